//! The scheduler's internal queues, shared via `Rc<RefCell<Inner>>` with every installed fake.

use std::collections::{BinaryHeap, HashSet, VecDeque};

use crate::ids::IdAllocator;
use crate::timer::{HeapEntry, Immediate, StoredTimer, Tick};

pub(crate) struct Inner {
    pub now: u64,
    pub ids: IdAllocator,
    pub ticks: VecDeque<Tick>,
    pub immediates: VecDeque<Immediate>,
    pub timers: std::collections::HashMap<u64, StoredTimer>,
    pub heap: BinaryHeap<HeapEntry>,
    pub cancelled_ticks: HashSet<u64>,
    pub disposed: bool,
    pub max_loops: usize,
}

impl Inner {
    pub fn new(max_loops: usize) -> Self {
        Self {
            now: 0,
            ids: IdAllocator::default(),
            ticks: VecDeque::new(),
            immediates: VecDeque::new(),
            timers: std::collections::HashMap::new(),
            heap: BinaryHeap::new(),
            cancelled_ticks: HashSet::new(),
            disposed: false,
            max_loops,
        }
    }

    pub fn timer_count(&self) -> usize {
        self.timers.len() + self.immediates.len() + self.ticks.len()
    }

    pub fn clear_all_timers(&mut self) {
        self.timers.clear();
        self.heap.clear();
        self.immediates.clear();
        self.ticks.clear();
    }

    pub fn reset(&mut self) {
        self.now = 0;
        self.clear_all_timers();
        self.cancelled_ticks.clear();
    }

    pub fn dispose(&mut self) {
        self.disposed = true;
        self.clear_all_timers();
    }

    /// Returns the `(id, expiry)` of the earliest still-live timer without removing it,
    /// discarding any stale heap entries in front of it.
    ///
    /// An entry is stale either because its timer was cancelled (no longer in `timers`) or
    /// because an interval rescheduled past it (the `timers` entry now carries a later expiry
    /// than the heap entry recorded at push time).
    pub fn peek_next_timer(&mut self) -> Option<(u64, u64)> {
        loop {
            let entry = *self.heap.peek()?;
            match self.timers.get(&entry.id) {
                Some(timer) if timer.expiry == entry.expiry => return Some((entry.id, entry.expiry)),
                _ => {
                    self.heap.pop();
                }
            }
        }
    }

    pub fn take_timer(&mut self, id: u64) -> Option<StoredTimer> {
        self.timers.remove(&id)
    }
}
