//! Storage-level records for ticks, immediates, and timers.
//!
//! Splits the callback itself from the scheduled firing of it, the way a task queue separates a
//! unit of work from its execution slot: here the split is between the `timers` map, which
//! owns the callback and is the single source of truth for whether a timer is still live, and the
//! `heap`, which only orders ids by expiry and is lazily cleaned against the map (see
//! [`crate::state::Inner::peek_next_timer`]).

use std::cmp::Ordering;

/// A closure already bound to its own arguments; the scheduler calls it with the virtual clock
/// reading at fire time. Timeout/interval callbacks that don't care about the clock simply ignore
/// the argument; `requestAnimationFrame`'s wrapper (see [`crate::fakes::request_animation_frame`])
/// is the one consumer that forwards it to the caller.
pub type TimerCallback = Box<dyn FnMut(u64)>;

/// A plain zero-argument thunk, used for ticks and immediates.
pub type Thunk = Box<dyn FnOnce()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerKind {
    Timeout,
    Interval { interval_ms: u64 },
}

pub(crate) struct StoredTimer {
    pub kind: TimerKind,
    pub callback: TimerCallback,
    pub expiry: u64,
}

/// An entry in the expiry-ordered heap. Kept deliberately small (no callback) so that stale
/// entries left behind by cancellation or interval rescheduling are cheap to skip over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HeapEntry {
    pub id: u64,
    pub expiry: u64,
}

// `BinaryHeap` is a max-heap; reversing the comparison gives us pop-the-smallest, with ties
// broken by ascending id (equivalently: insertion order).
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.expiry, self.id).cmp(&(other.expiry, other.id)).reverse()
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub(crate) struct Tick {
    pub id: u64,
    /// Shared with the real-nextTick fallback so whichever side observes the tick first is the
    /// one that actually runs it; see [`crate::fakes::try_fire_tick`].
    pub callback: std::rc::Rc<std::cell::RefCell<Option<Thunk>>>,
}

pub(crate) struct Immediate {
    pub id: u64,
    pub callback: Thunk,
}
