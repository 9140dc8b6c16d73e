//! Fake primitive implementations.
//!
//! These are free functions rather than methods so that [`crate::scheduler::FakeTimers`] can close
//! over them independently for each primitive family when it builds the installable
//! [`crate::host::PrimitiveTable`], keeping the public `set_*`/`clear_*` surface separate from the
//! plumbing that wires a fired callback back into the scheduler's own queues.

use std::cell::RefCell;
use std::rc::Rc;

use crate::bridge::TimerBridge;
use crate::host::PrimitiveTable;
use crate::state::Inner;
use crate::timer::{Immediate, StoredTimer, Thunk, Tick, TimerCallback, TimerKind};

/// `1000 / 60`, truncated: `requestAnimationFrame` is implemented as a `setTimeout` at a 60fps
/// cadence.
const ANIMATION_FRAME_INTERVAL_MS: i64 = 1000 / 60;

/// Truncates to a non-negative value, clamped to the range a 32-bit timer delay would allow.
fn normalize_delay(delay: i64) -> u64 {
    delay.clamp(0, i32::MAX as i64) as u64
}

pub(crate) fn set_timeout<Ref: Clone>(
    inner: &Rc<RefCell<Inner>>,
    bridge: &TimerBridge<Ref>,
    callback: TimerCallback,
    delay: i64,
) -> Ref {
    let mut state = inner.borrow_mut();
    if state.disposed {
        return bridge.id_to_ref(0);
    }
    let id = state.ids.next();
    let expiry = state.now + normalize_delay(delay);
    state.timers.insert(
        id,
        StoredTimer {
            kind: TimerKind::Timeout,
            callback,
            expiry,
        },
    );
    state.heap.push(crate::timer::HeapEntry { id, expiry });
    bridge.id_to_ref(id)
}

pub(crate) fn set_interval<Ref: Clone>(
    inner: &Rc<RefCell<Inner>>,
    bridge: &TimerBridge<Ref>,
    callback: TimerCallback,
    delay: i64,
) -> Ref {
    let mut state = inner.borrow_mut();
    if state.disposed {
        return bridge.id_to_ref(0);
    }
    let interval_ms = normalize_delay(delay);
    let id = state.ids.next();
    let expiry = state.now + interval_ms;
    state.timers.insert(
        id,
        StoredTimer {
            kind: TimerKind::Interval { interval_ms },
            callback,
            expiry,
        },
    );
    state.heap.push(crate::timer::HeapEntry { id, expiry });
    bridge.id_to_ref(id)
}

/// Backs `clearTimeout`, `clearInterval`, and `cancelAnimationFrame` alike: clearing an unknown
/// or already-cleared ref is a no-op (P5).
pub(crate) fn clear_timer<Ref>(inner: &Rc<RefCell<Inner>>, bridge: &TimerBridge<Ref>, r: Ref) {
    if let Some(id) = bridge.ref_to_id(&r) {
        inner.borrow_mut().timers.remove(&id);
    }
}

/// `requestAnimationFrame` is sugar over `setTimeout`: the wrapper ignores its own bound argument
/// and instead forwards the fire-time virtual clock reading to the caller's callback.
pub(crate) fn request_animation_frame<Ref: Clone>(
    inner: &Rc<RefCell<Inner>>,
    bridge: &TimerBridge<Ref>,
    mut callback: TimerCallback,
) -> Ref {
    let wrapped: TimerCallback = Box::new(move |now| callback(now));
    set_timeout(inner, bridge, wrapped, ANIMATION_FRAME_INTERVAL_MS)
}

/// Runs a tick or immediate's callback exactly once, whichever caller (the virtual drain, or the
/// real-primitive fallback) gets there first. `id` has already been removed from `cancelled_ticks`
/// bookkeeping by the caller where relevant; this only guards the shared callback cell itself.
pub(crate) fn take_and_call(cell: &Rc<RefCell<Option<Thunk>>>) {
    if let Some(cb) = cell.borrow_mut().take() {
        cb();
    }
}

/// Fires a queued tick if (and only if) it has not already fired via the other path, marking it
/// cancelled either way so the other path becomes a no-op from here on.
pub(crate) fn try_fire_tick(inner: &Rc<RefCell<Inner>>, id: u64, cell: &Rc<RefCell<Option<Thunk>>>) {
    let should_run = {
        let mut state = inner.borrow_mut();
        if state.cancelled_ticks.contains(&id) {
            false
        } else {
            state.cancelled_ticks.insert(id);
            true
        }
    };
    if should_run {
        take_and_call(cell);
    }
}

pub(crate) fn next_tick<Ref>(
    inner: &Rc<RefCell<Inner>>,
    originals: &Rc<PrimitiveTable<Ref>>,
    callback: Thunk,
) {
    let mut state = inner.borrow_mut();
    if state.disposed {
        return;
    }
    let id = state.ids.next();
    let cell = Rc::new(RefCell::new(Some(callback)));
    state.ticks.push_back(Tick {
        id,
        callback: cell.clone(),
    });
    drop(state);

    if let Some(real_next_tick) = &originals.next_tick {
        let inner = inner.clone();
        let fallback: Thunk = Box::new(move || try_fire_tick(&inner, id, &cell));
        real_next_tick(fallback);
    }
}

/// Fires a queued immediate if it is still present (i.e. hasn't already been fired or cleared),
/// backing both the virtual drain and the real-primitive fallback.
pub(crate) fn try_fire_immediate(inner: &Rc<RefCell<Inner>>, id: u64) {
    let immediate = {
        let mut state = inner.borrow_mut();
        state
            .immediates
            .iter()
            .position(|entry| entry.id == id)
            .map(|pos| state.immediates.remove(pos).unwrap())
    };
    if let Some(immediate) = immediate {
        (immediate.callback)();
    }
}

pub(crate) fn set_immediate<Ref: Clone>(
    inner: &Rc<RefCell<Inner>>,
    bridge: &TimerBridge<Ref>,
    originals: &Rc<PrimitiveTable<Ref>>,
    callback: Thunk,
) -> Ref {
    let id = {
        let mut state = inner.borrow_mut();
        if state.disposed {
            return bridge.id_to_ref(0);
        }
        let id = state.ids.next();
        state.immediates.push_back(Immediate { id, callback });
        id
    };

    if let Some(real_set_immediate) = &originals.set_immediate {
        let inner = inner.clone();
        let fallback: Thunk = Box::new(move || try_fire_immediate(&inner, id));
        real_set_immediate(fallback);
    }
    bridge.id_to_ref(id)
}

pub(crate) fn clear_immediate<Ref>(inner: &Rc<RefCell<Inner>>, bridge: &TimerBridge<Ref>, r: Ref) {
    if let Some(id) = bridge.ref_to_id(&r) {
        let mut state = inner.borrow_mut();
        if let Some(pos) = state.immediates.iter().position(|entry| entry.id == id) {
            state.immediates.remove(pos);
        }
    }
}
