//! Drain algorithms: the bounded loops that pull work out of the queues.
//!
//! Every loop here follows the same shape — peek the next piece of work, fire it, repeat — with
//! an explicit iteration counter so a callback that keeps rescheduling itself fails loudly
//! instead of spinning the test process.

use std::cell::RefCell;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::rc::Rc;

use crate::error::{DrainKind, SchedulerError};
use crate::fakes::take_and_call;
use crate::stack::StackFormatter;
use crate::state::Inner;
use crate::timer::{StoredTimer, TimerKind};

/// Fires the ticks currently queued, in order, skipping any already marked cancelled by the
/// real-nextTick fallback (see [`crate::fakes::try_fire_tick`]).
pub(crate) fn run_all_ticks(inner: &Rc<RefCell<Inner>>) -> Result<(), SchedulerError> {
    let max_loops = inner.borrow().max_loops;
    let mut count = 0usize;
    loop {
        if inner.borrow().ticks.is_empty() {
            return Ok(());
        }
        if count == max_loops {
            return Err(SchedulerError::RecursionLimitExceeded {
                drain: DrainKind::Ticks,
                max_loops,
            });
        }
        count += 1;
        let tick = inner.borrow_mut().ticks.pop_front().expect("checked non-empty above");
        let should_run = {
            let mut state = inner.borrow_mut();
            if state.cancelled_ticks.contains(&tick.id) {
                false
            } else {
                state.cancelled_ticks.insert(tick.id);
                true
            }
        };
        if should_run {
            take_and_call(&tick.callback);
        }
    }
}

/// Fires the immediates currently queued, in order. Each entry is popped before its callback
/// runs, so a panicking callback still leaves the queue consistent.
pub(crate) fn run_all_immediates(inner: &Rc<RefCell<Inner>>) -> Result<(), SchedulerError> {
    let max_loops = inner.borrow().max_loops;
    let mut count = 0usize;
    loop {
        if inner.borrow().immediates.is_empty() {
            return Ok(());
        }
        if count == max_loops {
            return Err(SchedulerError::RecursionLimitExceeded {
                drain: DrainKind::Immediates,
                max_loops,
            });
        }
        count += 1;
        let immediate = inner
            .borrow_mut()
            .immediates
            .pop_front()
            .expect("checked non-empty above");
        (immediate.callback)();
    }
}

/// Fires a single timer by id, handling interval re-entry.
///
/// An interval's slot is refilled with a no-op placeholder *before* the real callback runs, so a
/// `clearInterval` of its own id from inside the callback body has something to remove; the real
/// callback is swapped back in afterwards only if that placeholder is still there. This preserves
/// "re-insert before the callback runs" without holding the `Inner` borrow across a reentrant
/// callback invocation. The callback is invoked under `catch_unwind` so that a panicking callback
/// doesn't strand the interval on its placeholder: the real closure is written back into `timers`
/// unconditionally, and the panic is then resumed so the caller still observes it.
///
/// Returns `false` without doing anything if `id` is no longer present (already fired, cancelled,
/// or never existed — callers such as [`run_only_pending_timers`] rely on this to skip stale ids
/// in their snapshot).
fn fire_timer(inner: &Rc<RefCell<Inner>>, id: u64) -> bool {
    let now;
    let kind;
    let mut callback;
    {
        let mut state = inner.borrow_mut();
        now = state.now;
        let stored = match state.take_timer(id) {
            Some(stored) => stored,
            None => return false,
        };
        kind = stored.kind;
        callback = stored.callback;
        if let TimerKind::Interval { interval_ms } = kind {
            let new_expiry = now + interval_ms;
            state.timers.insert(
                id,
                StoredTimer {
                    kind,
                    callback: Box::new(|_| {}),
                    expiry: new_expiry,
                },
            );
            state.heap.push(crate::timer::HeapEntry { id, expiry: new_expiry });
        }
    }

    let result = catch_unwind(AssertUnwindSafe(|| callback(now)));

    if let TimerKind::Interval { .. } = kind {
        if let Some(existing) = inner.borrow_mut().timers.get_mut(&id) {
            existing.callback = callback;
        }
    }

    if let Err(payload) = result {
        resume_unwind(payload);
    }
    true
}

/// Drains ticks, then immediates, then every timer in expiry order, re-draining ticks/immediates
/// scheduled during each timer's firing before picking the next one. Does not advance `now`.
pub(crate) fn run_all_timers(inner: &Rc<RefCell<Inner>>) -> Result<(), SchedulerError> {
    run_all_ticks(inner)?;
    run_all_immediates(inner)?;

    let max_loops = inner.borrow().max_loops;
    let mut count = 0usize;
    loop {
        let next = inner.borrow_mut().peek_next_timer();
        let id = match next {
            Some((id, _)) => id,
            None => return Ok(()),
        };
        if count == max_loops {
            return Err(SchedulerError::RecursionLimitExceeded {
                drain: DrainKind::Timers,
                max_loops,
            });
        }
        count += 1;
        fire_timer(inner, id);
        run_all_ticks(inner)?;
        run_all_immediates(inner)?;
    }
}

/// Advances the virtual clock by `ms`, firing every timer whose expiry falls within the advance.
pub(crate) fn advance_timers_by_time(inner: &Rc<RefCell<Inner>>, ms: u64) -> Result<(), SchedulerError> {
    run_all_ticks(inner)?;
    run_all_immediates(inner)?;

    let max_loops = inner.borrow().max_loops;
    let mut remaining = ms;
    let mut count = 0usize;
    loop {
        let next = inner.borrow_mut().peek_next_timer();
        let (id, expiry) = match next {
            Some(pair) => pair,
            None => {
                inner.borrow_mut().now += remaining;
                return Ok(());
            }
        };
        let now = inner.borrow().now;
        if now + remaining < expiry {
            inner.borrow_mut().now += remaining;
            return Ok(());
        }
        if count == max_loops {
            return Err(SchedulerError::RecursionLimitExceeded {
                drain: DrainKind::Timers,
                max_loops,
            });
        }
        count += 1;
        remaining -= expiry - now;
        inner.borrow_mut().now = expiry;
        fire_timer(inner, id);
        run_all_ticks(inner)?;
        run_all_immediates(inner)?;
    }
}

/// Advances the clock to the next scheduled timer's expiry, `steps` times in a row.
pub(crate) fn advance_timers_to_next_timer(inner: &Rc<RefCell<Inner>>, steps: u32) -> Result<(), SchedulerError> {
    for _ in 0..steps {
        let next = inner.borrow_mut().peek_next_timer();
        match next {
            Some((_, expiry)) => {
                let now = inner.borrow().now;
                advance_timers_by_time(inner, expiry.saturating_sub(now))?;
            }
            None => break,
        }
    }
    Ok(())
}

/// Fires every timer live at the moment this is called, in expiry order, ignoring any timer
/// scheduled as a side effect of firing one of the snapshotted ones (including interval
/// re-insertions — those are picked up by a later drain, not this one).
pub(crate) fn run_only_pending_timers(inner: &Rc<RefCell<Inner>>) -> Result<(), SchedulerError> {
    run_all_immediates(inner)?;

    let mut snapshot: Vec<(u64, u64)> = {
        let state = inner.borrow();
        state.timers.iter().map(|(&id, timer)| (id, timer.expiry)).collect()
    };
    snapshot.sort_unstable_by_key(|&(id, expiry)| (expiry, id));

    let max_loops = inner.borrow().max_loops;
    for (count, (id, _)) in snapshot.into_iter().enumerate() {
        if count == max_loops {
            return Err(SchedulerError::RecursionLimitExceeded {
                drain: DrainKind::Timers,
                max_loops,
            });
        }
        fire_timer(inner, id);
    }
    Ok(())
}

/// Emits the non-fatal "fakes not installed" warning when `is_installed` is false.
pub(crate) fn warn_if_not_installed(is_installed: bool, formatter: &dyn StackFormatter) {
    if !is_installed {
        log::warn!(
            "a timer drain ran while the real primitives are still installed; call use_fake_timers() first\n{}",
            formatter.format()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{HeapEntry, TimerCallback};
    use std::cell::Cell;

    fn push_timeout(inner: &Rc<RefCell<Inner>>, expiry: u64, cb: TimerCallback) -> u64 {
        let mut state = inner.borrow_mut();
        let id = state.ids.next();
        state.timers.insert(
            id,
            StoredTimer {
                kind: TimerKind::Timeout,
                callback: cb,
                expiry,
            },
        );
        state.heap.push(HeapEntry { id, expiry });
        id
    }

    fn push_interval(inner: &Rc<RefCell<Inner>>, interval_ms: u64, cb: TimerCallback) -> u64 {
        let mut state = inner.borrow_mut();
        let id = state.ids.next();
        state.timers.insert(
            id,
            StoredTimer {
                kind: TimerKind::Interval { interval_ms },
                callback: cb,
                expiry: interval_ms,
            },
        );
        state.heap.push(HeapEntry { id, expiry: interval_ms });
        id
    }

    #[test]
    fn run_all_timers_fires_in_expiry_order() {
        let inner = Rc::new(RefCell::new(Inner::new(100_000)));
        let order = Rc::new(RefCell::new(Vec::new()));
        for delay in [100u64, 200, 50] {
            let order = order.clone();
            push_timeout(&inner, delay, Box::new(move |_| order.borrow_mut().push(delay)));
        }
        run_all_timers(&inner).unwrap();
        assert_eq!(*order.borrow(), vec![50, 100, 200]);
        assert_eq!(inner.borrow().now, 0);
    }

    #[test]
    fn advance_by_time_stops_partway_through() {
        let inner = Rc::new(RefCell::new(Inner::new(100_000)));
        let fired = Rc::new(Cell::new(0u32));
        for delay in [100u64, 200] {
            let fired = fired.clone();
            push_timeout(&inner, delay, Box::new(move |_| fired.set(fired.get() + 1)));
        }
        advance_timers_by_time(&inner, 150).unwrap();
        assert_eq!(fired.get(), 1);
        assert_eq!(inner.borrow().now, 150);
        assert_eq!(inner.borrow().timer_count(), 1);
    }

    #[test]
    fn advance_by_time_runs_an_interval_repeatedly() {
        let inner = Rc::new(RefCell::new(Inner::new(100_000)));
        let fire_times = Rc::new(RefCell::new(Vec::new()));
        let fire_times2 = fire_times.clone();
        push_interval(&inner, 30, Box::new(move |now| fire_times2.borrow_mut().push(now)));
        advance_timers_by_time(&inner, 100).unwrap();
        assert_eq!(*fire_times.borrow(), vec![30, 60, 90]);
        assert_eq!(inner.borrow().now, 100);
        let remaining_expiry = inner.borrow_mut().peek_next_timer().map(|(_, expiry)| expiry);
        assert_eq!(remaining_expiry, Some(120));
    }

    #[test]
    fn clearing_an_interval_during_its_own_callback_stops_it() {
        let inner = Rc::new(RefCell::new(Inner::new(100_000)));
        let count = Rc::new(Cell::new(0u32));
        let count2 = count.clone();
        let inner_for_cb = inner.clone();
        let handle: Rc<Cell<u64>> = Rc::new(Cell::new(0));
        let handle_for_cb = handle.clone();
        let id = push_interval(
            &inner,
            10,
            Box::new(move |_| {
                count2.set(count2.get() + 1);
                if count2.get() == 2 {
                    inner_for_cb.borrow_mut().timers.remove(&handle_for_cb.get());
                }
            }),
        );
        handle.set(id);
        advance_timers_by_time(&inner, 1000).unwrap();
        assert_eq!(count.get(), 2);
        assert_eq!(inner.borrow().timer_count(), 0);
    }

    #[test]
    fn a_panicking_interval_callback_is_restored_for_the_next_fire() {
        let inner = Rc::new(RefCell::new(Inner::new(100_000)));
        let calls = Rc::new(Cell::new(0u32));
        let calls2 = calls.clone();
        push_interval(
            &inner,
            10,
            Box::new(move |_| {
                calls2.set(calls2.get() + 1);
                if calls2.get() == 1 {
                    panic!("boom");
                }
            }),
        );

        let result = catch_unwind(AssertUnwindSafe(|| advance_timers_by_time(&inner, 10)));
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
        assert_eq!(inner.borrow().timer_count(), 1);

        advance_timers_by_time(&inner, 10).unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn run_all_ticks_enforces_the_recursion_guard() {
        let inner = Rc::new(RefCell::new(Inner::new(5)));
        fn schedule_one_more(inner: Rc<RefCell<Inner>>) {
            let id = inner.borrow_mut().ids.next();
            let inner_for_cb = inner.clone();
            let cell = Rc::new(RefCell::new(Some(Box::new(move || {
                schedule_one_more(inner_for_cb.clone());
            }) as Box<dyn FnOnce()>)));
            inner.borrow_mut().ticks.push_back(crate::timer::Tick { id, callback: cell });
        }
        schedule_one_more(inner.clone());
        let err = run_all_ticks(&inner).unwrap_err();
        assert_eq!(
            err,
            SchedulerError::RecursionLimitExceeded {
                drain: DrainKind::Ticks,
                max_loops: 5
            }
        );
    }

    #[test]
    fn run_only_pending_timers_ignores_timers_scheduled_during_the_drain() {
        let inner = Rc::new(RefCell::new(Inner::new(100_000)));
        let inner_for_cb = inner.clone();
        let ran = Rc::new(Cell::new(false));
        let ran2 = ran.clone();
        push_timeout(
            &inner,
            10,
            Box::new(move |_| {
                push_timeout(&inner_for_cb, 0, Box::new(|_| {}));
                ran2.set(true);
            }),
        );
        run_only_pending_timers(&inner).unwrap();
        assert!(ran.get());
        assert_eq!(inner.borrow().timer_count(), 1);
    }
}
