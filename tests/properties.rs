//! P1-P7 from the testable-properties section, exercised as direct assertions against literal
//! inputs (no property-testing crate is present anywhere in the grounding pack; `rstest`
//! parameterizes the handful of cases that share a single property).

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rstest::rstest;
use virtual_timers::{FakeTimers, GlobalHost, NoStackFormatter, NoopModuleMocker, PrimitiveTable, TimerBridge};

/// A "real" table with a placeholder closure in every slot, so `Support` reports every family
/// as present and `use_fake_timers` installs a fake for all of them.
fn fully_supported_real_table() -> PrimitiveTable<u64> {
    let mut real = PrimitiveTable::default();
    real.set_timeout = Some(Rc::new(|_, _| 0));
    real.clear_timeout = Some(Rc::new(|_| {}));
    real.set_interval = Some(Rc::new(|_, _| 0));
    real.clear_interval = Some(Rc::new(|_| {}));
    real.next_tick = Some(Rc::new(|_| {}));
    real.set_immediate = Some(Rc::new(|_| 0));
    real.clear_immediate = Some(Rc::new(|_| {}));
    real.request_animation_frame = Some(Rc::new(|_| 0));
    real.cancel_animation_frame = Some(Rc::new(|_| {}));
    real
}

fn scheduler() -> FakeTimers<u64, GlobalHost<u64>> {
    let host = GlobalHost::new(fully_supported_real_table());
    let scheduler = FakeTimers::new(
        host,
        TimerBridge::identity(),
        Box::new(NoopModuleMocker),
        Box::new(NoStackFormatter),
        None,
    );
    scheduler.use_fake_timers();
    scheduler
}

/// P1: virtual-now never decreases across a sequence of advances.
#[rstest]
#[case(vec![10, 20, 5])]
#[case(vec![0, 0, 100])]
#[case(vec![1000])]
fn p1_monotonic_clock(#[case] advances: Vec<u64>) {
    let scheduler = scheduler();
    let mut last = scheduler.now();
    for ms in advances {
        scheduler.advance_timers_by_time(ms).unwrap();
        let now = scheduler.now();
        assert!(now >= last);
        last = now;
    }
}

/// P2: `getTimerCount()` equals the sum of timers, immediates, and ticks at every observation
/// point.
#[test]
fn p2_count_accounting() {
    let scheduler = scheduler();
    let primitives = scheduler.current_primitives();
    assert_eq!(scheduler.get_timer_count(), 0);

    (primitives.set_timeout.clone().unwrap())(Box::new(|_| {}), 10);
    (primitives.set_interval.clone().unwrap())(Box::new(|_| {}), 10);
    (primitives.set_immediate.clone().unwrap())(Box::new(|| {}));
    (primitives.next_tick.clone().unwrap())(Box::new(|| {}));
    assert_eq!(scheduler.get_timer_count(), 4);

    scheduler.run_all_ticks().unwrap();
    assert_eq!(scheduler.get_timer_count(), 3);
}

/// P3: after `dispose()`, every fake returns a null-ish value and no container grows.
#[test]
fn p3_dispose_short_circuits() {
    let scheduler = scheduler();
    scheduler.dispose();
    let primitives = scheduler.current_primitives();

    assert_eq!((primitives.set_timeout.unwrap())(Box::new(|_| {}), 10), 0);
    assert_eq!((primitives.set_interval.unwrap())(Box::new(|_| {}), 10), 0);
    assert_eq!((primitives.set_immediate.unwrap())(Box::new(|| {})), 0);
    assert_eq!(scheduler.get_timer_count(), 0);
}

/// P4: timers scheduled at ascending expiries fire in that order under a full drain.
#[rstest]
#[case(vec![100, 200, 50], vec![50, 100, 200])]
#[case(vec![0, 0, 0], vec![0, 0, 0])]
#[case(vec![5], vec![5])]
fn p4_timer_ordering(#[case] delays: Vec<i64>, #[case] expected: Vec<i64>) {
    let scheduler = scheduler();
    let set_timeout = scheduler.current_primitives().set_timeout.unwrap();
    let order = Rc::new(RefCell::new(Vec::new()));
    for delay in delays {
        let order = order.clone();
        set_timeout(Box::new(move |_| order.borrow_mut().push(delay)), delay);
    }
    scheduler.run_all_timers().unwrap();
    assert_eq!(*order.borrow(), expected);
}

/// P5: clearing an unknown ref, or the same ref twice, is observably a no-op.
#[test]
fn p5_cancellation_is_idempotent() {
    let scheduler = scheduler();
    let primitives = scheduler.current_primitives();
    let clear_timeout = primitives.clear_timeout.unwrap();

    clear_timeout(999);
    assert_eq!(scheduler.get_timer_count(), 0);

    let set_timeout = primitives.set_timeout.unwrap();
    let id = set_timeout(Box::new(|_| {}), 10);
    clear_timeout(id);
    clear_timeout(id);
    assert_eq!(scheduler.get_timer_count(), 0);
}

/// P6: an interval fired `k` times and then cleared has run exactly `k` callbacks.
#[rstest]
#[case(3)]
#[case(0)]
#[case(10)]
fn p6_interval_reentry(#[case] k: u32) {
    let scheduler = scheduler();
    let primitives = scheduler.current_primitives();
    let set_interval = primitives.set_interval.unwrap();
    let clear_interval = primitives.clear_interval.unwrap();

    let count = Rc::new(Cell::new(0u32));
    let count2 = count.clone();
    let id = set_interval(Box::new(move |_| count2.set(count2.get() + 1)), 10);

    scheduler.advance_timers_to_next_timer(k).unwrap();
    clear_interval(id);

    assert_eq!(count.get(), k);
    assert_eq!(scheduler.get_timer_count(), 0);
}

/// P7: a callback that unconditionally reschedules itself raises within `maxLoops` iterations.
#[test]
fn p7_bound_enforcement() {
    let host = GlobalHost::new(fully_supported_real_table());
    let scheduler = FakeTimers::new(
        host,
        TimerBridge::identity(),
        Box::new(NoopModuleMocker),
        Box::new(NoStackFormatter),
        Some(3),
    );
    scheduler.use_fake_timers();
    let set_immediate = scheduler.current_primitives().set_immediate.unwrap();

    fn reschedule(set_immediate: Rc<dyn Fn(Box<dyn FnOnce()>) -> u64>) {
        let set_immediate2 = set_immediate.clone();
        set_immediate(Box::new(move || reschedule(set_immediate2)));
    }
    reschedule(set_immediate);

    let err = scheduler.run_all_immediates().unwrap_err();
    assert_eq!(err.to_string().contains("immediates"), true);
}
