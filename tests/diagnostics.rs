//! Exercises the "fakes not installed" diagnostic end to end, the way a binary consumer would
//! configure logging via `env_logger`.

use std::rc::Rc;

use virtual_timers::{FakeTimers, GlobalHost, NoStackFormatter, NoopModuleMocker, PrimitiveTable, TimerBridge};

#[test]
fn drain_without_installing_fakes_still_runs_and_only_warns() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut real_table = PrimitiveTable::<u64>::default();
    real_table.set_timeout = Some(Rc::new(|_, _| 0));
    let host = GlobalHost::new(real_table);
    let scheduler = FakeTimers::new(
        host,
        TimerBridge::identity(),
        Box::new(NoopModuleMocker),
        Box::new(NoStackFormatter),
        None,
    );

    // Fakes were never installed; the drain still runs (on an empty internal queue) rather than
    // failing, logging a non-fatal warning instead.
    scheduler.run_all_ticks().unwrap();
    assert_eq!(scheduler.get_timer_count(), 0);
}
