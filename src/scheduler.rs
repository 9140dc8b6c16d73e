//! The public façade: `FakeTimers<Ref, H>` ties the data model, fake primitives, drain
//! algorithms, and installer together behind a single construction surface.

use std::cell::RefCell;
use std::future::Future;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::rc::Rc;

use crate::drain;
use crate::error::SchedulerError;
use crate::fakes;
use crate::host::{ClearFn, Host, PrimitiveTable};
use crate::mocker::ModuleMocker;
use crate::stack::StackFormatter;
use crate::state::Inner;
use crate::timer::TimerCallback;
use crate::TimerBridge;

/// A deterministic, single-threaded virtual-time scheduler.
///
/// `Ref` is the host's native timer handle type (an integer id, or a stateful object — see
/// [`TimerBridge`]). `H` is the [`Host`] implementation the scheduler installs its fakes into and
/// reads its captured originals from.
pub struct FakeTimers<Ref, H> {
    inner: Rc<RefCell<Inner>>,
    host: H,
    bridge: Rc<TimerBridge<Ref>>,
    mocker: Rc<dyn ModuleMocker>,
    stack_formatter: Box<dyn StackFormatter>,
    originals: Rc<PrimitiveTable<Ref>>,
    fakes: RefCell<Option<PrimitiveTable<Ref>>>,
}

impl<Ref, H> FakeTimers<Ref, H>
where
    Ref: Clone + 'static,
    H: Host<Ref>,
{
    /// Captures the host's currently-installed primitives as "the originals" and builds a
    /// scheduler around them. The fake table itself is built lazily on first use (see
    /// [`Self::ensure_fakes`]).
    pub fn new(
        host: H,
        bridge: TimerBridge<Ref>,
        mocker: Box<dyn ModuleMocker>,
        stack_formatter: Box<dyn StackFormatter>,
        max_loops: Option<usize>,
    ) -> Self {
        let originals = Rc::new(host.current());
        Self {
            inner: Rc::new(RefCell::new(Inner::new(max_loops.unwrap_or(100_000)))),
            host,
            bridge: Rc::new(bridge),
            mocker: Rc::from(mocker),
            stack_formatter,
            originals,
            fakes: RefCell::new(None),
        }
    }

    fn clear_closure(&self, name: &'static str) -> ClearFn<Ref> {
        let inner = self.inner.clone();
        let bridge = self.bridge.clone();
        let mocker = self.mocker.clone();
        Rc::new(move |r: Ref| {
            mocker.record_invocation(name);
            fakes::clear_timer(&inner, &bridge, r);
        })
    }

    fn build_fake_table(&self) -> PrimitiveTable<Ref> {
        let support = self.host.support();
        let mut table = PrimitiveTable::default();

        if support.set_timeout {
            let inner = self.inner.clone();
            let bridge = self.bridge.clone();
            let mocker = self.mocker.clone();
            table.set_timeout = Some(Rc::new(move |cb: TimerCallback, delay: i64| {
                mocker.record_invocation("setTimeout");
                fakes::set_timeout(&inner, &bridge, cb, delay)
            }));
            table.clear_timeout = Some(self.clear_closure("clearTimeout"));
        }

        if support.set_interval {
            let inner = self.inner.clone();
            let bridge = self.bridge.clone();
            let mocker = self.mocker.clone();
            table.set_interval = Some(Rc::new(move |cb: TimerCallback, delay: i64| {
                mocker.record_invocation("setInterval");
                fakes::set_interval(&inner, &bridge, cb, delay)
            }));
            table.clear_interval = Some(self.clear_closure("clearInterval"));
        }

        if support.next_tick {
            let inner = self.inner.clone();
            let originals = self.originals.clone();
            let mocker = self.mocker.clone();
            table.next_tick = Some(Rc::new(move |cb: crate::timer::Thunk| {
                mocker.record_invocation("nextTick");
                fakes::next_tick(&inner, &originals, cb);
            }));
        }

        if support.set_immediate {
            let inner = self.inner.clone();
            let bridge = self.bridge.clone();
            let originals = self.originals.clone();
            let mocker = self.mocker.clone();
            table.set_immediate = Some(Rc::new(move |cb: crate::timer::Thunk| {
                mocker.record_invocation("setImmediate");
                fakes::set_immediate(&inner, &bridge, &originals, cb)
            }));
            table.clear_immediate = Some(self.clear_closure("clearImmediate"));
        }

        if support.animation_frame {
            let inner = self.inner.clone();
            let bridge = self.bridge.clone();
            let mocker = self.mocker.clone();
            table.request_animation_frame = Some(Rc::new(move |cb: TimerCallback| {
                mocker.record_invocation("requestAnimationFrame");
                fakes::request_animation_frame(&inner, &bridge, cb)
            }));
            table.cancel_animation_frame = Some(self.clear_closure("cancelAnimationFrame"));
        }

        table
    }

    /// Builds the fake table on first call and reuses it afterwards, so that every installed
    /// closure is backed by the same `Rc` (the identity the not-installed probe relies on).
    fn ensure_fakes(&self) -> PrimitiveTable<Ref> {
        if self.fakes.borrow().is_none() {
            let table = self.build_fake_table();
            *self.fakes.borrow_mut() = Some(table);
        }
        self.fakes.borrow().as_ref().expect("just populated above").clone()
    }

    /// Installs the fakes into the host for every primitive family the host supports.
    pub fn use_fake_timers(&self) {
        self.host.install(self.ensure_fakes());
    }

    /// Restores the originals captured at construction.
    pub fn use_real_timers(&self) {
        self.host.install((*self.originals).clone());
    }

    /// The primitive table currently installed into the host — whichever of fakes/originals was
    /// last written by [`Self::use_fake_timers`]/[`Self::use_real_timers`]/[`Self::run_with_real_timers`].
    pub fn current_primitives(&self) -> PrimitiveTable<Ref> {
        self.host.current()
    }

    /// Runs `cb` with the originals temporarily reinstalled, restoring whatever was installed
    /// beforehand afterwards — even if `cb` panics.
    pub fn run_with_real_timers<T>(&self, cb: impl FnOnce() -> T) -> T {
        let snapshot = self.host.current();
        self.host.install((*self.originals).clone());
        let result = catch_unwind(AssertUnwindSafe(cb));
        self.host.install(snapshot);
        match result {
            Ok(value) => value,
            Err(payload) => resume_unwind(payload),
        }
    }

    /// Schedules a fake timeout that resolves a future with `value` once it fires.
    pub fn timeout_as_future<T: 'static>(&self, delay_ms: i64, value: T) -> impl Future<Output = T> {
        let (tx, rx) = futures::channel::oneshot::channel();
        let mut value = Some(value);
        let mut tx = Some(tx);
        let cb: TimerCallback = Box::new(move |_now| {
            if let (Some(tx), Some(value)) = (tx.take(), value.take()) {
                let _ = tx.send(value);
            }
        });
        fakes::set_timeout(&self.inner, &self.bridge, cb, delay_ms);
        async move { rx.await.expect("timeout future's timer was dropped before firing") }
    }

    /// True if the host's currently-installed `setTimeout` is this scheduler's fake (or if the
    /// host has no `setTimeout` family at all, in which case there is nothing to compare).
    fn is_installed(&self) -> bool {
        match (self.host.current().set_timeout, self.ensure_fakes().set_timeout) {
            (Some(current), Some(fake)) => Rc::ptr_eq(&current, &fake),
            (None, None) => true,
            _ => false,
        }
    }

    fn warn_if_needed(&self) {
        drain::warn_if_not_installed(self.is_installed(), self.stack_formatter.as_ref());
    }

    /// Fires every queued tick, in order.
    pub fn run_all_ticks(&self) -> Result<(), SchedulerError> {
        self.warn_if_needed();
        drain::run_all_ticks(&self.inner)
    }

    /// Fires every queued immediate, in order.
    pub fn run_all_immediates(&self) -> Result<(), SchedulerError> {
        self.warn_if_needed();
        drain::run_all_immediates(&self.inner)
    }

    /// Drains ticks, then immediates, then every timer in expiry order. Does not advance the
    /// virtual clock.
    pub fn run_all_timers(&self) -> Result<(), SchedulerError> {
        self.warn_if_needed();
        drain::run_all_timers(&self.inner)
    }

    /// Advances the virtual clock by `ms`, firing whatever falls within the advance.
    pub fn advance_timers_by_time(&self, ms: u64) -> Result<(), SchedulerError> {
        self.warn_if_needed();
        drain::advance_timers_by_time(&self.inner, ms)
    }

    /// Advances to the next scheduled timer's expiry, `steps` times in a row.
    pub fn advance_timers_to_next_timer(&self, steps: u32) -> Result<(), SchedulerError> {
        self.warn_if_needed();
        drain::advance_timers_to_next_timer(&self.inner, steps)
    }

    /// Fires only the timers already live at the moment of the call.
    pub fn run_only_pending_timers(&self) -> Result<(), SchedulerError> {
        self.warn_if_needed();
        drain::run_only_pending_timers(&self.inner)
    }

    /// The combined count of outstanding timers, immediates, and ticks.
    pub fn get_timer_count(&self) -> usize {
        self.inner.borrow().timer_count()
    }

    /// The current reading of the virtual clock, in milliseconds.
    pub fn now(&self) -> u64 {
        self.inner.borrow().now
    }

    /// Empties all three containers, leaving the virtual clock and cancelled-tick bookkeeping
    /// untouched.
    pub fn clear_all_timers(&self) {
        self.inner.borrow_mut().clear_all_timers();
    }

    /// Resets the virtual clock to 0 and empties every container.
    pub fn reset(&self) {
        self.inner.borrow_mut().reset();
    }

    /// Marks the scheduler disposed: every fake primitive becomes a no-op from here on.
    pub fn dispose(&self) {
        self.inner.borrow_mut().dispose();
    }
}
