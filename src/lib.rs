//! A deterministic virtual-time scheduler for exercising code that relies on
//! `setTimeout`/`setInterval`/`process.nextTick`/`setImmediate`/`requestAnimationFrame`-shaped
//! asynchronous scheduling primitives.
//!
//! Host code under test registers callbacks through a [`Host`] implementation instead of directly
//! against wall-clock timers. [`FakeTimers`] stores those registrations in internal queues keyed by
//! a monotonically increasing id, and a test drives time forward explicitly — draining all pending
//! work, advancing by a chosen number of virtual milliseconds, or stepping to the next scheduled
//! boundary — rather than waiting on the real clock.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use virtual_timers::{FakeTimers, GlobalHost, NoStackFormatter, NoopModuleMocker, PrimitiveTable, TimerBridge};
//!
//! // A host's "real" primitive table establishes which families it supports; a program
//! // embedding this crate would plug in its actual `setTimeout` binding here.
//! let mut real = PrimitiveTable::<u64>::default();
//! real.set_timeout = Some(Rc::new(|_cb, _delay_ms| 0));
//! real.clear_timeout = Some(Rc::new(|_id| {}));
//! let host = GlobalHost::new(real);
//! let scheduler = FakeTimers::new(
//!     host,
//!     TimerBridge::identity(),
//!     Box::new(NoopModuleMocker),
//!     Box::new(NoStackFormatter),
//!     None,
//! );
//! scheduler.use_fake_timers();
//!
//! let fired = Rc::new(RefCell::new(false));
//! let fired2 = fired.clone();
//! let set_timeout = scheduler.current_primitives().set_timeout.unwrap();
//! set_timeout(Box::new(move |_now| *fired2.borrow_mut() = true), 100);
//!
//! scheduler.run_all_timers().unwrap();
//! assert!(*fired.borrow());
//! ```

#![warn(missing_docs)]

mod bridge;
mod drain;
mod error;
mod fakes;
mod host;
mod ids;
mod mocker;
mod scheduler;
mod stack;
mod state;
mod timer;

pub use bridge::TimerBridge;
pub use error::{DrainKind, SchedulerError};
pub use host::{GlobalHost, Host, PrimitiveTable, Support};
pub use mocker::{ModuleMocker, NoopModuleMocker, RecordingModuleMocker};
pub use scheduler::FakeTimers;
pub use stack::{BacktraceStackFormatter, NoStackFormatter, StackFormatter};
pub use timer::{Thunk, TimerCallback};
