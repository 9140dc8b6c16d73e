//! The "host globals" abstraction: an explicit interface over get/set per primitive family,
//! replacing mutable-global-object patching with an explicit capability table.

use std::cell::RefCell;
use std::rc::Rc;

use crate::timer::{Thunk, TimerCallback};

/// A one-shot or periodic "set" primitive: takes a bound callback and a delay, returns a ref.
pub type SetTimerFn<Ref> = Rc<dyn Fn(TimerCallback, i64) -> Ref>;
/// A "clear" primitive shared by `clearTimeout`, `clearInterval`, and `cancelAnimationFrame`.
pub type ClearFn<Ref> = Rc<dyn Fn(Ref)>;
/// `nextTick`'s primitive: fire-and-forget, no ref returned.
pub type NextTickFn = Rc<dyn Fn(Thunk)>;
/// `setImmediate`'s primitive: fire-and-forget callback, but a ref is still returned for `clear`.
pub type SetImmediateFn<Ref> = Rc<dyn Fn(Thunk) -> Ref>;
/// `requestAnimationFrame`'s primitive: callback receives the fire-time clock reading.
pub type RequestAnimationFrameFn<Ref> = Rc<dyn Fn(TimerCallback) -> Ref>;

/// The set of primitive bindings installed at a single point in time.
///
/// Every field is independently optional: `None` can mean either "this host doesn't support the
/// family at all" (see [`Support`]) or simply "nothing has been installed into this slot yet."
pub struct PrimitiveTable<Ref> {
    /// `setTimeout`-shaped one-shot scheduling.
    pub set_timeout: Option<SetTimerFn<Ref>>,
    /// Cancels a ref returned by `set_timeout`.
    pub clear_timeout: Option<ClearFn<Ref>>,
    /// `setInterval`-shaped periodic scheduling.
    pub set_interval: Option<SetTimerFn<Ref>>,
    /// Cancels a ref returned by `set_interval`.
    pub clear_interval: Option<ClearFn<Ref>>,
    /// `process.nextTick`-shaped microtask scheduling.
    pub next_tick: Option<NextTickFn>,
    /// `setImmediate`-shaped macrotask scheduling.
    pub set_immediate: Option<SetImmediateFn<Ref>>,
    /// Cancels a ref returned by `set_immediate`.
    pub clear_immediate: Option<ClearFn<Ref>>,
    /// `requestAnimationFrame`-shaped scheduling.
    pub request_animation_frame: Option<RequestAnimationFrameFn<Ref>>,
    /// Cancels a ref returned by `request_animation_frame`.
    pub cancel_animation_frame: Option<ClearFn<Ref>>,
}

// Manually implemented: `#[derive(Clone)]`/`#[derive(Default)]` would incorrectly require
// `Ref: Clone`/`Ref: Default`, even though every field here is an `Rc`/`Option` that doesn't need it.
impl<Ref> Clone for PrimitiveTable<Ref> {
    fn clone(&self) -> Self {
        Self {
            set_timeout: self.set_timeout.clone(),
            clear_timeout: self.clear_timeout.clone(),
            set_interval: self.set_interval.clone(),
            clear_interval: self.clear_interval.clone(),
            next_tick: self.next_tick.clone(),
            set_immediate: self.set_immediate.clone(),
            clear_immediate: self.clear_immediate.clone(),
            request_animation_frame: self.request_animation_frame.clone(),
            cancel_animation_frame: self.cancel_animation_frame.clone(),
        }
    }
}

impl<Ref> Default for PrimitiveTable<Ref> {
    fn default() -> Self {
        Self {
            set_timeout: None,
            clear_timeout: None,
            set_interval: None,
            clear_interval: None,
            next_tick: None,
            set_immediate: None,
            clear_immediate: None,
            request_animation_frame: None,
            cancel_animation_frame: None,
        }
    }
}

/// Which primitive families this host defines at all. Probed once, at construction, from
/// whichever bindings the embedder passed in as "the real primitives" — some hosts simply don't
/// have e.g. `requestAnimationFrame`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Support {
    /// Host defines `setTimeout`/`clearTimeout`.
    pub set_timeout: bool,
    /// Host defines `setInterval`/`clearInterval`.
    pub set_interval: bool,
    /// Host defines `process.nextTick`.
    pub next_tick: bool,
    /// Host defines `setImmediate`/`clearImmediate`.
    pub set_immediate: bool,
    /// Host defines `requestAnimationFrame`/`cancelAnimationFrame`.
    pub animation_frame: bool,
}

impl<Ref> From<&PrimitiveTable<Ref>> for Support {
    fn from(table: &PrimitiveTable<Ref>) -> Self {
        Support {
            set_timeout: table.set_timeout.is_some(),
            set_interval: table.set_interval.is_some(),
            next_tick: table.next_tick.is_some(),
            set_immediate: table.set_immediate.is_some(),
            animation_frame: table.request_animation_frame.is_some(),
        }
    }
}

/// Stands in for "a reference to the host's global binding object."
pub trait Host<Ref> {
    /// Which primitive families this host defines, fixed at construction.
    fn support(&self) -> Support;
    /// The table currently installed (fakes, originals, or whatever was last written).
    fn current(&self) -> PrimitiveTable<Ref>;
    /// Replaces the installed table wholesale.
    fn install(&self, table: PrimitiveTable<Ref>);
}

/// The crate-provided `Host`: an in-process table behind a `RefCell`, with `Support` fixed at
/// construction from whichever primitives were marked as real.
pub struct GlobalHost<Ref> {
    support: Support,
    current: RefCell<PrimitiveTable<Ref>>,
}

impl<Ref> GlobalHost<Ref> {
    /// Wraps `real` as the originals and probes it to fix `Support` for this host's lifetime.
    pub fn new(real: PrimitiveTable<Ref>) -> Self {
        let support = Support::from(&real);
        Self {
            support,
            current: RefCell::new(real),
        }
    }
}

impl<Ref> Host<Ref> for GlobalHost<Ref> {
    fn support(&self) -> Support {
        self.support
    }

    fn current(&self) -> PrimitiveTable<Ref> {
        self.current.borrow().clone()
    }

    fn install(&self, table: PrimitiveTable<Ref>) {
        *self.current.borrow_mut() = table;
    }
}
