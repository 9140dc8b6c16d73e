//! Stand-in for an external "moduleMocker" collaborator: "given an implementation function,
//! returns a callable that records invocations and forwards."
//!
//! A literal port (a factory method generic over arbitrary closure shapes) isn't expressible as a
//! single object-safe Rust trait, since `setTimeout`, `clearTimeout`, `nextTick`, etc. all have
//! different arities and return types. Instead every fake primitive calls
//! `record_invocation(name)` before doing its own work, which preserves the externally observable
//! behavior ("you can tell how many times each primitive was called") without requiring the
//! collaborator to understand nine different closure signatures.

use std::cell::RefCell;
use std::collections::HashMap;

/// Records that a named primitive was invoked.
pub trait ModuleMocker: 'static {
    /// Called by a fake primitive's closure body before it does its own work.
    fn record_invocation(&self, primitive: &'static str);
}

/// The production default: records nothing.
#[derive(Debug, Default)]
pub struct NoopModuleMocker;

impl ModuleMocker for NoopModuleMocker {
    fn record_invocation(&self, _primitive: &'static str) {}
}

/// A mocker that counts calls per primitive name, for tests that want to assert on them.
#[derive(Debug, Default)]
pub struct RecordingModuleMocker {
    calls: RefCell<HashMap<&'static str, u32>>,
}

impl RecordingModuleMocker {
    /// How many times `primitive` was recorded so far.
    pub fn calls(&self, primitive: &str) -> u32 {
        self.calls.borrow().get(primitive).copied().unwrap_or(0)
    }
}

impl ModuleMocker for RecordingModuleMocker {
    fn record_invocation(&self, primitive: &'static str) {
        *self.calls.borrow_mut().entry(primitive).or_insert(0) += 1;
    }
}
