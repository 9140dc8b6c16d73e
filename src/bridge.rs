//! The ref↔id bridge: two pure conversion closures supplied at construction.

/// Translates between the host's opaque timer handle type and the scheduler's internal ids.
pub struct TimerBridge<Ref> {
    id_to_ref: Box<dyn Fn(u64) -> Ref>,
    ref_to_id: Box<dyn Fn(&Ref) -> Option<u64>>,
}

impl<Ref> TimerBridge<Ref> {
    /// Builds a bridge from a pair of pure conversion closures.
    pub fn new(
        id_to_ref: impl Fn(u64) -> Ref + 'static,
        ref_to_id: impl Fn(&Ref) -> Option<u64> + 'static,
    ) -> Self {
        Self {
            id_to_ref: Box::new(id_to_ref),
            ref_to_id: Box::new(ref_to_id),
        }
    }

    pub(crate) fn id_to_ref(&self, id: u64) -> Ref {
        (self.id_to_ref)(id)
    }

    pub(crate) fn ref_to_id(&self, r: &Ref) -> Option<u64> {
        (self.ref_to_id)(r)
    }
}

impl TimerBridge<u64> {
    /// A bridge for hosts whose timer handle already *is* a plain integer id.
    pub fn identity() -> Self {
        Self::new(|id| id, |r| Some(*r))
    }
}
