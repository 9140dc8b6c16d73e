//! Error taxonomy for drain operations.

use std::fmt;

/// Identifies which drain loop exceeded its bound, for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainKind {
    /// `process.nextTick`-shaped queue.
    Ticks,
    /// `setImmediate`-shaped queue.
    Immediates,
    /// Timeout/interval heap.
    Timers,
}

impl fmt::Display for DrainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DrainKind::Ticks => "ticks",
            DrainKind::Immediates => "immediates",
            DrainKind::Timers => "timers",
        };
        f.write_str(name)
    }
}

/// Errors a drain operation can return.
///
/// [`SchedulerError::UnexpectedTimerKind`] is never constructed by this crate: `TimerKind` is a
/// closed two-variant enum, so the invariant it guards against is ruled out statically. It is
/// kept in the taxonomy as a stable extension point should a third timer kind ever be added.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    /// A drain loop reached `max_loops` iterations without running out of work.
    ///
    /// The scheduler's state is left intact: the work that would have run on the next
    /// iteration is still queued, and further drains can be attempted once the runaway
    /// rescheduling is fixed.
    #[error("drain of {drain} exceeded the configured loop bound ({max_loops} iterations); a callback is probably rescheduling itself unconditionally")]
    RecursionLimitExceeded {
        /// Which queue was being drained.
        drain: DrainKind,
        /// The configured bound that was exceeded.
        max_loops: usize,
    },

    /// Internal invariant violation: a stored timer had neither a timeout nor an interval kind.
    #[error("internal error: a timer carried an unexpected kind; this indicates scheduler state corruption")]
    UnexpectedTimerKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_kind_display_matches_spec_wording() {
        assert_eq!(DrainKind::Ticks.to_string(), "ticks");
        assert_eq!(DrainKind::Immediates.to_string(), "immediates");
        assert_eq!(DrainKind::Timers.to_string(), "timers");
    }

    #[test]
    fn recursion_error_message_names_the_drain() {
        let err = SchedulerError::RecursionLimitExceeded {
            drain: DrainKind::Ticks,
            max_loops: 5,
        };
        assert!(err.to_string().contains("ticks"));
        assert!(err.to_string().contains('5'));
    }
}
