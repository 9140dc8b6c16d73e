//! Id allocation shared by ticks, immediates, and timers.

/// Mints a strictly increasing sequence of ids, starting at 1.
///
/// `0` is reserved as the null-ish id returned by fakes once the scheduler
/// has been disposed (see [`crate::fakes`]).
#[derive(Debug, Default)]
pub(crate) struct IdAllocator(u64);

impl IdAllocator {
    pub(crate) fn next(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }
}
