//! Stand-in for a `stackConfig`/stack-formatter collaborator used in the
//! "fakes not installed" warning.

/// Formats a stack trace (or any other positional context) to append to the
/// not-installed warning. The formatter itself is the injected capability, rather than opaque
/// configuration forwarded to one.
pub trait StackFormatter: 'static {
    /// Produces the context string to append to the not-installed warning.
    fn format(&self) -> String;
}

/// Appends nothing. The default for hosts that don't want stack traces in warnings.
#[derive(Debug, Default)]
pub struct NoStackFormatter;

impl StackFormatter for NoStackFormatter {
    fn format(&self) -> String {
        String::new()
    }
}

/// Captures a real backtrace via `std::backtrace`.
///
/// Requires the caller to run with `RUST_BACKTRACE=1` (or `full`) for the capture to include
/// frame information; otherwise `Backtrace::force_capture` still succeeds but prints a notice to
/// that effect, which is itself useful diagnostic context.
#[derive(Debug, Default)]
pub struct BacktraceStackFormatter;

impl StackFormatter for BacktraceStackFormatter {
    fn format(&self) -> String {
        std::backtrace::Backtrace::force_capture().to_string()
    }
}
