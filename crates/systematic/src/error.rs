use std::fmt;

/// Sentinel returned by every scheduling point and controlled primitive
/// once the iteration has been cancelled (§6, §7 Propagation).
///
/// There is no Rust analogue of an uncatchable exception, so the
/// cancellation contract is realized structurally instead: `Cancelled`
/// carries no information a caller could branch on, every controlled
/// primitive propagates it with `?` rather than matching it, and the
/// driver is the only place that ever inspects an `Err(Cancelled)`. Code
/// written against the controlled primitives has no typed path to
/// intercept it, the same guarantee §6's instrumentation contract gives
/// the original rewriter-based implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "iteration cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// Result type returned by scheduling points and controlled primitives.
pub type OpResult<T = ()> = Result<T, Cancelled>;
