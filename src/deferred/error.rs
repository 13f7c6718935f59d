//! Error types for completion ports.

use thiserror::Error;

/// Returned when a completion slot is written after it already delivered.
///
/// Each invocation owns exactly one write-once slot. The first delivery wins,
/// whether it came from the operation's synchronous return or from its
/// completion port; any later delivery is rejected with this error.
///
/// # Examples
///
/// ```rust
/// use sinch::deferred::AlreadyResolvedError;
///
/// let error = AlreadyResolvedError;
/// assert_eq!(error.to_string(), "completion slot already resolved");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("completion slot already resolved")]
pub struct AlreadyResolvedError;
