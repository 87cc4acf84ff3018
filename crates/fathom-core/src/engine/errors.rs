//! Error types for fathom execution.

use thiserror::Error;

/// Errors that can occur while building distributions, configuring strategies,
/// or running a program.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in the future without breaking changes.
///
/// A path whose log-probability drops to `-inf` is *not* an error: strategies
/// abandon such branches silently.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ExecError {
    /// Invalid constructor parameter (distribution parameters, path caps, particle counts).
    #[error("validation error: {0}")]
    ValidationError(String),

    /// A strategy was used on a program it cannot handle (e.g. enumerating a
    /// continuous distribution).
    #[error("usage error: {0}")]
    Usage(String),

    /// Numerical stability error (NaN weights during resampling).
    #[error("numerical error: {0}")]
    Numerical(String),

    /// Internal execution error (programmer error, not user error).
    #[error("internal error: {0}")]
    Internal(String),
}
