use core::fmt;

use crate::kernel::{ConfigError, ExecInvariantViolation};

/// Errors raised whilst running a coupling computation.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Inputs were rejected before any coupling was computed.
    Validation(ConfigError),
    /// The kernel failed on one connection; the whole computation was aborted.
    Connection {
        /// Position of the connection in the requested connection set.
        index: usize,
        /// Seed channel of the failing connection.
        seed: usize,
        /// Target channel of the failing connection.
        target: usize,
        /// What went wrong inside the kernel.
        source: ExecInvariantViolation,
    },
    /// The worker pool could not be started.
    ThreadPool {
        /// Explaining why the pool could not be built.
        reason: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Validation(err) => write!(f, "Validation failed: {err}"),
            Error::Connection {
                index,
                seed,
                target,
                source,
            } => write!(
                f,
                "Coupling failed for connection {index} (seed {seed}, target {target}): {source}"
            ),
            Error::ThreadPool { reason } => write!(f, "Could not build worker pool: {reason}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Validation(err) => Some(err),
            Error::Connection { source, .. } => Some(source),
            Error::ThreadPool { .. } => None,
        }
    }
}

impl From<ConfigError> for Error {
    fn from(value: ConfigError) -> Self {
        Error::Validation(value)
    }
}

/// Result alias for coupling computations.
pub type Result<T> = core::result::Result<T, Error>;
