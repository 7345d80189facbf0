use core::{error, fmt};

/// Errors raised by `cfc-rs-core` helpers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Error {
    /// The requested value is not present in the searched array.
    NotFound {
        /// Value that was searched for.
        value: f64,
    },
    /// Argument passed into a function was invalid.
    InvalidArg {
        /// Name of the invalid argument.
        arg: &'static str,
        /// Why the argument is invalid.
        reason: &'static str,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound { value } => write!(f, "Value {value} was not found."),
            Error::InvalidArg { arg, reason } => write!(f, "Invalid argument `{arg}`: {reason}"),
        }
    }
}

impl error::Error for Error {}

/// Result alias for `cfc-rs-core` helpers.
pub type Result<T> = core::result::Result<T, Error>;
