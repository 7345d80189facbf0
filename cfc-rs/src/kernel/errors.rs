use core::fmt;

/// Validation errors raised at construction time or before any coupling is computed.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A required input or configuration field is empty.
    EmptyInput {
        /// Name of the argument that is empty.
        arg: &'static str,
    },
    /// A configuration argument value is invalid.
    InvalidArgument {
        /// Name of the argument.
        arg: &'static str,
        /// Human readable reason.
        reason: &'static str,
    },
    /// A contiguous 1D slice view could not be obtained.
    NonContiguous {
        /// Name of the argument that is non-contiguous.
        arg: &'static str,
    },
    /// Input lengths did not match the required shape.
    LengthMismatch {
        /// Name of the argument.
        arg: &'static str,
        /// Required length.
        expected: usize,
        /// Received length.
        got: usize,
    },
    /// A channel index lies outside `[0, bound)`.
    IndexOutOfRange {
        /// Name of the argument.
        arg: &'static str,
        /// Position of the offending entry.
        position: usize,
        /// Offending index.
        index: usize,
        /// Exclusive upper bound.
        bound: usize,
    },
    /// Requested frequencies are not exact members of the frequency axis.
    FrequencyNotFound {
        /// Name of the argument.
        arg: &'static str,
        /// Every offending value, in request order.
        values: Vec<f64>,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyInput { arg } => write!(f, "Input `{arg}` was empty."),
            ConfigError::InvalidArgument { arg, reason } => {
                write!(f, "Invalid argument `{arg}`: {reason}")
            }
            ConfigError::NonContiguous { arg } => {
                write!(f, "Argument `{arg}` is not contiguous in memory.")
            }
            ConfigError::LengthMismatch { arg, expected, got } => {
                write!(
                    f,
                    "Length mismatch on `{arg}`. Expected {expected}, got {got}."
                )
            }
            ConfigError::IndexOutOfRange {
                arg,
                position,
                index,
                bound,
            } => {
                write!(
                    f,
                    "Index {index} at position {position} of `{arg}` is out of range [0, {bound})."
                )
            }
            ConfigError::FrequencyNotFound { arg, values } => {
                write!(
                    f,
                    "Entries of `{arg}` must be present in the frequency axis; missing: {values:?}"
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Runtime invariant violations raised while a coupling kernel runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecInvariantViolation {
    /// An execution precondition was violated.
    InvalidState {
        /// Human readable reason.
        reason: &'static str,
    },
    /// Output or input length mismatched the expected runtime shape.
    LengthMismatch {
        /// Name of the argument.
        arg: &'static str,
        /// Required length.
        expected: usize,
        /// Received length.
        got: usize,
    },
    /// A queried frequency could not be located on the axis.
    FrequencyLookup(cfc_rs_core::Error),
    /// Adapter binding/configuration failure.
    Config(ConfigError),
}

impl From<ConfigError> for ExecInvariantViolation {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<cfc_rs_core::Error> for ExecInvariantViolation {
    fn from(value: cfc_rs_core::Error) -> Self {
        Self::FrequencyLookup(value)
    }
}

impl fmt::Display for ExecInvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecInvariantViolation::InvalidState { reason } => {
                write!(f, "Execution invariant violation: {reason}")
            }
            ExecInvariantViolation::LengthMismatch { arg, expected, got } => {
                write!(
                    f,
                    "Execution length mismatch on `{arg}`. Expected {expected}, got {got}."
                )
            }
            ExecInvariantViolation::FrequencyLookup(err) => {
                write!(f, "Frequency lookup failed: {err}")
            }
            ExecInvariantViolation::Config(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ExecInvariantViolation {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExecInvariantViolation::FrequencyLookup(err) => Some(err),
            ExecInvariantViolation::Config(err) => Some(err),
            ExecInvariantViolation::InvalidState { .. }
            | ExecInvariantViolation::LengthMismatch { .. } => None,
        }
    }
}
