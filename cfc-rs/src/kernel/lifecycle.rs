use super::ConfigError;

/// Constructor validation lifecycle shared by selectors, kernels and processes.
pub trait KernelLifecycle: Sized {
    /// Config type.
    type Config;

    /// Construct a validated value from config.
    fn try_new(config: Self::Config) -> Result<Self, ConfigError>;
}
