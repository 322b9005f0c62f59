use std::fmt;

/// Configuration could not be read, parsed or validated.
///
/// The CLI maps this to the configuration-error exit code instead of
/// treating it as a fatal runtime failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(pub String);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Returns the `ConfigError` buried in an `anyhow` chain, if any.
pub fn as_config_error(err: &anyhow::Error) -> Option<&ConfigError> {
    err.chain().find_map(|e| e.downcast_ref::<ConfigError>())
}
