//! Error types for the CTS runtime.

use cts_framework::FrameworkError;
use thiserror::Error;

/// Errors raised while configuring or driving a run.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Loading, addressing or reporting failed in the framework.
    #[error(transparent)]
    Framework(#[from] FrameworkError),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Writing the report failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A registered task was dropped before it reported completion.
    #[error("host dropped test {0} before it completed")]
    Host(String),
}

/// Result type alias for runtime operations.
pub type RuntimeResult<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framework_errors_pass_through() {
        let err: RuntimeError = FrameworkError::UnknownSpec("cts:nope".into()).into();
        assert_eq!(err.to_string(), "unknown spec: cts:nope");
    }

    #[test]
    fn test_host_error_names_case() {
        let err = RuntimeError::Host("cts:examples:basic:".into());
        assert!(err.to_string().contains("cts:examples:basic:"));
    }
}
