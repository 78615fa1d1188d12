use thiserror::Error;

/// Top-level error type shared by the PawChat crates.
///
/// Subsystem crates define their own error types and convert into or out of
/// `PawchatError` where a boundary needs it.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PawchatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for PawchatError {
    fn from(err: toml::de::Error) -> Self {
        PawchatError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for PawchatError {
    fn from(err: toml::ser::Error) -> Self {
        PawchatError::Config(err.to_string())
    }
}

/// A specialized `Result` type for PawChat operations.
pub type Result<T> = std::result::Result<T, PawchatError>;
