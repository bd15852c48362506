use thiserror::Error;

pub type SsgaResult<T> = Result<T, SsgaError>;

#[derive(Error, Debug)]
pub enum SsgaError {
    #[error("Property \"{0}\" is read only")]
    ReadOnlyParameter(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
