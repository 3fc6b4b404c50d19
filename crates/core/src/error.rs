use thiserror::Error;

pub type TrackerResult<T> = Result<T, TrackerError>;

/// Failure reported by an analytics collaborator for a single call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Analytics client not initialized")]
    NotInitialized,

    #[error("Analytics transport error: {0}")]
    Transport(String),
}

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Analytics client initialization failed: {0}")]
    Init(#[from] ClientError),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),
}
