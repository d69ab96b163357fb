use thiserror::Error;
use tally_core::StoreError;

/// Failures that must stop the process before it serves traffic.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("store initialization failed: {0}")]
    Initialize(#[source] StoreError),
    #[error("durable redirect counter is unreadable: {0}")]
    ReadCounter(#[source] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid redirect target: {0}")]
    InvalidTarget(String),
    #[error("invalid counter parameter: {0}")]
    InvalidParam(String),
    #[error("invalid allowed origins: {0}")]
    InvalidOrigins(String),
}
