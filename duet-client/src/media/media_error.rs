use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaError {
    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("no capture device: {0}")]
    Unavailable(String),

    #[error("recorder failure: {0}")]
    Recorder(String),
}
