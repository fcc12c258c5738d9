use crate::media::MediaError;
use duet_core::RoomError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CallError {
    #[error("media access denied: {0}")]
    MediaAccessDenied(String),

    #[error("recording failed: {0}")]
    Recording(String),

    #[error("peer transport failure: {0}")]
    Transport(String),

    #[error("signaling relay unavailable")]
    RelayUnavailable,

    #[error(transparent)]
    Room(#[from] RoomError),
}

impl CallError {
    /// Flattens an `anyhow` chain coming from the webrtc layer.
    pub fn transport(err: anyhow::Error) -> Self {
        Self::Transport(format!("{err:#}"))
    }
}

impl From<MediaError> for CallError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::AccessDenied(reason) => Self::MediaAccessDenied(reason),
            other => Self::Recording(other.to_string()),
        }
    }
}
