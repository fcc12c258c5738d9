use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Room-membership failures. Returned to the requester inside its reply.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RoomError {
    #[error("room not found")]
    RoomNotFound,

    #[error("room is full")]
    RoomFull,

    #[error("not a member of this room")]
    NotInRoom,

    #[error("room code must be six digits")]
    InvalidCode,

    #[error("file of {size} bytes exceeds the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("no room code available")]
    RoomCreation,

    #[error("signaling relay unavailable")]
    RelayUnavailable,
}
