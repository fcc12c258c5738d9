use crate::model::participant::ParticipantId;
use serde::{Deserialize, Serialize};

/// A file sent inline through the room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FilePayload {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

/// What a participant asks the room to relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    Text(String),
    File(FilePayload),
}

/// One entry of a room's history. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub sender: ParticipantId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FilePayload>,
    /// Unix time in milliseconds.
    pub timestamp: u64,
}

impl ChatMessage {
    pub fn new(sender: ParticipantId, content: MessageContent, timestamp: u64) -> Self {
        match content {
            MessageContent::Text(text) => Self {
                sender,
                text,
                file: None,
                timestamp,
            },
            MessageContent::File(file) => Self {
                sender,
                text: String::new(),
                file: Some(file),
                timestamp,
            },
        }
    }

    pub fn is_file(&self) -> bool {
        self.file.is_some()
    }
}
