use crate::error::RoomError;
use crate::model::code::RoomCode;
use crate::model::message::{ChatMessage, FilePayload, MessageContent};
use crate::model::participant::ParticipantId;
use crate::model::room::RoomMode;
use crate::model::signaling::{IceServerConfig, SignalKind, SignalingEnvelope};
use serde::{Deserialize, Serialize};

/// A client request. `seq` is echoed back in the matching [`ServerEvent::Reply`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientFrame {
    pub seq: u64,
    pub event: ClientEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(
    tag = "op",
    content = "d",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    CreateRoom { mode: RoomMode },
    JoinRoom { code: RoomCode },
    SendMessage { code: RoomCode, text: String },
    SendFile { code: RoomCode, file: FilePayload },
    LeaveRoom { code: RoomCode },
    Offer { code: RoomCode, sdp: String },
    Answer { code: RoomCode, sdp: String },
    IceCandidate { code: RoomCode, candidate: String },
    EndCall { code: RoomCode },
}

impl ClientEvent {
    /// Room the event addresses, if any.
    pub fn room_code(&self) -> Option<&RoomCode> {
        match self {
            Self::CreateRoom { .. } => None,
            Self::JoinRoom { code }
            | Self::SendMessage { code, .. }
            | Self::SendFile { code, .. }
            | Self::LeaveRoom { code }
            | Self::Offer { code, .. }
            | Self::Answer { code, .. }
            | Self::IceCandidate { code, .. }
            | Self::EndCall { code } => Some(code),
        }
    }

    /// Splits a chat event into its target room and content.
    pub fn into_message(self) -> Option<(RoomCode, MessageContent)> {
        match self {
            Self::SendMessage { code, text } => Some((code, MessageContent::Text(text))),
            Self::SendFile { code, file } => Some((code, MessageContent::File(file))),
            _ => None,
        }
    }

    /// Wraps a call-setup event into an envelope sent by `from`.
    pub fn into_envelope(self, from: ParticipantId) -> Option<SignalingEnvelope> {
        let (kind, code, payload) = match self {
            Self::Offer { code, sdp } => (SignalKind::Offer, code, sdp),
            Self::Answer { code, sdp } => (SignalKind::Answer, code, sdp),
            Self::IceCandidate { code, candidate } => (SignalKind::IceCandidate, code, candidate),
            Self::EndCall { code } => (SignalKind::EndCall, code, String::new()),
            _ => return None,
        };
        Some(SignalingEnvelope::new(kind, payload, code, from))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(
    tag = "status",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ReplyBody {
    Created {
        code: RoomCode,
    },
    Joined {
        total_users: usize,
        messages: Vec<ChatMessage>,
        mode: RoomMode,
        is_initiator: bool,
    },
    Ok,
    Error {
        error: RoomError,
    },
}

impl From<Result<(), RoomError>> for ReplyBody {
    fn from(result: Result<(), RoomError>) -> Self {
        match result {
            Ok(()) => Self::Ok,
            Err(error) => Self::Error { error },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(
    tag = "op",
    content = "d",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    Welcome {
        participant_id: ParticipantId,
        ice_servers: Vec<IceServerConfig>,
    },
    Reply {
        seq: u64,
        body: ReplyBody,
    },
    UserJoined {
        total_users: usize,
    },
    UserLeft {
        total_users: usize,
    },
    UserDisconnected,
    NewMessage {
        message: ChatMessage,
    },
    ReceiveFile {
        message: ChatMessage,
    },
    CallEnded {
        from: ParticipantId,
    },
    Offer {
        from: ParticipantId,
        sdp: String,
    },
    Answer {
        from: ParticipantId,
        sdp: String,
    },
    IceCandidate {
        from: ParticipantId,
        candidate: String,
    },
}

impl ServerEvent {
    /// Delivery form of a relayed envelope.
    pub fn from_envelope(envelope: SignalingEnvelope) -> Self {
        let SignalingEnvelope {
            kind,
            payload,
            from,
            ..
        } = envelope;
        match kind {
            SignalKind::Offer => Self::Offer { from, sdp: payload },
            SignalKind::Answer => Self::Answer { from, sdp: payload },
            SignalKind::IceCandidate => Self::IceCandidate {
                from,
                candidate: payload,
            },
            SignalKind::EndCall => Self::CallEnded { from },
        }
    }

    /// Delivery form of a relayed chat message.
    pub fn from_message(message: ChatMessage) -> Self {
        if message.is_file() {
            Self::ReceiveFile { message }
        } else {
            Self::NewMessage { message }
        }
    }
}
