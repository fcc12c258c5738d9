use crate::model::code::RoomCode;
use crate::model::participant::ParticipantId;
use serde::{Deserialize, Serialize};

/// STUN/TURN server advertised to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(urls: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
            username: None,
            credential: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Hash, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
    EndCall,
}

/// Call-setup payload on its way through a room. The payload is never inspected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignalingEnvelope {
    pub kind: SignalKind,
    pub payload: String,
    pub room_code: RoomCode,
    pub from: ParticipantId,
}

impl SignalingEnvelope {
    pub fn new(
        kind: SignalKind,
        payload: impl Into<String>,
        room_code: RoomCode,
        from: ParticipantId,
    ) -> Self {
        Self {
            kind,
            payload: payload.into(),
            room_code,
            from,
        }
    }
}
