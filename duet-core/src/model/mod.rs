mod code;
mod events;
mod message;
mod participant;
mod room;
mod signaling;

pub use code::{CODE_LENGTH, RoomCode};
pub use events::{ClientEvent, ClientFrame, ReplyBody, ServerEvent};
pub use message::{ChatMessage, FilePayload, MessageContent};
pub use participant::{Participant, ParticipantId};
pub use room::{RoomId, RoomMode};
pub use signaling::{IceServerConfig, SignalKind, SignalingEnvelope};
