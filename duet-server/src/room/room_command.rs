use crate::room::{JoinOutcome, RoomSnapshot};
use duet_core::{MessageContent, ParticipantId, RoomError, SignalingEnvelope};
use tokio::sync::oneshot;

pub type Reply<T> = oneshot::Sender<Result<T, RoomError>>;

/// Requests handled by a room actor, one at a time, in arrival order.
#[derive(Debug)]
pub enum RoomCommand {
    Join {
        participant: ParticipantId,
        reply: Reply<JoinOutcome>,
    },

    Leave {
        participant: ParticipantId,
        reply: Reply<()>,
    },

    /// The participant's connection dropped without a `leaveRoom`.
    Disconnect { participant: ParticipantId },

    Relay {
        participant: ParticipantId,
        content: MessageContent,
        reply: Reply<()>,
    },

    Signal {
        envelope: SignalingEnvelope,
        reply: Reply<()>,
    },

    Inspect {
        reply: oneshot::Sender<RoomSnapshot>,
    },
}
