use async_trait::async_trait;
use duet_core::{ParticipantId, ServerEvent};

/// Implemented by the connection layer (the WebSocket server) so rooms can
/// push events to participants without knowing how they are connected.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Queue an event for one participant. Delivery is FIFO per participant.
    async fn deliver(&self, participant: ParticipantId, event: ServerEvent);
}
