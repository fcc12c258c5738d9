use crate::error::CallError;
use async_trait::async_trait;
use duet_core::RoomCode;

/// Call-setup message leaving this client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundSignal {
    Offer(String),
    Answer(String),
    IceCandidate(String),
    EndCall,
}

/// Where the negotiation machine sends its signals. Fire-and-forget: a send
/// only fails when the relay itself is gone.
#[async_trait]
pub trait SignalSink: Send + Sync {
    async fn send_signal(&self, code: &RoomCode, signal: OutboundSignal) -> Result<(), CallError>;
}
