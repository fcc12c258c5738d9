use crate::media::MediaStream;
use std::fmt;
use std::sync::Arc;

/// What a peer connection reports back to the call task.
pub enum TransportEvent {
    /// Local ICE candidate to trickle to the peer.
    CandidateGenerated(String),

    Connected,

    Disconnected,

    /// Remote tracks arrived. Repeated as more tracks join the same stream.
    RemoteStream(Arc<dyn MediaStream>),
}

impl fmt::Debug for TransportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CandidateGenerated(c) => f.debug_tuple("CandidateGenerated").field(c).finish(),
            Self::Connected => f.write_str("Connected"),
            Self::Disconnected => f.write_str("Disconnected"),
            Self::RemoteStream(s) => f.debug_tuple("RemoteStream").field(&s.id()).finish(),
        }
    }
}

/// A [`TransportEvent`] tagged with the call attempt whose transport raised it.
#[derive(Debug)]
pub struct TransportNotice {
    pub attempt: u64,
    pub event: TransportEvent,
}
