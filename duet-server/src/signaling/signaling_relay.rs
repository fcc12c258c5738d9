use crate::signaling::SignalingOutput;
use duet_core::{ParticipantId, ServerEvent, SignalingEnvelope};
use std::sync::Arc;
use tracing::debug;

/// Room-scoped bus. Forwards envelopes to everyone but the sender without
/// looking at the payload.
#[derive(Clone)]
pub struct SignalingRelay {
    output: Arc<dyn SignalingOutput>,
}

impl SignalingRelay {
    pub fn new(output: Arc<dyn SignalingOutput>) -> Self {
        Self { output }
    }

    /// Delivers `envelope` to `recipients`, skipping its sender. Returns how
    /// many participants it went to; zero means it was dropped.
    pub async fn forward(&self, recipients: &[ParticipantId], envelope: SignalingEnvelope) -> usize {
        let targets: Vec<ParticipantId> = recipients
            .iter()
            .filter(|id| **id != envelope.from)
            .copied()
            .collect();

        if targets.is_empty() {
            debug!(
                code = %envelope.room_code,
                kind = ?envelope.kind,
                "No counterpart in room, signal dropped"
            );
            return 0;
        }

        debug!(
            code = %envelope.room_code,
            kind = ?envelope.kind,
            from = %envelope.from,
            "Forwarding signal"
        );
        let event = ServerEvent::from_envelope(envelope);
        for target in &targets {
            self.output.deliver(*target, event.clone()).await;
        }
        targets.len()
    }

    pub async fn notify(&self, participant: ParticipantId, event: ServerEvent) {
        self.output.deliver(participant, event).await;
    }

    pub async fn broadcast_except(
        &self,
        members: &[ParticipantId],
        excluded: &ParticipantId,
        event: ServerEvent,
    ) {
        for member in members.iter().filter(|id| *id != excluded) {
            self.output.deliver(*member, event.clone()).await;
        }
    }
}
