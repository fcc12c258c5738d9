use async_trait::async_trait;
use duet_core::{ParticipantId, ServerEvent};
use duet_server::SignalingOutput;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// One event handed to the outbound side, with its recipient.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub to: ParticipantId,
    pub event: ServerEvent,
}

/// Mock SignalingOutput that captures every delivered event.
#[derive(Clone)]
pub struct MockSignalingOutput {
    /// Channel to stream captured deliveries.
    tx: mpsc::UnboundedSender<Delivery>,
    /// All captured deliveries (for verification).
    deliveries: Arc<Mutex<Vec<Delivery>>>,
}

impl MockSignalingOutput {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Delivery>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let signaling = Self {
            tx,
            deliveries: Arc::new(Mutex::new(Vec::new())),
        };
        (signaling, rx)
    }

    /// Deliveries are only stored, nobody streams them.
    pub fn new_stored_only() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self {
            tx,
            deliveries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every event delivered to `participant`, oldest first.
    pub async fn events_for(&self, participant: &ParticipantId) -> Vec<ServerEvent> {
        self.deliveries
            .lock()
            .await
            .iter()
            .filter(|d| d.to == *participant)
            .map(|d| d.event.clone())
            .collect()
    }

    pub async fn count(&self) -> usize {
        self.deliveries.lock().await.len()
    }
}

impl Default for MockSignalingOutput {
    fn default() -> Self {
        Self::new_stored_only()
    }
}

#[async_trait]
impl SignalingOutput for MockSignalingOutput {
    async fn deliver(&self, participant: ParticipantId, event: ServerEvent) {
        tracing::debug!("[MockSignaling] deliver {:?} to {}", event, participant);

        let delivery = Delivery {
            to: participant,
            event,
        };
        self.deliveries.lock().await.push(delivery.clone());
        let _ = self.tx.send(delivery);
    }
}
