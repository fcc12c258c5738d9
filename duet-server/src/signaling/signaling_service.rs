use crate::signaling::SignalingOutput;
use async_trait::async_trait;
use axum::extract::ws::Message;
use dashmap::DashMap;
use duet_core::{IceServerConfig, ParticipantId, ServerEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, warn};

struct SignalingInner {
    peers: DashMap<ParticipantId, mpsc::UnboundedSender<Message>>,
    ice_servers: Vec<IceServerConfig>,
}

/// Outbound side of every open WebSocket: one FIFO queue per participant.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
}

impl SignalingService {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                peers: DashMap::new(),
                ice_servers,
            }),
        }
    }

    pub fn get_ice_servers(&self) -> Vec<IceServerConfig> {
        self.inner.ice_servers.clone()
    }

    pub fn add_peer(&self, participant: ParticipantId, tx: mpsc::UnboundedSender<Message>) {
        self.inner.peers.insert(participant, tx);
    }

    pub fn remove_peer(&self, participant: &ParticipantId) {
        self.inner.peers.remove(participant);
    }

    pub fn connected_peers(&self) -> usize {
        self.inner.peers.len()
    }

    pub fn send_event(&self, participant: ParticipantId, event: &ServerEvent) {
        let Some(peer) = self.inner.peers.get(&participant) else {
            warn!(%participant, "Attempted to send event to disconnected participant");
            return;
        };

        match serde_json::to_string(event) {
            Ok(json) => {
                if let Err(e) = peer.send(Message::Text(json.into())) {
                    error!(%participant, "Failed to queue WS message: {:?}", e);
                }
            }
            Err(e) => error!("Failed to serialize server event: {}", e),
        }
    }
}

#[async_trait]
impl SignalingOutput for SignalingService {
    async fn deliver(&self, participant: ParticipantId, event: ServerEvent) {
        self.send_event(participant, &event);
    }
}
