use crate::room::code_generator::CodeGenerator;
use crate::room::room::Room;
use crate::room::room_command::{Reply, RoomCommand};
use crate::room::room_config::RoomConfig;
use crate::room::room_state::{JoinOutcome, RoomSnapshot, RoomState};
use crate::signaling::{SignalingOutput, SignalingRelay};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use duet_core::{
    MessageContent, ParticipantId, RoomCode, RoomError, RoomId, RoomMode, SignalingEnvelope,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

const COLLISIONS_BEFORE_BACKOFF: u32 = 16;
const INITIAL_BACKOFF: Duration = Duration::from_millis(5);
const MAX_BACKOFF: Duration = Duration::from_millis(250);

/// Registry-side handle of a live room actor.
#[derive(Clone)]
pub struct RoomHandle {
    pub(crate) id: RoomId,
    tx: mpsc::Sender<RoomCommand>,
}

/// Source of truth for which codes are live. Each room is a separate actor;
/// the registry only routes requests to it.
#[derive(Clone)]
pub struct RoomRegistry {
    rooms: Arc<DashMap<RoomCode, RoomHandle>>,
    codes: Arc<dyn CodeGenerator>,
    relay: SignalingRelay,
    config: RoomConfig,
}

impl RoomRegistry {
    pub fn new(
        signaling: Arc<dyn SignalingOutput>,
        codes: Arc<dyn CodeGenerator>,
        config: RoomConfig,
    ) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            codes,
            relay: SignalingRelay::new(signaling),
            config,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn contains(&self, code: &RoomCode) -> bool {
        self.rooms.contains_key(code)
    }

    /// Allocates a fresh code and spawns its room with `creator` as initiator.
    /// Collisions are retried with a new draw, backing off as they pile up.
    pub async fn create_room(
        &self,
        creator: ParticipantId,
        mode: RoomMode,
    ) -> Result<RoomCode, RoomError> {
        let mut collisions = 0u32;
        let mut backoff = INITIAL_BACKOFF;

        loop {
            if self.rooms.len() >= self.codes.capacity() {
                warn!(rooms = self.rooms.len(), "Code space exhausted");
                return Err(RoomError::RoomCreation);
            }

            let code = self.codes.next_code();
            let spawned = match self.rooms.entry(code.clone()) {
                Entry::Occupied(_) => None,
                Entry::Vacant(slot) => {
                    let (tx, rx) = mpsc::channel(self.config.channel_capacity);
                    let id = RoomId::new();
                    slot.insert(RoomHandle { id, tx });
                    Some((id, rx))
                }
            };

            let Some((id, rx)) = spawned else {
                collisions += 1;
                debug!(%code, collisions, "Room code collision, drawing again");
                if collisions % COLLISIONS_BEFORE_BACKOFF == 0 {
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                continue;
            };

            let state = RoomState::new(
                code.clone(),
                mode,
                creator,
                Instant::now(),
                self.config.room_ttl,
            );
            let room = Room::new(
                id,
                state,
                rx,
                self.relay.clone(),
                self.rooms.clone(),
                self.config.clone(),
            );
            tokio::spawn(room.run());

            info!(%code, %mode, %creator, "Created room");
            return Ok(code);
        }
    }

    pub async fn join_room(
        &self,
        code: &RoomCode,
        participant: ParticipantId,
    ) -> Result<JoinOutcome, RoomError> {
        self.request(code, |reply| RoomCommand::Join { participant, reply })
            .await
    }

    pub async fn leave_room(
        &self,
        code: &RoomCode,
        participant: ParticipantId,
    ) -> Result<(), RoomError> {
        self.request(code, |reply| RoomCommand::Leave { participant, reply })
            .await
    }

    /// Best-effort removal after a transport loss. The peer sees `userDisconnected`.
    pub async fn disconnect(&self, code: &RoomCode, participant: ParticipantId) {
        let Some(handle) = self.handle(code) else {
            return;
        };
        if handle
            .tx
            .send(RoomCommand::Disconnect { participant })
            .await
            .is_err()
        {
            debug!(%code, %participant, "Room gone before disconnect was processed");
        }
    }

    pub async fn relay_message(
        &self,
        code: &RoomCode,
        participant: ParticipantId,
        content: MessageContent,
    ) -> Result<(), RoomError> {
        self.request(code, |reply| RoomCommand::Relay {
            participant,
            content,
            reply,
        })
        .await
    }

    pub async fn forward_signal(&self, envelope: SignalingEnvelope) -> Result<(), RoomError> {
        let code = envelope.room_code.clone();
        self.request(&code, |reply| RoomCommand::Signal { envelope, reply })
            .await
    }

    pub async fn snapshot(&self, code: &RoomCode) -> Option<RoomSnapshot> {
        let handle = self.handle(code)?;
        let (reply, rx) = oneshot::channel();
        handle.tx.send(RoomCommand::Inspect { reply }).await.ok()?;
        rx.await.ok()
    }

    fn handle(&self, code: &RoomCode) -> Option<RoomHandle> {
        self.rooms.get(code).map(|entry| entry.value().clone())
    }

    /// Sends a command to the room actor and waits for its answer. A room that
    /// disappears mid-request is reported as not found.
    async fn request<T>(
        &self,
        code: &RoomCode,
        build: impl FnOnce(Reply<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let handle = self.handle(code).ok_or(RoomError::RoomNotFound)?;
        let (reply, rx) = oneshot::channel();

        handle
            .tx
            .send(build(reply))
            .await
            .map_err(|_| RoomError::RoomNotFound)?;
        rx.await.map_err(|_| RoomError::RoomNotFound)?
    }
}
