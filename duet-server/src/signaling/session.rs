use crate::room::RoomRegistry;
use duet_core::{
    ClientEvent, ClientFrame, ParticipantId, ReplyBody, RoomCode, ServerEvent,
};
use tracing::{debug, info};

/// Server-side state of one connection: who it is and which room it is in.
/// Turns client frames into registry calls; the transport only moves bytes.
pub struct Session {
    participant: ParticipantId,
    registry: RoomRegistry,
    room: Option<RoomCode>,
}

impl Session {
    pub fn new(participant: ParticipantId, registry: RoomRegistry) -> Self {
        Self {
            participant,
            registry,
            room: None,
        }
    }

    pub fn participant(&self) -> ParticipantId {
        self.participant
    }

    pub fn current_room(&self) -> Option<&RoomCode> {
        self.room.as_ref()
    }

    /// Handles one frame. Room operations always get a reply; call-setup
    /// signals are fire-and-forget and only answer when they fail.
    pub async fn handle(&mut self, frame: ClientFrame) -> Option<ServerEvent> {
        let ClientFrame { seq, event } = frame;

        let body = match event {
            ClientEvent::CreateRoom { mode } => {
                match self.registry.create_room(self.participant, mode).await {
                    Ok(code) => {
                        self.enter(code.clone()).await;
                        ReplyBody::Created { code }
                    }
                    Err(error) => ReplyBody::Error { error },
                }
            }

            ClientEvent::JoinRoom { code } => {
                match self.registry.join_room(&code, self.participant).await {
                    Ok(outcome) => {
                        self.enter(code).await;
                        ReplyBody::Joined {
                            total_users: outcome.total_users,
                            messages: outcome.messages,
                            mode: outcome.mode,
                            is_initiator: outcome.is_initiator,
                        }
                    }
                    Err(error) => ReplyBody::Error { error },
                }
            }

            ClientEvent::LeaveRoom { code } => {
                let result = self.registry.leave_room(&code, self.participant).await;
                if result.is_ok() && self.room.as_ref() == Some(&code) {
                    self.room = None;
                }
                ReplyBody::from(result)
            }

            event @ (ClientEvent::SendMessage { .. } | ClientEvent::SendFile { .. }) => {
                let Some((code, content)) = event.into_message() else {
                    unreachable!("matched a chat event");
                };
                ReplyBody::from(
                    self.registry
                        .relay_message(&code, self.participant, content)
                        .await,
                )
            }

            event => {
                let Some(envelope) = event.into_envelope(self.participant) else {
                    unreachable!("remaining events are call signals");
                };
                match self.registry.forward_signal(envelope).await {
                    Ok(()) => return None,
                    Err(error) => {
                        debug!(participant = %self.participant, "Signal rejected: {}", error);
                        ReplyBody::Error { error }
                    }
                }
            }
        };

        Some(ServerEvent::Reply { seq, body })
    }

    /// Called when the transport is gone.
    pub async fn close(&mut self) {
        if let Some(code) = self.room.take() {
            info!(participant = %self.participant, %code, "Session closed while in room");
            self.registry.disconnect(&code, self.participant).await;
        }
    }

    /// A connection sits in one room at a time; entering another leaves the old one.
    async fn enter(&mut self, code: RoomCode) {
        let previous = self.room.replace(code.clone());
        let Some(previous) = previous.filter(|p| *p != code) else {
            return;
        };

        if let Err(e) = self.registry.leave_room(&previous, self.participant).await {
            debug!(participant = %self.participant, %previous, "Previous room already gone: {}", e);
        }
    }
}
