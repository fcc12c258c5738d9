use crate::room::room_command::RoomCommand;
use crate::room::room_config::RoomConfig;
use crate::room::room_registry::RoomHandle;
use crate::room::room_state::RoomState;
use crate::signaling::SignalingRelay;
use dashmap::DashMap;
use duet_core::utils::unix_millis;
use duet_core::{ParticipantId, RoomCode, RoomError, RoomId, ServerEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

/// Room actor. Every create/join/leave/relay for one code runs through
/// [`Room::run`], so membership checks and the notifications they trigger
/// happen in a single step.
pub struct Room {
    id: RoomId,
    state: RoomState,
    command_rx: mpsc::Receiver<RoomCommand>,
    relay: SignalingRelay,
    registry: Arc<DashMap<RoomCode, RoomHandle>>,
    config: RoomConfig,
}

impl Room {
    pub fn new(
        id: RoomId,
        state: RoomState,
        command_rx: mpsc::Receiver<RoomCommand>,
        relay: SignalingRelay,
        registry: Arc<DashMap<RoomCode, RoomHandle>>,
        config: RoomConfig,
    ) -> Self {
        Self {
            id,
            state,
            command_rx,
            relay,
            registry,
            config,
        }
    }

    pub async fn run(mut self) {
        info!(code = %self.state.code(), mode = %self.state.mode(), "Room event loop started");

        loop {
            let deadline = self.state.deadline(self.config.empty_room_grace);

            tokio::select! {
                biased;

                _ = sleep_until(deadline) => {
                    self.close_expired().await;
                    break;
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!(code = %self.state.code(), "Command channel closed. Shutting down room.");
                            break;
                        }
                    }
                }
            }
        }

        let id = self.id;
        self.registry
            .remove_if(self.state.code(), |_, handle| handle.id == id);
        info!(code = %self.state.code(), "Room event loop finished");
    }

    async fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join { participant, reply } => {
                let result = self.state.join(participant);

                if let Ok((outcome, true)) = &result {
                    info!(
                        code = %self.state.code(),
                        %participant,
                        total_users = outcome.total_users,
                        "Participant joined"
                    );
                    // Sent before this actor looks at any later command, so the
                    // initiator always hears about its peer before signaling starts.
                    let event = ServerEvent::UserJoined {
                        total_users: outcome.total_users,
                    };
                    self.relay
                        .broadcast_except(self.state.members(), &participant, event)
                        .await;
                }
                if let Err(e) = &result {
                    debug!(code = %self.state.code(), %participant, "Join refused: {}", e);
                }

                let _ = reply.send(result.map(|(outcome, _)| outcome));
            }

            RoomCommand::Leave { participant, reply } => {
                let result = self.remove_member(&participant, false).await;
                let _ = reply.send(result);
            }

            RoomCommand::Disconnect { participant } => {
                if self.remove_member(&participant, true).await.is_err() {
                    debug!(%participant, "Disconnect for a participant that already left");
                }
            }

            RoomCommand::Relay {
                participant,
                content,
                reply,
            } => {
                let result = self.state.append(
                    participant,
                    content,
                    unix_millis(),
                    self.config.max_file_bytes,
                );

                let result = match result {
                    Ok(message) => {
                        debug!(code = %self.state.code(), %participant, file = message.is_file(), "Relaying message");
                        self.relay
                            .broadcast_except(
                                self.state.members(),
                                &participant,
                                ServerEvent::from_message(message),
                            )
                            .await;
                        Ok(())
                    }
                    Err(e) => Err(e),
                };
                let _ = reply.send(result);
            }

            RoomCommand::Signal { envelope, reply } => {
                if !self.state.is_member(&envelope.from) {
                    warn!(
                        code = %self.state.code(),
                        from = %envelope.from,
                        kind = ?envelope.kind,
                        "Signal from a non-member dropped"
                    );
                    let _ = reply.send(Err(RoomError::NotInRoom));
                    return;
                }

                let recipients = self.state.others(&envelope.from);
                self.relay.forward(&recipients, envelope).await;
                let _ = reply.send(Ok(()));
            }

            RoomCommand::Inspect { reply } => {
                let _ = reply.send(self.state.snapshot(self.id));
            }
        }
    }

    async fn remove_member(
        &mut self,
        participant: &ParticipantId,
        disconnected: bool,
    ) -> Result<(), RoomError> {
        let remaining = self.state.leave(participant, Instant::now())?;
        info!(code = %self.state.code(), %participant, remaining, disconnected, "Participant left");

        let event = if disconnected {
            ServerEvent::UserDisconnected
        } else {
            ServerEvent::UserLeft {
                total_users: remaining,
            }
        };
        self.relay
            .broadcast_except(self.state.members(), participant, event)
            .await;

        if remaining == 0 {
            info!(
                code = %self.state.code(),
                grace = ?self.config.empty_room_grace,
                "Room is empty, scheduled for destruction"
            );
        }
        Ok(())
    }

    async fn close_expired(&mut self) {
        if self.state.is_empty() {
            info!(code = %self.state.code(), "Grace period elapsed, destroying empty room");
            return;
        }

        info!(code = %self.state.code(), "Room lifetime elapsed, closing");
        for member in self.state.members().to_vec() {
            self.relay
                .notify(member, ServerEvent::UserDisconnected)
                .await;
        }
    }
}
