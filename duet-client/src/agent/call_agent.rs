use crate::agent::call_command::{CallCommand, CallHandle, CallUpdate};
use crate::call::CallController;
use crate::error::CallError;
use crate::negotiation::{NegotiationDeps, NegotiationEvents, NegotiationMachine, NegotiationState};
use duet_core::{RoomCode, ServerEvent};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// Call task for one room. Owns the negotiation machine and the call
/// controller; every input is applied in arrival order on [`CallAgent::run`].
pub struct CallAgent {
    machine: NegotiationMachine,
    controller: CallController,
    events: NegotiationEvents,
    server_rx: mpsc::UnboundedReceiver<ServerEvent>,
    command_rx: mpsc::Receiver<CallCommand>,
    updates: mpsc::UnboundedSender<CallUpdate>,
    initial_users: usize,
}

impl CallAgent {
    /// `total_users` and `is_initiator` come from the create/join reply.
    pub fn new(
        code: RoomCode,
        is_initiator: bool,
        total_users: usize,
        deps: NegotiationDeps,
        server_rx: mpsc::UnboundedReceiver<ServerEvent>,
    ) -> (Self, CallHandle, mpsc::UnboundedReceiver<CallUpdate>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (updates, updates_rx) = mpsc::unbounded_channel();

        let controller = CallController::new(code.clone(), deps.media.clone());
        let (machine, events) = NegotiationMachine::new(code, is_initiator, deps);

        let agent = Self {
            machine,
            controller,
            events,
            server_rx,
            command_rx,
            updates,
            initial_users: total_users,
        };
        (agent, CallHandle::new(command_tx), updates_rx)
    }

    pub async fn run(mut self) {
        info!(code = %self.machine.code(), initiator = self.machine.is_initiator(), "Call agent started");

        let before = self.machine.state();
        let result = self.machine.on_peer_present(self.initial_users).await;
        self.report(result);
        self.sync(before).await;

        loop {
            let before = self.machine.state();

            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(CallCommand::Shutdown) | None => {
                        self.hang_up().await;
                        break;
                    }
                    Some(cmd) => self.handle_command(cmd).await,
                },

                event = self.server_rx.recv() => match event {
                    Some(event) => self.handle_server_event(event).await,
                    None => {
                        warn!(code = %self.machine.code(), "Signaling relay lost");
                        self.finish_call().await;
                        self.machine.on_peer_left().await;
                        self.emit(CallUpdate::RelayLost);
                        break;
                    }
                },

                Some(media) = self.events.media_rx.recv() => {
                    let result = self.machine.on_media(media).await;
                    self.report(result);
                }

                Some(notice) = self.events.transport_rx.recv() => {
                    let result = self.machine.on_transport(notice).await;
                    self.report(result);
                }
            }

            self.sync(before).await;
        }

        info!(code = %self.machine.code(), "Call agent finished");
    }

    async fn handle_server_event(&mut self, event: ServerEvent) {
        let result = match event {
            ServerEvent::UserJoined { total_users } => {
                self.emit(CallUpdate::RoomEvent(event));
                self.machine.on_peer_present(total_users).await
            }
            ServerEvent::UserLeft { .. } | ServerEvent::UserDisconnected => {
                self.emit(CallUpdate::RoomEvent(event));
                self.finish_call().await;
                self.machine.on_peer_left().await;
                Ok(())
            }
            ServerEvent::CallEnded { .. } => {
                self.finish_call().await;
                self.machine.on_remote_end_call().await;
                Ok(())
            }
            ServerEvent::Offer { sdp, .. } => self.machine.on_remote_offer(sdp).await,
            ServerEvent::Answer { sdp, .. } => self.machine.on_remote_answer(sdp).await,
            ServerEvent::IceCandidate { candidate, .. } => {
                self.machine.on_remote_candidate(candidate).await
            }
            other => {
                self.emit(CallUpdate::RoomEvent(other));
                Ok(())
            }
        };
        self.report(result);
    }

    async fn handle_command(&mut self, cmd: CallCommand) {
        debug!(code = %self.machine.code(), ?cmd, "Call command");

        match cmd {
            CallCommand::StartCall => {
                let result = self.machine.start_call().await.map(|_| ());
                self.report(result);
            }
            CallCommand::EndCall => {
                self.finish_call().await;
                let result = self.machine.end_call().await.map(|_| ());
                self.report(result);
            }
            CallCommand::ToggleMute => {
                let muted = self.controller.toggle_mute();
                self.emit(CallUpdate::MuteChanged(muted));
            }
            CallCommand::ToggleVideo => {
                let video_off = self.controller.toggle_video();
                self.emit(CallUpdate::VideoChanged(video_off));
            }
            CallCommand::StartRecording => {
                let result = match (self.machine.local_media(), self.machine.remote_media()) {
                    (Some(local), Some(remote)) => self.controller.start_recording(local, remote).await,
                    _ => Err(CallError::Recording("no media to record".into())),
                };
                match result {
                    Ok(()) => self.emit(CallUpdate::RecordingStarted),
                    Err(e) => self.report(Err(e)),
                }
            }
            CallCommand::StopRecording => match self.controller.stop_recording().await {
                Ok(file) => self.emit(CallUpdate::RecordingFinished(file)),
                Err(e) => self.report(Err(e)),
            },
            CallCommand::Shutdown => {}
        }
    }

    async fn hang_up(&mut self) {
        self.finish_call().await;
        if let Err(e) = self.machine.end_call().await {
            debug!(code = %self.machine.code(), "Hang-up not delivered: {}", e);
        }
    }

    /// Stops the controller while media is still alive, so a running
    /// recording is finalized before the tracks go away.
    async fn finish_call(&mut self) {
        if self.controller.is_active() {
            let recording = self.controller.end_call().await;
            self.emit(CallUpdate::CallEnded { recording });
        }
    }

    async fn sync(&mut self, before: NegotiationState) {
        let now = self.machine.state();
        if now != before {
            self.emit(CallUpdate::StateChanged(now));
        }

        if now == NegotiationState::Connected && !self.controller.is_active() {
            self.controller
                .activate(self.machine.local_media(), Instant::now());
            self.emit(CallUpdate::CallActivated);
        } else if now != NegotiationState::Connected {
            self.finish_call().await;
        }
    }

    fn report(&self, result: Result<(), CallError>) {
        let Err(e) = result else {
            return;
        };
        match e {
            CallError::MediaAccessDenied(reason) => self.emit(CallUpdate::MediaDenied(reason)),
            CallError::RelayUnavailable => self.emit(CallUpdate::RelayLost),
            other => {
                warn!(code = %self.machine.code(), "Call error: {}", other);
                self.emit(CallUpdate::Error(other.to_string()));
            }
        }
    }

    fn emit(&self, update: CallUpdate) {
        if self.updates.send(update).is_err() {
            debug!("Call update receiver dropped");
        }
    }
}
