use crate::error::CallError;
use crate::media::RecordingFile;
use crate::negotiation::NegotiationState;
use duet_core::ServerEvent;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallCommand {
    /// Initiator only: starts a new attempt after a failure or a hang-up.
    StartCall,
    EndCall,
    ToggleMute,
    ToggleVideo,
    StartRecording,
    StopRecording,
    Shutdown,
}

/// What the call task reports to the UI.
#[derive(Debug)]
pub enum CallUpdate {
    StateChanged(NegotiationState),
    CallActivated,
    /// Carries the recording finalized on hang-up, if one was running.
    CallEnded { recording: Option<RecordingFile> },
    MuteChanged(bool),
    /// True when local video is now off.
    VideoChanged(bool),
    RecordingStarted,
    RecordingFinished(RecordingFile),
    MediaDenied(String),
    /// Room traffic the call task does not consume itself (chat, occupancy).
    RoomEvent(ServerEvent),
    Error(String),
    RelayLost,
}

/// Cloneable sender side of a running [`crate::CallAgent`].
#[derive(Clone)]
pub struct CallHandle {
    tx: mpsc::Sender<CallCommand>,
}

impl CallHandle {
    pub(crate) fn new(tx: mpsc::Sender<CallCommand>) -> Self {
        Self { tx }
    }

    pub async fn send(&self, command: CallCommand) -> Result<(), CallError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| CallError::Transport("call agent stopped".into()))
    }

    pub async fn start_call(&self) -> Result<(), CallError> {
        self.send(CallCommand::StartCall).await
    }

    pub async fn end_call(&self) -> Result<(), CallError> {
        self.send(CallCommand::EndCall).await
    }

    pub async fn toggle_mute(&self) -> Result<(), CallError> {
        self.send(CallCommand::ToggleMute).await
    }

    pub async fn toggle_video(&self) -> Result<(), CallError> {
        self.send(CallCommand::ToggleVideo).await
    }

    pub async fn start_recording(&self) -> Result<(), CallError> {
        self.send(CallCommand::StartRecording).await
    }

    pub async fn stop_recording(&self) -> Result<(), CallError> {
        self.send(CallCommand::StopRecording).await
    }

    pub async fn shutdown(&self) -> Result<(), CallError> {
        self.send(CallCommand::Shutdown).await
    }
}
