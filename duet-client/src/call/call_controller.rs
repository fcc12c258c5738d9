use crate::call::duration::format_duration;
use crate::error::CallError;
use crate::media::{
    MediaBackend, MediaStream, RecordingFile, RecordingSpec, Recorder, TrackKind,
    recording_file_name,
};
use duet_core::RoomCode;
use duet_core::utils::unix_millis;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Lifecycle of an established call: duration, track toggles and recording.
pub struct CallController {
    code: RoomCode,
    media: Arc<dyn MediaBackend>,
    started_at: Option<Instant>,
    local: Option<Arc<dyn MediaStream>>,
    muted: bool,
    video_off: bool,
    recorder: Option<Box<dyn Recorder>>,
}

impl CallController {
    pub fn new(code: RoomCode, media: Arc<dyn MediaBackend>) -> Self {
        Self {
            code,
            media,
            started_at: None,
            local: None,
            muted: false,
            video_off: false,
            recorder: None,
        }
    }

    /// Negotiation reached `Connected`.
    pub fn activate(&mut self, local: Option<Arc<dyn MediaStream>>, now: Instant) {
        if self.started_at.is_some() {
            return;
        }
        info!(code = %self.code, "Call active");
        self.started_at = Some(now);
        self.local = local;
        self.muted = false;
        self.video_off = false;
    }

    pub fn is_active(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn duration(&self, now: Instant) -> Duration {
        self.started_at
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or_default()
    }

    pub fn formatted_duration(&self, now: Instant) -> String {
        format_duration(self.duration(now))
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_video_off(&self) -> bool {
        self.video_off
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    /// Flips the local audio track. Returns the muted flag, unchanged when
    /// there is no local stream to act on.
    pub fn toggle_mute(&mut self) -> bool {
        let Some(local) = &self.local else {
            debug!(code = %self.code, "No local stream, mute toggle ignored");
            return self.muted;
        };
        self.muted = !self.muted;
        local.set_enabled(TrackKind::Audio, !self.muted);
        self.muted
    }

    /// Flips the local video track. Returns true when video is off.
    pub fn toggle_video(&mut self) -> bool {
        let Some(local) = &self.local else {
            debug!(code = %self.code, "No local stream, video toggle ignored");
            return self.video_off;
        };
        self.video_off = !self.video_off;
        local.set_enabled(TrackKind::Video, !self.video_off);
        self.video_off
    }

    pub async fn start_recording(
        &mut self,
        local: Arc<dyn MediaStream>,
        remote: Arc<dyn MediaStream>,
    ) -> Result<(), CallError> {
        if !self.is_active() {
            return Err(CallError::Recording("no active call".into()));
        }
        if self.recorder.is_some() {
            return Err(CallError::Recording("already recording".into()));
        }

        let recorder = self
            .media
            .mix_and_record(vec![local, remote], RecordingSpec::default())
            .await?;
        self.recorder = Some(recorder);
        info!(code = %self.code, "Recording started");
        Ok(())
    }

    pub async fn stop_recording(&mut self) -> Result<RecordingFile, CallError> {
        let recorder = self
            .recorder
            .take()
            .ok_or_else(|| CallError::Recording("not recording".into()))?;

        let name = recording_file_name(&self.code, unix_millis());
        let file = recorder.finalize(name).await?;
        info!(code = %self.code, file = %file.name, bytes = file.data.len(), "Recording finished");
        Ok(file)
    }

    /// Finalizes a running recording before anything is torn down, then
    /// resets the call. Repeated calls do nothing.
    pub async fn end_call(&mut self) -> Option<RecordingFile> {
        let recording = if self.recorder.is_some() {
            match self.stop_recording().await {
                Ok(file) => Some(file),
                Err(e) => {
                    warn!(code = %self.code, "Recording lost on hang-up: {}", e);
                    None
                }
            }
        } else {
            None
        };

        if self.started_at.take().is_some() {
            debug!(code = %self.code, "Call controller reset");
        }
        self.local = None;
        self.muted = false;
        self.video_off = false;
        recording
    }
}
