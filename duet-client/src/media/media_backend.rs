use crate::media::media_error::MediaError;
use crate::media::recording::{RecordingFile, RecordingSpec};
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

/// A set of media tracks owned by whoever produced it. Handles are shared,
/// so `stop` must be safe to call more than once.
pub trait MediaStream: Send + Sync {
    fn id(&self) -> &str;

    fn kinds(&self) -> Vec<TrackKind>;

    fn set_enabled(&self, kind: TrackKind, enabled: bool);

    fn is_enabled(&self, kind: TrackKind) -> bool;

    fn stop(&self);

    fn is_stopped(&self) -> bool;
}

/// Capture and recording capabilities of the target platform. Negotiation
/// code only ever sees this trait.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    async fn acquire_local_media(&self) -> Result<Arc<dyn MediaStream>, MediaError>;

    /// Starts mixing `streams` into a single recording laid out per `spec`.
    async fn mix_and_record(
        &self,
        streams: Vec<Arc<dyn MediaStream>>,
        spec: RecordingSpec,
    ) -> Result<Box<dyn Recorder>, MediaError>;
}

#[async_trait]
pub trait Recorder: Send {
    /// Stops capture and hands back the finished file.
    async fn finalize(self: Box<Self>, name: String) -> Result<RecordingFile, MediaError>;
}
