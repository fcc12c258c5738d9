use bytes::Bytes;
use duet_core::RoomCode;

pub const RECORDING_MIME_TYPE: &str = "video/webm";

/// Canvas layout for a recorded call: local pane on the left, remote on the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingSpec {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub mime_type: &'static str,
    pub mix_audio: bool,
}

impl Default for RecordingSpec {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            frame_rate: 30,
            mime_type: RECORDING_MIME_TYPE,
            mix_audio: true,
        }
    }
}

impl RecordingSpec {
    pub fn pane_width(&self) -> u32 {
        self.width / 2
    }

    /// Top-left corner and size of the pane at `index` (0 local, 1 remote).
    pub fn pane(&self, index: u32) -> (u32, u32, u32, u32) {
        let width = self.pane_width();
        (index * width, 0, width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingFile {
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
}

/// `call-<code>-<unix-ms>.webm`
pub fn recording_file_name(code: &RoomCode, unix_ms: u64) -> String {
    format!("call-{}-{}.webm", code, unix_ms)
}
