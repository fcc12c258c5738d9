use crate::media::{MediaStream, TrackKind};
use crate::transport::peer_transport::{PeerTransport, TransportFactory};
use crate::transport::transport_config::TransportConfig;
use crate::transport::transport_event::{TransportEvent, TransportNotice};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8, MediaEngine};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// [`PeerTransport`] on top of a webrtc-rs peer connection.
pub struct RtcTransport {
    attempt: u64,
    peer_connection: Arc<RTCPeerConnection>,
    local_tracks: Mutex<Vec<Arc<TrackLocalStaticSample>>>,
}

impl RtcTransport {
    /// Builds the peer connection and wires its callbacks into `event_tx`.
    pub async fn new(
        attempt: u64,
        config: TransportConfig,
        event_tx: mpsc::Sender<TransportNotice>,
    ) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .into_iter()
                .map(|server| RTCIceServer {
                    urls: server.urls,
                    username: server.username.unwrap_or_default(),
                    credential: server.credential.unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let state_tx = event_tx.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();

                Box::pin(async move {
                    info!(attempt, "Peer connection state changed: {:?}", s);
                    let Some(event) = connection_event(s) else {
                        return;
                    };
                    let _ = tx.send(TransportNotice { attempt, event }).await;
                })
            },
        ));

        let ice_tx = event_tx.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(json_candidate) = candidate.to_json() else {
                    return;
                };
                let Ok(str_candidate) = serde_json::to_string(&json_candidate) else {
                    return;
                };
                let _ = tx
                    .send(TransportNotice {
                        attempt,
                        event: TransportEvent::CandidateGenerated(str_candidate),
                    })
                    .await;
            })
        }));

        // Audio and video arrive as separate tracks of one remote stream.
        let remote = Arc::new(RemoteMediaStream::default());
        let track_tx = event_tx;
        peer_connection.on_track(Box::new(move |track, _receiver, _transceiver| {
            let tx = track_tx.clone();
            let remote = remote.clone();

            Box::pin(async move {
                let kind = match track.kind() {
                    RTPCodecType::Audio => TrackKind::Audio,
                    RTPCodecType::Video => TrackKind::Video,
                    _ => return,
                };
                debug!(attempt, ?kind, stream = %track.stream_id(), "Remote track received");
                remote.add_kind(kind);
                let _ = tx
                    .send(TransportNotice {
                        attempt,
                        event: TransportEvent::RemoteStream(remote),
                    })
                    .await;
            })
        }));

        Ok(Self {
            attempt,
            peer_connection,
            local_tracks: Mutex::new(Vec::new()),
        })
    }

    /// Outbound sample tracks, one per attached kind. The media backend writes
    /// encoded frames into these.
    pub async fn local_tracks(&self) -> Vec<Arc<TrackLocalStaticSample>> {
        self.local_tracks.lock().await.clone()
    }
}

#[async_trait]
impl PeerTransport for RtcTransport {
    async fn attach_local_media(&self, stream: Arc<dyn MediaStream>) -> Result<()> {
        let mut tracks = self.local_tracks.lock().await;
        for kind in stream.kinds() {
            let (mime_type, track_id) = match kind {
                TrackKind::Audio => (MIME_TYPE_OPUS, "audio"),
                TrackKind::Video => (MIME_TYPE_VP8, "video"),
            };
            let track = Arc::new(TrackLocalStaticSample::new(
                RTCRtpCodecCapability {
                    mime_type: mime_type.to_owned(),
                    ..Default::default()
                },
                track_id.to_owned(),
                stream.id().to_owned(),
            ));
            self.peer_connection
                .add_track(Arc::clone(&track) as Arc<dyn TrackLocal + Send + Sync>)
                .await
                .with_context(|| format!("Failed to add {track_id} track"))?;
            tracks.push(track);
        }
        debug!(attempt = self.attempt, tracks = tracks.len(), "Local media attached");
        Ok(())
    }

    async fn create_offer(&self) -> Result<String> {
        let offer = self.peer_connection.create_offer(None).await?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await?;
        Ok(offer.sdp)
    }

    async fn create_answer(&self) -> Result<String> {
        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;
        Ok(answer.sdp)
    }

    async fn apply_remote_offer(&self, sdp: String) -> Result<()> {
        let desc = RTCSessionDescription::offer(sdp)?;
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn apply_remote_answer(&self, sdp: String) -> Result<()> {
        let desc = RTCSessionDescription::answer(sdp)?;
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: String) -> Result<()> {
        let candidate: RTCIceCandidateInit =
            serde_json::from_str(&candidate).context("Failed to parse ICE candidate JSON")?;
        self.peer_connection.add_ice_candidate(candidate).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

/// `Disconnected` is left out: ICE may recover from it without help.
fn connection_event(state: RTCPeerConnectionState) -> Option<TransportEvent> {
    match state {
        RTCPeerConnectionState::Connected => Some(TransportEvent::Connected),
        RTCPeerConnectionState::Failed | RTCPeerConnectionState::Closed => {
            Some(TransportEvent::Disconnected)
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct RtcTransportFactory {
    config: TransportConfig,
}

impl RtcTransportFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TransportFactory for RtcTransportFactory {
    async fn open(
        &self,
        attempt: u64,
        events: mpsc::Sender<TransportNotice>,
    ) -> Result<Arc<dyn PeerTransport>> {
        let transport = RtcTransport::new(attempt, self.config.clone(), events).await?;
        Ok(Arc::new(transport))
    }
}

/// Receiving side of the call, as seen through [`MediaStream`]. Enable flags
/// only gate local playback.
#[derive(Debug)]
struct RemoteMediaStream {
    id: String,
    has_audio: AtomicBool,
    has_video: AtomicBool,
    audio_enabled: AtomicBool,
    video_enabled: AtomicBool,
    stopped: AtomicBool,
}

impl Default for RemoteMediaStream {
    fn default() -> Self {
        Self {
            id: "remote".to_owned(),
            has_audio: AtomicBool::new(false),
            has_video: AtomicBool::new(false),
            audio_enabled: AtomicBool::new(true),
            video_enabled: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
        }
    }
}

impl RemoteMediaStream {
    fn add_kind(&self, kind: TrackKind) {
        match kind {
            TrackKind::Audio => self.has_audio.store(true, Ordering::SeqCst),
            TrackKind::Video => self.has_video.store(true, Ordering::SeqCst),
        }
    }
}

impl MediaStream for RemoteMediaStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn kinds(&self) -> Vec<TrackKind> {
        let mut kinds = Vec::with_capacity(2);
        if self.has_audio.load(Ordering::SeqCst) {
            kinds.push(TrackKind::Audio);
        }
        if self.has_video.load(Ordering::SeqCst) {
            kinds.push(TrackKind::Video);
        }
        kinds
    }

    fn set_enabled(&self, kind: TrackKind, enabled: bool) {
        match kind {
            TrackKind::Audio => self.audio_enabled.store(enabled, Ordering::SeqCst),
            TrackKind::Video => self.video_enabled.store(enabled, Ordering::SeqCst),
        }
    }

    fn is_enabled(&self, kind: TrackKind) -> bool {
        match kind {
            TrackKind::Audio => self.audio_enabled.load(Ordering::SeqCst),
            TrackKind::Video => self.video_enabled.load(Ordering::SeqCst),
        }
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}
