use crate::media::MediaStream;
use crate::transport::transport_event::TransportNotice;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One peer connection. `create_offer`/`create_answer` also install the
/// result as the local description.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn attach_local_media(&self, stream: Arc<dyn MediaStream>) -> Result<()>;

    async fn create_offer(&self) -> Result<String>;

    async fn create_answer(&self) -> Result<String>;

    async fn apply_remote_offer(&self, sdp: String) -> Result<()>;

    async fn apply_remote_answer(&self, sdp: String) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: String) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// Opens a fresh transport for each call attempt. Everything it reports is
/// sent to `events` tagged with `attempt`.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn open(
        &self,
        attempt: u64,
        events: mpsc::Sender<TransportNotice>,
    ) -> Result<Arc<dyn PeerTransport>>;
}
