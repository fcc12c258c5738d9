use anyhow::Result;
use async_trait::async_trait;
use duet_client::{
    MediaStream, PeerTransport, TransportEvent, TransportFactory, TransportNotice,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use super::mock_media::MockStream;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    AttachMedia(String),
    CreateOffer,
    CreateAnswer,
    RemoteOffer(String),
    RemoteAnswer(String),
    Candidate(String),
    Close,
}

/// Records every call. In auto-connect mode it also trickles local
/// candidates and reports `Connected` once both descriptions are in place.
pub struct MockTransport {
    attempt: u64,
    label: String,
    events: mpsc::Sender<TransportNotice>,
    calls: Mutex<Vec<TransportCall>>,
    auto_connect: bool,
    local_set: AtomicBool,
    remote_set: AtomicBool,
}

impl MockTransport {
    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn candidates(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                TransportCall::Candidate(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn close_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| **c == TransportCall::Close)
            .count()
    }

    fn record(&self, call: TransportCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn notify(&self, event: TransportEvent) {
        let _ = self.events.try_send(TransportNotice {
            attempt: self.attempt,
            event,
        });
    }

    fn local_description_set(&self) {
        self.local_set.store(true, Ordering::SeqCst);
        if self.auto_connect {
            self.notify(TransportEvent::CandidateGenerated(format!(
                "candidate:{}-{}",
                self.label, self.attempt
            )));
            self.maybe_connect();
        }
    }

    fn remote_description_set(&self) {
        self.remote_set.store(true, Ordering::SeqCst);
        if self.auto_connect {
            self.maybe_connect();
        }
    }

    fn maybe_connect(&self) {
        if self.local_set.load(Ordering::SeqCst) && self.remote_set.load(Ordering::SeqCst) {
            let remote = MockStream::new(&format!("remote-{}", self.label));
            self.notify(TransportEvent::RemoteStream(remote));
            self.notify(TransportEvent::Connected);
        }
    }
}

#[async_trait]
impl PeerTransport for MockTransport {
    async fn attach_local_media(&self, stream: Arc<dyn MediaStream>) -> Result<()> {
        self.record(TransportCall::AttachMedia(stream.id().to_owned()));
        Ok(())
    }

    async fn create_offer(&self) -> Result<String> {
        self.record(TransportCall::CreateOffer);
        self.local_description_set();
        Ok(format!("offer-{}-{}", self.label, self.attempt))
    }

    async fn create_answer(&self) -> Result<String> {
        self.record(TransportCall::CreateAnswer);
        self.local_description_set();
        Ok(format!("answer-{}-{}", self.label, self.attempt))
    }

    async fn apply_remote_offer(&self, sdp: String) -> Result<()> {
        self.record(TransportCall::RemoteOffer(sdp));
        self.remote_description_set();
        Ok(())
    }

    async fn apply_remote_answer(&self, sdp: String) -> Result<()> {
        self.record(TransportCall::RemoteAnswer(sdp));
        self.remote_description_set();
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: String) -> Result<()> {
        self.record(TransportCall::Candidate(candidate));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.record(TransportCall::Close);
        Ok(())
    }
}

/// Hands out [`MockTransport`]s and keeps them for inspection.
pub struct MockTransportFactory {
    label: String,
    auto_connect: bool,
    opened: Mutex<Vec<Arc<MockTransport>>>,
}

impl MockTransportFactory {
    /// Transports that only record; tests inject events by hand.
    pub fn manual(label: &str) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_owned(),
            auto_connect: false,
            opened: Mutex::new(Vec::new()),
        })
    }

    pub fn auto_connect(label: &str) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_owned(),
            auto_connect: true,
            opened: Mutex::new(Vec::new()),
        })
    }

    pub fn opened(&self) -> Vec<Arc<MockTransport>> {
        self.opened.lock().unwrap().clone()
    }

    pub fn last(&self) -> Arc<MockTransport> {
        self.opened()
            .last()
            .cloned()
            .expect("no transport opened yet")
    }

    /// Raises `event` on the transport of `attempt`.
    pub async fn inject(&self, attempt: u64, event: TransportEvent) {
        let transport = self
            .opened()
            .into_iter()
            .find(|t| t.attempt == attempt)
            .expect("no transport for attempt");
        transport
            .events
            .send(TransportNotice { attempt, event })
            .await
            .expect("transport receiver dropped");
    }
}

#[async_trait]
impl TransportFactory for MockTransportFactory {
    async fn open(
        &self,
        attempt: u64,
        events: mpsc::Sender<TransportNotice>,
    ) -> Result<Arc<dyn PeerTransport>> {
        let transport = Arc::new(MockTransport {
            attempt,
            label: self.label.clone(),
            events,
            calls: Mutex::new(Vec::new()),
            auto_connect: self.auto_connect,
            local_set: AtomicBool::new(false),
            remote_set: AtomicBool::new(false),
        });
        self.opened.lock().unwrap().push(transport.clone());
        Ok(transport)
    }
}
