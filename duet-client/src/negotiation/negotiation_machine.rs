use crate::error::CallError;
use crate::media::{MediaBackend, MediaError, MediaStream};
use crate::negotiation::negotiation_state::NegotiationState;
use crate::negotiation::signal_sink::{OutboundSignal, SignalSink};
use crate::transport::{PeerTransport, TransportEvent, TransportFactory, TransportNotice};
use duet_core::RoomCode;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Outcome of a local media request, tagged with the attempt that asked for it.
pub struct MediaResult {
    pub attempt: u64,
    pub result: Result<Arc<dyn MediaStream>, MediaError>,
}

/// Collaborators of a [`NegotiationMachine`].
#[derive(Clone)]
pub struct NegotiationDeps {
    pub signals: Arc<dyn SignalSink>,
    pub transports: Arc<dyn TransportFactory>,
    pub media: Arc<dyn MediaBackend>,
}

/// Channels the machine reports asynchronous results on. Whoever drives the
/// machine feeds them back through [`NegotiationMachine::on_media`] and
/// [`NegotiationMachine::on_transport`].
pub struct NegotiationEvents {
    pub media_rx: mpsc::Receiver<MediaResult>,
    pub transport_rx: mpsc::Receiver<TransportNotice>,
}

/// Per-peer offer/answer state machine for one room.
///
/// Every field is mutated only from the `on_*` handlers, which the owning
/// task calls one at a time. Remote ICE candidates are queued until a remote
/// description has been applied and then drained in arrival order.
pub struct NegotiationMachine {
    code: RoomCode,
    is_initiator: bool,
    peer_present: bool,
    state: NegotiationState,
    offer_latched: bool,
    pending_candidates: VecDeque<String>,
    remote_description_set: bool,
    attempt: u64,
    local_media: Option<Arc<dyn MediaStream>>,
    remote_media: Option<Arc<dyn MediaStream>>,
    transport: Option<Arc<dyn PeerTransport>>,
    deps: NegotiationDeps,
    media_tx: mpsc::Sender<MediaResult>,
    transport_tx: mpsc::Sender<TransportNotice>,
}

impl NegotiationMachine {
    pub fn new(
        code: RoomCode,
        is_initiator: bool,
        deps: NegotiationDeps,
    ) -> (Self, NegotiationEvents) {
        let (media_tx, media_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (transport_tx, transport_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let machine = Self {
            code,
            is_initiator,
            peer_present: false,
            state: NegotiationState::Idle,
            offer_latched: false,
            pending_candidates: VecDeque::new(),
            remote_description_set: false,
            attempt: 0,
            local_media: None,
            remote_media: None,
            transport: None,
            deps,
            media_tx,
            transport_tx,
        };
        (
            machine,
            NegotiationEvents {
                media_rx,
                transport_rx,
            },
        )
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub fn is_initiator(&self) -> bool {
        self.is_initiator
    }

    pub fn offer_latched(&self) -> bool {
        self.offer_latched
    }

    pub fn remote_description_set(&self) -> bool {
        self.remote_description_set
    }

    pub fn peer_present(&self) -> bool {
        self.peer_present
    }

    pub fn pending_candidates(&self) -> usize {
        self.pending_candidates.len()
    }

    pub fn local_media(&self) -> Option<Arc<dyn MediaStream>> {
        self.local_media.clone()
    }

    pub fn remote_media(&self) -> Option<Arc<dyn MediaStream>> {
        self.remote_media.clone()
    }

    /// Room occupancy changed. With two members present the initiator starts
    /// an attempt, at most once until the latch is reset.
    pub async fn on_peer_present(&mut self, total_users: usize) -> Result<(), CallError> {
        if total_users < 2 {
            return Ok(());
        }
        self.peer_present = true;

        if !self.is_initiator {
            debug!(code = %self.code, "Peer present, waiting for the initiator's offer");
            return Ok(());
        }
        if self.offer_latched || self.state.is_negotiating() {
            debug!(code = %self.code, attempt = self.attempt, state = %self.state, "Offer already under way, trigger ignored");
            return Ok(());
        }

        // Our offer has not gone out yet, so anything queued belongs to an
        // earlier attempt.
        if !self.pending_candidates.is_empty() {
            debug!(code = %self.code, dropped = self.pending_candidates.len(), "Stale candidates discarded");
            self.pending_candidates.clear();
        }

        self.begin_attempt().await?;
        self.offer_latched = true;
        self.set_state(NegotiationState::AwaitingLocalMedia);
        self.request_media();
        Ok(())
    }

    /// Manual retry by the initiator once an attempt was aborted or hung up.
    /// Returns false when there is nothing to start.
    pub async fn start_call(&mut self) -> Result<bool, CallError> {
        if !self.is_initiator || !self.peer_present {
            debug!(code = %self.code, initiator = self.is_initiator, peer = self.peer_present, "Call start ignored");
            return Ok(false);
        }
        if !matches!(self.state, NegotiationState::Idle | NegotiationState::Ended) {
            debug!(code = %self.code, state = %self.state, "Call already under way");
            return Ok(false);
        }

        info!(code = %self.code, next_attempt = self.attempt + 1, "Starting call");
        self.offer_latched = false;
        self.on_peer_present(2).await?;
        Ok(true)
    }

    pub async fn on_remote_offer(&mut self, sdp: String) -> Result<(), CallError> {
        if self.is_initiator {
            warn!(code = %self.code, "Offer received while holding the initiator seat, dropped");
            return Ok(());
        }
        if self.state.is_negotiating() {
            debug!(code = %self.code, state = %self.state, "NegotiationStale: offer dropped");
            return Ok(());
        }

        self.peer_present = true;
        let transport = self.begin_attempt().await?;
        self.set_state(NegotiationState::OfferReceived);

        if let Err(e) = transport.apply_remote_offer(sdp).await {
            return self.fail(e).await;
        }
        self.remote_description_set = true;
        self.flush_candidates(&transport).await;
        self.request_media();
        Ok(())
    }

    pub async fn on_remote_answer(&mut self, sdp: String) -> Result<(), CallError> {
        if self.state != NegotiationState::OfferSent {
            debug!(code = %self.code, state = %self.state, "NegotiationStale: answer dropped");
            return Ok(());
        }
        let Some(transport) = self.transport.clone() else {
            return Ok(());
        };

        if let Err(e) = transport.apply_remote_answer(sdp).await {
            return self.fail(e).await;
        }
        self.remote_description_set = true;
        self.set_state(NegotiationState::AnswerReceived);
        self.flush_candidates(&transport).await;
        Ok(())
    }

    pub async fn on_remote_candidate(&mut self, candidate: String) -> Result<(), CallError> {
        if self.state == NegotiationState::Ended {
            debug!(code = %self.code, "Candidate after teardown dropped");
            return Ok(());
        }

        match (&self.transport, self.remote_description_set) {
            (Some(transport), true) => {
                if let Err(e) = transport.add_ice_candidate(candidate).await {
                    warn!(code = %self.code, "Failed to add ICE candidate: {:#}", e);
                }
            }
            _ => {
                self.pending_candidates.push_back(candidate);
                debug!(
                    code = %self.code,
                    queued = self.pending_candidates.len(),
                    "No remote description yet, candidate queued"
                );
            }
        }
        Ok(())
    }

    /// Result of a media request made by [`Self::request_media`].
    pub async fn on_media(&mut self, media: MediaResult) -> Result<(), CallError> {
        let MediaResult { attempt, result } = media;

        let waiting = matches!(
            self.state,
            NegotiationState::AwaitingLocalMedia | NegotiationState::OfferReceived
        );
        if attempt != self.attempt || !waiting || self.local_media.is_some() {
            if let Ok(stream) = result {
                stream.stop();
            }
            debug!(attempt, current = self.attempt, "Media for an abandoned attempt discarded");
            return Ok(());
        }

        let stream = match result {
            Ok(stream) => stream,
            Err(e) => {
                warn!(code = %self.code, attempt, "Local media unavailable, attempt aborted: {}", e);
                self.abort_attempt(NegotiationState::Idle).await;
                return Err(e.into());
            }
        };
        self.local_media = Some(stream.clone());

        let Some(transport) = self.transport.clone() else {
            return Ok(());
        };
        if let Err(e) = transport.attach_local_media(stream).await {
            return self.fail(e).await;
        }

        match self.state {
            NegotiationState::AwaitingLocalMedia => {
                let sdp = match transport.create_offer().await {
                    Ok(sdp) => sdp,
                    Err(e) => return self.fail(e).await,
                };
                self.send(OutboundSignal::Offer(sdp)).await?;
                self.set_state(NegotiationState::OfferSent);
            }
            _ => {
                let sdp = match transport.create_answer().await {
                    Ok(sdp) => sdp,
                    Err(e) => return self.fail(e).await,
                };
                self.send(OutboundSignal::Answer(sdp)).await?;
                self.set_state(NegotiationState::AnswerSent);
            }
        }
        Ok(())
    }

    pub async fn on_transport(&mut self, notice: TransportNotice) -> Result<(), CallError> {
        if notice.attempt != self.attempt || self.transport.is_none() {
            debug!(attempt = notice.attempt, event = ?notice.event, "Event from a closed transport ignored");
            return Ok(());
        }

        match notice.event {
            TransportEvent::CandidateGenerated(candidate) => {
                self.send(OutboundSignal::IceCandidate(candidate)).await?;
            }
            TransportEvent::Connected => match self.state {
                NegotiationState::AnswerSent | NegotiationState::AnswerReceived => {
                    info!(code = %self.code, attempt = self.attempt, "Peer connection established");
                    self.set_state(NegotiationState::Connected);
                }
                state => debug!(%state, "Transport connected outside an exchange"),
            },
            TransportEvent::Disconnected => {
                if self.state.is_negotiating() {
                    warn!(code = %self.code, attempt = self.attempt, "Peer connection lost");
                    self.abort_attempt(NegotiationState::Idle).await;
                }
            }
            TransportEvent::RemoteStream(stream) => {
                self.remote_media = Some(stream);
            }
        }
        Ok(())
    }

    /// Local hang-up. Returns false when the call had already ended; the peer
    /// is only notified on the first call.
    pub async fn end_call(&mut self) -> Result<bool, CallError> {
        if self.state == NegotiationState::Ended {
            debug!(code = %self.code, "Call already ended");
            return Ok(false);
        }

        self.abort_attempt(NegotiationState::Ended).await;
        if self.peer_present {
            self.send(OutboundSignal::EndCall).await?;
        }
        Ok(true)
    }

    pub async fn on_remote_end_call(&mut self) {
        if self.state == NegotiationState::Ended {
            return;
        }
        info!(code = %self.code, "Peer ended the call");
        self.abort_attempt(NegotiationState::Ended).await;
    }

    /// The other member left or lost its connection. The remaining member
    /// holds the initiator seat from now on.
    pub async fn on_peer_left(&mut self) {
        self.peer_present = false;
        self.is_initiator = true;
        self.abort_attempt(NegotiationState::Idle).await;
    }

    async fn begin_attempt(&mut self) -> Result<Arc<dyn PeerTransport>, CallError> {
        self.attempt += 1;
        self.remote_description_set = false;
        self.remote_media = None;

        match self
            .deps
            .transports
            .open(self.attempt, self.transport_tx.clone())
            .await
        {
            Ok(transport) => {
                debug!(code = %self.code, attempt = self.attempt, "Transport opened");
                self.transport = Some(transport.clone());
                Ok(transport)
            }
            Err(e) => {
                warn!(code = %self.code, "Failed to open peer transport: {:#}", e);
                self.abort_attempt(NegotiationState::Idle).await;
                Err(CallError::transport(e))
            }
        }
    }

    fn request_media(&self) {
        let media = self.deps.media.clone();
        let tx = self.media_tx.clone();
        let attempt = self.attempt;

        tokio::spawn(async move {
            let result = media.acquire_local_media().await;
            if let Err(unsent) = tx.send(MediaResult { attempt, result }).await {
                if let Ok(stream) = unsent.0.result {
                    stream.stop();
                }
            }
        });
    }

    async fn flush_candidates(&mut self, transport: &Arc<dyn PeerTransport>) {
        if self.pending_candidates.is_empty() {
            return;
        }
        debug!(code = %self.code, count = self.pending_candidates.len(), "Flushing queued candidates");

        while let Some(candidate) = self.pending_candidates.pop_front() {
            if let Err(e) = transport.add_ice_candidate(candidate).await {
                warn!(code = %self.code, "Failed to add queued ICE candidate: {:#}", e);
            }
        }
    }

    async fn fail(&mut self, err: anyhow::Error) -> Result<(), CallError> {
        warn!(code = %self.code, attempt = self.attempt, "Negotiation failed: {:#}", err);
        self.abort_attempt(NegotiationState::Idle).await;
        Err(CallError::transport(err))
    }

    /// Releases everything owned by the current attempt. Safe to repeat.
    async fn abort_attempt(&mut self, next: NegotiationState) {
        if let Some(stream) = self.local_media.take() {
            stream.stop();
        }
        self.remote_media = None;
        if let Some(transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                debug!(code = %self.code, "Transport close failed: {:#}", e);
            }
        }
        self.pending_candidates.clear();
        self.remote_description_set = false;
        self.offer_latched = false;
        self.set_state(next);
    }

    async fn send(&self, signal: OutboundSignal) -> Result<(), CallError> {
        self.deps.signals.send_signal(&self.code, signal).await
    }

    fn set_state(&mut self, next: NegotiationState) {
        if self.state != next {
            debug!(code = %self.code, attempt = self.attempt, from = %self.state, to = %next, "Negotiation state changed");
        }
        self.state = next;
    }
}
