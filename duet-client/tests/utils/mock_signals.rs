use async_trait::async_trait;
use duet_client::{CallError, OutboundSignal, SignalSink};
use duet_core::{ParticipantId, RoomCode, ServerEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Captures every outbound signal.
#[derive(Default)]
pub struct MockSignalSink {
    sent: Mutex<Vec<(RoomCode, OutboundSignal)>>,
    unavailable: AtomicBool,
}

impl MockSignalSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<OutboundSignal> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, s)| s.clone())
            .collect()
    }

    pub fn offers(&self) -> usize {
        self.count(|s| matches!(s, OutboundSignal::Offer(_)))
    }

    pub fn end_calls(&self) -> usize {
        self.count(|s| matches!(s, OutboundSignal::EndCall))
    }

    pub fn count(&self, predicate: impl Fn(&OutboundSignal) -> bool) -> usize {
        self.sent().iter().filter(|s| predicate(s)).count()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl SignalSink for MockSignalSink {
    async fn send_signal(&self, code: &RoomCode, signal: OutboundSignal) -> Result<(), CallError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CallError::RelayUnavailable);
        }
        tracing::debug!("[MockSignals] {:?} to room {}", signal, code);
        self.sent.lock().unwrap().push((code.clone(), signal));
        Ok(())
    }
}

/// Delivers signals straight into the other agent's server-event channel,
/// the way the relay would.
pub struct LoopbackSignals {
    from: ParticipantId,
    peer_tx: mpsc::UnboundedSender<ServerEvent>,
    sent: Mutex<Vec<OutboundSignal>>,
}

impl LoopbackSignals {
    pub fn new(from: ParticipantId, peer_tx: mpsc::UnboundedSender<ServerEvent>) -> Arc<Self> {
        Arc::new(Self {
            from,
            peer_tx,
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn sent(&self) -> Vec<OutboundSignal> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SignalSink for LoopbackSignals {
    async fn send_signal(&self, _code: &RoomCode, signal: OutboundSignal) -> Result<(), CallError> {
        self.sent.lock().unwrap().push(signal.clone());
        let from = self.from;
        let event = match signal {
            OutboundSignal::Offer(sdp) => ServerEvent::Offer { from, sdp },
            OutboundSignal::Answer(sdp) => ServerEvent::Answer { from, sdp },
            OutboundSignal::IceCandidate(candidate) => ServerEvent::IceCandidate { from, candidate },
            OutboundSignal::EndCall => ServerEvent::CallEnded { from },
        };
        self.peer_tx
            .send(event)
            .map_err(|_| CallError::RelayUnavailable)
    }
}
