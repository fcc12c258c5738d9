use crate::error::CallError;
use crate::negotiation::{OutboundSignal, SignalSink};
use crate::transport::TransportConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use duet_core::utils::unix_millis;
use duet_core::{
    ChatMessage, ClientEvent, ClientFrame, FilePayload, IceServerConfig, MessageContent,
    ParticipantId, ReplyBody, RoomCode, RoomMode, ServerEvent,
};
use futures::{SinkExt, Stream, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};

const WELCOME_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of a successful `joinRoom`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedRoom {
    pub code: RoomCode,
    pub total_users: usize,
    pub messages: Vec<ChatMessage>,
    pub mode: RoomMode,
    pub is_initiator: bool,
}

struct SessionInner {
    participant: ParticipantId,
    ice_servers: Vec<IceServerConfig>,
    outbound: mpsc::UnboundedSender<Message>,
    pending: DashMap<u64, oneshot::Sender<ReplyBody>>,
    seq: AtomicU64,
    closed: AtomicBool,
}

/// Client end of the signaling WebSocket. Room requests are correlated with
/// their replies by `seq`; everything else the server pushes comes out of the
/// event receiver returned by [`SignalingSession::connect`].
#[derive(Clone)]
pub struct SignalingSession {
    inner: Arc<SessionInner>,
}

impl SignalingSession {
    /// Opens the socket and waits for `welcome`.
    pub async fn connect(url: &str) -> Result<(Self, mpsc::UnboundedReceiver<ServerEvent>)> {
        let (stream, _) = connect_async(url)
            .await
            .with_context(|| format!("Failed to connect to {url}"))?;
        let (mut sink, mut source) = stream.split();

        let welcome = tokio::time::timeout(WELCOME_TIMEOUT, next_event(&mut source))
            .await
            .context("Timed out waiting for welcome")??;
        let ServerEvent::Welcome {
            participant_id,
            ice_servers,
        } = welcome
        else {
            anyhow::bail!("Expected welcome, got {:?}", welcome);
        };
        info!(participant = %participant_id, "Signaling session established");

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(SessionInner {
            participant: participant_id,
            ice_servers,
            outbound: out_tx,
            pending: DashMap::new(),
            seq: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        });

        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                if sink.send(msg).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let reader = inner.clone();
        tokio::spawn(async move {
            while let Some(msg) = source.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ServerEvent>(text.as_str()) {
                            Ok(ServerEvent::Reply { seq, body }) => reader.resolve(seq, body),
                            Ok(event) => {
                                if event_tx.send(event).is_err() {
                                    debug!("Event receiver dropped");
                                }
                            }
                            Err(e) => warn!("Invalid server event: {:?}", e),
                        }
                    }
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => {}
                }
            }

            reader.closed.store(true, Ordering::SeqCst);
            reader.pending.clear();
            info!(participant = %reader.participant, "Signaling connection closed");
        });

        Ok((Self { inner }, event_rx))
    }

    pub fn participant(&self) -> ParticipantId {
        self.inner.participant
    }

    pub fn ice_servers(&self) -> &[IceServerConfig] {
        &self.inner.ice_servers
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig::from_welcome(self.inner.ice_servers.clone())
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub async fn create_room(&self, mode: RoomMode) -> Result<RoomCode, CallError> {
        match self.request(ClientEvent::CreateRoom { mode }).await? {
            ReplyBody::Created { code } => Ok(code),
            other => Err(unexpected(other)),
        }
    }

    pub async fn join_room(&self, code: &RoomCode) -> Result<JoinedRoom, CallError> {
        let event = ClientEvent::JoinRoom { code: code.clone() };
        match self.request(event).await? {
            ReplyBody::Joined {
                total_users,
                messages,
                mode,
                is_initiator,
            } => Ok(JoinedRoom {
                code: code.clone(),
                total_users,
                messages,
                mode,
                is_initiator,
            }),
            other => Err(unexpected(other)),
        }
    }

    /// Returns the message as the sender should append it locally; the server
    /// never echoes it back.
    pub async fn send_message(&self, code: &RoomCode, text: String) -> Result<ChatMessage, CallError> {
        let event = ClientEvent::SendMessage {
            code: code.clone(),
            text: text.clone(),
        };
        expect_ok(self.request(event).await?)?;
        Ok(ChatMessage::new(
            self.inner.participant,
            MessageContent::Text(text),
            unix_millis(),
        ))
    }

    pub async fn send_file(&self, code: &RoomCode, file: FilePayload) -> Result<ChatMessage, CallError> {
        let event = ClientEvent::SendFile {
            code: code.clone(),
            file: file.clone(),
        };
        expect_ok(self.request(event).await?)?;
        Ok(ChatMessage::new(
            self.inner.participant,
            MessageContent::File(file),
            unix_millis(),
        ))
    }

    pub async fn leave_room(&self, code: &RoomCode) -> Result<(), CallError> {
        let event = ClientEvent::LeaveRoom { code: code.clone() };
        expect_ok(self.request(event).await?)
    }

    pub fn close(&self) {
        let _ = self.inner.outbound.send(Message::Close(None));
    }

    async fn request(&self, event: ClientEvent) -> Result<ReplyBody, CallError> {
        let (tx, rx) = oneshot::channel();
        let seq = self.inner.next_seq();
        self.inner.pending.insert(seq, tx);

        // The reader clears `pending` after flagging the close, so checking
        // here catches a request that raced with shutdown.
        if self.is_closed() {
            self.inner.pending.remove(&seq);
            return Err(CallError::RelayUnavailable);
        }
        if let Err(e) = self.inner.send_frame(seq, event) {
            self.inner.pending.remove(&seq);
            return Err(e);
        }

        rx.await.map_err(|_| CallError::RelayUnavailable)
    }
}

impl SessionInner {
    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn send_frame(&self, seq: u64, event: ClientEvent) -> Result<(), CallError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CallError::RelayUnavailable);
        }
        let json = serde_json::to_string(&ClientFrame { seq, event })
            .map_err(|e| CallError::Transport(e.to_string()))?;
        self.outbound
            .send(Message::Text(json.into()))
            .map_err(|_| CallError::RelayUnavailable)
    }

    fn resolve(&self, seq: u64, body: ReplyBody) {
        if let Some((_, tx)) = self.pending.remove(&seq) {
            let _ = tx.send(body);
            return;
        }
        match body {
            ReplyBody::Error { error } => warn!(seq, "Signal rejected by server: {}", error),
            _ => debug!(seq, "Reply for an untracked frame"),
        }
    }
}

#[async_trait]
impl SignalSink for SignalingSession {
    async fn send_signal(&self, code: &RoomCode, signal: OutboundSignal) -> Result<(), CallError> {
        let code = code.clone();
        let event = match signal {
            OutboundSignal::Offer(sdp) => ClientEvent::Offer { code, sdp },
            OutboundSignal::Answer(sdp) => ClientEvent::Answer { code, sdp },
            OutboundSignal::IceCandidate(candidate) => ClientEvent::IceCandidate { code, candidate },
            OutboundSignal::EndCall => ClientEvent::EndCall { code },
        };
        let seq = self.inner.next_seq();
        self.inner.send_frame(seq, event)
    }
}

async fn next_event<S>(source: &mut S) -> Result<ServerEvent>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(msg) = source.next().await {
        match msg? {
            Message::Text(text) => {
                return serde_json::from_str(text.as_str()).context("Invalid server event");
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    anyhow::bail!("Connection closed before welcome")
}

fn expect_ok(body: ReplyBody) -> Result<(), CallError> {
    match body {
        ReplyBody::Ok => Ok(()),
        other => Err(unexpected(other)),
    }
}

fn unexpected(body: ReplyBody) -> CallError {
    match body {
        ReplyBody::Error { error } => CallError::Room(error),
        other => CallError::Transport(format!("unexpected reply: {:?}", other)),
    }
}
