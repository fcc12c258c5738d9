use crate::room::RoomRegistry;
use crate::signaling::{Session, SignalingService};
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use duet_core::{ClientFrame, ParticipantId, ServerEvent};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Shared state behind the `/ws` route.
#[derive(Clone)]
pub struct SignalingState {
    pub service: SignalingService,
    pub registry: RoomRegistry,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<SignalingState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: SignalingState) {
    let participant = ParticipantId::new();
    info!(%participant, "New WebSocket connection");

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let SignalingState { service, registry } = state;
    service.add_peer(participant, tx);
    service.send_event(
        participant,
        &ServerEvent::Welcome {
            participant_id: participant,
            ice_servers: service.get_ice_servers(),
        },
    );

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    // Reading stays on this task so the session is always closed, whichever
    // side of the socket fails first.
    let mut session = Session::new(participant, registry);
    loop {
        tokio::select! {
            _ = (&mut send_task) => break,

            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(frame) => {
                        debug!(%participant, seq = frame.seq, "Client frame");
                        if let Some(reply) = session.handle(frame).await {
                            service.send_event(participant, &reply);
                        }
                    }
                    Err(e) => warn!(%participant, "Invalid client frame: {:?}", e),
                },
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    session.close().await;
    send_task.abort();
    service.remove_peer(&participant);
    info!(%participant, "WebSocket disconnected");
}
