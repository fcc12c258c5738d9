use duet_core::utils::DEFAULT_STUN_ADDR;
use duet_core::{IceServerConfig, RoomCode};
use duet_server::{
    CodeGenerator, RandomCodeGenerator, RoomConfig, RoomRegistry, SignalingService,
    SignalingState, serve_with_listener,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpListener;

/// Always proposes the same code; collisions fall back to random draws.
struct FixedFirstCode {
    code: RoomCode,
    used: AtomicBool,
}

impl CodeGenerator for FixedFirstCode {
    fn next_code(&self) -> RoomCode {
        if self.used.swap(true, Ordering::SeqCst) {
            RandomCodeGenerator.next_code()
        } else {
            self.code.clone()
        }
    }
}

/// Starts a signaling server on an ephemeral port and returns its `/ws` URL.
pub async fn start_server(first_code: Option<&str>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr: SocketAddr = listener.local_addr().unwrap();

    let codes: Arc<dyn CodeGenerator> = match first_code {
        Some(code) => Arc::new(FixedFirstCode {
            code: RoomCode::parse(code).unwrap(),
            used: Default::default(),
        }),
        None => Arc::new(RandomCodeGenerator),
    };

    let service = SignalingService::new(vec![IceServerConfig::stun([DEFAULT_STUN_ADDR])]);
    let registry = RoomRegistry::new(Arc::new(service.clone()), codes, RoomConfig::default());
    let state = SignalingState { service, registry };

    tokio::spawn(async move {
        if let Err(e) = serve_with_listener(listener, state).await {
            tracing::error!("Test server stopped: {:?}", e);
        }
    });

    format!("ws://{}/ws", addr)
}
