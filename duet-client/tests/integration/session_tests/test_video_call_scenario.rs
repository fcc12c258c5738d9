use std::sync::Arc;

use duet_client::{CallAgent, CallUpdate, NegotiationDeps, NegotiationState, SignalingSession};
use duet_core::RoomMode;

use crate::integration::{init_tracing, wait_for_update};
use crate::utils::{MockMediaBackend, MockTransportFactory, start_server};

/// Two sessions meet in a video room and negotiate through the real relay.
#[tokio::test]
async fn test_video_call_through_relay() {
    init_tracing();
    let url = start_server(Some("482913")).await;

    let (host, host_rx) = SignalingSession::connect(&url).await.unwrap();
    let (guest, guest_rx) = SignalingSession::connect(&url).await.unwrap();

    let code = host.create_room(RoomMode::Video).await.unwrap();
    let joined = guest.join_room(&code).await.unwrap();
    assert_eq!(joined.total_users, 2);
    assert!(!joined.is_initiator);

    let host_media = MockMediaBackend::new();
    let guest_media = MockMediaBackend::new();

    let (host_agent, host_handle, mut host_updates) = CallAgent::new(
        code.clone(),
        true,
        1,
        NegotiationDeps {
            signals: Arc::new(host.clone()),
            transports: MockTransportFactory::auto_connect("host"),
            media: host_media.clone(),
        },
        host_rx,
    );
    let (guest_agent, _guest_handle, mut guest_updates) = CallAgent::new(
        code.clone(),
        joined.is_initiator,
        joined.total_users,
        NegotiationDeps {
            signals: Arc::new(guest.clone()),
            transports: MockTransportFactory::auto_connect("guest"),
            media: guest_media.clone(),
        },
        guest_rx,
    );
    tokio::spawn(host_agent.run());
    tokio::spawn(guest_agent.run());

    wait_for_update(&mut host_updates, |u| matches!(u, CallUpdate::CallActivated)).await;
    wait_for_update(&mut guest_updates, |u| matches!(u, CallUpdate::CallActivated)).await;
    assert_eq!(host_media.acquired().len(), 1);
    assert_eq!(guest_media.acquired().len(), 1);

    host_handle.toggle_mute().await.unwrap();
    let muted = wait_for_update(&mut host_updates, |u| matches!(u, CallUpdate::MuteChanged(_))).await;
    assert!(matches!(muted, CallUpdate::MuteChanged(true)));

    host_handle.end_call().await.unwrap();
    wait_for_update(&mut guest_updates, |u| {
        matches!(u, CallUpdate::StateChanged(NegotiationState::Ended))
    })
    .await;
    assert_eq!(host_media.acquired()[0].stop_count(), 1);
}
