use std::sync::Arc;

use duet_core::{ParticipantId, RoomError, RoomMode, ServerEvent};
use duet_server::RoomConfig;

use crate::integration::{create_test_registry, create_test_registry_with, init_tracing};
use crate::utils::{SequenceCodeGenerator, wait_for_event};

#[tokio::test]
async fn test_create_then_join_reports_two_users() {
    init_tracing();

    let codes = Arc::new(SequenceCodeGenerator::new(&["482913"]));
    let (registry, mut signal_rx, _) = create_test_registry_with(codes, RoomConfig::default());

    let alice = ParticipantId::new();
    let bob = ParticipantId::new();

    let code = registry
        .create_room(alice, RoomMode::Video)
        .await
        .expect("Failed to create room");
    assert_eq!(code.as_str(), "482913");

    let outcome = registry.join_room(&code, bob).await.expect("Join failed");
    assert_eq!(outcome.total_users, 2);
    assert_eq!(outcome.mode, RoomMode::Video);
    assert!(!outcome.is_initiator, "joiner must not be the initiator");

    let joined = wait_for_event(&mut signal_rx, &alice, |e| {
        matches!(e, ServerEvent::UserJoined { .. })
    })
    .await
    .expect("Initiator was not told about the joiner");
    assert_eq!(joined, ServerEvent::UserJoined { total_users: 2 });

    let snapshot = registry.snapshot(&code).await.expect("Room vanished");
    assert_eq!(snapshot.members.len(), 2);
    assert!(snapshot.members[0].is_initiator);
    assert_eq!(snapshot.members[0].id, alice);
}

#[tokio::test]
async fn test_join_unknown_code_is_not_found() {
    init_tracing();

    let (registry, _, signaling) = create_test_registry();
    let code = "000000".parse().unwrap();

    let result = registry.join_room(&code, ParticipantId::new()).await;

    assert_eq!(result, Err(RoomError::RoomNotFound));
    assert_eq!(signaling.count().await, 0);
}

#[tokio::test]
async fn test_rejoin_is_idempotent() {
    init_tracing();

    let (registry, _, signaling) = create_test_registry();
    let alice = ParticipantId::new();
    let bob = ParticipantId::new();

    let code = registry.create_room(alice, RoomMode::Text).await.unwrap();
    registry.join_room(&code, bob).await.unwrap();
    let again = registry.join_room(&code, bob).await.unwrap();

    assert_eq!(again.total_users, 2);
    let joined: Vec<_> = signaling
        .events_for(&alice)
        .await
        .into_iter()
        .filter(|e| matches!(e, ServerEvent::UserJoined { .. }))
        .collect();
    assert_eq!(joined.len(), 1, "repeated join must not notify twice");
}
