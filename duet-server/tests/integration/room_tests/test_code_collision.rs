use std::collections::HashSet;
use std::sync::Arc;

use duet_core::{ParticipantId, RoomError, RoomMode};
use duet_server::RoomConfig;

use crate::integration::{create_test_registry, create_test_registry_with, init_tracing};
use crate::utils::SequenceCodeGenerator;

#[tokio::test]
async fn test_colliding_code_is_drawn_again() {
    init_tracing();

    let codes = Arc::new(SequenceCodeGenerator::new(&["111111", "111111", "222222"]));
    let (registry, _, _) = create_test_registry_with(codes.clone(), RoomConfig::default());

    let first = registry
        .create_room(ParticipantId::new(), RoomMode::Text)
        .await
        .unwrap();
    let second = registry
        .create_room(ParticipantId::new(), RoomMode::Text)
        .await
        .unwrap();

    assert_eq!(first.as_str(), "111111");
    assert_eq!(second.as_str(), "222222");
    assert_eq!(codes.drawn().len(), 3);
    assert_eq!(registry.room_count(), 2);
}

#[tokio::test]
async fn test_exhausted_code_space_fails_creation() {
    init_tracing();

    let codes = Arc::new(SequenceCodeGenerator::new(&["333333"]));
    let (registry, _, _) = create_test_registry_with(codes, RoomConfig::default());

    registry
        .create_room(ParticipantId::new(), RoomMode::Video)
        .await
        .unwrap();
    let result = registry
        .create_room(ParticipantId::new(), RoomMode::Video)
        .await;

    assert_eq!(result, Err(RoomError::RoomCreation));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_get_distinct_codes() {
    init_tracing();

    let (registry, _, _) = create_test_registry();

    let mut handles = Vec::new();
    for _ in 0..200 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            registry
                .create_room(ParticipantId::new(), RoomMode::Text)
                .await
        }));
    }

    let mut seen = HashSet::new();
    for handle in handles {
        let code = handle.await.unwrap().expect("create failed");
        assert!(seen.insert(code.clone()), "duplicate live code {code}");
    }
    assert_eq!(registry.room_count(), 200);
}
