use duet_client::NegotiationState;

use crate::integration::{TestMachine, init_tracing};
use crate::utils::MockMediaBackend;

#[tokio::test]
async fn test_start_call_retries_after_media_denial() {
    init_tracing();

    let mut tm = TestMachine::with_media(true, MockMediaBackend::denying());
    tm.machine.on_peer_present(2).await.unwrap();
    tm.deliver_media().await;
    assert_eq!(tm.machine.state(), NegotiationState::Idle);

    tm.media.set_deny(false);
    assert!(tm.machine.start_call().await.unwrap());
    assert_eq!(tm.machine.state(), NegotiationState::AwaitingLocalMedia);
    assert_eq!(tm.machine.attempt(), 2);

    tm.deliver_media().await;
    assert_eq!(tm.machine.state(), NegotiationState::OfferSent);
    assert_eq!(tm.signals.offers(), 1);
}

#[tokio::test]
async fn test_start_call_after_hang_up() {
    init_tracing();

    let mut tm = TestMachine::new(true);
    tm.machine.on_peer_present(2).await.unwrap();
    tm.deliver_media().await;
    tm.machine.end_call().await.unwrap();
    assert_eq!(tm.machine.state(), NegotiationState::Ended);
    assert!(tm.machine.peer_present());

    assert!(tm.machine.start_call().await.unwrap());
    tm.deliver_media().await;

    assert_eq!(tm.machine.state(), NegotiationState::OfferSent);
    assert_eq!(tm.signals.offers(), 2);
    assert_eq!(tm.transports.opened().len(), 2);
}

#[tokio::test]
async fn test_start_call_needs_initiator_and_peer() {
    init_tracing();

    let mut responder = TestMachine::new(false);
    responder.machine.on_peer_present(2).await.unwrap();
    assert!(!responder.machine.start_call().await.unwrap());
    assert_eq!(responder.machine.state(), NegotiationState::Idle);

    let mut alone = TestMachine::new(true);
    alone.machine.on_peer_present(1).await.unwrap();
    assert!(!alone.machine.start_call().await.unwrap());
    assert!(alone.transports.opened().is_empty());
}

#[tokio::test]
async fn test_start_call_is_ignored_while_negotiating() {
    init_tracing();

    let mut tm = TestMachine::new(true);
    tm.machine.on_peer_present(2).await.unwrap();

    assert!(!tm.machine.start_call().await.unwrap());
    assert_eq!(tm.machine.attempt(), 1);
    assert_eq!(tm.transports.opened().len(), 1);
}
