use duet_client::{CallError, NegotiationState};

use crate::integration::{TestMachine, init_tracing};
use crate::utils::MockMediaBackend;

#[tokio::test]
async fn test_media_denial_aborts_attempt_and_resets_latch() {
    init_tracing();

    let mut tm = TestMachine::with_media(true, MockMediaBackend::denying());
    tm.machine.on_peer_present(2).await.unwrap();

    let media = tm.next_media().await;
    let result = tm.machine.on_media(media).await;

    assert!(matches!(result, Err(CallError::MediaAccessDenied(_))));
    assert_eq!(tm.machine.state(), NegotiationState::Idle);
    assert!(!tm.machine.offer_latched());
    assert_eq!(tm.transports.last().close_count(), 1);
    assert_eq!(tm.signals.offers(), 0);

    // Permission granted on the next try.
    tm.media.set_deny(false);
    tm.machine.on_peer_present(2).await.unwrap();
    tm.deliver_media().await;
    assert_eq!(tm.machine.state(), NegotiationState::OfferSent);
    assert_eq!(tm.signals.offers(), 1);
}

#[tokio::test]
async fn test_media_for_ended_attempt_is_stopped() {
    init_tracing();

    let mut tm = TestMachine::new(true);
    tm.machine.on_peer_present(2).await.unwrap();
    tm.machine.end_call().await.unwrap();

    let media = tm.next_media().await;
    tm.machine.on_media(media).await.unwrap();

    assert_eq!(tm.machine.state(), NegotiationState::Ended);
    assert!(tm.machine.local_media().is_none());
    assert_eq!(tm.media.acquired()[0].stop_count(), 1);
    assert_eq!(tm.signals.offers(), 0);
}

#[tokio::test]
async fn test_media_from_previous_attempt_is_discarded() {
    init_tracing();

    let mut tm = TestMachine::new(true);
    tm.machine.on_peer_present(2).await.unwrap();
    tm.machine.end_call().await.unwrap();
    tm.machine.on_peer_present(2).await.unwrap();

    // Both requests are in flight; they may complete in either order.
    let first = tm.next_media().await;
    let second = tm.next_media().await;
    tm.machine.on_media(first).await.unwrap();
    tm.machine.on_media(second).await.unwrap();

    assert_eq!(tm.machine.state(), NegotiationState::OfferSent);
    assert_eq!(tm.signals.offers(), 1);

    let stopped = tm
        .media
        .acquired()
        .iter()
        .filter(|s| s.stop_count() > 0)
        .count();
    assert_eq!(stopped, 1, "only the stale stream is released");
}
