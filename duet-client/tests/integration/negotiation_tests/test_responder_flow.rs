use duet_client::{NegotiationState, OutboundSignal, TransportEvent};

use crate::integration::{TestMachine, init_tracing};
use crate::utils::TransportCall;

#[tokio::test]
async fn test_responder_waits_for_offer() {
    init_tracing();

    let mut tm = TestMachine::new(false);
    tm.machine.on_peer_present(2).await.unwrap();

    assert_eq!(tm.machine.state(), NegotiationState::Idle);
    assert!(!tm.machine.offer_latched());
    assert!(tm.transports.opened().is_empty());
}

#[tokio::test]
async fn test_responder_answers_and_connects() {
    init_tracing();

    let mut tm = TestMachine::new(false);
    tm.machine.on_peer_present(2).await.unwrap();

    tm.machine
        .on_remote_offer("offer-host-1".into())
        .await
        .unwrap();
    assert_eq!(tm.machine.state(), NegotiationState::OfferReceived);
    assert!(tm.machine.remote_description_set());

    tm.deliver_media().await;
    assert_eq!(tm.machine.state(), NegotiationState::AnswerSent);
    assert_eq!(
        tm.signals.sent(),
        vec![OutboundSignal::Answer("answer-guest-1".into())]
    );
    assert_eq!(
        tm.transports.last().calls(),
        vec![
            TransportCall::RemoteOffer("offer-host-1".into()),
            TransportCall::AttachMedia("local-1".into()),
            TransportCall::CreateAnswer,
        ]
    );

    tm.transports.inject(1, TransportEvent::Connected).await;
    let notice = tm.events.transport_rx.recv().await.unwrap();
    tm.machine.on_transport(notice).await.unwrap();
    assert_eq!(tm.machine.state(), NegotiationState::Connected);
}

#[tokio::test]
async fn test_second_offer_during_exchange_is_stale() {
    init_tracing();

    let mut tm = TestMachine::new(false);
    tm.machine.on_remote_offer("one".into()).await.unwrap();
    tm.machine.on_remote_offer("two".into()).await.unwrap();

    assert_eq!(tm.transports.opened().len(), 1);
    assert_eq!(
        tm.transports.last().calls(),
        vec![TransportCall::RemoteOffer("one".into())]
    );
}

#[tokio::test]
async fn test_peer_departure_hands_over_initiator_seat() {
    init_tracing();

    let mut tm = TestMachine::new(false);
    tm.machine.on_remote_offer("offer".into()).await.unwrap();
    tm.deliver_media().await;

    tm.machine.on_peer_left().await;

    assert_eq!(tm.machine.state(), NegotiationState::Idle);
    assert!(tm.machine.is_initiator());
    assert_eq!(tm.transports.last().close_count(), 1);
    assert_eq!(tm.media.acquired()[0].stop_count(), 1);

    // The next joiner is called by the member that stayed.
    tm.machine.on_peer_present(2).await.unwrap();
    assert_eq!(tm.machine.state(), NegotiationState::AwaitingLocalMedia);
}
