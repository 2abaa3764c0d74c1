use meshroom_client::{NegotiationState, SessionRole};
use meshroom_core::{IceCandidate, MemoryStore, SdpKind, SessionDescription, Signal};
use std::sync::Arc;

use crate::utils::{FakeTransportFactory, RawPeer, TestPeer, TransportCall, init_tracing};

#[tokio::test]
async fn test_early_candidates_flush_in_order_after_offer() {
    init_tracing();
    let store = MemoryStore::new();
    let transports = FakeTransportFactory::new();

    let alice = TestPeer::join(&store, Arc::new(transports.clone()), "Alice").await;
    let mut remote = RawPeer::join(&store, "user_remote").await;

    remote
        .send(alice.id(), Signal::Candidate(IceCandidate::new("c1")))
        .await;
    remote
        .send(alice.id(), Signal::Candidate(IceCandidate::new("c2")))
        .await;
    remote
        .send(alice.id(), Signal::Offer(SessionDescription::offer("v=0")))
        .await;

    let snapshot = alice
        .wait_for_state(&remote.id, NegotiationState::Stable)
        .await;
    assert_eq!(
        snapshot.session(&remote.id).unwrap().role,
        SessionRole::Answerer
    );

    remote
        .recv_matching(|m| matches!(m.signal, Signal::Answer(_)))
        .await;

    let calls = transports.calls_between(alice.id(), &remote.id);
    let position = |call: TransportCall| calls.iter().position(|c| *c == call).unwrap();

    let offer_at = position(TransportCall::RemoteDescription(SdpKind::Offer));
    let c1_at = position(TransportCall::Candidate("c1".into()));
    let c2_at = position(TransportCall::Candidate("c2".into()));
    let answer_at = position(TransportCall::Answer);

    assert!(offer_at < c1_at);
    assert!(c1_at < c2_at);
    assert!(c2_at < answer_at);
    assert_eq!(
        transports.count(alice.id(), |c| *c == TransportCall::Created),
        1
    );
}
