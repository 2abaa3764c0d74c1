use meshroom_client::{MediaKind, NegotiationState, SessionRole};
use meshroom_core::{MemoryStore, SdpKind};
use std::sync::Arc;

use crate::utils::{FakeTransportFactory, TestPeer, TransportCall, init_tracing, wait_for};

#[tokio::test]
async fn test_later_joiner_initiates_single_exchange() {
    init_tracing();
    let store = MemoryStore::new();
    let transports = FakeTransportFactory::new();

    let alice = TestPeer::join(&store, Arc::new(transports.clone()), "Alice").await;
    let bob = TestPeer::join(&store, Arc::new(transports.clone()), "Bob").await;

    let bob_view = bob.wait_for_state(alice.id(), NegotiationState::Stable).await;
    let alice_view = alice.wait_for_state(bob.id(), NegotiationState::Stable).await;

    assert_eq!(bob_view.session(alice.id()).unwrap().role, SessionRole::Initiator);
    assert_eq!(alice_view.session(bob.id()).unwrap().role, SessionRole::Answerer);

    // Exactly one offer/answer pair.
    assert_eq!(transports.count(bob.id(), |c| *c == TransportCall::Offer), 1);
    assert_eq!(transports.count(alice.id(), |c| *c == TransportCall::Offer), 0);
    assert_eq!(transports.count(alice.id(), |c| *c == TransportCall::Answer), 1);
    assert_eq!(
        transports.count(bob.id(), |c| *c == TransportCall::RemoteDescription(SdpKind::Answer)),
        1
    );

    // Each side applied the other's candidate.
    let alice_candidate = format!("candidate:{}", alice.id());
    let bob_candidate = format!("candidate:{}", bob.id());
    wait_for(|| {
        transports
            .calls_between(alice.id(), bob.id())
            .contains(&TransportCall::Candidate(bob_candidate.clone()))
    })
    .await;
    wait_for(|| {
        transports
            .calls_between(bob.id(), alice.id())
            .contains(&TransportCall::Candidate(alice_candidate.clone()))
    })
    .await;

    // Both see each other's stream.
    let alice_view = alice
        .wait_until(|s| s.remote_streams.contains_key(bob.id()) && s.participants.len() == 2)
        .await;
    let stream = &alice_view.remote_streams[bob.id()];
    assert!(stream.track(MediaKind::Audio).is_some());
    bob.wait_until(|s| s.remote_streams.contains_key(alice.id())).await;

    assert_eq!(alice_view.participants.len(), 2);
    assert_eq!(alice_view.peers().count(), 1);
}
