use meshroom_client::NegotiationState;
use meshroom_core::MemoryStore;
use std::sync::Arc;

use crate::utils::{FakeTransportFactory, TestPeer, TransportCall, init_tracing};

#[tokio::test]
async fn test_failed_transport_removes_only_that_session() {
    init_tracing();
    let store = MemoryStore::new();
    let transports = FakeTransportFactory::new();

    let alice = TestPeer::join(&store, Arc::new(transports.clone()), "Alice").await;
    let bob = TestPeer::join(&store, Arc::new(transports.clone()), "Bob").await;
    let carol = TestPeer::join(&store, Arc::new(transports.clone()), "Carol").await;
    carol
        .wait_until(|s| {
            s.sessions.len() == 2
                && s.sessions.values().all(|v| v.state == NegotiationState::Stable)
                && s.remote_streams.len() == 2
        })
        .await;

    transports.fail(carol.id(), alice.id()).await;

    let view = carol
        .wait_until(|s| !s.sessions.contains_key(alice.id()))
        .await;
    assert!(!view.remote_streams.contains_key(alice.id()));
    assert_eq!(view.state_of(bob.id()), Some(NegotiationState::Stable));
    assert!(view.remote_streams.contains_key(bob.id()));
    assert!(view.participants.contains_key(alice.id()));

    assert!(
        transports
            .calls_between(carol.id(), alice.id())
            .contains(&TransportCall::Closed)
    );
    assert!(
        !transports
            .calls_between(carol.id(), bob.id())
            .contains(&TransportCall::Closed)
    );
}
