use meshroom_client::SessionRole;
use meshroom_core::MemoryStore;
use std::sync::Arc;

use crate::utils::{FakeTransportFactory, TestPeer, TransportCall, init_tracing};

#[tokio::test]
async fn test_joiner_initiates_towards_every_existing_peer() {
    init_tracing();
    let store = MemoryStore::new();
    let transports = FakeTransportFactory::new();

    let mut existing = Vec::new();
    for name in ["Alice", "Bob", "Carol"] {
        let peer = TestPeer::join(&store, Arc::new(transports.clone()), name).await;
        existing.push(peer);
        let size = existing.len() - 1;
        for peer in &existing {
            peer.wait_for_mesh(size).await;
        }
    }

    let dave = TestPeer::join(&store, Arc::new(transports.clone()), "Dave").await;
    let dave_view = dave.wait_for_mesh(3).await;

    assert!(
        dave_view
            .sessions
            .values()
            .all(|s| s.role == SessionRole::Initiator)
    );
    assert_eq!(transports.count(dave.id(), |c| *c == TransportCall::Created), 3);
    assert_eq!(transports.count(dave.id(), |c| *c == TransportCall::Offer), 3);

    for peer in &existing {
        let view = peer.wait_for_mesh(3).await;
        assert_eq!(view.session(dave.id()).unwrap().role, SessionRole::Answerer);

        let towards_dave = transports.calls_between(peer.id(), dave.id());
        assert_eq!(
            towards_dave
                .iter()
                .filter(|c| **c == TransportCall::Created)
                .count(),
            1
        );
        assert!(!towards_dave.contains(&TransportCall::Offer));
    }
}
