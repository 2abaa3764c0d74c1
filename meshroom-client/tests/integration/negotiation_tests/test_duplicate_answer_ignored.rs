use meshroom_client::NegotiationState;
use meshroom_core::{MemoryStore, SdpKind, SessionDescription, Signal};
use std::sync::Arc;

use crate::utils::{
    FakeTransportFactory, RawPeer, TestPeer, TransportCall, init_tracing, room, wait_for,
};

#[tokio::test]
async fn test_replayed_answer_leaves_stable_session_unchanged() {
    init_tracing();
    let store = MemoryStore::new();
    let transports = FakeTransportFactory::new();

    // Present first, so the room under test initiates towards it.
    let mut remote = RawPeer::join(&store, "user_remote").await;
    let alice = TestPeer::join(&store, Arc::new(transports.clone()), "Alice").await;

    let offer = remote
        .recv_matching(|m| matches!(m.signal, Signal::Offer(_)))
        .await;
    assert_eq!(&offer.sender, alice.id());

    let answer = Signal::Answer(SessionDescription::answer("v=0"));
    remote.send(alice.id(), answer.clone()).await;
    alice
        .wait_for_state(&remote.id, NegotiationState::Stable)
        .await;

    remote.send(alice.id(), answer).await;
    wait_for(|| store.inbox_len(&room(), alice.id()) == 0).await;

    let snapshot = alice.handle.snapshot();
    assert_eq!(snapshot.state_of(&remote.id), Some(NegotiationState::Stable));
    assert_eq!(
        transports.count(alice.id(), |c| *c == TransportCall::RemoteDescription(SdpKind::Answer)),
        1
    );
}
