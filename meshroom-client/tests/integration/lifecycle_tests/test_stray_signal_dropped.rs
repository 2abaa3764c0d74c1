use meshroom_client::NegotiationState;
use meshroom_core::{
    IceCandidate, Identity, MemoryStore, RelayMailbox, SessionDescription, Signal, SignalMessage,
};
use std::sync::Arc;

use crate::utils::{
    FakeTransportFactory, RawPeer, TestPeer, TransportCall, init_tracing, room, wait_for,
};

#[tokio::test]
async fn test_signal_from_departed_peer_creates_no_session() {
    init_tracing();
    let store = MemoryStore::new();
    let transports = FakeTransportFactory::new();

    let remote = RawPeer::join(&store, "user_remote").await;
    let alice = TestPeer::join(&store, Arc::new(transports.clone()), "Alice").await;
    alice
        .wait_for_state(&remote.id, NegotiationState::OfferSent)
        .await;

    remote.leave().await;
    alice
        .wait_until(|s| !s.sessions.contains_key(&remote.id))
        .await;

    remote
        .send(alice.id(), Signal::Candidate(IceCandidate::new("late")))
        .await;
    remote
        .send(alice.id(), Signal::Offer(SessionDescription::offer("v=0")))
        .await;
    wait_for(|| store.inbox_len(&room(), alice.id()) == 0).await;

    assert!(!alice.handle.snapshot().sessions.contains_key(&remote.id));
    assert_eq!(
        transports
            .calls_between(alice.id(), &remote.id)
            .iter()
            .filter(|c| **c == TransportCall::Created)
            .count(),
        1
    );
}

#[tokio::test]
async fn test_answer_without_session_is_dropped() {
    init_tracing();
    let store = MemoryStore::new();
    let transports = FakeTransportFactory::new();

    let alice = TestPeer::join(&store, Arc::new(transports.clone()), "Alice").await;
    let remote = RawPeer::join(&store, "user_remote").await;

    remote
        .send(alice.id(), Signal::Answer(SessionDescription::answer("v=0")))
        .await;
    wait_for(|| store.inbox_len(&room(), alice.id()) == 0).await;

    assert!(alice.handle.snapshot().sessions.is_empty());
    assert_eq!(transports.count(alice.id(), |c| *c == TransportCall::Created), 0);
}

#[tokio::test]
async fn test_signal_from_never_joined_sender_is_dropped() {
    init_tracing();
    let store = MemoryStore::new();
    let transports = FakeTransportFactory::new();

    let alice = TestPeer::join(&store, Arc::new(transports.clone()), "Alice").await;
    let ghost = Identity::from("user_ghost");
    let outsider = store.connect();

    for signal in [
        Signal::Candidate(IceCandidate::new("c1")),
        Signal::Offer(SessionDescription::offer("v=0")),
    ] {
        let message = SignalMessage::new(signal, ghost.clone(), "Ghost");
        outsider.send_to(&room(), alice.id(), message).await.unwrap();
    }
    wait_for(|| store.inbox_len(&room(), alice.id()) == 0).await;

    let bob = TestPeer::join(&store, Arc::new(transports.clone()), "Bob").await;
    let snapshot = alice.wait_for_mesh(1).await;

    assert!(snapshot.session(&ghost).is_none());
    assert!(!snapshot.participants.contains_key(&ghost));
    assert!(snapshot.session(bob.id()).is_some());
    assert!(transports.calls_between(alice.id(), &ghost).is_empty());
}

#[tokio::test]
async fn test_signal_after_later_presence_changes_is_dropped() {
    init_tracing();
    let store = MemoryStore::new();
    let transports = FakeTransportFactory::new();

    let remote = RawPeer::join(&store, "user_remote").await;
    let alice = TestPeer::join(&store, Arc::new(transports.clone()), "Alice").await;
    remote.leave().await;
    alice
        .wait_until(|s| !s.sessions.contains_key(&remote.id))
        .await;

    // Further presence updates push the departure out of recent history.
    let bob = TestPeer::join(&store, Arc::new(transports.clone()), "Bob").await;
    alice.wait_for_mesh(1).await;
    bob.handle.leave().await.unwrap();
    alice.wait_until(|s| s.sessions.is_empty()).await;

    remote
        .send(alice.id(), Signal::Offer(SessionDescription::offer("v=0")))
        .await;
    wait_for(|| store.inbox_len(&room(), alice.id()) == 0).await;

    assert!(alice.handle.snapshot().sessions.is_empty());
    assert_eq!(
        transports
            .calls_between(alice.id(), &remote.id)
            .iter()
            .filter(|c| **c == TransportCall::Created)
            .count(),
        1
    );
}
