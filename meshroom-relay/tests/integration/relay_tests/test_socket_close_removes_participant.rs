use meshroom_client::RelayClient;
use meshroom_core::{Identity, PresenceRegistry, RoomId};

use crate::utils::{init_tracing, recv_until, start_relay};

#[tokio::test]
async fn test_dropped_client_is_removed_from_presence() {
    init_tracing();
    let (url, service) = start_relay().await;
    let room = RoomId::from("standup");
    let alice = Identity::from("user_alice");
    let bob = Identity::from("user_bob");

    let alice_client = RelayClient::connect(&url).await.unwrap();
    alice_client.join(&room, &alice, "Alice").await.unwrap();
    let mut presence = alice_client.subscribe(&room).await.unwrap();

    let bob_client = RelayClient::connect(&url).await.unwrap();
    bob_client.join(&room, &bob, "Bob").await.unwrap();
    recv_until(&mut presence, |p| p.len() == 2).await;

    // No explicit leave: the socket closing is the only signal.
    drop(bob_client);

    let snapshot = recv_until(&mut presence, |p| p.len() == 1).await;
    assert_eq!(snapshot[0].id, alice);
    assert_eq!(service.store().participants(&room).len(), 1);
}

#[tokio::test]
async fn test_explicit_leave_is_idempotent() {
    init_tracing();
    let (url, service) = start_relay().await;
    let room = RoomId::from("standup");
    let alice = Identity::from("user_alice");

    let client = RelayClient::connect(&url).await.unwrap();
    client.join(&room, &alice, "Alice").await.unwrap();

    client.leave(&room, &alice).await.unwrap();
    client.leave(&room, &alice).await.unwrap();

    assert!(service.store().participants(&room).is_empty());
    assert!(client.is_connected());
}
