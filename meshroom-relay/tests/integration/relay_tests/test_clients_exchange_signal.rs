use meshroom_client::RelayClient;
use meshroom_core::{
    Identity, PresenceRegistry, RelayMailbox, RoomId, SessionDescription, Signal, SignalMessage,
};

use crate::utils::{init_tracing, recv_until, start_relay};

#[tokio::test]
async fn test_clients_see_each_other_and_exchange_signal() {
    init_tracing();
    let (url, _service) = start_relay().await;
    let room = RoomId::from("standup");
    let alice = Identity::from("user_alice");
    let bob = Identity::from("user_bob");

    let alice_client = RelayClient::connect(&url).await.unwrap();
    let bob_client = RelayClient::connect(&url).await.unwrap();

    alice_client.join(&room, &alice, "Alice").await.unwrap();
    let mut alice_presence = alice_client.subscribe(&room).await.unwrap();
    bob_client.join(&room, &bob, "Bob").await.unwrap();

    let snapshot = recv_until(&mut alice_presence, |p| p.len() == 2).await;
    assert!(snapshot.iter().any(|p| p.id == bob && p.display_name == "Bob"));

    let roster = bob_client.list_participants(&room).await.unwrap();
    assert_eq!(roster.len(), 2);

    let mut bob_inbox = bob_client.subscribe_inbox(&room, &bob).await.unwrap();
    let offer = SignalMessage::new(
        Signal::Offer(SessionDescription::offer("v=0")),
        alice.clone(),
        "Alice",
    );
    alice_client.send_to(&room, &bob, offer.clone()).await.unwrap();

    let delivery = recv_until(&mut bob_inbox, |_| true).await;
    assert_eq!(delivery.message, offer);

    bob_client.ack(&room, &bob, delivery.id).await.unwrap();
    // Unknown ids are ignored.
    bob_client.ack(&room, &bob, delivery.id).await.unwrap();
}

#[tokio::test]
async fn test_unacked_message_is_redelivered_to_new_subscription() {
    init_tracing();
    let (url, service) = start_relay().await;
    let room = RoomId::from("standup");
    let bob = Identity::from("user_bob");

    let client = RelayClient::connect(&url).await.unwrap();
    client.join(&room, &bob, "Bob").await.unwrap();

    let mut inbox = client.subscribe_inbox(&room, &bob).await.unwrap();
    let message = SignalMessage::new(
        Signal::Answer(SessionDescription::answer("v=0")),
        Identity::from("user_alice"),
        "Alice",
    );
    client.send_to(&room, &bob, message.clone()).await.unwrap();

    let first = recv_until(&mut inbox, |_| true).await;
    inbox.unsubscribe();

    let mut again = client.subscribe_inbox(&room, &bob).await.unwrap();
    let second = recv_until(&mut again, |_| true).await;

    assert_eq!(first.id, second.id);
    assert_eq!(second.message, message);
    assert_eq!(service.store().inbox_len(&room, &bob), 1);
}
