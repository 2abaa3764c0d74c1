use meshroom_client::{
    NegotiationState, RoomDeps, RoomHandle, RoomOptions, RoomSnapshot, TransportFactory,
};
use meshroom_core::{
    Identity, InboxDelivery, MemoryStore, PresenceRegistry, RelayMailbox, RoomId, Signal,
    SignalMessage, StoreConnection, Subscription,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

/// Timeout for a room to reach an expected snapshot (ms).
pub const SNAPSHOT_TIMEOUT_MS: u64 = 5000;

/// Timeout for polling store or transport state (ms).
pub const POLL_TIMEOUT_MS: u64 = 5000;

pub const TEST_ROOM: &str = "standup";

/// Initialize tracing for tests (call once per test).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// A room participant driven by a [`RoomHandle`].
pub struct TestPeer {
    pub handle: RoomHandle,
    /// Store connection the room runs on; disconnect it to simulate a crash.
    pub conn: Arc<StoreConnection>,
}

impl TestPeer {
    pub async fn join(
        store: &MemoryStore,
        transports: Arc<dyn TransportFactory>,
        name: &str,
    ) -> Self {
        let conn = Arc::new(store.connect());
        let deps = RoomDeps::new(conn.clone(), transports);
        let handle = RoomHandle::join(RoomOptions::new(TEST_ROOM, name), deps)
            .await
            .expect("join failed");
        Self { handle, conn }
    }

    pub fn id(&self) -> &Identity {
        self.handle.identity()
    }

    pub async fn wait_until<F>(&self, pred: F) -> RoomSnapshot
    where
        F: FnMut(&RoomSnapshot) -> bool,
    {
        tokio::time::timeout(
            Duration::from_millis(SNAPSHOT_TIMEOUT_MS),
            self.handle.wait_until(pred),
        )
        .await
        .expect("timed out waiting for snapshot")
        .expect("room closed while waiting")
    }

    /// Wait until the session with `remote` reaches `state`.
    pub async fn wait_for_state(&self, remote: &Identity, state: NegotiationState) -> RoomSnapshot {
        self.wait_until(|s| s.state_of(remote) == Some(state)).await
    }

    /// Wait until every other participant has a stable session with us.
    pub async fn wait_for_mesh(&self, peers: usize) -> RoomSnapshot {
        self.wait_until(|s| {
            s.sessions.len() == peers
                && s.sessions
                    .values()
                    .all(|v| v.state == NegotiationState::Stable)
        })
        .await
    }
}

/// A participant that talks to the store directly, so tests can hand-craft
/// signals for a room under test.
pub struct RawPeer {
    pub id: Identity,
    pub conn: StoreConnection,
    pub inbox: Subscription<InboxDelivery>,
}

impl RawPeer {
    pub async fn join(store: &MemoryStore, id: &str) -> Self {
        let id = Identity::from(id);
        let conn = store.connect();
        conn.join(&room(), &id, id.as_str()).await.unwrap();
        let inbox = conn.subscribe_inbox(&room(), &id).await.unwrap();
        Self { id, conn, inbox }
    }

    pub async fn send(&self, to: &Identity, signal: Signal) {
        let message = SignalMessage::new(signal, self.id.clone(), self.id.as_str());
        self.conn.send_to(&room(), to, message).await.unwrap();
    }

    /// Next message in our inbox matching `pred`, acknowledged.
    pub async fn recv_matching<F>(&mut self, mut pred: F) -> SignalMessage
    where
        F: FnMut(&SignalMessage) -> bool,
    {
        let wait = async {
            loop {
                let delivery = self.inbox.recv().await.expect("inbox closed");
                self.conn.ack(&room(), &self.id, delivery.id).await.unwrap();
                if pred(&delivery.message) {
                    return delivery.message;
                }
            }
        };
        tokio::time::timeout(Duration::from_millis(SNAPSHOT_TIMEOUT_MS), wait)
            .await
            .expect("timed out waiting for inbox message")
    }

    pub async fn leave(&self) {
        self.conn.leave(&room(), &self.id).await.unwrap();
    }
}

pub fn room() -> RoomId {
    RoomId::from(TEST_ROOM)
}

/// Poll `check` every 10ms until it holds.
pub async fn wait_for<F>(mut check: F)
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = Duration::from_millis(POLL_TIMEOUT_MS);

    while !check() {
        if start.elapsed() > timeout {
            panic!("condition not reached within {}ms", POLL_TIMEOUT_MS);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
