use meshroom_core::Subscription;
use meshroom_relay::{RelayService, serve};
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::Level;

/// Timeout for a pushed frame to reach the client (ms).
pub const PUSH_TIMEOUT_MS: u64 = 5000;

/// Initialize tracing for tests (call once per test).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Start a relay on an ephemeral port.
///
/// Returns (ws url, service) so tests can inspect the backing store.
pub async fn start_relay() -> (String, RelayService) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let service = RelayService::default();

    tokio::spawn(serve(listener, service.clone()));

    (format!("ws://{}/ws", addr), service)
}

/// Receive from a subscription until `pred` matches, or panic on timeout.
pub async fn recv_until<T, F>(sub: &mut Subscription<T>, mut pred: F) -> T
where
    F: FnMut(&T) -> bool,
{
    let wait = async {
        loop {
            match sub.recv().await {
                Some(item) if pred(&item) => return item,
                Some(_) => continue,
                None => panic!("subscription ended"),
            }
        }
    };

    tokio::time::timeout(Duration::from_millis(PUSH_TIMEOUT_MS), wait)
        .await
        .expect("timed out waiting for push")
}
