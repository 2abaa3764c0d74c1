use async_trait::async_trait;
use meshroom_core::{Identity, Signal, StoreError};

/// Where a room sends offers, answers and candidates for its peers.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    async fn send_signal(&self, to: &Identity, signal: Signal) -> Result<(), StoreError>;
}
