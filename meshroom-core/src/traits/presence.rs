use crate::error::StoreError;
use crate::model::{Identity, Participant, PresenceUpdate, RoomId};
use crate::store::Subscription;
use async_trait::async_trait;

/// Who is currently in a room.
///
/// A record written by `join` must be erased by the store if the writer's
/// connection drops without an explicit `leave`.
#[async_trait]
pub trait PresenceRegistry: Send + Sync {
    async fn join(
        &self,
        room: &RoomId,
        identity: &Identity,
        display_name: &str,
    ) -> Result<Participant, StoreError>;

    /// Point-in-time read of the participant set.
    async fn list_participants(&self, room: &RoomId) -> Result<Vec<Participant>, StoreError>;

    /// Delivers the current set immediately, then the full set after every change.
    async fn subscribe(&self, room: &RoomId) -> Result<Subscription<PresenceUpdate>, StoreError>;

    /// Idempotent.
    async fn leave(&self, room: &RoomId, identity: &Identity) -> Result<(), StoreError>;
}
