use crate::error::StoreError;
use crate::model::{Identity, InboxDelivery, MessageId, RoomId, SignalMessage};
use crate::store::Subscription;
use async_trait::async_trait;

/// Per-recipient ordered inbox.
///
/// Messages from one sender reach a recipient in send order. Delivery is
/// at-least-once: entries stay in the inbox until acknowledged and are
/// delivered again to a fresh subscription.
#[async_trait]
pub trait RelayMailbox: Send + Sync {
    async fn send_to(
        &self,
        room: &RoomId,
        recipient: &Identity,
        message: SignalMessage,
    ) -> Result<(), StoreError>;

    async fn subscribe_inbox(
        &self,
        room: &RoomId,
        identity: &Identity,
    ) -> Result<Subscription<InboxDelivery>, StoreError>;

    /// Deletes one entry. Unknown ids are ignored.
    async fn ack(&self, room: &RoomId, identity: &Identity, id: MessageId)
    -> Result<(), StoreError>;

    async fn clear_inbox(&self, room: &RoomId, identity: &Identity) -> Result<(), StoreError>;
}
