use crate::signaling::SignalingOutput;
use async_trait::async_trait;
use meshroom_core::{Identity, RelayMailbox, RoomId, Signal, SignalMessage, StoreError};
use std::sync::Arc;
use tracing::debug;

/// Delivers signals through the recipient's relay inbox, stamped with the
/// local identity and display name.
pub struct MailboxOutput {
    mailbox: Arc<dyn RelayMailbox>,
    room: RoomId,
    sender: Identity,
    sender_name: String,
}

impl MailboxOutput {
    pub fn new(
        mailbox: Arc<dyn RelayMailbox>,
        room: RoomId,
        sender: Identity,
        sender_name: impl Into<String>,
    ) -> Self {
        Self {
            mailbox,
            room,
            sender,
            sender_name: sender_name.into(),
        }
    }
}

#[async_trait]
impl SignalingOutput for MailboxOutput {
    async fn send_signal(&self, to: &Identity, signal: Signal) -> Result<(), StoreError> {
        debug!("Sending {} to {} in {}", signal.kind(), to, self.room);
        let message = SignalMessage::new(signal, self.sender.clone(), self.sender_name.clone());
        self.mailbox.send_to(&self.room, to, message).await
    }
}
