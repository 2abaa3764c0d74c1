use crate::media::{LocalMedia, MediaKind};
use tokio::sync::oneshot;

/// Commands a [`RoomHandle`](crate::RoomHandle) sends to the room actor.
#[derive(Debug)]
pub enum RoomCommand {
    /// New local capture, pushed to every live session without renegotiation.
    ReplaceMedia(LocalMedia),

    /// Mute or unmute one media kind.
    SetTrackEnabled { kind: MediaKind, enabled: bool },

    /// Tear the room down; `done` fires once the store is cleaned up.
    Leave { done: oneshot::Sender<()> },
}
