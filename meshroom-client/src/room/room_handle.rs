use crate::error::RoomError;
use crate::media::{LocalMedia, MediaKind};
use crate::room::room::MeshRoom;
use crate::room::room_command::RoomCommand;
use crate::room::room_options::{RoomDeps, RoomOptions};
use crate::room::room_snapshot::RoomSnapshot;
use meshroom_core::{Identity, RoomId};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::info;

/// UI-side handle to a running room.
///
/// Clones share the same room. When the last clone is dropped the room
/// leaves as if [`RoomHandle::leave`] had been called.
#[derive(Clone)]
pub struct RoomHandle {
    room: RoomId,
    identity: Identity,
    command_tx: mpsc::Sender<RoomCommand>,
    snapshot_rx: watch::Receiver<RoomSnapshot>,
}

impl RoomHandle {
    /// Joins the room and spawns its event loop.
    ///
    /// Returns once presence is registered, both feeds are open and offers
    /// have gone out to everyone already present.
    pub async fn join(options: RoomOptions, deps: RoomDeps) -> Result<Self, RoomError> {
        let (command_tx, command_rx) = mpsc::channel(options.command_capacity);
        let room = options.room.clone();

        let (mesh, snapshot_rx) = MeshRoom::start(options, deps, command_rx).await?;
        let identity = mesh.identity().clone();
        tokio::spawn(mesh.run());

        info!("Joined room {} as {}", room, identity);
        Ok(Self {
            room,
            identity,
            command_tx,
            snapshot_rx,
        })
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<RoomSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Waits for the first snapshot matching `pred`, including the current one.
    pub async fn wait_until<F>(&self, mut pred: F) -> Result<RoomSnapshot, RoomError>
    where
        F: FnMut(&RoomSnapshot) -> bool,
    {
        let mut rx = self.snapshot_rx.clone();
        let snapshot = rx
            .wait_for(|s| pred(s))
            .await
            .map_err(|_| RoomError::Closed)?;
        Ok(snapshot.clone())
    }

    pub async fn replace_media(&self, media: LocalMedia) -> Result<(), RoomError> {
        self.send(RoomCommand::ReplaceMedia(media)).await
    }

    pub async fn set_track_enabled(&self, kind: MediaKind, enabled: bool) -> Result<(), RoomError> {
        self.send(RoomCommand::SetTrackEnabled { kind, enabled })
            .await
    }

    /// Closes every session and removes the local participant and inbox.
    /// A room that already tore itself down counts as left.
    pub async fn leave(self) -> Result<(), RoomError> {
        let (done, finished) = oneshot::channel();
        if self.send(RoomCommand::Leave { done }).await.is_err() {
            return Ok(());
        }
        finished.await.map_err(|_| RoomError::Closed)
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.command_tx
            .send(cmd)
            .await
            .map_err(|_| RoomError::Closed)
    }
}
