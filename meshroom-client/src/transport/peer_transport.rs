use crate::media::{LocalMedia, MediaKind};
use crate::transport::transport_event::{SessionKey, TransportEvent};
use anyhow::Result;
use async_trait::async_trait;
use meshroom_core::{IceCandidate, Identity, SessionDescription};
use tokio::sync::mpsc;

/// The media connection behind one peer session.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Create an offer and apply it as the local description.
    async fn create_offer(&self) -> Result<SessionDescription>;

    /// Create an answer and apply it as the local description.
    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    async fn has_remote_description(&self) -> bool;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    /// Swap outgoing tracks without renegotiating.
    async fn replace_media(&mut self, media: &LocalMedia) -> Result<()>;

    async fn set_track_enabled(&mut self, kind: MediaKind, enabled: bool) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

pub struct TransportContext {
    pub local: Identity,
    pub key: SessionKey,
    pub media: LocalMedia,
    pub events: mpsc::Sender<TransportEvent>,
}

#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(&self, ctx: TransportContext) -> Result<Box<dyn PeerTransport>>;
}
