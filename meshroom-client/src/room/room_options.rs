use crate::media::LocalMedia;
use crate::transport::TransportFactory;
use meshroom_core::{Identity, PresenceRegistry, RelayMailbox, RoomId};
use std::sync::Arc;

const DEFAULT_COMMAND_CAPACITY: usize = 100;
const DEFAULT_TRANSPORT_CAPACITY: usize = 256;

/// What the UI hands over when joining a room.
#[derive(Debug, Clone)]
pub struct RoomOptions {
    pub room: RoomId,
    pub display_name: String,
    /// Generated when absent.
    pub identity: Option<Identity>,
    pub media: LocalMedia,
    pub command_capacity: usize,
    pub transport_capacity: usize,
}

impl RoomOptions {
    pub fn new(room: impl Into<RoomId>, display_name: impl Into<String>) -> Self {
        Self {
            room: room.into(),
            display_name: display_name.into(),
            identity: None,
            media: LocalMedia::default(),
            command_capacity: DEFAULT_COMMAND_CAPACITY,
            transport_capacity: DEFAULT_TRANSPORT_CAPACITY,
        }
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_media(mut self, media: LocalMedia) -> Self {
        self.media = media;
        self
    }
}

/// Store and transport backends a room runs against.
#[derive(Clone)]
pub struct RoomDeps {
    pub presence: Arc<dyn PresenceRegistry>,
    pub mailbox: Arc<dyn RelayMailbox>,
    pub transports: Arc<dyn TransportFactory>,
}

impl RoomDeps {
    /// Uses one store connection for both presence and mailbox.
    pub fn new<S>(store: Arc<S>, transports: Arc<dyn TransportFactory>) -> Self
    where
        S: PresenceRegistry + RelayMailbox + 'static,
    {
        Self {
            presence: store.clone(),
            mailbox: store,
            transports,
        }
    }
}
