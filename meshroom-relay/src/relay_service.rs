use dashmap::DashMap;
use meshroom_core::{
    Identity, MemoryStore, PresenceRegistry, RelayEvent, RelayMailbox, RelayOp, RelayRequest,
    RoomId, StoreConnection, StoreError,
};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

pub type SocketId = u64;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind: SocketAddr,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, 8787)),
        }
    }
}

struct RelayInner {
    store: MemoryStore,
    sockets: DashMap<SocketId, Arc<RelaySocket>>,
    next_socket: AtomicU64,
}

#[derive(Clone)]
pub struct RelayService {
    inner: Arc<RelayInner>,
}

impl Default for RelayService {
    fn default() -> Self {
        Self::new(MemoryStore::new())
    }
}

impl RelayService {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            inner: Arc::new(RelayInner {
                store,
                sockets: DashMap::new(),
                next_socket: AtomicU64::new(1),
            }),
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.inner.store
    }

    pub fn socket_count(&self) -> usize {
        self.inner.sockets.len()
    }

    /// Opens a store connection for a freshly accepted socket. Frames for
    /// the client are pushed into `tx`.
    pub fn open_socket(&self, tx: mpsc::UnboundedSender<String>) -> Arc<RelaySocket> {
        let id = self.inner.next_socket.fetch_add(1, Ordering::SeqCst);
        let socket = Arc::new(RelaySocket {
            id,
            conn: self.inner.store.connect(),
            outgoing: tx,
            watches: DashMap::new(),
        });
        self.inner.sockets.insert(id, socket.clone());
        info!("Relay socket {} opened", id);
        socket
    }

    /// Stops the socket's feeds and fires its disconnect rules.
    pub fn close_socket(&self, socket: &RelaySocket) {
        self.inner.sockets.remove(&socket.id);
        socket.close();
        info!("Relay socket {} closed", socket.id);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum WatchKey {
    Presence(RoomId),
    Inbox(RoomId, Identity),
}

/// One client's view of the store.
pub struct RelaySocket {
    id: SocketId,
    conn: StoreConnection,
    outgoing: mpsc::UnboundedSender<String>,
    watches: DashMap<WatchKey, JoinHandle<()>>,
}

impl RelaySocket {
    pub fn id(&self) -> SocketId {
        self.id
    }

    /// Executes one request and returns its reply.
    pub async fn handle(&self, request: RelayRequest) -> RelayEvent {
        let request_id = request.request_id;
        match self.execute(request_id, request.op).await {
            Ok(reply) => reply,
            Err(e) => {
                debug!("Request {} on socket {} failed: {}", request_id, self.id, e);
                RelayEvent::failed(request_id, e.to_string())
            }
        }
    }

    pub fn push(&self, event: &RelayEvent) {
        push_frame(&self.outgoing, event);
    }

    async fn execute(&self, request_id: u64, op: RelayOp) -> Result<RelayEvent, StoreError> {
        match op {
            RelayOp::Join {
                room,
                identity,
                display_name,
            } => {
                let participant = self.conn.join(&room, &identity, &display_name).await?;
                Ok(RelayEvent::Reply {
                    request_id,
                    participant: Some(participant),
                    participants: None,
                    error: None,
                })
            }

            RelayOp::Leave { room, identity } => {
                self.conn.leave(&room, &identity).await?;
                Ok(RelayEvent::ok(request_id))
            }

            RelayOp::List { room } => {
                let participants = self.conn.list_participants(&room).await?;
                Ok(RelayEvent::Reply {
                    request_id,
                    participant: None,
                    participants: Some(participants),
                    error: None,
                })
            }

            RelayOp::WatchPresence { room } => {
                let mut feed = self.conn.subscribe(&room).await?;
                let tx = self.outgoing.clone();
                let feed_room = room.clone();
                let task = tokio::spawn(async move {
                    while let Some(participants) = feed.recv().await {
                        let event = RelayEvent::Presence {
                            room: feed_room.clone(),
                            participants,
                        };
                        if !push_frame(&tx, &event) {
                            break;
                        }
                    }
                });
                self.watch(WatchKey::Presence(room), task);
                Ok(RelayEvent::ok(request_id))
            }

            RelayOp::UnwatchPresence { room } => {
                self.unwatch(&WatchKey::Presence(room));
                Ok(RelayEvent::ok(request_id))
            }

            RelayOp::Send { room, to, message } => {
                self.conn.send_to(&room, &to, message).await?;
                Ok(RelayEvent::ok(request_id))
            }

            RelayOp::WatchInbox { room, identity } => {
                let mut feed = self.conn.subscribe_inbox(&room, &identity).await?;
                let tx = self.outgoing.clone();
                let (feed_room, feed_identity) = (room.clone(), identity.clone());
                let task = tokio::spawn(async move {
                    while let Some(delivery) = feed.recv().await {
                        let event = RelayEvent::Inbox {
                            room: feed_room.clone(),
                            identity: feed_identity.clone(),
                            delivery,
                        };
                        if !push_frame(&tx, &event) {
                            break;
                        }
                    }
                });
                self.watch(WatchKey::Inbox(room, identity), task);
                Ok(RelayEvent::ok(request_id))
            }

            RelayOp::UnwatchInbox { room, identity } => {
                self.unwatch(&WatchKey::Inbox(room, identity));
                Ok(RelayEvent::ok(request_id))
            }

            RelayOp::Ack { room, identity, id } => {
                self.conn.ack(&room, &identity, id).await?;
                Ok(RelayEvent::ok(request_id))
            }

            RelayOp::ClearInbox { room, identity } => {
                self.conn.clear_inbox(&room, &identity).await?;
                Ok(RelayEvent::ok(request_id))
            }
        }
    }

    /// A second watch on the same key replaces the first.
    fn watch(&self, key: WatchKey, task: JoinHandle<()>) {
        if let Some(previous) = self.watches.insert(key, task) {
            previous.abort();
        }
    }

    fn unwatch(&self, key: &WatchKey) {
        if let Some((_, task)) = self.watches.remove(key) {
            task.abort();
        }
    }

    fn close(&self) {
        for entry in self.watches.iter() {
            entry.value().abort();
        }
        self.watches.clear();
        self.conn.disconnect();
    }
}

fn push_frame(tx: &mpsc::UnboundedSender<String>, event: &RelayEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(json) => tx.send(json).is_ok(),
        Err(e) => {
            error!("Failed to serialize relay event: {}", e);
            false
        }
    }
}
