use async_trait::async_trait;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use meshroom_core::{
    Identity, InboxDelivery, MessageId, Participant, PresenceRegistry, PresenceUpdate,
    RelayEvent, RelayMailbox, RelayOp, RelayRequest, RoomId, SignalMessage, StoreError,
    Subscription,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

type InboxKey = (RoomId, Identity);

/// Presence registry and relay mailbox backed by a remote relay server.
///
/// The WebSocket is the store connection: dropping every clone of the client
/// closes it, and the relay then erases whatever this client joined.
#[derive(Clone)]
pub struct RelayClient {
    inner: Arc<RelayInner>,
}

struct RelayInner {
    outgoing: mpsc::UnboundedSender<Message>,
    pending: DashMap<u64, oneshot::Sender<RelayEvent>>,
    presence_watchers: DashMap<RoomId, mpsc::UnboundedSender<PresenceUpdate>>,
    inbox_watchers: DashMap<InboxKey, mpsc::UnboundedSender<InboxDelivery>>,
    next_request: AtomicU64,
    closed: AtomicBool,
}

struct Reply {
    participant: Option<Participant>,
    participants: Option<Vec<Participant>>,
}

impl RelayClient {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let (mut ws_writer, mut ws_reader) = ws_stream.split();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
        let inner = Arc::new(RelayInner {
            outgoing: out_tx,
            pending: DashMap::new(),
            presence_watchers: DashMap::new(),
            inbox_watchers: DashMap::new(),
            next_request: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        });

        // Ends, and closes the socket, once the last client clone is gone.
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                if ws_writer.send(msg).await.is_err() {
                    break;
                }
            }
            let _ = ws_writer.close().await;
        });

        let weak = Arc::downgrade(&inner);
        tokio::spawn(async move {
            while let Some(frame) = ws_reader.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => continue,
                };
                let Some(inner) = weak.upgrade() else { break };
                match serde_json::from_str::<RelayEvent>(text.as_str()) {
                    Ok(event) => inner.dispatch(event),
                    Err(e) => warn!("Malformed relay frame: {}", e),
                }
            }

            if let Some(inner) = weak.upgrade() {
                inner.shut();
            }
            info!("Relay connection closed");
        });

        info!("Connected to relay at {}", url);
        Ok(Self { inner })
    }

    pub fn is_connected(&self) -> bool {
        !self.inner.closed.load(Ordering::SeqCst)
    }
}

impl RelayInner {
    fn dispatch(&self, event: RelayEvent) {
        match event {
            RelayEvent::Reply { request_id, .. } => {
                if let Some((_, tx)) = self.pending.remove(&request_id) {
                    let _ = tx.send(event);
                }
            }
            RelayEvent::Presence { room, participants } => {
                if let Some(tx) = self.presence_watchers.get(&room) {
                    let _ = tx.send(participants);
                }
            }
            RelayEvent::Inbox {
                room,
                identity,
                delivery,
            } => {
                if let Some(tx) = self.inbox_watchers.get(&(room, identity)) {
                    let _ = tx.send(delivery);
                }
            }
        }
    }

    /// Fails pending requests and ends every feed.
    fn shut(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.pending.clear();
        self.presence_watchers.clear();
        self.inbox_watchers.clear();
    }

    fn encode(&self, op: RelayOp) -> Result<(u64, Message), StoreError> {
        let request_id = self.next_request.fetch_add(1, Ordering::SeqCst);
        let json = serde_json::to_string(&RelayRequest { request_id, op })?;
        Ok((request_id, Message::Text(json.into())))
    }

    async fn request(&self, op: RelayOp) -> Result<Reply, StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Disconnected);
        }

        let (request_id, frame) = self.encode(op)?;
        let (tx, rx) = oneshot::channel();
        self.pending.insert(request_id, tx);
        if self.closed.load(Ordering::SeqCst) || self.outgoing.send(frame).is_err() {
            self.pending.remove(&request_id);
            return Err(StoreError::Disconnected);
        }

        match rx.await.map_err(|_| StoreError::Disconnected)? {
            RelayEvent::Reply {
                error: Some(error), ..
            } => Err(StoreError::Remote(error)),
            RelayEvent::Reply {
                participant,
                participants,
                ..
            } => Ok(Reply {
                participant,
                participants,
            }),
            other => Err(StoreError::Transport(format!(
                "unexpected reply frame: {:?}",
                other
            ))),
        }
    }

    /// Sends without waiting for the reply.
    fn notify(&self, op: RelayOp) {
        match self.encode(op) {
            Ok((request_id, frame)) => {
                if self.outgoing.send(frame).is_err() {
                    debug!("Relay gone before request {} went out", request_id);
                }
            }
            Err(e) => warn!("Failed to encode relay request: {}", e),
        }
    }
}

#[async_trait]
impl PresenceRegistry for RelayClient {
    async fn join(
        &self,
        room: &RoomId,
        identity: &Identity,
        display_name: &str,
    ) -> Result<Participant, StoreError> {
        let reply = self
            .inner
            .request(RelayOp::Join {
                room: room.clone(),
                identity: identity.clone(),
                display_name: display_name.to_owned(),
            })
            .await?;
        reply
            .participant
            .ok_or_else(|| StoreError::Transport("join reply without participant".into()))
    }

    async fn list_participants(&self, room: &RoomId) -> Result<Vec<Participant>, StoreError> {
        let reply = self
            .inner
            .request(RelayOp::List { room: room.clone() })
            .await?;
        Ok(reply.participants.unwrap_or_default())
    }

    async fn subscribe(&self, room: &RoomId) -> Result<Subscription<PresenceUpdate>, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        // Registered first so the initial push cannot overtake it.
        self.inner.presence_watchers.insert(room.clone(), tx);

        if let Err(e) = self
            .inner
            .request(RelayOp::WatchPresence { room: room.clone() })
            .await
        {
            self.inner.presence_watchers.remove(room);
            return Err(e);
        }

        let weak: Weak<RelayInner> = Arc::downgrade(&self.inner);
        let room = room.clone();
        Ok(Subscription::new(rx, move || {
            if let Some(inner) = weak.upgrade() {
                inner.presence_watchers.remove(&room);
                inner.notify(RelayOp::UnwatchPresence { room });
            }
        }))
    }

    async fn leave(&self, room: &RoomId, identity: &Identity) -> Result<(), StoreError> {
        self.inner
            .request(RelayOp::Leave {
                room: room.clone(),
                identity: identity.clone(),
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RelayMailbox for RelayClient {
    async fn send_to(
        &self,
        room: &RoomId,
        recipient: &Identity,
        message: SignalMessage,
    ) -> Result<(), StoreError> {
        self.inner
            .request(RelayOp::Send {
                room: room.clone(),
                to: recipient.clone(),
                message,
            })
            .await?;
        Ok(())
    }

    async fn subscribe_inbox(
        &self,
        room: &RoomId,
        identity: &Identity,
    ) -> Result<Subscription<InboxDelivery>, StoreError> {
        let key = (room.clone(), identity.clone());
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.inbox_watchers.insert(key.clone(), tx);

        if let Err(e) = self
            .inner
            .request(RelayOp::WatchInbox {
                room: room.clone(),
                identity: identity.clone(),
            })
            .await
        {
            self.inner.inbox_watchers.remove(&key);
            return Err(e);
        }

        let weak = Arc::downgrade(&self.inner);
        Ok(Subscription::new(rx, move || {
            if let Some(inner) = weak.upgrade() {
                inner.inbox_watchers.remove(&key);
                let (room, identity) = key;
                inner.notify(RelayOp::UnwatchInbox { room, identity });
            }
        }))
    }

    async fn ack(
        &self,
        room: &RoomId,
        identity: &Identity,
        id: MessageId,
    ) -> Result<(), StoreError> {
        self.inner
            .request(RelayOp::Ack {
                room: room.clone(),
                identity: identity.clone(),
                id,
            })
            .await?;
        Ok(())
    }

    async fn clear_inbox(&self, room: &RoomId, identity: &Identity) -> Result<(), StoreError> {
        self.inner
            .request(RelayOp::ClearInbox {
                room: room.clone(),
                identity: identity.clone(),
            })
            .await?;
        Ok(())
    }
}
