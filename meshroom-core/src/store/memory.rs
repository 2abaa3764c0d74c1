use crate::error::StoreError;
use crate::model::{
    Identity, InboxDelivery, MessageId, Participant, PresenceUpdate, RoomId, SignalMessage,
};
use crate::store::Subscription;
use crate::traits::{PresenceRegistry, RelayMailbox};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, info};

type ConnectionId = u64;
type WatcherId = u64;

/// In-process presence registry and relay mailbox.
///
/// All state lives behind one lock so that a disconnect erases a client's
/// participant record and inbox in a single step. Clients talk to it through
/// [`StoreConnection`]s; dropping the last clone of a connection behaves like
/// a crashed browser tab.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

#[derive(Default)]
struct StoreState {
    rooms: HashMap<RoomId, RoomRecord>,
    connections: HashMap<ConnectionId, ConnectionRecord>,
    next_connection: ConnectionId,
    next_watcher: WatcherId,
    next_message: u64,
}

#[derive(Default)]
struct RoomRecord {
    participants: HashMap<Identity, Participant>,
    presence_watchers: HashMap<WatcherId, Watcher<PresenceUpdate>>,
    inboxes: HashMap<Identity, Inbox>,
}

#[derive(Default)]
struct Inbox {
    entries: VecDeque<InboxDelivery>,
    watchers: HashMap<WatcherId, Watcher<InboxDelivery>>,
}

struct Watcher<T> {
    owner: ConnectionId,
    tx: mpsc::UnboundedSender<T>,
}

/// Records erased when the owning connection drops.
#[derive(Default)]
struct ConnectionRecord {
    on_disconnect: Vec<(RoomId, Identity)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self) -> StoreConnection {
        let id = {
            let mut state = self.lock();
            let id = state.next_connection;
            state.next_connection += 1;
            state.connections.insert(id, ConnectionRecord::default());
            id
        };
        debug!("Store connection {} opened", id);

        StoreConnection {
            link: Arc::new(ConnectionLink {
                id,
                store: self.clone(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn participants(&self, room: &RoomId) -> Vec<Participant> {
        self.lock()
            .rooms
            .get(room)
            .map(RoomRecord::snapshot)
            .unwrap_or_default()
    }

    /// Number of rooms with participants, watchers or pending inbox entries.
    pub fn room_count(&self) -> usize {
        self.lock().rooms.len()
    }

    /// Number of entries waiting in an inbox.
    pub fn inbox_len(&self, room: &RoomId, identity: &Identity) -> usize {
        self.lock()
            .rooms
            .get(room)
            .and_then(|r| r.inboxes.get(identity))
            .map(|inbox| inbox.entries.len())
            .unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StoreState {
    fn allocate_watcher(&mut self) -> WatcherId {
        let id = self.next_watcher;
        self.next_watcher += 1;
        id
    }

    fn remove_participant(&mut self, room: &RoomId, identity: &Identity) {
        let Some(record) = self.rooms.get_mut(room) else {
            return;
        };
        if record.participants.remove(identity).is_some() {
            record.notify_presence();
        }
    }

    /// Drops idle inboxes, then the room itself once nothing is left in it.
    fn prune(&mut self, room: &RoomId) {
        let Some(record) = self.rooms.get_mut(room) else {
            return;
        };
        record.prune_inboxes();
        if record.is_idle() {
            debug!("Room {} is empty, dropping it", room);
            self.rooms.remove(room);
        }
    }

    fn disconnect(&mut self, conn: ConnectionId) {
        let Some(record) = self.connections.remove(&conn) else {
            return;
        };

        // The connection's own feeds end before its records are erased.
        for room in self.rooms.values_mut() {
            room.presence_watchers.retain(|_, w| w.owner != conn);
            for inbox in room.inboxes.values_mut() {
                inbox.watchers.retain(|_, w| w.owner != conn);
            }
        }

        for (room, identity) in record.on_disconnect {
            info!("Connection {} dropped, erasing {} from room {}", conn, identity, room);
            self.remove_participant(&room, &identity);
            if let Some(record) = self.rooms.get_mut(&room) {
                record.inboxes.remove(&identity);
            }
        }

        self.rooms.retain(|_, record| {
            record.prune_inboxes();
            !record.is_idle()
        });
    }
}

impl RoomRecord {
    fn snapshot(&self) -> PresenceUpdate {
        let mut participants: Vec<Participant> = self.participants.values().cloned().collect();
        participants.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then_with(|| a.id.cmp(&b.id)));
        participants
    }

    fn is_idle(&self) -> bool {
        self.participants.is_empty() && self.presence_watchers.is_empty() && self.inboxes.is_empty()
    }

    fn prune_inboxes(&mut self) {
        self.inboxes
            .retain(|_, inbox| !inbox.entries.is_empty() || !inbox.watchers.is_empty());
    }

    fn notify_presence(&mut self) {
        let snapshot = self.snapshot();
        self.presence_watchers
            .retain(|_, w| w.tx.send(snapshot.clone()).is_ok());
    }
}

struct ConnectionLink {
    id: ConnectionId,
    store: MemoryStore,
    closed: AtomicBool,
}

impl ConnectionLink {
    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("Store connection {} closed", self.id);
        self.store.lock().disconnect(self.id);
    }
}

impl Drop for ConnectionLink {
    fn drop(&mut self) {
        self.close();
    }
}

/// One client's session with a [`MemoryStore`].
///
/// Clones share the session; the disconnect rules fire on
/// [`StoreConnection::disconnect`] or when the last clone is dropped.
#[derive(Clone)]
pub struct StoreConnection {
    link: Arc<ConnectionLink>,
}

impl StoreConnection {
    pub fn disconnect(&self) {
        self.link.close();
    }

    pub fn is_connected(&self) -> bool {
        !self.link.closed.load(Ordering::SeqCst)
    }

    fn state(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        if !self.is_connected() {
            return Err(StoreError::Disconnected);
        }
        Ok(self.link.store.lock())
    }
}

#[async_trait]
impl PresenceRegistry for StoreConnection {
    async fn join(
        &self,
        room: &RoomId,
        identity: &Identity,
        display_name: &str,
    ) -> Result<Participant, StoreError> {
        let mut state = self.state()?;
        let participant = Participant::new(identity.clone(), display_name);

        if let Some(conn) = state.connections.get_mut(&self.link.id) {
            let rule = (room.clone(), identity.clone());
            if !conn.on_disconnect.contains(&rule) {
                conn.on_disconnect.push(rule);
            }
        }

        let record = state.rooms.entry(room.clone()).or_default();
        record
            .participants
            .insert(identity.clone(), participant.clone());
        record.notify_presence();

        Ok(participant)
    }

    async fn list_participants(&self, room: &RoomId) -> Result<Vec<Participant>, StoreError> {
        let state = self.state()?;
        Ok(state.rooms.get(room).map(RoomRecord::snapshot).unwrap_or_default())
    }

    async fn subscribe(&self, room: &RoomId) -> Result<Subscription<PresenceUpdate>, StoreError> {
        let mut state = self.state()?;
        let watcher = state.allocate_watcher();
        let (tx, rx) = mpsc::unbounded_channel();

        let record = state.rooms.entry(room.clone()).or_default();
        let _ = tx.send(record.snapshot());
        record.presence_watchers.insert(
            watcher,
            Watcher {
                owner: self.link.id,
                tx,
            },
        );

        let store = self.link.store.clone();
        let room = room.clone();
        Ok(Subscription::new(rx, move || {
            let mut state = store.lock();
            if let Some(record) = state.rooms.get_mut(&room) {
                record.presence_watchers.remove(&watcher);
            }
            state.prune(&room);
        }))
    }

    async fn leave(&self, room: &RoomId, identity: &Identity) -> Result<(), StoreError> {
        let mut state = self.state()?;
        if let Some(conn) = state.connections.get_mut(&self.link.id) {
            conn.on_disconnect
                .retain(|(r, id)| !(r == room && id == identity));
        }
        state.remove_participant(room, identity);
        state.prune(room);
        Ok(())
    }
}

#[async_trait]
impl RelayMailbox for StoreConnection {
    async fn send_to(
        &self,
        room: &RoomId,
        recipient: &Identity,
        message: SignalMessage,
    ) -> Result<(), StoreError> {
        let mut state = self.state()?;
        let id = MessageId(state.next_message);

        // Mail is only kept for current participants.
        let Some(record) = state
            .rooms
            .get_mut(room)
            .filter(|r| r.participants.contains_key(recipient))
        else {
            debug!(
                "Dropping {} for {}, not in room {}",
                message.signal.kind(),
                recipient,
                room
            );
            return Ok(());
        };

        let inbox = record.inboxes.entry(recipient.clone()).or_default();
        let delivery = InboxDelivery { id, message };
        inbox
            .watchers
            .retain(|_, w| w.tx.send(delivery.clone()).is_ok());
        inbox.entries.push_back(delivery);
        state.next_message += 1;

        Ok(())
    }

    async fn subscribe_inbox(
        &self,
        room: &RoomId,
        identity: &Identity,
    ) -> Result<Subscription<InboxDelivery>, StoreError> {
        let mut state = self.state()?;
        let watcher = state.allocate_watcher();
        let (tx, rx) = mpsc::unbounded_channel();

        let inbox = state
            .rooms
            .entry(room.clone())
            .or_default()
            .inboxes
            .entry(identity.clone())
            .or_default();
        for pending in &inbox.entries {
            let _ = tx.send(pending.clone());
        }
        inbox.watchers.insert(
            watcher,
            Watcher {
                owner: self.link.id,
                tx,
            },
        );

        let store = self.link.store.clone();
        let room = room.clone();
        let identity = identity.clone();
        Ok(Subscription::new(rx, move || {
            let mut state = store.lock();
            let inbox = state
                .rooms
                .get_mut(&room)
                .and_then(|r| r.inboxes.get_mut(&identity));
            if let Some(inbox) = inbox {
                inbox.watchers.remove(&watcher);
            }
            state.prune(&room);
        }))
    }

    async fn ack(
        &self,
        room: &RoomId,
        identity: &Identity,
        id: MessageId,
    ) -> Result<(), StoreError> {
        let mut state = self.state()?;
        let inbox = state
            .rooms
            .get_mut(room)
            .and_then(|r| r.inboxes.get_mut(identity));
        if let Some(inbox) = inbox {
            inbox.entries.retain(|entry| entry.id != id);
        }
        state.prune(room);
        Ok(())
    }

    async fn clear_inbox(&self, room: &RoomId, identity: &Identity) -> Result<(), StoreError> {
        let mut state = self.state()?;
        let inbox = state
            .rooms
            .get_mut(room)
            .and_then(|r| r.inboxes.get_mut(identity));
        if let Some(inbox) = inbox {
            inbox.entries.clear();
        }
        state.prune(room);
        Ok(())
    }
}
