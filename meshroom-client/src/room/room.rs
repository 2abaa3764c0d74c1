use crate::error::RoomError;
use crate::media::{LocalMedia, MediaKind};
use crate::room::room_command::RoomCommand;
use crate::room::room_options::{RoomDeps, RoomOptions};
use crate::room::room_snapshot::{RoomSnapshot, SessionView};
use crate::session::{Handled, PeerSession, SessionRole};
use crate::signaling::{MailboxOutput, SignalingOutput};
use crate::transport::{SessionKey, TransportContext, TransportEvent, TransportFactory};
use meshroom_core::{
    Identity, InboxDelivery, Participant, PresenceRegistry, PresenceUpdate, RelayMailbox, RoomId,
    Signal, SignalMessage, Subscription,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

/// Mesh orchestrator for one room.
///
/// A single task owns every [`PeerSession`] and processes presence updates,
/// inbox deliveries, transport events and UI commands one at a time.
pub struct MeshRoom {
    room: RoomId,
    identity: Identity,
    presence: Arc<dyn PresenceRegistry>,
    mailbox: Arc<dyn RelayMailbox>,
    output: Arc<dyn SignalingOutput>,
    transports: Arc<dyn TransportFactory>,
    media: LocalMedia,
    sessions: HashMap<Identity, PeerSession>,
    participants: BTreeMap<Identity, Participant>,
    /// Left in the latest presence update. Late signals from them are
    /// dropped without a roster read.
    departed: HashSet<Identity>,
    next_generation: u64,
    presence_feed: Subscription<PresenceUpdate>,
    inbox_feed: Subscription<InboxDelivery>,
    command_rx: mpsc::Receiver<RoomCommand>,
    transport_rx: mpsc::Receiver<TransportEvent>,
    transport_tx: mpsc::Sender<TransportEvent>,
    snapshot_tx: watch::Sender<RoomSnapshot>,
}

impl MeshRoom {
    /// Registers presence, opens both feeds and offers to everyone already
    /// in the room. The returned room still has to be driven by [`run`].
    ///
    /// [`run`]: MeshRoom::run
    pub async fn start(
        options: RoomOptions,
        deps: RoomDeps,
        command_rx: mpsc::Receiver<RoomCommand>,
    ) -> Result<(Self, watch::Receiver<RoomSnapshot>), RoomError> {
        let RoomOptions {
            room,
            display_name,
            identity,
            media,
            transport_capacity,
            ..
        } = options;
        let RoomDeps {
            presence,
            mailbox,
            transports,
        } = deps;
        let identity = identity.unwrap_or_else(Identity::generate);

        presence.join(&room, &identity, &display_name).await?;
        info!("{} joined {} as {:?}", identity, room, display_name);

        let feeds = async {
            let roster = presence.list_participants(&room).await?;
            let presence_feed = presence.subscribe(&room).await?;
            let inbox_feed = mailbox.subscribe_inbox(&room, &identity).await?;
            Ok::<_, RoomError>((roster, presence_feed, inbox_feed))
        };
        let (roster, presence_feed, inbox_feed) = match feeds.await {
            Ok(feeds) => feeds,
            Err(e) => {
                if let Err(leave_err) = presence.leave(&room, &identity).await {
                    warn!("Failed to leave {} after aborted join: {}", room, leave_err);
                }
                return Err(e);
            }
        };

        let output: Arc<dyn SignalingOutput> = Arc::new(MailboxOutput::new(
            mailbox.clone(),
            room.clone(),
            identity.clone(),
            display_name,
        ));
        let (transport_tx, transport_rx) = mpsc::channel(transport_capacity);
        let (snapshot_tx, snapshot_rx) = watch::channel(RoomSnapshot::new(identity.clone()));

        let mut this = Self {
            room,
            identity,
            presence,
            mailbox,
            output,
            transports,
            media,
            sessions: HashMap::new(),
            participants: BTreeMap::new(),
            departed: HashSet::new(),
            next_generation: 0,
            presence_feed,
            inbox_feed,
            command_rx,
            transport_rx,
            transport_tx,
            snapshot_tx,
        };

        // Everyone already here gets an offer from us; later joiners offer to us.
        for participant in roster {
            let remote = participant.id.clone();
            this.participants.insert(remote.clone(), participant);
            if remote == this.identity {
                continue;
            }
            this.initiate_session(remote).await;
        }
        this.publish();

        Ok((this, snapshot_rx))
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub async fn run(mut self) {
        info!("Room {} event loop started for {}", self.room, self.identity);
        let mut leave_ack: Option<oneshot::Sender<()>> = None;

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(RoomCommand::Leave { done }) => {
                            leave_ack = Some(done);
                            break;
                        }
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("Command channel closed. Leaving room.");
                            break;
                        }
                    }
                }

                update = self.presence_feed.recv() => {
                    match update {
                        Some(u) => self.handle_presence(u).await,
                        None => {
                            error!("Presence feed closed by the store");
                            break;
                        }
                    }
                }

                delivery = self.inbox_feed.recv() => {
                    match delivery {
                        Some(d) => self.handle_delivery(d).await,
                        None => {
                            error!("Inbox feed closed by the store");
                            break;
                        }
                    }
                }

                Some(evt) = self.transport_rx.recv() => {
                    self.handle_transport_event(evt).await;
                }
            }
        }

        self.shutdown().await;
        if let Some(done) = leave_ack {
            let _ = done.send(());
        }
        info!("Room {} event loop finished", self.room);
    }

    async fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::ReplaceMedia(media) => {
                self.media = media;
                for session in self.sessions.values_mut() {
                    if let Err(e) = session.replace_media(&self.media).await {
                        warn!("Track replacement failed for {}: {:?}", session.key(), e);
                    }
                }
            }

            RoomCommand::SetTrackEnabled { kind, enabled } => {
                if !self.media.set_enabled(kind, enabled) {
                    warn!("No local {} track to toggle", kind);
                    return;
                }
                self.apply_track_enabled(kind, enabled).await;
            }

            RoomCommand::Leave { .. } => {}
        }
    }

    async fn apply_track_enabled(&mut self, kind: MediaKind, enabled: bool) {
        for session in self.sessions.values_mut() {
            if let Err(e) = session.set_track_enabled(kind, enabled).await {
                warn!("Failed to toggle {} for {}: {:?}", kind, session.key(), e);
            }
        }
    }

    /// Each update is the full participant set.
    async fn handle_presence(&mut self, update: PresenceUpdate) {
        let present: HashSet<Identity> = update.iter().map(|p| p.id.clone()).collect();

        let mut departed: HashSet<Identity> = self
            .participants
            .keys()
            .filter(|id| !present.contains(*id))
            .cloned()
            .collect();
        self.participants = update.into_iter().map(|p| (p.id.clone(), p)).collect();

        let mut gone = Vec::new();
        for (id, session) in self.sessions.iter_mut() {
            if present.contains(id) {
                session.mark_present();
            } else if session.is_present() {
                gone.push(id.clone());
            }
        }
        for id in gone {
            departed.insert(id.clone());
            self.close_session(&id).await;
        }
        self.departed = departed;

        self.publish();
    }

    async fn handle_delivery(&mut self, delivery: InboxDelivery) {
        let InboxDelivery { id, message } = delivery;

        if message.sender == self.identity {
            debug!("Ignoring {} from ourselves", message.signal.kind());
        } else {
            self.handle_signal(message).await;
        }

        // Acknowledge only after the signal has been acted upon.
        if let Err(e) = self.mailbox.ack(&self.room, &self.identity, id).await {
            warn!("Failed to acknowledge inbox entry {}: {}", id, e);
        }
    }

    async fn handle_signal(&mut self, message: SignalMessage) {
        let SignalMessage {
            signal,
            sender,
            sender_name,
        } = message;
        let kind = signal.kind();

        if !self.sessions.contains_key(&sender) {
            if self.departed.contains(&sender) {
                debug!("Dropping {} from departed {}", kind, sender);
                return;
            }
            if matches!(signal, Signal::Answer(_)) {
                debug!("Dropping answer from {} with no session", sender);
                return;
            }
            if !self.participants.contains_key(&sender) {
                // The presence feed may lag behind the inbox.
                match self.presence.list_participants(&self.room).await {
                    Ok(roster) if roster.iter().any(|p| p.id == sender) => {}
                    Ok(_) => {
                        debug!("Dropping {} from {}, not in {}", kind, sender, self.room);
                        return;
                    }
                    Err(e) => {
                        warn!("Roster read for {} failed, dropping {}: {}", sender, kind, e);
                        return;
                    }
                }
            }
            info!("First contact from {} ({})", sender, sender_name);
            if let Err(e) = self.open_session(sender.clone(), SessionRole::Answerer).await {
                error!("Failed to create session for {}: {:?}", sender, e);
                return;
            }
        }

        let Some(session) = self.sessions.get_mut(&sender) else {
            return;
        };
        match session.handle_signal(signal, self.output.as_ref()).await {
            Ok(Handled::Ignored(reason)) => {
                info!("Ignored {} from {}: {:?}", kind, session.key(), reason);
            }
            Ok(Handled::Queued) => debug!("Queued candidate from {}", session.key()),
            Ok(Handled::Applied) => {}
            Err(e) => {
                warn!("Negotiation with {} failed: {:?}", sender, e);
                self.fail_session(&sender).await;
            }
        }

        self.publish();
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        let current = self
            .sessions
            .get(&event.key().identity)
            .map(|s| s.generation());
        if current != Some(event.key().generation) {
            debug!("Dropping transport event for stale session {}", event.key());
            return;
        }

        match event {
            TransportEvent::CandidateGenerated(key, candidate) => {
                if let Err(e) = self
                    .output
                    .send_signal(&key.identity, Signal::Candidate(candidate))
                    .await
                {
                    warn!("Failed to send candidate to {}: {}", key, e);
                }
            }

            TransportEvent::TrackArrived(key, track) => {
                let Some(session) = self.sessions.get_mut(&key.identity) else {
                    return;
                };
                info!("Remote {} track from {}", track.kind(), key);
                if session.add_remote_track(track) {
                    self.publish();
                }
            }

            TransportEvent::Failed(key) => {
                warn!("Transport for {} failed", key);
                self.fail_session(&key.identity).await;
                self.publish();
            }
        }
    }

    async fn initiate_session(&mut self, remote: Identity) {
        if let Err(e) = self.open_session(remote.clone(), SessionRole::Initiator).await {
            error!("Failed to create session for {}: {:?}", remote, e);
            return;
        }
        let Some(session) = self.sessions.get_mut(&remote) else {
            return;
        };
        if let Err(e) = session.initiate(self.output.as_ref()).await {
            warn!("Failed to send offer to {}: {:?}", remote, e);
            self.fail_session(&remote).await;
        }
    }

    async fn open_session(&mut self, remote: Identity, role: SessionRole) -> anyhow::Result<()> {
        self.next_generation += 1;
        let key = SessionKey {
            identity: remote.clone(),
            generation: self.next_generation,
        };

        let transport = self
            .transports
            .create(TransportContext {
                local: self.identity.clone(),
                key: key.clone(),
                media: self.media.clone(),
                events: self.transport_tx.clone(),
            })
            .await?;

        let mut session = PeerSession::new(key, role, transport);
        if self.participants.contains_key(&remote) {
            session.mark_present();
        }

        debug!("Opened {:?} session {}", role, session.key());
        if let Some(mut previous) = self.sessions.insert(remote, session) {
            previous.close().await;
        }
        Ok(())
    }

    async fn close_session(&mut self, remote: &Identity) {
        if let Some(mut session) = self.sessions.remove(remote) {
            session.close().await;
        }
    }

    async fn fail_session(&mut self, remote: &Identity) {
        if let Some(mut session) = self.sessions.remove(remote) {
            session.fail().await;
        }
    }

    async fn shutdown(&mut self) {
        // Stop both feeds before releasing anything they could touch.
        self.presence_feed.unsubscribe();
        self.inbox_feed.unsubscribe();

        for (_, mut session) in self.sessions.drain() {
            session.close().await;
        }

        if let Err(e) = self.presence.leave(&self.room, &self.identity).await {
            warn!("Failed to leave {}: {}", self.room, e);
        }
        if let Err(e) = self.mailbox.clear_inbox(&self.room, &self.identity).await {
            warn!("Failed to clear inbox in {}: {}", self.room, e);
        }

        self.participants.clear();
        let mut last = RoomSnapshot::new(self.identity.clone());
        last.closed = true;
        self.snapshot_tx.send_replace(last);
        info!("{} left {}", self.identity, self.room);
    }

    fn publish(&self) {
        let mut snapshot = RoomSnapshot::new(self.identity.clone());
        snapshot.participants = self.participants.clone();
        for (id, session) in &self.sessions {
            snapshot.sessions.insert(
                id.clone(),
                SessionView {
                    role: session.role(),
                    state: session.state(),
                },
            );
            if let Some(stream) = session.stream() {
                snapshot.remote_streams.insert(id.clone(), stream.clone());
            }
        }
        self.snapshot_tx.send_replace(snapshot);
    }
}
