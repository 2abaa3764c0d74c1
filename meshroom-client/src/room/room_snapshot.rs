use crate::media::RemoteStream;
use crate::session::{NegotiationState, SessionRole};
use meshroom_core::{Identity, Participant};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionView {
    pub role: SessionRole,
    pub state: NegotiationState,
}

/// Read-only projection of a room, republished after every presence change,
/// negotiation step and track arrival.
#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    pub local_identity: Identity,
    pub participants: BTreeMap<Identity, Participant>,
    pub remote_streams: BTreeMap<Identity, RemoteStream>,
    pub sessions: BTreeMap<Identity, SessionView>,
    /// Set once the room has left and released every session.
    pub closed: bool,
}

impl RoomSnapshot {
    pub fn new(local_identity: Identity) -> Self {
        Self {
            local_identity,
            participants: BTreeMap::new(),
            remote_streams: BTreeMap::new(),
            sessions: BTreeMap::new(),
            closed: false,
        }
    }

    pub fn session(&self, identity: &Identity) -> Option<SessionView> {
        self.sessions.get(identity).copied()
    }

    pub fn state_of(&self, identity: &Identity) -> Option<NegotiationState> {
        self.session(identity).map(|s| s.state)
    }

    /// Remote participants, excluding the local one.
    pub fn peers(&self) -> impl Iterator<Item = &Participant> {
        self.participants
            .values()
            .filter(|p| p.id != self.local_identity)
    }
}
