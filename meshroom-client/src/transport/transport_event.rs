use crate::media::RemoteTrack;
use meshroom_core::{IceCandidate, Identity};
use std::fmt;

/// Addresses one incarnation of a peer session.
///
/// A peer that leaves and comes back gets a new generation, so events still
/// in flight for the old connection cannot touch the new one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub identity: Identity,
    pub generation: u64,
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.identity, self.generation)
    }
}

/// Events a transport emits for the room's event loop.
#[derive(Debug)]
pub enum TransportEvent {
    /// Local ICE candidate to be relayed to the remote peer.
    CandidateGenerated(SessionKey, IceCandidate),

    /// The remote peer started sending a track.
    TrackArrived(SessionKey, RemoteTrack),

    /// The connection failed and will not recover by itself.
    Failed(SessionKey),
}

impl TransportEvent {
    pub fn key(&self) -> &SessionKey {
        match self {
            TransportEvent::CandidateGenerated(key, _)
            | TransportEvent::TrackArrived(key, _)
            | TransportEvent::Failed(key) => key,
        }
    }
}
