//! Mesh orchestration for one participant of a WebRTC room.
//!
//! [`RoomHandle::join`] registers presence, then keeps one [`PeerSession`]
//! per remote participant, negotiating through the relay mailbox.

mod error;
pub mod media;
pub mod relay;
pub mod room;
pub mod session;
pub mod signaling;
pub mod transport;

pub use error::RoomError;
pub use media::{LocalMedia, MediaKind, RemoteStream, RemoteTrack};
pub use relay::RelayClient;
pub use room::{MeshRoom, RoomCommand, RoomDeps, RoomHandle, RoomOptions, RoomSnapshot, SessionView};
pub use session::{
    CandidateQueue, Handled, IgnoreReason, NegotiationInput, NegotiationState, PeerSession,
    SessionRole, Transition,
};
pub use signaling::{MailboxOutput, SignalingOutput};
pub use transport::{
    PeerTransport, SessionKey, TransportConfig, TransportContext, TransportEvent,
    TransportFactory, WebrtcTransport, WebrtcTransportFactory,
};
