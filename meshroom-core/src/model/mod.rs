mod identity;
mod participant;
mod relay;
mod room;
mod signaling;

pub use identity::Identity;
pub use participant::{Participant, PresenceUpdate};
pub use relay::{RelayEvent, RelayOp, RelayRequest};
pub use room::RoomId;
pub use signaling::{
    IceCandidate, IceServerConfig, InboxDelivery, MessageId, SdpKind, SessionDescription, Signal,
    SignalMessage,
};
