mod candidate_queue;
mod negotiation;
mod peer_session;

pub use candidate_queue::CandidateQueue;
pub use negotiation::{IgnoreReason, NegotiationInput, NegotiationState, Transition};
pub use peer_session::{Handled, PeerSession, SessionRole};
