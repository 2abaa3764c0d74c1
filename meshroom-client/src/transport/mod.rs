mod peer_transport;
mod transport_config;
mod transport_event;
mod webrtc_transport;

pub use peer_transport::{PeerTransport, TransportContext, TransportFactory};
pub use transport_config::TransportConfig;
pub use transport_event::{SessionKey, TransportEvent};
pub use webrtc_transport::{WebrtcTransport, WebrtcTransportFactory};
