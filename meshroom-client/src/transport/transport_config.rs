use meshroom_core::IceServerConfig;
use meshroom_core::utils::{DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2};

/// Configuration for WebRTC peer connections.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![
                IceServerConfig::stun(DEFAULT_STUN_ADDR),
                IceServerConfig::stun(DEFAULT_STUN_ADDR_2),
            ],
        }
    }
}
