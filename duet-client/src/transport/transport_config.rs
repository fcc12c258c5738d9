use duet_core::IceServerConfig;
use duet_core::utils::{DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2};

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig::stun([DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2])],
        }
    }
}

impl TransportConfig {
    /// Uses the servers from `welcome`, falling back to public STUN when none were sent.
    pub fn from_welcome(ice_servers: Vec<IceServerConfig>) -> Self {
        if ice_servers.is_empty() {
            return Self::default();
        }
        Self { ice_servers }
    }
}
