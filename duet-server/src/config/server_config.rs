use crate::room::RoomConfig;
use anyhow::{Context, Result};
use duet_core::IceServerConfig;
use duet_core::utils::{DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Settings for the signaling server. Every field has a default, so a config
/// file only needs the keys it overrides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Advertised to clients in `welcome`. TURN entries carry credentials.
    pub ice_servers: Vec<IceServerConfig>,
    pub empty_room_grace_secs: u64,
    pub room_ttl_secs: u64,
    pub max_file_bytes: u64,
    pub room_channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let rooms = RoomConfig::default();
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3001)),
            ice_servers: vec![IceServerConfig::stun([DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2])],
            empty_room_grace_secs: rooms.empty_room_grace.as_secs(),
            room_ttl_secs: rooms.room_ttl.as_secs(),
            max_file_bytes: rooms.max_file_bytes,
            room_channel_capacity: rooms.channel_capacity,
        }
    }
}

impl ServerConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json_str(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.room_channel_capacity == 0 {
            anyhow::bail!("roomChannelCapacity must be positive");
        }
        if self.room_ttl_secs == 0 {
            anyhow::bail!("roomTtlSecs must be positive");
        }
        if self.ice_servers.iter().any(|s| s.urls.is_empty()) {
            anyhow::bail!("every ICE server needs at least one url");
        }
        Ok(())
    }

    /// Appends a TURN relay entry. Only the configuration point; the relay runs elsewhere.
    pub fn add_turn_server(&mut self, url: String, username: String, credential: String) {
        self.ice_servers.push(IceServerConfig {
            urls: vec![url],
            username: Some(username),
            credential: Some(credential),
        });
    }

    pub fn room_config(&self) -> RoomConfig {
        RoomConfig {
            empty_room_grace: Duration::from_secs(self.empty_room_grace_secs),
            room_ttl: Duration::from_secs(self.room_ttl_secs),
            max_file_bytes: self.max_file_bytes,
            channel_capacity: self.room_channel_capacity,
        }
    }
}
