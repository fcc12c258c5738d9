use std::time::Duration;

/// Per-room limits shared by every room the registry spawns.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// How long an empty room survives so a refreshing client can come back.
    pub empty_room_grace: Duration,
    /// Hard upper bound on a room's lifetime.
    pub room_ttl: Duration,
    pub max_file_bytes: u64,
    pub channel_capacity: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            empty_room_grace: Duration::from_secs(30),
            room_ttl: Duration::from_secs(24 * 60 * 60),
            max_file_bytes: 10 * 1024 * 1024,
            channel_capacity: 100,
        }
    }
}
