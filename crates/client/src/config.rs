use std::time::Duration;

use karma::net::{DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_PORT};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub connect_timeout_ms: u32,
    pub location_rate: u32,
    /// Sent once, to everyone, after the first spawn.
    pub chat: Option<String>,
    pub fire_shot: bool,
    /// Run until the server drops us when unset.
    pub duration: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            name: "bot".to_string(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            location_rate: 20,
            chat: None,
            fire_shot: false,
            duration: None,
        }
    }
}

impl ClientConfig {
    pub fn location_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.location_rate.max(1) as f64)
    }
}
