use super::enet::{EnetClientTransport, EnetServerTransport};
use super::transport::TransportError;
use super::types::{DEFAULT_MAX_CLIENTS, DEFAULT_PORT, SERVER_CHANNEL_COUNT};

#[derive(Debug, Clone)]
pub struct ServerNetworkConfig {
    pub port: u16,
    pub max_clients: usize,
    pub channel_count: usize,
}

impl Default for ServerNetworkConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_clients: DEFAULT_MAX_CLIENTS,
            channel_count: SERVER_CHANNEL_COUNT,
        }
    }
}

/// Builds the default server transport. The channel count is always forced
/// to `SERVER_CHANNEL_COUNT` so unreliable traffic keeps its own channel.
pub fn create_server_transport(
    config: &ServerNetworkConfig,
) -> Result<EnetServerTransport, TransportError> {
    if config.channel_count != SERVER_CHANNEL_COUNT {
        log::warn!(
            "Server transport requested {} channels, using {}",
            config.channel_count,
            SERVER_CHANNEL_COUNT
        );
    }

    EnetServerTransport::bind(config.port, config.max_clients, SERVER_CHANNEL_COUNT)
}

pub fn create_client_transport() -> EnetClientTransport {
    EnetClientTransport::new()
}
