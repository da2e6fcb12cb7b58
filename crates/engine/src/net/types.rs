use std::fmt;
use std::net::IpAddr;

pub type ClientId = u32;

/// Opaque transport-level identifier for one peer connection.
pub type ConnectionHandle = usize;

/// Source id stamped on messages the server originates itself.
pub const SERVER_CLIENT_ID: ClientId = 0;
/// Destination id that addresses every connected client.
pub const BROADCAST_CLIENT_ID: ClientId = ClientId::MAX;
pub const FIRST_CLIENT_ID: ClientId = 1;

pub const PROTOCOL_VERSION: u32 = 1;
pub const DEFAULT_PORT: u16 = 5154;
pub const DEFAULT_MAX_CLIENTS: usize = 32;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u32 = 5000;

/// Channel count every server transport is created with.
pub const SERVER_CHANNEL_COUNT: usize = 2;

pub const DISCONNECTED_REASON: &str = "Disconnected from server.";
pub const TIMEOUT_REASON: &str = "Connection lost (timeout).";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Delivery {
    Reliable,
    Unreliable,
}

/// Address of the remote end of a connection as observed by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PeerAddr {
    pub ip: Option<IpAddr>,
    pub port: u16,
}

impl PeerAddr {
    pub fn new(ip: Option<IpAddr>, port: u16) -> Self {
        Self { ip, port }
    }

    pub fn ip_string(&self) -> Option<String> {
        self.ip.map(|ip| ip.to_string())
    }
}

impl From<std::net::SocketAddr> for PeerAddr {
    fn from(addr: std::net::SocketAddr) -> Self {
        Self {
            ip: Some(addr.ip()),
            port: addr.port(),
        }
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ip {
            Some(ip) => write!(f, "{}:{}", ip, self.port),
            None => write!(f, "<unknown>:{}", self.port),
        }
    }
}
