mod client;
mod library;
mod server;

use std::net::UdpSocket;
use std::time::Duration;

use rusty_enet as enet;

use super::types::{Delivery, PeerAddr};

pub use client::EnetClientTransport;
pub use library::EnetLibrary;
pub use server::EnetServerTransport;

/// Disconnect code sent on every graceful disconnect. The library reports
/// keepalive timeouts with code 0, which is how the two are told apart.
pub const DISCONNECT_GRACEFUL: u32 = 1;
pub const DISCONNECT_TIMEOUT: u32 = 0;

pub const RELIABLE_CHANNEL: u8 = 0;
pub const UNRELIABLE_CHANNEL: u8 = 1;

/// Unreliable traffic gets its own channel when the host has one to spare.
pub fn channel_for(delivery: Delivery, channel_count: usize) -> u8 {
    match delivery {
        Delivery::Unreliable if channel_count >= 2 => UNRELIABLE_CHANNEL,
        _ => RELIABLE_CHANNEL,
    }
}

/// How long a peer may go without acknowledging reliable traffic before
/// the library drops it. Defaults are ENet's own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerTimeout {
    pub limit: u32,
    pub minimum: Duration,
    pub maximum: Duration,
}

impl Default for PeerTimeout {
    fn default() -> Self {
        Self {
            limit: 32,
            minimum: Duration::from_millis(5000),
            maximum: Duration::from_millis(30000),
        }
    }
}

impl PeerTimeout {
    fn apply(&self, peer: &mut enet::Peer<UdpSocket>) {
        peer.set_timeout(
            self.limit,
            self.minimum.as_millis() as u32,
            self.maximum.as_millis() as u32,
        );
    }
}

fn make_packet(data: &[u8], delivery: Delivery) -> enet::Packet {
    match delivery {
        Delivery::Reliable => enet::Packet::reliable(data),
        Delivery::Unreliable => enet::Packet::unreliable(data),
    }
}

fn peer_addr(peer: &enet::Peer<UdpSocket>) -> PeerAddr {
    peer.address().map(PeerAddr::from).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_selection() {
        assert_eq!(channel_for(Delivery::Reliable, 2), RELIABLE_CHANNEL);
        assert_eq!(channel_for(Delivery::Unreliable, 2), UNRELIABLE_CHANNEL);
        assert_eq!(channel_for(Delivery::Unreliable, 4), UNRELIABLE_CHANNEL);
    }

    #[test]
    fn test_single_channel_falls_back_to_zero() {
        assert_eq!(channel_for(Delivery::Unreliable, 1), RELIABLE_CHANNEL);
        assert_eq!(channel_for(Delivery::Reliable, 1), RELIABLE_CHANNEL);
    }
}
