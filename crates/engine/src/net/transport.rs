use std::io;
use std::net::IpAddr;

use super::types::{ConnectionHandle, Delivery, PeerAddr};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Receive {
        connection: ConnectionHandle,
        payload: Vec<u8>,
    },
    Connect {
        connection: ConnectionHandle,
        peer: PeerAddr,
    },
    Disconnect {
        connection: ConnectionHandle,
        peer: PeerAddr,
    },
    DisconnectTimeout {
        connection: ConnectionHandle,
        peer: PeerAddr,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to create host: {0}")]
    HostCreation(String),
    #[error("could not resolve {host}:{port}")]
    Resolve { host: String, port: u16 },
    #[error("no available peers for a new connection")]
    NoAvailablePeers,
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Client side of a connection-oriented packet transport.
///
/// All operations except `connect` are non-blocking. Failures are logged
/// and absorbed; nothing here panics on an unknown or absent peer.
pub trait ClientTransport {
    fn connect(&mut self, host: &str, port: u16, timeout_ms: u32) -> bool;
    fn poll(&mut self, events: &mut Vec<Event>);
    fn send(&mut self, data: &[u8], delivery: Delivery, flush: bool);
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;
    fn remote_addr(&self) -> Option<PeerAddr>;

    fn remote_ip(&self) -> Option<IpAddr> {
        self.remote_addr().and_then(|addr| addr.ip)
    }

    fn remote_port(&self) -> Option<u16> {
        self.remote_addr().map(|addr| addr.port)
    }
}

/// Server side of a connection-oriented packet transport.
pub trait ServerTransport {
    fn poll(&mut self, events: &mut Vec<Event>);
    fn send(&mut self, connection: ConnectionHandle, data: &[u8], delivery: Delivery, flush: bool);
    fn disconnect(&mut self, connection: ConnectionHandle);
}

impl<T: ClientTransport + ?Sized> ClientTransport for Box<T> {
    fn connect(&mut self, host: &str, port: u16, timeout_ms: u32) -> bool {
        (**self).connect(host, port, timeout_ms)
    }

    fn poll(&mut self, events: &mut Vec<Event>) {
        (**self).poll(events)
    }

    fn send(&mut self, data: &[u8], delivery: Delivery, flush: bool) {
        (**self).send(data, delivery, flush)
    }

    fn disconnect(&mut self) {
        (**self).disconnect()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn remote_addr(&self) -> Option<PeerAddr> {
        (**self).remote_addr()
    }
}

impl<T: ServerTransport + ?Sized> ServerTransport for Box<T> {
    fn poll(&mut self, events: &mut Vec<Event>) {
        (**self).poll(events)
    }

    fn send(&mut self, connection: ConnectionHandle, data: &[u8], delivery: Delivery, flush: bool) {
        (**self).send(connection, data, delivery, flush)
    }

    fn disconnect(&mut self, connection: ConnectionHandle) {
        (**self).disconnect(connection)
    }
}
