use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::thread;
use std::time::{Duration, Instant};

use rusty_enet as enet;

use super::{
    DISCONNECT_GRACEFUL, DISCONNECT_TIMEOUT, EnetLibrary, PeerTimeout, channel_for, make_packet,
    peer_addr,
};
use crate::net::transport::{ClientTransport, Event, TransportError};
use crate::net::types::{Delivery, PeerAddr};

const CLIENT_CHANNEL_COUNT: usize = 2;
const CONNECT_POLL_INTERVAL: Duration = Duration::from_millis(1);

pub struct EnetClientTransport {
    host: Option<enet::Host<UdpSocket>>,
    peer: Option<enet::PeerID>,
    remote: Option<PeerAddr>,
    connected: bool,
    closing: bool,
    timeout: PeerTimeout,
    _library: EnetLibrary,
}

impl Default for EnetClientTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl EnetClientTransport {
    pub fn new() -> Self {
        Self {
            host: None,
            peer: None,
            remote: None,
            connected: false,
            closing: false,
            timeout: PeerTimeout::default(),
            _library: EnetLibrary::acquire(),
        }
    }

    /// Applies to the current server peer and to every later connection.
    pub fn set_peer_timeout(&mut self, timeout: PeerTimeout) {
        self.timeout = timeout;
        if let (Some(host), Some(peer_id)) = (self.host.as_mut(), self.peer) {
            timeout.apply(host.peer_mut(peer_id));
        }
    }

    fn resolve(host: &str, port: u16) -> Result<SocketAddr, TransportError> {
        let resolve_error = || TransportError::Resolve {
            host: host.to_string(),
            port,
        };

        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|_| resolve_error())?
            .collect();

        // The client socket is bound on IPv4, so prefer an IPv4 answer.
        addrs
            .iter()
            .find(|addr| addr.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
            .ok_or_else(resolve_error)
    }

    fn ensure_host(&mut self) -> Result<&mut enet::Host<UdpSocket>, TransportError> {
        if self.host.is_none() {
            let socket = UdpSocket::bind(SocketAddr::from(([0, 0, 0, 0], 0)))?;
            let host = enet::Host::new(
                socket,
                enet::HostSettings {
                    peer_limit: 1,
                    channel_limit: CLIENT_CHANNEL_COUNT,
                    ..Default::default()
                },
            )
            .map_err(|e| TransportError::HostCreation(format!("{:?}", e)))?;
            self.host = Some(host);
        }

        self.host
            .as_mut()
            .ok_or_else(|| TransportError::HostCreation("host unavailable".to_string()))
    }

    fn try_connect(&mut self, host: &str, port: u16, timeout_ms: u32) -> Result<bool, TransportError> {
        let addr = Self::resolve(host, port)?;
        let timeout = self.timeout;
        let enet_host = self.ensure_host()?;

        let peer_id = enet_host
            .connect(addr, CLIENT_CHANNEL_COUNT, 0)
            .map_err(|_| TransportError::NoAvailablePeers)?
            .id();
        timeout.apply(enet_host.peer_mut(peer_id));

        let deadline = Instant::now() + Duration::from_millis(timeout_ms as u64);
        let mut connected = false;

        while !connected && Instant::now() < deadline {
            match enet_host.service() {
                Ok(Some(enet::Event::Connect { .. })) => connected = true,
                Ok(Some(enet::Event::Disconnect { peer, .. })) if peer.id() == peer_id => {
                    log::warn!("Server at {} dropped the handshake", addr);
                    break;
                }
                Ok(Some(_)) => {}
                Ok(None) => thread::sleep(CONNECT_POLL_INTERVAL),
                Err(e) => {
                    log::error!("ENet client service failed while connecting: {:?}", e);
                    break;
                }
            }
        }

        if !connected {
            enet_host.peer_mut(peer_id).reset();
            return Ok(false);
        }

        self.peer = Some(peer_id);
        self.remote = Some(PeerAddr::from(addr));
        self.connected = true;
        self.closing = false;
        Ok(true)
    }
}

impl ClientTransport for EnetClientTransport {
    fn connect(&mut self, host: &str, port: u16, timeout_ms: u32) -> bool {
        if self.connected {
            log::warn!("Already connected, disconnect before connecting to {}:{}", host, port);
            return false;
        }

        log::info!("Connecting to {}:{}", host, port);
        match self.try_connect(host, port, timeout_ms) {
            Ok(true) => {
                log::info!("Connected to {}:{}", host, port);
                true
            }
            Ok(false) => {
                log::error!("Connection to {}:{} failed within {}ms", host, port, timeout_ms);
                false
            }
            Err(e) => {
                log::error!("Connection to {}:{} failed: {}", host, port, e);
                false
            }
        }
    }

    fn poll(&mut self, events: &mut Vec<Event>) {
        let Some(host) = self.host.as_mut() else {
            return;
        };

        loop {
            let event = match host.service() {
                Ok(Some(event)) => match event {
                    enet::Event::Connect { peer, .. } => Event::Connect {
                        connection: peer.id().0,
                        peer: peer_addr(peer),
                    },
                    enet::Event::Disconnect { peer, data } => {
                        let connection = peer.id().0;
                        let addr = peer_addr(peer);
                        let requested = self.closing;
                        self.connected = false;
                        self.closing = false;
                        self.peer = None;
                        if data == DISCONNECT_TIMEOUT && !requested {
                            Event::DisconnectTimeout {
                                connection,
                                peer: addr,
                            }
                        } else {
                            Event::Disconnect {
                                connection,
                                peer: addr,
                            }
                        }
                    }
                    enet::Event::Receive { peer, packet, .. } => Event::Receive {
                        connection: peer.id().0,
                        payload: packet.data().to_vec(),
                    },
                },
                Ok(None) => break,
                Err(e) => {
                    log::error!("ENet client service failed: {:?}", e);
                    break;
                }
            };
            events.push(event);
        }
    }

    fn send(&mut self, data: &[u8], delivery: Delivery, flush: bool) {
        let (Some(host), Some(peer_id)) = (self.host.as_mut(), self.peer) else {
            log::warn!("ENet send while not connected, dropping {} bytes", data.len());
            return;
        };

        let channel = channel_for(delivery, CLIENT_CHANNEL_COUNT);
        let packet = make_packet(data, delivery);
        if let Err(e) = host.peer_mut(peer_id).send(channel, &packet) {
            log::warn!("ENet send failed: {:?}", e);
            return;
        }

        if flush {
            host.flush();
        }
    }

    fn disconnect(&mut self) {
        let (Some(host), Some(peer_id)) = (self.host.as_mut(), self.peer) else {
            log::warn!("ENet disconnect while not connected");
            return;
        };

        self.closing = true;
        host.peer_mut(peer_id).disconnect(DISCONNECT_GRACEFUL);
        host.flush();
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn remote_addr(&self) -> Option<PeerAddr> {
        self.remote
    }
}

impl Drop for EnetClientTransport {
    fn drop(&mut self) {
        if let (Some(host), Some(peer_id)) = (self.host.as_mut(), self.peer) {
            host.peer_mut(peer_id).disconnect(DISCONNECT_GRACEFUL);
            host.flush();
        }
    }
}
