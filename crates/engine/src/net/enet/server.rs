use std::collections::{HashMap, HashSet};
use std::net::{SocketAddr, UdpSocket};

use rusty_enet as enet;

use super::{
    DISCONNECT_GRACEFUL, DISCONNECT_TIMEOUT, EnetLibrary, PeerTimeout, channel_for, make_packet,
    peer_addr,
};
use crate::net::transport::{Event, ServerTransport, TransportError};
use crate::net::types::{ConnectionHandle, Delivery};

pub struct EnetServerTransport {
    host: enet::Host<UdpSocket>,
    local_addr: SocketAddr,
    channel_count: usize,
    peers: HashMap<ConnectionHandle, enet::PeerID>,
    closing: HashSet<ConnectionHandle>,
    timeout: PeerTimeout,
    _library: EnetLibrary,
}

impl EnetServerTransport {
    pub fn bind(
        port: u16,
        max_clients: usize,
        channel_count: usize,
    ) -> Result<Self, TransportError> {
        let library = EnetLibrary::acquire();

        let socket = UdpSocket::bind(SocketAddr::from(([0, 0, 0, 0], port)))?;
        let local_addr = socket.local_addr()?;

        let host = enet::Host::new(
            socket,
            enet::HostSettings {
                peer_limit: max_clients,
                channel_limit: channel_count,
                ..Default::default()
            },
        )
        .map_err(|e| TransportError::HostCreation(format!("{:?}", e)))?;

        log::info!(
            "ENet server listening on {} ({} clients, {} channels)",
            local_addr,
            max_clients,
            channel_count
        );

        Ok(Self {
            host,
            local_addr,
            channel_count,
            peers: HashMap::new(),
            closing: HashSet::new(),
            timeout: PeerTimeout::default(),
            _library: library,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Applies to every live peer and to peers that connect later.
    pub fn set_peer_timeout(&mut self, timeout: PeerTimeout) {
        self.timeout = timeout;
        for peer_id in self.peers.values() {
            timeout.apply(self.host.peer_mut(*peer_id));
        }
    }
}

impl ServerTransport for EnetServerTransport {
    fn poll(&mut self, events: &mut Vec<Event>) {
        loop {
            let event = match self.host.service() {
                Ok(Some(event)) => match event {
                    enet::Event::Connect { peer, .. } => {
                        let connection = peer.id().0;
                        self.peers.insert(connection, peer.id());
                        self.timeout.apply(peer);
                        Event::Connect {
                            connection,
                            peer: peer_addr(peer),
                        }
                    }
                    enet::Event::Disconnect { peer, data } => {
                        let connection = peer.id().0;
                        let addr = peer_addr(peer);
                        self.peers.remove(&connection);
                        let requested = self.closing.remove(&connection);
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
                    log::error!("ENet server service failed: {:?}", e);
                    break;
                }
            };
            events.push(event);
        }
    }

    fn send(&mut self, connection: ConnectionHandle, data: &[u8], delivery: Delivery, flush: bool) {
        let Some(&peer_id) = self.peers.get(&connection) else {
            log::warn!("ENet send to unknown connection {}", connection);
            return;
        };

        let channel = channel_for(delivery, self.channel_count);
        let packet = make_packet(data, delivery);
        if let Err(e) = self.host.peer_mut(peer_id).send(channel, &packet) {
            log::warn!("ENet send to connection {} failed: {:?}", connection, e);
            return;
        }

        if flush {
            self.host.flush();
        }
    }

    fn disconnect(&mut self, connection: ConnectionHandle) {
        let Some(&peer_id) = self.peers.get(&connection) else {
            log::warn!("ENet disconnect of unknown connection {}", connection);
            return;
        };

        self.closing.insert(connection);
        self.host.peer_mut(peer_id).disconnect(DISCONNECT_GRACEFUL);
        self.host.flush();
    }
}

impl Drop for EnetServerTransport {
    fn drop(&mut self) {
        for peer_id in self.peers.values() {
            self.host.peer_mut(*peer_id).disconnect(DISCONNECT_GRACEFUL);
        }
        self.host.flush();
    }
}
