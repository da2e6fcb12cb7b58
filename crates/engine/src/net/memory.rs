//! In-process transport pair.
//!
//! A `MemoryNetwork` links one server transport with any number of client
//! transports without sockets. Event semantics match the ENet transport:
//! disconnects are observed on the next poll, payloads are copied, and a
//! forced timeout surfaces as `DisconnectTimeout` on both ends.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::net::IpAddr;
use std::rc::Rc;

use super::transport::{ClientTransport, Event, ServerTransport};
use super::types::{ConnectionHandle, Delivery, PeerAddr};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentPacket {
    pub from_server: bool,
    pub connection: ConnectionHandle,
    pub delivery: Delivery,
    pub flushed: bool,
    pub data: Vec<u8>,
}

#[derive(Debug, Default)]
struct HubState {
    listening: bool,
    max_clients: usize,
    next_connection: ConnectionHandle,
    next_client_port: u16,
    live: HashSet<ConnectionHandle>,
    client_addrs: HashMap<ConnectionHandle, PeerAddr>,
    server_events: VecDeque<Event>,
    client_inboxes: HashMap<ConnectionHandle, VecDeque<Event>>,
    sent: Vec<SentPacket>,
}

impl HubState {
    fn close(&mut self, connection: ConnectionHandle, timed_out: bool) -> bool {
        if !self.live.remove(&connection) {
            return false;
        }

        let client_addr = self.client_addrs.remove(&connection).unwrap_or_default();
        let server_addr = PeerAddr::default();

        let (to_server, to_client) = if timed_out {
            (
                Event::DisconnectTimeout {
                    connection,
                    peer: client_addr,
                },
                Event::DisconnectTimeout {
                    connection,
                    peer: server_addr,
                },
            )
        } else {
            (
                Event::Disconnect {
                    connection,
                    peer: client_addr,
                },
                Event::Disconnect {
                    connection,
                    peer: server_addr,
                },
            )
        };

        self.server_events.push_back(to_server);
        self.client_inboxes
            .entry(connection)
            .or_default()
            .push_back(to_client);
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryNetwork {
    state: Rc<RefCell<HubState>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn server(&self, max_clients: usize) -> MemoryServerTransport {
        let mut state = self.state.borrow_mut();
        state.listening = true;
        state.max_clients = max_clients;
        MemoryServerTransport {
            network: self.clone(),
        }
    }

    pub fn client(&self, ip: IpAddr) -> MemoryClientTransport {
        MemoryClientTransport {
            network: self.clone(),
            ip,
            connection: None,
            remote: None,
        }
    }

    /// Drops a live connection as if keepalives stopped arriving.
    pub fn time_out(&self, connection: ConnectionHandle) -> bool {
        self.state.borrow_mut().close(connection, true)
    }

    pub fn sent_packets(&self) -> Vec<SentPacket> {
        self.state.borrow().sent.clone()
    }

    pub fn clear_sent_packets(&self) {
        self.state.borrow_mut().sent.clear();
    }
}

pub struct MemoryServerTransport {
    network: MemoryNetwork,
}

impl ServerTransport for MemoryServerTransport {
    fn poll(&mut self, events: &mut Vec<Event>) {
        events.extend(self.network.state.borrow_mut().server_events.drain(..));
    }

    fn send(&mut self, connection: ConnectionHandle, data: &[u8], delivery: Delivery, flush: bool) {
        let mut state = self.network.state.borrow_mut();
        if !state.live.contains(&connection) {
            log::warn!("Memory send to unknown connection {}", connection);
            return;
        }

        state.sent.push(SentPacket {
            from_server: true,
            connection,
            delivery,
            flushed: flush,
            data: data.to_vec(),
        });
        state
            .client_inboxes
            .entry(connection)
            .or_default()
            .push_back(Event::Receive {
                connection,
                payload: data.to_vec(),
            });
    }

    fn disconnect(&mut self, connection: ConnectionHandle) {
        if !self.network.state.borrow_mut().close(connection, false) {
            log::warn!("Memory disconnect of unknown connection {}", connection);
        }
    }
}

impl Drop for MemoryServerTransport {
    fn drop(&mut self) {
        let mut state = self.network.state.borrow_mut();
        state.listening = false;
        let live: Vec<ConnectionHandle> = state.live.iter().copied().collect();
        for connection in live {
            state.close(connection, false);
        }
    }
}

pub struct MemoryClientTransport {
    network: MemoryNetwork,
    ip: IpAddr,
    connection: Option<ConnectionHandle>,
    remote: Option<PeerAddr>,
}

impl MemoryClientTransport {
    pub fn connection(&self) -> Option<ConnectionHandle> {
        self.connection
    }
}

impl ClientTransport for MemoryClientTransport {
    fn connect(&mut self, host: &str, port: u16, _timeout_ms: u32) -> bool {
        if self.is_connected() {
            log::warn!("Already connected, disconnect before connecting to {}:{}", host, port);
            return false;
        }

        let mut state = self.network.state.borrow_mut();
        if !state.listening {
            log::error!("Connection to {}:{} failed: nothing listening", host, port);
            return false;
        }
        if state.live.len() >= state.max_clients {
            log::error!("Connection to {}:{} failed: server full", host, port);
            return false;
        }

        state.next_connection += 1;
        state.next_client_port = state.next_client_port.wrapping_add(1);
        let connection = state.next_connection;
        let client_addr = PeerAddr::new(Some(self.ip), 40000u16.wrapping_add(state.next_client_port));

        if let Some(stale) = self.connection {
            state.client_inboxes.remove(&stale);
        }

        state.live.insert(connection);
        state.client_addrs.insert(connection, client_addr);
        state.client_inboxes.insert(connection, VecDeque::new());
        state.server_events.push_back(Event::Connect {
            connection,
            peer: client_addr,
        });

        self.connection = Some(connection);
        self.remote = Some(PeerAddr::new(host.parse().ok(), port));
        true
    }

    fn poll(&mut self, events: &mut Vec<Event>) {
        let Some(connection) = self.connection else {
            return;
        };

        let mut state = self.network.state.borrow_mut();
        if let Some(inbox) = state.client_inboxes.get_mut(&connection) {
            events.extend(inbox.drain(..));
        }
        // A closed connection's last event has now been delivered.
        if !state.live.contains(&connection) {
            state.client_inboxes.remove(&connection);
        }
    }

    fn send(&mut self, data: &[u8], delivery: Delivery, flush: bool) {
        let Some(connection) = self.connection else {
            log::warn!("Memory send while not connected, dropping {} bytes", data.len());
            return;
        };

        let mut state = self.network.state.borrow_mut();
        if !state.live.contains(&connection) {
            log::warn!("Memory send on closed connection {}", connection);
            return;
        }

        state.sent.push(SentPacket {
            from_server: false,
            connection,
            delivery,
            flushed: flush,
            data: data.to_vec(),
        });
        state.server_events.push_back(Event::Receive {
            connection,
            payload: data.to_vec(),
        });
    }

    fn disconnect(&mut self) {
        let Some(connection) = self.connection else {
            log::warn!("Memory disconnect while not connected");
            return;
        };

        if !self.network.state.borrow_mut().close(connection, false) {
            log::warn!("Memory disconnect of closed connection {}", connection);
        }
    }

    fn is_connected(&self) -> bool {
        self.connection
            .is_some_and(|connection| self.network.state.borrow().live.contains(&connection))
    }

    fn remote_addr(&self) -> Option<PeerAddr> {
        self.remote
    }
}
