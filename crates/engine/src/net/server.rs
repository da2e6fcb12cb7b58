use std::time::Instant;

use super::buffer::MessageBuffer;
use super::codec;
use super::connection::ConnectionManager;
use super::enet::EnetServerTransport;
use super::factory::{self, ServerNetworkConfig};
use super::message::{ClientMsg, ClientPlayerLeave, MessageVariant, ServerMsg};
use super::transport::{Event, ServerTransport, TransportError};
use super::types::{ClientId, ConnectionHandle, PeerAddr};

#[derive(Debug, Clone, Copy)]
enum Target {
    One(ClientId),
    AllExcept(ClientId),
    All,
}

#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub client_id: ClientId,
    pub peer: PeerAddr,
    pub connected_at: Instant,
}

/// Server side of the message layer.
///
/// Assigns client ids to transport connections, decodes inbound frames into
/// a per-tick `MessageBuffer`, and routes outbound messages by client id.
/// A dropped connection always surfaces as a `ClientPlayerLeave` for its id.
pub struct ServerNetwork<T: ServerTransport = EnetServerTransport> {
    transport: T,
    connections: ConnectionManager,
    received: MessageBuffer<ClientMsg>,
    events: Vec<Event>,
}

impl ServerNetwork<EnetServerTransport> {
    pub fn new(port: u16, max_clients: usize) -> Result<Self, TransportError> {
        Self::with_config(&ServerNetworkConfig {
            port,
            max_clients,
            ..Default::default()
        })
    }

    pub fn with_config(config: &ServerNetworkConfig) -> Result<Self, TransportError> {
        let transport = factory::create_server_transport(config)?;
        Ok(Self::with_transport(transport))
    }
}

impl<T: ServerTransport> ServerNetwork<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            connections: ConnectionManager::new(),
            received: MessageBuffer::new(),
            events: Vec::new(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Drains every pending transport event into the message buffer.
    pub fn update(&mut self) {
        let mut events = std::mem::take(&mut self.events);
        self.transport.poll(&mut events);

        for event in events.drain(..) {
            match event {
                Event::Connect { connection, peer } => self.handle_connect(connection, peer),
                Event::Receive {
                    connection,
                    payload,
                } => self.handle_receive(connection, &payload),
                Event::Disconnect { connection, .. } => self.handle_disconnect(connection, false),
                Event::DisconnectTimeout { connection, .. } => {
                    self.handle_disconnect(connection, true)
                }
            }
        }

        self.events = events;
    }

    fn handle_connect(&mut self, connection: ConnectionHandle, peer: PeerAddr) {
        let client_id = self.connections.register(connection, peer);
        log::info!("Client {} connected from {}", client_id, peer);
    }

    fn handle_receive(&mut self, connection: ConnectionHandle, payload: &[u8]) {
        let Some(client_id) = self.connections.client_for(connection) else {
            log::warn!(
                "Dropping {} bytes from unregistered connection {}",
                payload.len(),
                connection
            );
            return;
        };

        let mut msg = match codec::decode_client_msg(payload) {
            Ok(msg) => msg,
            Err(e) => {
                log::warn!("Dropping malformed message from client {}: {}", client_id, e);
                return;
            }
        };

        // The transport is the authority on who sent what and from where.
        msg.set_client_id(client_id);
        if let ClientMsg::PlayerJoin(join) = &mut msg {
            if let Some(ip) = self.connections.peer(connection).and_then(|p| p.ip_string()) {
                if !join.ip.is_empty() && join.ip != ip {
                    log::debug!(
                        "Client {} declared ip {}, using transport ip {}",
                        client_id,
                        join.ip,
                        ip
                    );
                }
                join.ip = ip;
            }
        }

        log::trace!("Received {:?} from client {}", msg.msg_type(), client_id);
        self.received.push(msg);
    }

    fn handle_disconnect(&mut self, connection: ConnectionHandle, timed_out: bool) {
        let Some(client_id) = self.connections.remove_connection(connection) else {
            log::debug!("Disconnect for unregistered connection {}", connection);
            return;
        };

        if timed_out {
            log::info!("Client {} timed out", client_id);
        } else {
            log::info!("Client {} disconnected", client_id);
        }

        self.received
            .push(ClientMsg::PlayerLeave(ClientPlayerLeave { client_id }));
    }

    pub fn peek_message<M, F>(&mut self, predicate: F) -> Option<&M>
    where
        M: MessageVariant<ClientMsg>,
        F: Fn(&M) -> bool,
    {
        self.received.peek(predicate)
    }

    pub fn consume_messages<M, F>(&mut self, predicate: F) -> Vec<M>
    where
        M: MessageVariant<ClientMsg>,
        F: Fn(&M) -> bool,
    {
        self.received.consume(predicate)
    }

    pub fn flush_peeked_messages(&mut self) -> usize {
        self.received.flush_peeked()
    }

    pub fn pending_messages(&self) -> usize {
        self.received.len()
    }

    pub fn send<M: Into<ServerMsg>>(&mut self, client_id: ClientId, msg: M, flush: bool) {
        self.send_impl(Target::One(client_id), &msg.into(), flush);
    }

    pub fn send_except<M: Into<ServerMsg>>(&mut self, except_id: ClientId, msg: M, flush: bool) {
        self.send_impl(Target::AllExcept(except_id), &msg.into(), flush);
    }

    pub fn send_all<M: Into<ServerMsg>>(&mut self, msg: M, flush: bool) {
        self.send_impl(Target::All, &msg.into(), flush);
    }

    fn send_impl(&mut self, target: Target, msg: &ServerMsg, flush: bool) {
        let kind = msg.msg_type();

        let connections: Vec<ConnectionHandle> = match target {
            Target::One(client_id) => match self.connections.connection_for(client_id) {
                Some(connection) => vec![connection],
                None => {
                    log::warn!("Cannot send {:?} to unknown client {}", kind, client_id);
                    return;
                }
            },
            Target::AllExcept(except_id) => self
                .connections
                .iter()
                .filter(|&(client_id, _)| client_id != except_id)
                .map(|(_, connection)| connection)
                .collect(),
            Target::All => self
                .connections
                .iter()
                .map(|(_, connection)| connection)
                .collect(),
        };

        if connections.is_empty() {
            return;
        }

        let data = match codec::encode_server_msg(msg) {
            Ok(data) => data,
            Err(e) => {
                log::error!("Failed to encode {:?}: {}", kind, e);
                return;
            }
        };

        let delivery = kind.delivery();
        let flush = flush || kind.forces_flush();
        for connection in connections {
            self.transport.send(connection, &data, delivery, flush);
        }
    }

    /// Live client ids in ascending order.
    pub fn clients(&self) -> Vec<ClientId> {
        self.connections.client_ids()
    }

    pub fn client_count(&self) -> usize {
        self.connections.len()
    }

    pub fn is_connected(&self, client_id: ClientId) -> bool {
        self.connections.connection_for(client_id).is_some()
    }

    pub fn client_ip(&self, client_id: ClientId) -> Option<String> {
        self.client_info(client_id)
            .and_then(|info| info.peer.ip_string())
    }

    pub fn client_info(&self, client_id: ClientId) -> Option<ClientInfo> {
        let connection = self.connections.connection_for(client_id)?;
        let info = self.connections.info(connection)?;
        Some(ClientInfo {
            client_id,
            peer: info.peer,
            connected_at: info.connected_at,
        })
    }

    pub fn client_infos(&self) -> Vec<ClientInfo> {
        self.clients()
            .into_iter()
            .filter_map(|client_id| self.client_info(client_id))
            .collect()
    }

    /// Asks the transport to drop a client. The id stays live until the
    /// transport reports the disconnect, which then yields the usual leave.
    pub fn disconnect_client(&mut self, client_id: ClientId) {
        match self.connections.connection_for(client_id) {
            Some(connection) => self.transport.disconnect(connection),
            None => log::warn!("Cannot disconnect unknown client {}", client_id),
        }
    }
}
