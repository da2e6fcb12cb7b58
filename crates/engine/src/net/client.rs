use super::buffer::MessageBuffer;
use super::codec;
use super::enet::EnetClientTransport;
use super::factory;
use super::message::{ClientMsg, MessageVariant, ServerMsg};
use super::transport::{ClientTransport, Event};
use super::types::{DISCONNECTED_REASON, PeerAddr, TIMEOUT_REASON};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectEvent {
    pub reason: String,
    pub timed_out: bool,
}

/// Client side of the message layer.
pub struct ClientNetwork<T: ClientTransport = EnetClientTransport> {
    transport: T,
    received: MessageBuffer<ServerMsg>,
    disconnect_event: Option<DisconnectEvent>,
    events: Vec<Event>,
}

impl Default for ClientNetwork<EnetClientTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientNetwork<EnetClientTransport> {
    pub fn new() -> Self {
        Self::with_transport(factory::create_client_transport())
    }
}

impl<T: ClientTransport> ClientNetwork<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            received: MessageBuffer::new(),
            disconnect_event: None,
            events: Vec::new(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Blocks for at most `timeout_ms` while the handshake completes.
    pub fn connect(&mut self, host: &str, port: u16, timeout_ms: u32) -> bool {
        self.transport.connect(host, port, timeout_ms)
    }

    pub fn disconnect(&mut self) {
        self.transport.disconnect();
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub fn server_addr(&self) -> Option<PeerAddr> {
        self.transport.remote_addr()
    }

    pub fn update(&mut self) {
        let mut events = std::mem::take(&mut self.events);
        self.transport.poll(&mut events);

        for event in events.drain(..) {
            match event {
                Event::Connect { peer, .. } => {
                    log::debug!("Transport connected to {}", peer);
                }
                Event::Receive { payload, .. } => match codec::decode_server_msg(&payload) {
                    Ok(msg) => {
                        log::trace!("Received {:?}", msg.msg_type());
                        self.received.push(msg);
                    }
                    Err(e) => log::warn!("Dropping malformed server message: {}", e),
                },
                Event::Disconnect { .. } => {
                    log::info!("{}", DISCONNECTED_REASON);
                    self.disconnect_event = Some(DisconnectEvent {
                        reason: DISCONNECTED_REASON.to_string(),
                        timed_out: false,
                    });
                }
                Event::DisconnectTimeout { .. } => {
                    log::warn!("{}", TIMEOUT_REASON);
                    self.disconnect_event = Some(DisconnectEvent {
                        reason: TIMEOUT_REASON.to_string(),
                        timed_out: true,
                    });
                }
            }
        }

        self.events = events;
    }

    pub fn peek_message<M, F>(&mut self, predicate: F) -> Option<&M>
    where
        M: MessageVariant<ServerMsg>,
        F: Fn(&M) -> bool,
    {
        self.received.peek(predicate)
    }

    pub fn consume_messages<M, F>(&mut self, predicate: F) -> Vec<M>
    where
        M: MessageVariant<ServerMsg>,
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

    pub fn send<M: Into<ClientMsg>>(&mut self, msg: M, flush: bool) {
        let msg = msg.into();
        let kind = msg.msg_type();

        if !self.transport.is_connected() {
            log::warn!("Not connected, dropping {:?}", kind);
            return;
        }

        let data = match codec::encode_client_msg(&msg) {
            Ok(data) => data,
            Err(e) => {
                log::error!("Failed to encode {:?}: {}", kind, e);
                return;
            }
        };

        self.transport
            .send(&data, kind.delivery(), flush || kind.forces_flush());
    }

    /// Returns the most recent disconnect once; later calls yield `None`
    /// until the next disconnect.
    pub fn consume_disconnect_event(&mut self) -> Option<DisconnectEvent> {
        self.disconnect_event.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::memory::MemoryNetwork;
    use crate::net::message::{ClientInit, ClientPlayerLocation, ServerPlayerDeath};
    use crate::net::server::ServerNetwork;
    use crate::net::types::Delivery;

    #[test]
    fn test_send_requires_connection() {
        let network = MemoryNetwork::new();
        let mut client = ClientNetwork::with_transport(network.client([127, 0, 0, 1].into()));
        client.send(ClientInit::default(), false);
        assert!(network.sent_packets().is_empty());
    }

    #[test]
    fn test_delivery_and_flush_follow_message_kind() {
        let network = MemoryNetwork::new();
        let _server = network.server(4);
        let mut client = ClientNetwork::with_transport(network.client([127, 0, 0, 1].into()));
        assert!(client.connect("127.0.0.1", 5154, 100));
        assert_eq!(client.transport().remote_port(), Some(5154));
        assert_eq!(client.transport().remote_ip(), "127.0.0.1".parse().ok());

        client.send(ClientInit::default(), false);
        client.send(ClientPlayerLocation::default(), false);

        let sent = network.sent_packets();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].delivery, Delivery::Reliable);
        assert!(sent[0].flushed);
        assert_eq!(sent[1].delivery, Delivery::Unreliable);
        assert!(!sent[1].flushed);
    }

    #[test]
    fn test_disconnect_event_is_consumed_once() {
        let network = MemoryNetwork::new();
        let mut server = ServerNetwork::with_transport(network.server(4));
        let mut client = ClientNetwork::with_transport(network.client([127, 0, 0, 1].into()));
        assert!(client.connect("127.0.0.1", 5154, 100));
        server.update();

        server.send(
            1,
            ServerPlayerDeath {
                client_id: 1,
                killer_id: 2,
            },
            false,
        );
        server.disconnect_client(1);
        client.update();

        let deaths = client.consume_messages(|_: &ServerPlayerDeath| true);
        assert_eq!(
            deaths,
            vec![ServerPlayerDeath {
                client_id: 1,
                killer_id: 2,
            }]
        );
        assert!(!client.is_connected());

        let event = client.consume_disconnect_event().unwrap();
        assert_eq!(event.reason, DISCONNECTED_REASON);
        assert!(!event.timed_out);
        assert!(client.consume_disconnect_event().is_none());
    }
}
