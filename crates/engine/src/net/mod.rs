mod buffer;
mod client;
pub mod codec;
mod connection;
pub mod enet;
mod factory;
pub mod memory;
mod message;
mod server;
mod transport;
mod types;
mod wire;

pub use buffer::MessageBuffer;
pub use client::{ClientNetwork, DisconnectEvent};
pub use codec::{CodecError, MAX_MESSAGE_SIZE};
pub use connection::{ConnectionInfo, ConnectionManager};
pub use enet::{EnetClientTransport, EnetLibrary, EnetServerTransport, PeerTimeout};
pub use factory::{ServerNetworkConfig, create_client_transport, create_server_transport};
pub use memory::{MemoryClientTransport, MemoryNetwork, MemoryServerTransport, SentPacket};
pub use message::*;
pub use server::{ClientInfo, ServerNetwork};
pub use transport::{ClientTransport, Event, ServerTransport, TransportError};
pub use types::*;
