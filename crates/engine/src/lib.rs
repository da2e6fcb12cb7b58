pub mod net;

pub use net::{
    BROADCAST_CLIENT_ID, ClientId, ClientMsg, ClientNetwork, DEFAULT_PORT, PROTOCOL_VERSION,
    SERVER_CLIENT_ID, ServerMsg, ServerNetwork,
};
