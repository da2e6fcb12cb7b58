use std::collections::HashMap;

use glam::{Quat, Vec3};

use super::types::{ClientId, Delivery};

pub type PlayerParameters = HashMap<String, f32>;

/// Implemented by every concrete message struct for its envelope enum `E`.
///
/// Lets the façades peek and consume by concrete type with a plain generic
/// parameter instead of comparing runtime type tags.
pub trait MessageVariant<E>: Into<E> + Sized {
    fn from_ref(msg: &E) -> Option<&Self>;
    fn from_msg(msg: E) -> Result<Self, E>;
}

macro_rules! message_enum {
    ($(#[$meta:meta])* $name:ident, $kind:ident { $($variant:ident($ty:ident)),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub enum $name {
            $($variant($ty)),+
        }

        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $kind {
            $($variant),+
        }

        impl $name {
            pub fn msg_type(&self) -> $kind {
                match self {
                    $(Self::$variant(_) => $kind::$variant),+
                }
            }

            pub fn client_id(&self) -> ClientId {
                match self {
                    $(Self::$variant(m) => m.client_id),+
                }
            }

            pub fn set_client_id(&mut self, client_id: ClientId) {
                match self {
                    $(Self::$variant(m) => m.client_id = client_id),+
                }
            }
        }

        $(
            impl From<$ty> for $name {
                fn from(msg: $ty) -> Self {
                    Self::$variant(msg)
                }
            }

            impl MessageVariant<$name> for $ty {
                fn from_ref(msg: &$name) -> Option<&Self> {
                    match msg {
                        $name::$variant(m) => Some(m),
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }

                fn from_msg(msg: $name) -> Result<Self, $name> {
                    match msg {
                        $name::$variant(m) => Ok(m),
                        #[allow(unreachable_patterns)]
                        other => Err(other),
                    }
                }
            }
        )+
    };
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlayerState {
    pub name: String,
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    pub alive: bool,
    pub score: i32,
    pub params: PlayerParameters,
}

// Client -> server

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClientInit {
    pub client_id: ClientId,
    pub name: String,
    pub protocol_version: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClientChat {
    pub client_id: ClientId,
    pub to_id: ClientId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClientPlayerLocation {
    pub client_id: ClientId,
    pub position: Vec3,
    pub rotation: Quat,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClientRequestPlayerSpawn {
    pub client_id: ClientId,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClientCreateShot {
    pub client_id: ClientId,
    pub local_shot_id: u32,
    pub position: Vec3,
    pub velocity: Vec3,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClientPlayerJoin {
    pub client_id: ClientId,
    pub ip: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClientPlayerLeave {
    pub client_id: ClientId,
}

message_enum! {
    /// Messages sent from a client to the server.
    ClientMsg, ClientMsgType {
        Init(ClientInit),
        Chat(ClientChat),
        PlayerLocation(ClientPlayerLocation),
        RequestPlayerSpawn(ClientRequestPlayerSpawn),
        CreateShot(ClientCreateShot),
        PlayerJoin(ClientPlayerJoin),
        PlayerLeave(ClientPlayerLeave),
    }
}

impl ClientMsgType {
    pub fn delivery(&self) -> Delivery {
        match self {
            Self::PlayerLocation => Delivery::Unreliable,
            _ => Delivery::Reliable,
        }
    }

    pub fn forces_flush(&self) -> bool {
        matches!(self, Self::Init)
    }
}

// Server -> client

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServerPlayerJoin {
    pub client_id: ClientId,
    pub ip: String,
    pub name: String,
    pub state: PlayerState,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServerPlayerLeave {
    pub client_id: ClientId,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServerPlayerState {
    pub client_id: ClientId,
    pub state: PlayerState,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServerPlayerParameters {
    pub client_id: ClientId,
    pub params: PlayerParameters,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServerPlayerLocation {
    pub client_id: ClientId,
    pub position: Vec3,
    pub rotation: Quat,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServerPlayerSpawn {
    pub client_id: ClientId,
    pub position: Vec3,
    pub rotation: Quat,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServerPlayerDeath {
    pub client_id: ClientId,
    pub killer_id: ClientId,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServerCreateShot {
    pub client_id: ClientId,
    pub global_shot_id: u32,
    pub position: Vec3,
    pub velocity: Vec3,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServerRemoveShot {
    pub client_id: ClientId,
    pub shot_id: u32,
    pub is_global_id: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServerInit {
    pub client_id: ClientId,
    pub server_name: String,
    pub world_name: String,
    pub protocol_version: u32,
    pub default_player_params: PlayerParameters,
    pub world_data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServerChat {
    pub client_id: ClientId,
    pub to_id: ClientId,
    pub text: String,
}

message_enum! {
    /// Messages sent from the server to clients.
    ServerMsg, ServerMsgType {
        PlayerJoin(ServerPlayerJoin),
        PlayerLeave(ServerPlayerLeave),
        PlayerState(ServerPlayerState),
        PlayerParameters(ServerPlayerParameters),
        PlayerLocation(ServerPlayerLocation),
        PlayerSpawn(ServerPlayerSpawn),
        PlayerDeath(ServerPlayerDeath),
        CreateShot(ServerCreateShot),
        RemoveShot(ServerRemoveShot),
        Init(ServerInit),
        Chat(ServerChat),
    }
}

impl ServerMsgType {
    pub fn delivery(&self) -> Delivery {
        match self {
            Self::PlayerLocation => Delivery::Unreliable,
            _ => Delivery::Reliable,
        }
    }

    pub fn forces_flush(&self) -> bool {
        matches!(self, Self::Init)
    }
}
