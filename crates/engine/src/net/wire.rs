//! Protobuf wire schema for the client/server envelopes.
//!
//! Each envelope carries the sender/subject `client_id` and exactly one
//! payload case. Tags are part of the protocol and must never be reused.

use std::collections::HashMap;

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Vector3 {
    #[prost(float, tag = "1")]
    pub x: f32,
    #[prost(float, tag = "2")]
    pub y: f32,
    #[prost(float, tag = "3")]
    pub z: f32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Quaternion {
    #[prost(float, tag = "1")]
    pub x: f32,
    #[prost(float, tag = "2")]
    pub y: f32,
    #[prost(float, tag = "3")]
    pub z: f32,
    #[prost(float, tag = "4")]
    pub w: f32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PlayerState {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, optional, tag = "2")]
    pub position: Option<Vector3>,
    #[prost(message, optional, tag = "3")]
    pub rotation: Option<Quaternion>,
    #[prost(message, optional, tag = "4")]
    pub velocity: Option<Vector3>,
    #[prost(bool, tag = "5")]
    pub alive: bool,
    #[prost(int32, tag = "6")]
    pub score: i32,
    #[prost(map = "string, float", tag = "7")]
    pub params: HashMap<String, f32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Init {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(uint32, tag = "2")]
    pub protocol_version: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ServerInit {
    #[prost(string, tag = "1")]
    pub server_name: String,
    #[prost(string, tag = "2")]
    pub world_name: String,
    #[prost(uint32, tag = "3")]
    pub protocol_version: u32,
    #[prost(map = "string, float", tag = "4")]
    pub default_player_params: HashMap<String, f32>,
    #[prost(bytes = "vec", tag = "5")]
    pub world_data: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Chat {
    #[prost(uint32, tag = "1")]
    pub to_id: u32,
    #[prost(string, tag = "2")]
    pub text: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PlayerLocation {
    #[prost(message, optional, tag = "1")]
    pub position: Option<Vector3>,
    #[prost(message, optional, tag = "2")]
    pub rotation: Option<Quaternion>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestPlayerSpawn {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PlayerSpawn {
    #[prost(message, optional, tag = "1")]
    pub position: Option<Vector3>,
    #[prost(message, optional, tag = "2")]
    pub rotation: Option<Quaternion>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PlayerDeath {
    #[prost(uint32, tag = "1")]
    pub killer_id: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateShot {
    #[prost(uint32, tag = "1")]
    pub shot_id: u32,
    #[prost(message, optional, tag = "2")]
    pub position: Option<Vector3>,
    #[prost(message, optional, tag = "3")]
    pub velocity: Option<Vector3>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RemoveShot {
    #[prost(uint32, tag = "1")]
    pub shot_id: u32,
    #[prost(bool, tag = "2")]
    pub is_global_id: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PlayerJoin {
    #[prost(string, tag = "1")]
    pub ip: String,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(message, optional, tag = "3")]
    pub state: Option<PlayerState>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PlayerLeave {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PlayerStateUpdate {
    #[prost(message, optional, tag = "1")]
    pub state: Option<PlayerState>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PlayerParameters {
    #[prost(map = "string, float", tag = "1")]
    pub params: HashMap<String, f32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClientMsg {
    #[prost(uint32, tag = "1")]
    pub client_id: u32,
    #[prost(oneof = "client_msg::Payload", tags = "2, 3, 4, 5, 6, 7, 8")]
    pub payload: Option<client_msg::Payload>,
}

pub mod client_msg {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Payload {
        #[prost(message, tag = "2")]
        Init(super::Init),
        #[prost(message, tag = "3")]
        Chat(super::Chat),
        #[prost(message, tag = "4")]
        PlayerLocation(super::PlayerLocation),
        #[prost(message, tag = "5")]
        RequestPlayerSpawn(super::RequestPlayerSpawn),
        #[prost(message, tag = "6")]
        CreateShot(super::CreateShot),
        #[prost(message, tag = "7")]
        PlayerJoin(super::PlayerJoin),
        #[prost(message, tag = "8")]
        PlayerLeave(super::PlayerLeave),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ServerMsg {
    #[prost(uint32, tag = "1")]
    pub client_id: u32,
    #[prost(
        oneof = "server_msg::Payload",
        tags = "2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12"
    )]
    pub payload: Option<server_msg::Payload>,
}

pub mod server_msg {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Payload {
        #[prost(message, tag = "2")]
        PlayerJoin(super::PlayerJoin),
        #[prost(message, tag = "3")]
        PlayerLeave(super::PlayerLeave),
        #[prost(message, tag = "4")]
        PlayerState(super::PlayerStateUpdate),
        #[prost(message, tag = "5")]
        PlayerParameters(super::PlayerParameters),
        #[prost(message, tag = "6")]
        PlayerLocation(super::PlayerLocation),
        #[prost(message, tag = "7")]
        PlayerSpawn(super::PlayerSpawn),
        #[prost(message, tag = "8")]
        PlayerDeath(super::PlayerDeath),
        #[prost(message, tag = "9")]
        CreateShot(super::CreateShot),
        #[prost(message, tag = "10")]
        RemoveShot(super::RemoveShot),
        #[prost(message, tag = "11")]
        Init(super::ServerInit),
        #[prost(message, tag = "12")]
        Chat(super::Chat),
    }
}
