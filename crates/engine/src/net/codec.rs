//! Conversion between wire bytes and the in-process message enums.
//!
//! Frame format: `[length: varint][envelope: protobuf]`. The length must
//! cover the rest of the frame exactly.

use glam::{Quat, Vec3};
use prost::Message;

use super::message::*;
use super::wire::{self, client_msg, server_msg};

/// Largest envelope accepted in either direction (ENet's default packet cap).
pub const MAX_MESSAGE_SIZE: usize = 32 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("malformed envelope: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("envelope has no recognised payload")]
    MissingPayload,
    #[error("frame declares {declared} bytes but carries {actual}")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("encoded {kind} is {size} bytes, limit is {limit}")]
    TooLarge {
        kind: &'static str,
        size: usize,
        limit: usize,
    },
}

fn to_wire_vec(v: Vec3) -> wire::Vector3 {
    wire::Vector3 {
        x: v.x,
        y: v.y,
        z: v.z,
    }
}

fn from_wire_vec(v: Option<wire::Vector3>) -> Vec3 {
    v.map(|v| Vec3::new(v.x, v.y, v.z)).unwrap_or(Vec3::ZERO)
}

fn to_wire_quat(q: Quat) -> wire::Quaternion {
    wire::Quaternion {
        x: q.x,
        y: q.y,
        z: q.z,
        w: q.w,
    }
}

fn from_wire_quat(q: Option<wire::Quaternion>) -> Quat {
    q.map(|q| Quat::from_xyzw(q.x, q.y, q.z, q.w))
        .unwrap_or(Quat::IDENTITY)
}

fn to_wire_state(state: &PlayerState) -> wire::PlayerState {
    wire::PlayerState {
        name: state.name.clone(),
        position: Some(to_wire_vec(state.position)),
        rotation: Some(to_wire_quat(state.rotation)),
        velocity: Some(to_wire_vec(state.velocity)),
        alive: state.alive,
        score: state.score,
        params: state.params.clone(),
    }
}

fn from_wire_state(state: Option<wire::PlayerState>) -> PlayerState {
    let Some(state) = state else {
        return PlayerState::default();
    };

    PlayerState {
        name: state.name,
        position: from_wire_vec(state.position),
        rotation: from_wire_quat(state.rotation),
        velocity: from_wire_vec(state.velocity),
        alive: state.alive,
        score: state.score,
        params: state.params,
    }
}

fn frame(envelope: &impl Message, kind: &'static str) -> Result<Vec<u8>, CodecError> {
    let bytes = envelope.encode_length_delimited_to_vec();
    if bytes.len() > MAX_MESSAGE_SIZE {
        return Err(CodecError::TooLarge {
            kind,
            size: bytes.len(),
            limit: MAX_MESSAGE_SIZE,
        });
    }
    Ok(bytes)
}

fn unframe(data: &[u8]) -> Result<&[u8], CodecError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(CodecError::TooLarge {
            kind: "frame",
            size: data.len(),
            limit: MAX_MESSAGE_SIZE,
        });
    }

    let mut body = data;
    let declared = prost::decode_length_delimiter(&mut body)?;
    if declared != body.len() {
        return Err(CodecError::LengthMismatch {
            declared,
            actual: body.len(),
        });
    }
    Ok(body)
}

pub fn encode_client_msg(msg: &ClientMsg) -> Result<Vec<u8>, CodecError> {
    let payload = match msg {
        ClientMsg::Init(m) => client_msg::Payload::Init(wire::Init {
            name: m.name.clone(),
            protocol_version: m.protocol_version,
        }),
        ClientMsg::Chat(m) => client_msg::Payload::Chat(wire::Chat {
            to_id: m.to_id,
            text: m.text.clone(),
        }),
        ClientMsg::PlayerLocation(m) => client_msg::Payload::PlayerLocation(wire::PlayerLocation {
            position: Some(to_wire_vec(m.position)),
            rotation: Some(to_wire_quat(m.rotation)),
        }),
        ClientMsg::RequestPlayerSpawn(_) => {
            client_msg::Payload::RequestPlayerSpawn(wire::RequestPlayerSpawn {})
        }
        ClientMsg::CreateShot(m) => client_msg::Payload::CreateShot(wire::CreateShot {
            shot_id: m.local_shot_id,
            position: Some(to_wire_vec(m.position)),
            velocity: Some(to_wire_vec(m.velocity)),
        }),
        ClientMsg::PlayerJoin(m) => client_msg::Payload::PlayerJoin(wire::PlayerJoin {
            ip: m.ip.clone(),
            name: m.name.clone(),
            state: None,
        }),
        ClientMsg::PlayerLeave(_) => client_msg::Payload::PlayerLeave(wire::PlayerLeave {}),
    };

    let envelope = wire::ClientMsg {
        client_id: msg.client_id(),
        payload: Some(payload),
    };
    frame(&envelope, "client message")
}

pub fn decode_client_msg(data: &[u8]) -> Result<ClientMsg, CodecError> {
    let envelope = wire::ClientMsg::decode(unframe(data)?)?;
    let client_id = envelope.client_id;

    let msg = match envelope.payload.ok_or(CodecError::MissingPayload)? {
        client_msg::Payload::Init(p) => ClientMsg::Init(ClientInit {
            client_id,
            name: p.name,
            protocol_version: p.protocol_version,
        }),
        client_msg::Payload::Chat(p) => ClientMsg::Chat(ClientChat {
            client_id,
            to_id: p.to_id,
            text: p.text,
        }),
        client_msg::Payload::PlayerLocation(p) => {
            ClientMsg::PlayerLocation(ClientPlayerLocation {
                client_id,
                position: from_wire_vec(p.position),
                rotation: from_wire_quat(p.rotation),
            })
        }
        client_msg::Payload::RequestPlayerSpawn(_) => {
            ClientMsg::RequestPlayerSpawn(ClientRequestPlayerSpawn { client_id })
        }
        client_msg::Payload::CreateShot(p) => ClientMsg::CreateShot(ClientCreateShot {
            client_id,
            local_shot_id: p.shot_id,
            position: from_wire_vec(p.position),
            velocity: from_wire_vec(p.velocity),
        }),
        client_msg::Payload::PlayerJoin(p) => ClientMsg::PlayerJoin(ClientPlayerJoin {
            client_id,
            ip: p.ip,
            name: p.name,
        }),
        client_msg::Payload::PlayerLeave(_) => {
            ClientMsg::PlayerLeave(ClientPlayerLeave { client_id })
        }
    };

    Ok(msg)
}

pub fn encode_server_msg(msg: &ServerMsg) -> Result<Vec<u8>, CodecError> {
    let payload = match msg {
        ServerMsg::PlayerJoin(m) => server_msg::Payload::PlayerJoin(wire::PlayerJoin {
            ip: m.ip.clone(),
            name: m.name.clone(),
            state: Some(to_wire_state(&m.state)),
        }),
        ServerMsg::PlayerLeave(_) => server_msg::Payload::PlayerLeave(wire::PlayerLeave {}),
        ServerMsg::PlayerState(m) => server_msg::Payload::PlayerState(wire::PlayerStateUpdate {
            state: Some(to_wire_state(&m.state)),
        }),
        ServerMsg::PlayerParameters(m) => {
            server_msg::Payload::PlayerParameters(wire::PlayerParameters {
                params: m.params.clone(),
            })
        }
        ServerMsg::PlayerLocation(m) => server_msg::Payload::PlayerLocation(wire::PlayerLocation {
            position: Some(to_wire_vec(m.position)),
            rotation: Some(to_wire_quat(m.rotation)),
        }),
        ServerMsg::PlayerSpawn(m) => server_msg::Payload::PlayerSpawn(wire::PlayerSpawn {
            position: Some(to_wire_vec(m.position)),
            rotation: Some(to_wire_quat(m.rotation)),
        }),
        ServerMsg::PlayerDeath(m) => server_msg::Payload::PlayerDeath(wire::PlayerDeath {
            killer_id: m.killer_id,
        }),
        ServerMsg::CreateShot(m) => server_msg::Payload::CreateShot(wire::CreateShot {
            shot_id: m.global_shot_id,
            position: Some(to_wire_vec(m.position)),
            velocity: Some(to_wire_vec(m.velocity)),
        }),
        ServerMsg::RemoveShot(m) => server_msg::Payload::RemoveShot(wire::RemoveShot {
            shot_id: m.shot_id,
            is_global_id: m.is_global_id,
        }),
        ServerMsg::Init(m) => server_msg::Payload::Init(wire::ServerInit {
            server_name: m.server_name.clone(),
            world_name: m.world_name.clone(),
            protocol_version: m.protocol_version,
            default_player_params: m.default_player_params.clone(),
            world_data: m.world_data.clone(),
        }),
        ServerMsg::Chat(m) => server_msg::Payload::Chat(wire::Chat {
            to_id: m.to_id,
            text: m.text.clone(),
        }),
    };

    let envelope = wire::ServerMsg {
        client_id: msg.client_id(),
        payload: Some(payload),
    };
    frame(&envelope, "server message")
}

pub fn decode_server_msg(data: &[u8]) -> Result<ServerMsg, CodecError> {
    let envelope = wire::ServerMsg::decode(unframe(data)?)?;
    let client_id = envelope.client_id;

    let msg = match envelope.payload.ok_or(CodecError::MissingPayload)? {
        server_msg::Payload::PlayerJoin(p) => ServerMsg::PlayerJoin(ServerPlayerJoin {
            client_id,
            ip: p.ip,
            name: p.name,
            state: from_wire_state(p.state),
        }),
        server_msg::Payload::PlayerLeave(_) => {
            ServerMsg::PlayerLeave(ServerPlayerLeave { client_id })
        }
        server_msg::Payload::PlayerState(p) => ServerMsg::PlayerState(ServerPlayerState {
            client_id,
            state: from_wire_state(p.state),
        }),
        server_msg::Payload::PlayerParameters(p) => {
            ServerMsg::PlayerParameters(ServerPlayerParameters {
                client_id,
                params: p.params,
            })
        }
        server_msg::Payload::PlayerLocation(p) => {
            ServerMsg::PlayerLocation(ServerPlayerLocation {
                client_id,
                position: from_wire_vec(p.position),
                rotation: from_wire_quat(p.rotation),
            })
        }
        server_msg::Payload::PlayerSpawn(p) => ServerMsg::PlayerSpawn(ServerPlayerSpawn {
            client_id,
            position: from_wire_vec(p.position),
            rotation: from_wire_quat(p.rotation),
        }),
        server_msg::Payload::PlayerDeath(p) => ServerMsg::PlayerDeath(ServerPlayerDeath {
            client_id,
            killer_id: p.killer_id,
        }),
        server_msg::Payload::CreateShot(p) => ServerMsg::CreateShot(ServerCreateShot {
            client_id,
            global_shot_id: p.shot_id,
            position: from_wire_vec(p.position),
            velocity: from_wire_vec(p.velocity),
        }),
        server_msg::Payload::RemoveShot(p) => ServerMsg::RemoveShot(ServerRemoveShot {
            client_id,
            shot_id: p.shot_id,
            is_global_id: p.is_global_id,
        }),
        server_msg::Payload::Init(p) => ServerMsg::Init(ServerInit {
            client_id,
            server_name: p.server_name,
            world_name: p.world_name,
            protocol_version: p.protocol_version,
            default_player_params: p.default_player_params,
            world_data: p.world_data,
        }),
        server_msg::Payload::Chat(p) => ServerMsg::Chat(ServerChat {
            client_id,
            to_id: p.to_id,
            text: p.text,
        }),
    };

    Ok(msg)
}
