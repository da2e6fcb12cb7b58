//! Property tests for the codec and the server-side bookkeeping.

use std::collections::HashSet;

use glam::{Quat, Vec3};
use karma::net::codec::{
    decode_client_msg, decode_server_msg, encode_client_msg, encode_server_msg,
};
use karma::net::{
    ClientChat, ClientCreateShot, ClientInit, ClientMsg, ClientPlayerJoin, ClientPlayerLeave,
    ClientPlayerLocation, ClientRequestPlayerSpawn, ConnectionManager, MessageBuffer, PeerAddr,
    PlayerParameters, PlayerState, ServerChat, ServerCreateShot, ServerInit, ServerMsg,
    ServerPlayerDeath, ServerPlayerJoin, ServerPlayerLeave, ServerPlayerLocation,
    ServerPlayerParameters, ServerPlayerSpawn, ServerPlayerState, ServerRemoveShot,
};
use proptest::prelude::*;

fn finite() -> impl Strategy<Value = f32> {
    -1.0e6f32..1.0e6f32
}

fn vec3() -> impl Strategy<Value = Vec3> {
    (finite(), finite(), finite()).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

fn quat() -> impl Strategy<Value = Quat> {
    (finite(), finite(), finite(), finite()).prop_map(|(x, y, z, w)| Quat::from_xyzw(x, y, z, w))
}

fn text() -> impl Strategy<Value = String> {
    ".{0,64}"
}

fn params() -> impl Strategy<Value = PlayerParameters> {
    prop::collection::hash_map("[a-zA-Z_]{1,12}", finite(), 0..8)
}

fn player_state() -> impl Strategy<Value = PlayerState> {
    (
        text(),
        vec3(),
        quat(),
        vec3(),
        any::<bool>(),
        any::<i32>(),
        params(),
    )
        .prop_map(|(name, position, rotation, velocity, alive, score, params)| PlayerState {
            name,
            position,
            rotation,
            velocity,
            alive,
            score,
            params,
        })
}

fn client_msg() -> impl Strategy<Value = ClientMsg> {
    let id = any::<u32>();
    prop_oneof![
        (id.clone(), text(), any::<u32>()).prop_map(|(client_id, name, protocol_version)| {
            ClientMsg::from(ClientInit { client_id, name, protocol_version })
        }),
        (id.clone(), any::<u32>(), text())
            .prop_map(|(client_id, to_id, text)| ClientMsg::from(ClientChat { client_id, to_id, text })),
        (id.clone(), vec3(), quat()).prop_map(|(client_id, position, rotation)| {
            ClientMsg::from(ClientPlayerLocation { client_id, position, rotation })
        }),
        id.clone()
            .prop_map(|client_id| ClientMsg::from(ClientRequestPlayerSpawn { client_id })),
        (id.clone(), any::<u32>(), vec3(), vec3()).prop_map(
            |(client_id, local_shot_id, position, velocity)| {
                ClientMsg::from(ClientCreateShot { client_id, local_shot_id, position, velocity })
            }
        ),
        (id.clone(), "[0-9.]{0,15}", text())
            .prop_map(|(client_id, ip, name)| ClientMsg::from(ClientPlayerJoin { client_id, ip, name })),
        id.prop_map(|client_id| ClientMsg::from(ClientPlayerLeave { client_id })),
    ]
}

fn server_msg() -> impl Strategy<Value = ServerMsg> {
    let id = any::<u32>();
    prop_oneof![
        (id.clone(), "[0-9.]{0,15}", text(), player_state()).prop_map(
            |(client_id, ip, name, state)| ServerMsg::from(ServerPlayerJoin { client_id, ip, name, state })
        ),
        id.clone()
            .prop_map(|client_id| ServerMsg::from(ServerPlayerLeave { client_id })),
        (id.clone(), player_state())
            .prop_map(|(client_id, state)| ServerMsg::from(ServerPlayerState { client_id, state })),
        (id.clone(), params())
            .prop_map(|(client_id, params)| ServerMsg::from(ServerPlayerParameters { client_id, params })),
        (id.clone(), vec3(), quat()).prop_map(|(client_id, position, rotation)| {
            ServerMsg::from(ServerPlayerLocation { client_id, position, rotation })
        }),
        (id.clone(), vec3(), quat()).prop_map(|(client_id, position, rotation)| {
            ServerMsg::from(ServerPlayerSpawn { client_id, position, rotation })
        }),
        (id.clone(), any::<u32>())
            .prop_map(|(client_id, killer_id)| ServerMsg::from(ServerPlayerDeath { client_id, killer_id })),
        (id.clone(), any::<u32>(), vec3(), vec3()).prop_map(
            |(client_id, global_shot_id, position, velocity)| {
                ServerMsg::from(ServerCreateShot { client_id, global_shot_id, position, velocity })
            }
        ),
        (id.clone(), any::<u32>(), any::<bool>()).prop_map(
            |(client_id, shot_id, is_global_id)| {
                ServerMsg::from(ServerRemoveShot { client_id, shot_id, is_global_id })
            }
        ),
        (
            id.clone(),
            text(),
            text(),
            any::<u32>(),
            params(),
            prop::collection::vec(any::<u8>(), 0..4096),
        )
            .prop_map(
                |(client_id, server_name, world_name, protocol_version, params, world_data)| {
                    ServerMsg::from(ServerInit {
                        client_id,
                        server_name,
                        world_name,
                        protocol_version,
                        default_player_params: params,
                        world_data,
                    })
                }
            ),
        (id, any::<u32>(), text())
            .prop_map(|(client_id, to_id, text)| ServerMsg::from(ServerChat { client_id, to_id, text })),
    ]
}

proptest! {
    /// Arbitrary bytes never panic either decoder.
    #[test]
    fn arbitrary_bytes_dont_crash_decoders(
        random_bytes in prop::collection::vec(any::<u8>(), 0..2000),
    ) {
        let _ = decode_client_msg(&random_bytes);
        let _ = decode_server_msg(&random_bytes);
    }

    #[test]
    fn every_client_message_roundtrips(msg in client_msg()) {
        let decoded = decode_client_msg(&encode_client_msg(&msg).unwrap()).unwrap();
        prop_assert_eq!(msg, decoded);
    }

    #[test]
    fn every_server_message_roundtrips(msg in server_msg()) {
        let decoded = decode_server_msg(&encode_server_msg(&msg).unwrap()).unwrap();
        prop_assert_eq!(msg, decoded);
    }

    /// Any truncation of a valid frame is rejected rather than misread.
    #[test]
    fn truncated_frames_are_rejected(name in "[a-z]{1,40}", cut in any::<prop::sample::Index>()) {
        let frame = encode_client_msg(&ClientMsg::PlayerJoin(ClientPlayerJoin {
            client_id: 0,
            ip: String::new(),
            name,
        }))
        .unwrap();
        let cut = cut.index(frame.len());
        prop_assert!(decode_client_msg(&frame[..cut]).is_err());
    }

    /// Successive consumes with disjoint predicates partition the buffer.
    #[test]
    fn disjoint_consumes_partition_buffer(ids in prop::collection::vec(0u32..6, 0..64)) {
        let mut buffer = MessageBuffer::new();
        for (n, &client_id) in ids.iter().enumerate() {
            buffer.push(ClientMsg::Chat(ClientChat { client_id, to_id: 0, text: n.to_string() }));
        }

        let even = buffer.consume(|c: &ClientChat| c.client_id % 2 == 0);
        let odd = buffer.consume(|c: &ClientChat| c.client_id % 2 == 1);

        prop_assert_eq!(even.len() + odd.len(), ids.len());
        prop_assert!(buffer.is_empty());

        let order: Vec<usize> = even.iter().map(|c| c.text.parse().unwrap()).collect();
        prop_assert!(order.windows(2).all(|w| w[0] < w[1]));
    }

    /// Live ids are unique, never zero, and a new client takes the lowest free id.
    #[test]
    fn ids_are_unique_and_lowest_free(ops in prop::collection::vec(any::<bool>(), 1..80)) {
        let mut manager = ConnectionManager::new();
        let mut next_connection = 0usize;
        let mut live: Vec<usize> = Vec::new();

        for connect in ops {
            if connect || live.is_empty() {
                let expected = (1..).find(|id| manager.connection_for(*id).is_none()).unwrap();
                next_connection += 1;
                let id = manager.register(next_connection, PeerAddr::default());
                prop_assert_eq!(id, expected);
                live.push(next_connection);
            } else {
                let connection = live.remove(live.len() / 2);
                prop_assert!(manager.remove_connection(connection).is_some());
            }

            let ids = manager.client_ids();
            let unique: HashSet<u32> = ids.iter().copied().collect();
            prop_assert_eq!(unique.len(), ids.len());
            prop_assert!(!ids.contains(&0));
            prop_assert_eq!(ids.len(), live.len());
        }
    }
}
