use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use glam::{Quat, Vec3};

use karma::net::{
    BROADCAST_CLIENT_ID, ClientChat, ClientCreateShot, ClientId, ClientInit, ClientPlayerJoin,
    ClientPlayerLeave, ClientPlayerLocation, ClientRequestPlayerSpawn, EnetServerTransport,
    PROTOCOL_VERSION, PlayerState, SERVER_CLIENT_ID, ServerChat, ServerCreateShot, ServerInit,
    ServerNetwork, ServerPlayerJoin, ServerPlayerLeave, ServerPlayerLocation,
    ServerPlayerParameters, ServerPlayerSpawn, ServerPlayerState, ServerRemoveShot,
    ServerTransport,
};

use crate::config::ServerConfig;
use crate::events::ServerEvent;

#[derive(Debug, Clone)]
struct Player {
    ip: String,
    state: PlayerState,
}

#[derive(Debug, Clone, Copy)]
struct LiveShot {
    global_id: u32,
    local_id: u32,
    owner: ClientId,
    expires_at: u64,
}

pub struct GameServer<T: ServerTransport = EnetServerTransport> {
    network: ServerNetwork<T>,
    config: ServerConfig,
    world_data: Vec<u8>,
    players: BTreeMap<ClientId, Player>,
    shots: Vec<LiveShot>,
    next_shot_id: u32,
    next_spawn_point: usize,
    tick: u64,
    tick_duration: Duration,
    last_tick_time: Instant,
    accumulator: Duration,
    running: Arc<AtomicBool>,
    start_time: Instant,
    pending_events: VecDeque<ServerEvent>,
}

impl GameServer<EnetServerTransport> {
    pub fn bind(config: ServerConfig) -> anyhow::Result<Self> {
        let world_data = config.world_data()?;
        let network = ServerNetwork::new(config.port, config.max_clients)?;
        Ok(Self::with_network(network, config, world_data))
    }

    pub fn local_port(&self) -> u16 {
        self.network.transport().local_addr().port()
    }
}

impl<T: ServerTransport> GameServer<T> {
    pub fn with_network(
        network: ServerNetwork<T>,
        config: ServerConfig,
        world_data: Vec<u8>,
    ) -> Self {
        Self {
            network,
            tick_duration: config.tick_duration(),
            config,
            world_data,
            players: BTreeMap::new(),
            shots: Vec::new(),
            next_shot_id: 0,
            next_spawn_point: 0,
            tick: 0,
            last_tick_time: Instant::now(),
            accumulator: Duration::ZERO,
            running: Arc::new(AtomicBool::new(true)),
            start_time: Instant::now(),
            pending_events: VecDeque::new(),
        }
    }

    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = ServerEvent> + '_ {
        self.pending_events.drain(..)
    }

    pub fn run(&mut self) {
        while self.running.load(Ordering::SeqCst) {
            self.tick_once();
            std::thread::sleep(Duration::from_millis(1));
        }
        self.shutdown_connections();
    }

    pub fn shutdown_connections(&mut self) {
        for client_id in self.network.clients() {
            self.network.disconnect_client(client_id);
        }
    }

    pub fn kick_client(&mut self, client_id: ClientId) {
        if !self.network.is_connected(client_id) {
            return;
        }
        log::info!("Kicking client {}", client_id);
        self.network.disconnect_client(client_id);
        self.pending_events
            .push_back(ServerEvent::ClientKicked { client_id });
    }

    pub fn tick_once(&mut self) {
        let now = Instant::now();
        let delta = now - self.last_tick_time;
        self.last_tick_time = now;
        self.accumulator += delta;

        while self.accumulator >= self.tick_duration {
            self.accumulator -= self.tick_duration;
            self.tick();
        }
    }

    fn tick(&mut self) {
        self.tick += 1;
        self.network.update();

        // Leaves go last so a join and a drop in the same tick still pair up.
        for init in self.network.consume_messages(|_: &ClientInit| true) {
            self.handle_init(init);
        }
        for join in self.network.consume_messages(|_: &ClientPlayerJoin| true) {
            self.handle_join(join);
        }
        for spawn in self.network.consume_messages(|_: &ClientRequestPlayerSpawn| true) {
            self.handle_spawn_request(spawn);
        }
        for location in self.network.consume_messages(|_: &ClientPlayerLocation| true) {
            self.handle_location(location);
        }
        for shot in self.network.consume_messages(|_: &ClientCreateShot| true) {
            self.handle_create_shot(shot);
        }
        for chat in self.network.consume_messages(|_: &ClientChat| true) {
            self.handle_chat(chat);
        }
        for leave in self.network.consume_messages(|_: &ClientPlayerLeave| true) {
            self.handle_leave(leave);
        }

        self.expire_shots();
        self.network.flush_peeked_messages();
    }

    fn handle_init(&mut self, init: ClientInit) {
        if init.protocol_version != PROTOCOL_VERSION {
            let reason = format!(
                "protocol version {} does not match server version {}",
                init.protocol_version, PROTOCOL_VERSION
            );
            log::warn!("Client {} rejected: {}", init.client_id, reason);
            self.network.disconnect_client(init.client_id);
            self.pending_events.push_back(ServerEvent::ClientRejected {
                client_id: init.client_id,
                reason,
            });
            return;
        }

        log::debug!("Client {} initialised as '{}'", init.client_id, init.name);
        self.network.send(
            init.client_id,
            ServerInit {
                client_id: init.client_id,
                server_name: self.config.server_name.clone(),
                world_name: self.config.world_name.clone(),
                protocol_version: PROTOCOL_VERSION,
                default_player_params: self.config.default_params.clone(),
                world_data: self.world_data.clone(),
            },
            true,
        );
    }

    fn handle_join(&mut self, join: ClientPlayerJoin) {
        let client_id = join.client_id;
        if self.players.contains_key(&client_id) {
            log::warn!("Client {} sent a second join, ignoring", client_id);
            return;
        }

        for (&other_id, other) in &self.players {
            self.network.send(
                client_id,
                ServerPlayerState {
                    client_id: other_id,
                    state: other.state.clone(),
                },
                false,
            );
        }

        let state = PlayerState {
            name: join.name.clone(),
            params: self.config.default_params.clone(),
            ..Default::default()
        };

        self.network.send_except(
            client_id,
            ServerPlayerJoin {
                client_id,
                ip: join.ip.clone(),
                name: join.name.clone(),
                state: state.clone(),
            },
            false,
        );
        self.network.send(
            client_id,
            ServerPlayerParameters {
                client_id,
                params: state.params.clone(),
            },
            false,
        );

        log::info!("Client {} joined as '{}' from {}", client_id, join.name, join.ip);
        self.pending_events.push_back(ServerEvent::ClientJoined {
            client_id,
            name: join.name,
            ip: join.ip.clone(),
        });
        self.players.insert(client_id, Player { ip: join.ip, state });
    }

    fn handle_leave(&mut self, leave: ClientPlayerLeave) {
        let client_id = leave.client_id;

        // An explicit leave followed by the transport drop yields two leaves.
        let Some(player) = self.players.remove(&client_id) else {
            log::debug!("Client {} left without a joined player", client_id);
            return;
        };

        self.network
            .send_except(client_id, ServerPlayerLeave { client_id }, false);
        log::info!(
            "Client {} ('{}' from {}) left",
            client_id,
            player.state.name,
            player.ip
        );
        self.pending_events.push_back(ServerEvent::ClientLeft {
            client_id,
            name: player.state.name,
        });
    }

    fn handle_spawn_request(&mut self, request: ClientRequestPlayerSpawn) {
        let client_id = request.client_id;
        if !self.players.contains_key(&client_id) {
            log::warn!("Spawn request from client {} before join", client_id);
            return;
        }

        let position = self.next_spawn_position();
        let Some(player) = self.players.get_mut(&client_id) else {
            return;
        };

        player.state.position = position;
        player.state.rotation = Quat::IDENTITY;
        player.state.velocity = Vec3::ZERO;
        player.state.alive = true;

        self.network.send_all(
            ServerPlayerSpawn {
                client_id,
                position,
                rotation: Quat::IDENTITY,
            },
            false,
        );
    }

    fn next_spawn_position(&mut self) -> Vec3 {
        if self.config.spawn_points.is_empty() {
            return Vec3::ZERO;
        }
        let index = self.next_spawn_point % self.config.spawn_points.len();
        self.next_spawn_point = self.next_spawn_point.wrapping_add(1);
        self.config.spawn_points[index]
    }

    fn handle_location(&mut self, location: ClientPlayerLocation) {
        let client_id = location.client_id;
        let Some(player) = self.players.get_mut(&client_id) else {
            return;
        };

        player.state.position = location.position;
        player.state.rotation = location.rotation;

        self.network.send_except(
            client_id,
            ServerPlayerLocation {
                client_id,
                position: location.position,
                rotation: location.rotation,
            },
            false,
        );
    }

    fn handle_create_shot(&mut self, shot: ClientCreateShot) {
        let client_id = shot.client_id;
        if !self.players.contains_key(&client_id) {
            log::warn!("Shot from client {} before join", client_id);
            return;
        }

        self.next_shot_id = self.next_shot_id.wrapping_add(1);
        let global_id = self.next_shot_id;
        self.shots.push(LiveShot {
            global_id,
            local_id: shot.local_shot_id,
            owner: client_id,
            expires_at: self.tick + self.config.shot_lifetime_ticks(),
        });

        self.network.send_except(
            client_id,
            ServerCreateShot {
                client_id,
                global_shot_id: global_id,
                position: shot.position,
                velocity: shot.velocity,
            },
            false,
        );
    }

    fn expire_shots(&mut self) {
        let tick = self.tick;
        let (expired, live): (Vec<LiveShot>, Vec<LiveShot>) =
            self.shots.drain(..).partition(|shot| shot.expires_at <= tick);
        self.shots = live;

        for shot in expired {
            // The owner only knows its own local id.
            if self.network.is_connected(shot.owner) {
                self.network.send(
                    shot.owner,
                    ServerRemoveShot {
                        client_id: shot.owner,
                        shot_id: shot.local_id,
                        is_global_id: false,
                    },
                    false,
                );
            }
            self.network.send_except(
                shot.owner,
                ServerRemoveShot {
                    client_id: shot.owner,
                    shot_id: shot.global_id,
                    is_global_id: true,
                },
                false,
            );
        }
    }

    fn handle_chat(&mut self, chat: ClientChat) {
        let msg = ServerChat {
            client_id: chat.client_id,
            to_id: chat.to_id,
            text: chat.text.clone(),
        };

        match chat.to_id {
            BROADCAST_CLIENT_ID => self.network.send_all(msg, false),
            SERVER_CLIENT_ID => {}
            to_id if self.network.is_connected(to_id) => self.network.send(to_id, msg, false),
            to_id => {
                log::warn!("Chat from client {} to unknown client {}", chat.client_id, to_id);
                return;
            }
        }

        log::info!("Chat [{} -> {}] {}", chat.client_id, chat.to_id, chat.text);
        self.pending_events.push_back(ServerEvent::Chat {
            from: chat.client_id,
            to: chat.to_id,
            text: chat.text,
        });
    }

    pub fn stats(&self) -> ServerStats {
        ServerStats {
            tick: self.tick,
            client_count: self.network.client_count(),
            max_clients: self.config.max_clients,
            player_count: self.players.len(),
            live_shots: self.shots.len(),
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }

    pub fn client_infos(&self) -> Vec<crate::tui::ClientInfo> {
        self.network
            .client_infos()
            .into_iter()
            .map(|info| {
                let player = self.players.get(&info.client_id);
                crate::tui::ClientInfo {
                    client_id: info.client_id,
                    addr: info.peer.to_string(),
                    name: player.map(|p| p.state.name.clone()),
                    alive: player.is_some_and(|p| p.state.alive),
                    connected_secs: info.connected_at.elapsed().as_secs(),
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ServerStats {
    pub tick: u64,
    pub client_count: usize,
    pub max_clients: usize,
    pub player_count: usize,
    pub live_shots: usize,
    pub uptime_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use karma::net::{
        ClientNetwork, MemoryClientTransport, MemoryNetwork, MemoryServerTransport,
    };

    type TestServer = GameServer<MemoryServerTransport>;
    type TestClient = ClientNetwork<MemoryClientTransport>;

    fn test_config() -> ServerConfig {
        ServerConfig {
            tick_rate: 10,
            shot_lifetime_secs: 0.15,
            spawn_points: vec![Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0)],
            ..Default::default()
        }
    }

    fn start(network: &MemoryNetwork) -> TestServer {
        let server_network = ServerNetwork::with_transport(network.server(8));
        GameServer::with_network(server_network, test_config(), vec![9, 9, 9])
    }

    fn join(
        network: &MemoryNetwork,
        server: &mut TestServer,
        name: &str,
        last_octet: u8,
    ) -> TestClient {
        let mut client =
            ClientNetwork::with_transport(network.client([10, 0, 0, last_octet].into()));
        assert!(client.connect("127.0.0.1", 5154, 100));
        client.send(
            ClientInit {
                client_id: 0,
                name: name.to_string(),
                protocol_version: PROTOCOL_VERSION,
            },
            false,
        );
        client.send(
            ClientPlayerJoin {
                client_id: 0,
                ip: String::new(),
                name: name.to_string(),
            },
            false,
        );
        server.tick();
        client.update();
        client
    }

    #[test]
    fn test_init_reply_carries_world() {
        let network = MemoryNetwork::new();
        let mut server = start(&network);
        let mut client = join(&network, &mut server, "alpha", 1);

        let init = client.consume_messages(|_: &ServerInit| true);
        assert_eq!(init.len(), 1);
        assert_eq!(init[0].client_id, 1);
        assert_eq!(init[0].world_data, vec![9, 9, 9]);
        assert_eq!(init[0].protocol_version, PROTOCOL_VERSION);

        let params = client.consume_messages(|_: &ServerPlayerParameters| true);
        assert_eq!(params[0].params, test_config().default_params);
        assert!(server.drain_events().any(|e| matches!(
            e,
            ServerEvent::ClientJoined { client_id: 1, ref ip, .. } if ip == "10.0.0.1"
        )));
    }

    #[test]
    fn test_protocol_mismatch_disconnects() {
        let network = MemoryNetwork::new();
        let mut server = start(&network);
        let mut client = ClientNetwork::with_transport(network.client([10, 0, 0, 7].into()));
        assert!(client.connect("127.0.0.1", 5154, 100));
        client.send(
            ClientInit {
                client_id: 0,
                name: "old".to_string(),
                protocol_version: PROTOCOL_VERSION + 1,
            },
            false,
        );

        server.tick();
        client.update();

        assert!(!client.is_connected());
        assert!(client.consume_disconnect_event().is_some());
        assert!(client.consume_messages(|_: &ServerInit| true).is_empty());
        assert!(server
            .drain_events()
            .any(|e| matches!(e, ServerEvent::ClientRejected { client_id: 1, .. })));
    }

    #[test]
    fn test_join_announces_both_ways() {
        let network = MemoryNetwork::new();
        let mut server = start(&network);
        let mut first = join(&network, &mut server, "alpha", 1);
        let mut second = join(&network, &mut server, "beta", 2);
        first.update();

        let announced = first.consume_messages(|_: &ServerPlayerJoin| true);
        assert_eq!(announced.len(), 1);
        assert_eq!(announced[0].client_id, 2);
        assert_eq!(announced[0].name, "beta");
        assert_eq!(announced[0].ip, "10.0.0.2");

        let existing = second.consume_messages(|_: &ServerPlayerState| true);
        assert_eq!(existing.len(), 1);
        assert_eq!(existing[0].client_id, 1);
        assert_eq!(existing[0].state.name, "alpha");
        assert!(second.consume_messages(|_: &ServerPlayerJoin| true).is_empty());
    }

    #[test]
    fn test_drop_broadcasts_leave_once() {
        let network = MemoryNetwork::new();
        let mut server = start(&network);
        let mut first = join(&network, &mut server, "alpha", 1);
        let mut second = join(&network, &mut server, "beta", 2);

        second.send(ClientPlayerLeave::default(), false);
        second.disconnect();
        server.tick();
        first.update();

        let leaves = first.consume_messages(|_: &ServerPlayerLeave| true);
        assert_eq!(leaves, vec![ServerPlayerLeave { client_id: 2 }]);
        assert_eq!(server.stats().player_count, 1);
    }

    #[test]
    fn test_spawn_points_round_robin() {
        let network = MemoryNetwork::new();
        let mut server = start(&network);
        let mut client = join(&network, &mut server, "alpha", 1);

        for _ in 0..3 {
            client.send(ClientRequestPlayerSpawn::default(), false);
            server.tick();
        }
        client.update();

        let spawns: Vec<f32> = client
            .consume_messages(|_: &ServerPlayerSpawn| true)
            .iter()
            .map(|s| s.position.x)
            .collect();
        assert_eq!(spawns, vec![1.0, 2.0, 1.0]);
    }

    #[test]
    fn test_location_relayed_to_others_only() {
        let network = MemoryNetwork::new();
        let mut server = start(&network);
        let mut first = join(&network, &mut server, "alpha", 1);
        let mut second = join(&network, &mut server, "beta", 2);

        first.send(
            ClientPlayerLocation {
                client_id: 0,
                position: Vec3::new(3.0, 4.0, 5.0),
                rotation: Quat::IDENTITY,
            },
            false,
        );
        server.tick();
        first.update();
        second.update();

        assert!(first.consume_messages(|_: &ServerPlayerLocation| true).is_empty());
        let relayed = second.consume_messages(|_: &ServerPlayerLocation| true);
        assert_eq!(relayed[0].client_id, 1);
        assert_eq!(relayed[0].position, Vec3::new(3.0, 4.0, 5.0));
    }

    #[test]
    fn test_shots_relay_and_expire() {
        let network = MemoryNetwork::new();
        let mut server = start(&network);
        let mut shooter = join(&network, &mut server, "alpha", 1);
        let mut target = join(&network, &mut server, "beta", 2);

        shooter.send(
            ClientCreateShot {
                client_id: 0,
                local_shot_id: 17,
                position: Vec3::ZERO,
                velocity: Vec3::X,
            },
            false,
        );
        server.tick();
        target.update();

        let created = target.consume_messages(|_: &ServerCreateShot| true);
        assert_eq!(created.len(), 1);
        let global_id = created[0].global_shot_id;
        assert_eq!(server.stats().live_shots, 1);

        // 0.15s at 10Hz rounds up to two ticks.
        server.tick();
        server.tick();
        assert_eq!(server.stats().live_shots, 0);

        shooter.update();
        target.update();
        let own = shooter.consume_messages(|_: &ServerRemoveShot| true);
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].shot_id, 17);
        assert!(!own[0].is_global_id);

        let other = target.consume_messages(|_: &ServerRemoveShot| true);
        assert_eq!(other.len(), 1);
        assert_eq!(other[0].shot_id, global_id);
        assert!(other[0].is_global_id);
    }

    #[test]
    fn test_chat_routing() {
        let network = MemoryNetwork::new();
        let mut server = start(&network);
        let mut first = join(&network, &mut server, "alpha", 1);
        let mut second = join(&network, &mut server, "beta", 2);
        let mut third = join(&network, &mut server, "gamma", 3);

        first.send(
            ClientChat {
                client_id: 0,
                to_id: 3,
                text: "psst".to_string(),
            },
            false,
        );
        first.send(
            ClientChat {
                client_id: 0,
                to_id: BROADCAST_CLIENT_ID,
                text: "hello all".to_string(),
            },
            false,
        );
        server.tick();
        for client in [&mut first, &mut second, &mut third] {
            client.update();
        }

        let texts = |client: &mut TestClient| -> Vec<String> {
            client
                .consume_messages(|_: &ServerChat| true)
                .into_iter()
                .map(|c| c.text)
                .collect()
        };
        assert_eq!(texts(&mut first), vec!["hello all"]);
        assert_eq!(texts(&mut second), vec!["hello all"]);
        assert_eq!(texts(&mut third), vec!["psst", "hello all"]);
    }

    #[test]
    fn test_kick_removes_player() {
        let network = MemoryNetwork::new();
        let mut server = start(&network);
        let mut client = join(&network, &mut server, "alpha", 1);

        server.kick_client(1);
        server.tick();
        client.update();

        assert!(!client.is_connected());
        assert_eq!(server.stats().client_count, 0);
        assert_eq!(server.stats().player_count, 0);
        let events: Vec<ServerEvent> = server.drain_events().collect();
        assert!(events.iter().any(|e| matches!(e, ServerEvent::ClientKicked { client_id: 1 })));
        assert!(events.iter().any(|e| matches!(e, ServerEvent::ClientLeft { client_id: 1, .. })));
    }
}
