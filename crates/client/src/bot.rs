use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use glam::{Quat, Vec3};

use karma::net::{
    BROADCAST_CLIENT_ID, ClientChat, ClientCreateShot, ClientId, ClientInit, ClientNetwork,
    ClientPlayerJoin, ClientPlayerLeave, ClientPlayerLocation, ClientRequestPlayerSpawn,
    ClientTransport, DisconnectEvent, EnetClientTransport, PROTOCOL_VERSION,
    PlayerParameters, ServerChat, ServerCreateShot, ServerInit, ServerPlayerDeath,
    ServerPlayerJoin, ServerPlayerLeave, ServerPlayerLocation, ServerPlayerParameters,
    ServerPlayerSpawn, ServerPlayerState, ServerRemoveShot,
};

use crate::config::ClientConfig;
use crate::roster::Roster;

const STEP_INTERVAL: Duration = Duration::from_millis(5);
const CIRCLE_RADIUS: f32 = 4.0;

/// Headless player: joins, spawns, walks in a circle and reports what it sees.
pub struct Bot<T: ClientTransport = EnetClientTransport> {
    network: ClientNetwork<T>,
    config: ClientConfig,
    client_id: Option<ClientId>,
    roster: Roster,
    params: PlayerParameters,
    spawn_point: Vec3,
    position: Vec3,
    alive: bool,
    greeted: bool,
    next_local_shot: u32,
    last_location: Option<Instant>,
    started: Instant,
    disconnect: Option<DisconnectEvent>,
}

impl Bot<EnetClientTransport> {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_network(ClientNetwork::new(), config)
    }
}

impl<T: ClientTransport> Bot<T> {
    pub fn with_network(network: ClientNetwork<T>, config: ClientConfig) -> Self {
        Self {
            network,
            config,
            client_id: None,
            roster: Roster::new(),
            params: PlayerParameters::new(),
            spawn_point: Vec3::ZERO,
            position: Vec3::ZERO,
            alive: false,
            greeted: false,
            next_local_shot: 0,
            last_location: None,
            started: Instant::now(),
            disconnect: None,
        }
    }

    pub fn connect(&mut self) -> Result<()> {
        let ClientConfig {
            host,
            port,
            connect_timeout_ms,
            ..
        } = &self.config;

        if !self.network.connect(host, *port, *connect_timeout_ms) {
            bail!("Could not connect to {}:{}", host, port);
        }

        self.started = Instant::now();
        self.network.send(
            ClientInit {
                client_id: 0,
                name: self.config.name.clone(),
                protocol_version: PROTOCOL_VERSION,
            },
            true,
        );
        Ok(())
    }

    /// Steps until the server drops us or the configured duration passes,
    /// then leaves cleanly if still connected.
    pub fn run(&mut self) -> Option<DisconnectEvent> {
        loop {
            let now = Instant::now();
            if !self.step(now) {
                break;
            }
            if self
                .config
                .duration
                .is_some_and(|duration| now.duration_since(self.started) >= duration)
            {
                self.leave();
                break;
            }
            thread::sleep(STEP_INTERVAL);
        }
        self.disconnect.take()
    }

    fn leave(&mut self) {
        log::info!("Leaving server");
        self.network.send(ClientPlayerLeave::default(), true);
        self.network.disconnect();

        let deadline = Instant::now() + Duration::from_secs(1);
        while self.disconnect.is_none() && Instant::now() < deadline {
            self.network.update();
            self.disconnect = self.network.consume_disconnect_event();
            thread::sleep(STEP_INTERVAL);
        }
    }

    /// Processes everything received since the last step. Returns false once
    /// the connection is gone.
    pub fn step(&mut self, now: Instant) -> bool {
        self.network.update();

        for init in self.network.consume_messages(|_: &ServerInit| true) {
            self.handle_init(init);
        }
        for params in self.network.consume_messages(|_: &ServerPlayerParameters| true) {
            if Some(params.client_id) == self.client_id {
                self.params = params.params;
            }
        }
        for join in self.network.consume_messages(|_: &ServerPlayerJoin| true) {
            log::info!("{} joined (client {})", join.name, join.client_id);
            self.roster.apply_join(&join);
        }
        for update in self.network.consume_messages(|_: &ServerPlayerState| true) {
            self.roster.apply_state(&update);
        }
        for spawn in self.network.consume_messages(|_: &ServerPlayerSpawn| true) {
            self.handle_spawn(spawn);
        }
        for location in self.network.consume_messages(|_: &ServerPlayerLocation| true) {
            self.roster.apply_location(&location);
        }
        for death in self.network.consume_messages(|_: &ServerPlayerDeath| true) {
            self.handle_death(death);
        }
        for shot in self.network.consume_messages(|_: &ServerCreateShot| true) {
            log::debug!("Client {} fired shot {}", shot.client_id, shot.global_shot_id);
        }
        for removed in self.network.consume_messages(|_: &ServerRemoveShot| true) {
            log::debug!(
                "Shot {} removed ({})",
                removed.shot_id,
                if removed.is_global_id { "global" } else { "ours" }
            );
        }
        for chat in self.network.consume_messages(|_: &ServerChat| true) {
            let from = self
                .roster
                .name_of(chat.client_id)
                .map(str::to_string)
                .unwrap_or_else(|| format!("client {}", chat.client_id));
            log::info!("<{}> {}", from, chat.text);
        }
        for leave in self.network.consume_messages(|_: &ServerPlayerLeave| true) {
            if let Some(player) = self.roster.apply_leave(leave.client_id) {
                log::info!("{} left (score {})", player.name, player.score);
            }
        }
        self.network.flush_peeked_messages();

        if let Some(event) = self.network.consume_disconnect_event() {
            log::warn!("{}", event.reason);
            self.disconnect = Some(event);
            return false;
        }

        if self.alive {
            self.stream_location(now);
        }
        true
    }

    fn handle_init(&mut self, init: ServerInit) {
        log::info!(
            "Connected to '{}' (world '{}', {} bytes) as client {}",
            init.server_name,
            init.world_name,
            init.world_data.len(),
            init.client_id
        );
        self.client_id = Some(init.client_id);
        self.params = init.default_player_params;

        self.network.send(
            ClientPlayerJoin {
                client_id: 0,
                ip: String::new(),
                name: self.config.name.clone(),
            },
            false,
        );
        self.network.send(ClientRequestPlayerSpawn::default(), false);
    }

    fn handle_spawn(&mut self, spawn: ServerPlayerSpawn) {
        if Some(spawn.client_id) != self.client_id {
            self.roster.apply_spawn(&spawn);
            return;
        }

        log::info!("Spawned at {}", spawn.position);
        self.spawn_point = spawn.position;
        self.position = spawn.position;
        self.alive = true;

        if !self.greeted {
            self.greeted = true;
            if let Some(text) = self.config.chat.clone() {
                self.network.send(
                    ClientChat {
                        client_id: 0,
                        to_id: BROADCAST_CLIENT_ID,
                        text,
                    },
                    false,
                );
            }
            if self.config.fire_shot {
                self.fire_shot();
            }
        }
    }

    fn handle_death(&mut self, death: ServerPlayerDeath) {
        if Some(death.client_id) == self.client_id {
            log::info!("Killed by client {}", death.killer_id);
            self.alive = false;
            self.network.send(ClientRequestPlayerSpawn::default(), false);
        } else {
            self.roster.apply_death(death.client_id);
        }
    }

    fn fire_shot(&mut self) {
        self.next_local_shot += 1;
        let speed = self.params.get("shot_speed").copied().unwrap_or(100.0);
        self.network.send(
            ClientCreateShot {
                client_id: 0,
                local_shot_id: self.next_local_shot,
                position: self.position,
                velocity: Vec3::Z * speed,
            },
            false,
        );
    }

    fn stream_location(&mut self, now: Instant) {
        let due = self
            .last_location
            .is_none_or(|last| now.duration_since(last) >= self.config.location_interval());
        if !due {
            return;
        }
        self.last_location = Some(now);

        let angle = now.duration_since(self.started).as_secs_f32();
        self.position =
            self.spawn_point + Vec3::new(angle.cos(), 0.0, angle.sin()) * CIRCLE_RADIUS;
        self.network.send(
            ClientPlayerLocation {
                client_id: 0,
                position: self.position,
                rotation: Quat::from_rotation_y(-angle),
            },
            false,
        );
    }

    pub fn client_id(&self) -> Option<ClientId> {
        self.client_id
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }
}
