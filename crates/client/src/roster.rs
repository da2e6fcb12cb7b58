use std::collections::BTreeMap;

use glam::{Quat, Vec3};
use karma::net::{
    ClientId, PlayerState, ServerPlayerJoin, ServerPlayerLocation, ServerPlayerSpawn,
    ServerPlayerState,
};

#[derive(Debug, Clone, PartialEq)]
pub struct RemotePlayer {
    pub name: String,
    pub ip: Option<String>,
    pub position: Vec3,
    pub rotation: Quat,
    pub alive: bool,
    pub score: i32,
}

impl RemotePlayer {
    fn from_state(state: &PlayerState) -> Self {
        Self {
            name: state.name.clone(),
            ip: None,
            position: state.position,
            rotation: state.rotation,
            alive: state.alive,
            score: state.score,
        }
    }
}

/// Other players as last reported by the server.
#[derive(Debug, Default)]
pub struct Roster {
    players: BTreeMap<ClientId, RemotePlayer>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_join(&mut self, join: &ServerPlayerJoin) {
        let mut player = RemotePlayer::from_state(&join.state);
        player.name = join.name.clone();
        player.ip = Some(join.ip.clone()).filter(|ip| !ip.is_empty());
        self.players.insert(join.client_id, player);
    }

    pub fn apply_state(&mut self, update: &ServerPlayerState) {
        let ip = self
            .players
            .get(&update.client_id)
            .and_then(|p| p.ip.clone());
        let mut player = RemotePlayer::from_state(&update.state);
        player.ip = ip;
        self.players.insert(update.client_id, player);
    }

    pub fn apply_leave(&mut self, client_id: ClientId) -> Option<RemotePlayer> {
        self.players.remove(&client_id)
    }

    pub fn apply_location(&mut self, location: &ServerPlayerLocation) {
        if let Some(player) = self.players.get_mut(&location.client_id) {
            player.position = location.position;
            player.rotation = location.rotation;
        }
    }

    pub fn apply_spawn(&mut self, spawn: &ServerPlayerSpawn) {
        if let Some(player) = self.players.get_mut(&spawn.client_id) {
            player.position = spawn.position;
            player.rotation = spawn.rotation;
            player.alive = true;
        }
    }

    pub fn apply_death(&mut self, client_id: ClientId) {
        if let Some(player) = self.players.get_mut(&client_id) {
            player.alive = false;
        }
    }

    pub fn get(&self, client_id: ClientId) -> Option<&RemotePlayer> {
        self.players.get(&client_id)
    }

    pub fn name_of(&self, client_id: ClientId) -> Option<&str> {
        self.get(client_id).map(|p| p.name.as_str())
    }

    pub fn alive_count(&self) -> usize {
        self.players.values().filter(|p| p.alive).count()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join(client_id: ClientId, name: &str) -> ServerPlayerJoin {
        ServerPlayerJoin {
            client_id,
            ip: "10.0.0.2".to_string(),
            name: name.to_string(),
            state: PlayerState {
                name: name.to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_join_spawn_move_leave() {
        let mut roster = Roster::new();
        roster.apply_join(&join(2, "beta"));
        assert_eq!(roster.name_of(2), Some("beta"));
        assert!(!roster.get(2).unwrap().alive);

        roster.apply_spawn(&ServerPlayerSpawn {
            client_id: 2,
            position: Vec3::new(5.0, 0.0, 5.0),
            rotation: Quat::IDENTITY,
        });
        roster.apply_location(&ServerPlayerLocation {
            client_id: 2,
            position: Vec3::new(6.0, 0.0, 5.0),
            rotation: Quat::IDENTITY,
        });

        let player = roster.get(2).unwrap();
        assert!(player.alive);
        assert_eq!(player.position.x, 6.0);

        roster.apply_death(2);
        assert!(!roster.get(2).unwrap().alive);

        let gone = roster.apply_leave(2).unwrap();
        assert_eq!(gone.ip.as_deref(), Some("10.0.0.2"));
        assert!(roster.is_empty());
    }

    #[test]
    fn test_state_update_keeps_known_ip() {
        let mut roster = Roster::new();
        roster.apply_join(&join(3, "gamma"));
        roster.apply_state(&ServerPlayerState {
            client_id: 3,
            state: PlayerState {
                name: "gamma".to_string(),
                score: 4,
                alive: true,
                ..Default::default()
            },
        });

        let player = roster.get(3).unwrap();
        assert_eq!(player.score, 4);
        assert_eq!(player.ip.as_deref(), Some("10.0.0.2"));
    }

    #[test]
    fn test_updates_for_unknown_players_are_ignored() {
        let mut roster = Roster::new();
        roster.apply_location(&ServerPlayerLocation {
            client_id: 9,
            ..Default::default()
        });
        roster.apply_death(9);
        assert!(roster.is_empty());
        assert!(roster.apply_leave(9).is_none());
    }
}
