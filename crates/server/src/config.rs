use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use glam::Vec3;
use karma::net::{DEFAULT_MAX_CLIENTS, DEFAULT_PORT, PlayerParameters};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server_name: String,
    pub world_name: String,
    pub port: u16,
    pub max_clients: usize,
    pub tick_rate: u32,
    /// Raw bytes sent to every client in its `ServerInit`.
    pub world_file: Option<PathBuf>,
    pub default_params: PlayerParameters,
    /// Spawn positions handed out round-robin. Empty means the origin.
    pub spawn_points: Vec<Vec3>,
    pub shot_lifetime_secs: f32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_name: "KARMA server".to_string(),
            world_name: "arena".to_string(),
            port: DEFAULT_PORT,
            max_clients: DEFAULT_MAX_CLIENTS,
            tick_rate: 60,
            world_file: None,
            default_params: HashMap::from([
                ("speed".to_string(), 10.0),
                ("jump_velocity".to_string(), 19.0),
                ("shot_speed".to_string(), 100.0),
            ]),
            spawn_points: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(50.0, 0.0, 50.0),
                Vec3::new(-50.0, 0.0, 50.0),
                Vec3::new(-50.0, 0.0, -50.0),
                Vec3::new(50.0, 0.0, -50.0),
            ],
            shot_lifetime_secs: 5.0,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn world_data(&self) -> Result<Vec<u8>> {
        match &self.world_file {
            Some(path) => fs::read(path)
                .with_context(|| format!("Failed to read world file {}", path.display())),
            None => Ok(Vec::new()),
        }
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }

    /// Shot lifetime in whole ticks, at least one.
    pub fn shot_lifetime_ticks(&self) -> u64 {
        let ticks = (self.shot_lifetime_secs.max(0.0) * self.tick_rate.max(1) as f32).ceil();
        (ticks as u64).max(1)
    }
}
