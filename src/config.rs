use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::sim::constants::spatial;
use crate::util::vec2::Vec2;

/// Axis-aligned world rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl WorldBounds {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Bounds anchored at the origin
    pub fn from_size(width: f64, height: f64) -> Self {
        Self::new(Vec2::ZERO, Vec2::new(width, height))
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Uniformly distributed point inside the bounds
    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec2 {
        Vec2::new(
            rng.gen_range(self.min.x..=self.max.x),
            rng.gen_range(self.min.y..=self.max.y),
        )
    }

    /// Inclusive on every edge
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }
}

/// Simulation runner configuration
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// World width in world units
    pub world_width: f64,
    /// World height in world units
    pub world_height: f64,
    /// Number of ticks to run
    pub ticks: u64,
    /// Agents spawned at random positions every tick
    pub spawn_per_tick: usize,
    /// Lifetime of spawned agents, in seconds
    pub agent_lifetime: f64,
    /// Seed for the simulation RNG and the flow-field noise
    pub seed: u64,
    /// Flow-field cell size
    pub flow_res: f64,
    /// Spatial grid cell size
    pub grid_cell: f64,
    /// Simulated frame duration in milliseconds
    pub frame_ms: f64,
    /// Log population stats every N ticks
    pub log_every: u64,
    /// Write a JSON snapshot of the final agents here
    pub snapshot_path: Option<String>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            world_width: 800.0,
            world_height: 600.0,
            ticks: 600,
            spawn_per_tick: 20,
            agent_lifetime: 3.0,
            seed: 42,
            flow_res: 2.0,
            grid_cell: spatial::CELL_SIZE,
            frame_ms: 1000.0 / 60.0,
            log_every: 60,
            snapshot_path: None,
        }
    }
}

/// Parse `key` into `T`, keeping `None` for missing, unparseable or
/// rejected values. Anything set but unusable is logged.
fn env_value<T, F>(key: &str, accept: F, requirement: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&T) -> bool,
{
    let raw = std::env::var(key).ok()?;
    match raw.parse::<T>() {
        Ok(parsed) if accept(&parsed) => Some(parsed),
        Ok(_) => {
            tracing::warn!("{} must be {}, using default", key, requirement);
            None
        }
        Err(_) => {
            tracing::warn!("Invalid {} '{}', using default", key, raw);
            None
        }
    }
}

fn positive(v: &f64) -> bool {
    v.is_finite() && *v > 0.0
}

impl SimConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Some(width) = env_value("SIM_WORLD_WIDTH", positive, "> 0") {
            config.world_width = width;
        }
        if let Some(height) = env_value("SIM_WORLD_HEIGHT", positive, "> 0") {
            config.world_height = height;
        }
        if let Some(ticks) = env_value("SIM_TICKS", |t: &u64| *t > 0, "> 0") {
            config.ticks = ticks;
        }
        if let Some(spawn) = env_value("SIM_SPAWN_PER_TICK", |n: &usize| *n <= 10_000, "0-10000") {
            config.spawn_per_tick = spawn;
        }
        if let Some(lifetime) = env_value("SIM_AGENT_LIFETIME", positive, "> 0") {
            config.agent_lifetime = lifetime;
        }
        if let Some(seed) = env_value("SIM_SEED", |_: &u64| true, "an integer") {
            config.seed = seed;
        }
        if let Some(res) = env_value("SIM_FLOW_RES", positive, "> 0") {
            config.flow_res = res;
        }
        if let Some(cell) = env_value("SIM_GRID_CELL", positive, "> 0") {
            config.grid_cell = cell;
        }

        if let Ok(path) = std::env::var("SIM_SNAPSHOT") {
            if !path.is_empty() {
                config.snapshot_path = Some(path);
            }
        }

        config
    }

    pub fn bounds(&self) -> WorldBounds {
        WorldBounds::from_size(self.world_width, self.world_height)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        if !positive(&self.world_width) || !positive(&self.world_height) {
            return Err("World dimensions must be greater than 0".to_string());
        }
        if !positive(&self.flow_res) {
            return Err("flow_res must be greater than 0".to_string());
        }
        if self.flow_res > self.world_width.min(self.world_height) {
            return Err("flow_res cannot exceed the world size".to_string());
        }
        if !positive(&self.grid_cell) {
            return Err("grid_cell must be greater than 0".to_string());
        }
        if !positive(&self.agent_lifetime) {
            return Err("agent_lifetime must be greater than 0".to_string());
        }
        if !positive(&self.frame_ms) {
            return Err("frame_ms must be greater than 0".to_string());
        }
        if self.log_every == 0 {
            return Err("log_every must be at least 1".to_string());
        }
        Ok(())
    }
}
