use std::fs::File;
use std::io::BufWriter;

use anyhow::Context;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use steering_sim::config::{SimConfig, WorldBounds};
use steering_sim::sim::agent::{Agent, AgentKind};
use steering_sim::sim::body::BodySnapshot;
use steering_sim::sim::constants::{steering, timing};
use steering_sim::sim::context::TickContext;
use steering_sim::sim::flow_field::{FlowField, PerlinNoise};
use steering_sim::sim::spatial::SpatialGrid;
use steering_sim::util::vec2::Vec2;

/// Noise sampling scale and number of full turns for the demo field
const FIELD_NOISE_SCALE: f64 = 10.0;
const FIELD_ROTATIONS: f64 = 1.5;

/// Headless flow-field run: agents appear at random points in the world and
/// drift along a Perlin field until their lifetime runs out.
struct Simulation {
    bounds: WorldBounds,
    field: FlowField,
    index: SpatialGrid,
    rng: StdRng,
    agents: Vec<Agent>,
    dt: f64,
    spawned: u64,
}

impl Simulation {
    fn new(config: &SimConfig) -> anyhow::Result<Self> {
        let bounds = config.bounds();
        let cols = (bounds.width() / config.flow_res).ceil() as usize;
        let rows = (bounds.height() / config.flow_res).ceil() as usize;

        let mut field = FlowField::new(cols, rows, config.flow_res)?;
        let noise = PerlinNoise::new(config.seed as u32);
        field.fill_with_noise_angles(&noise, FIELD_NOISE_SCALE, 0.0, FIELD_ROTATIONS, 0.0);
        info!("Flow field ready: {}x{} cells at res {}", cols, rows, config.flow_res);

        Ok(Self {
            bounds,
            field,
            index: SpatialGrid::new(config.grid_cell),
            rng: StdRng::seed_from_u64(config.seed),
            agents: Vec::new(),
            dt: timing::dt_for_frame(config.frame_ms),
            spawned: 0,
        })
    }

    fn spawn(&mut self, count: usize, lifetime: f64) -> anyhow::Result<()> {
        for _ in 0..count {
            let pos = self.bounds.random_point(&mut self.rng);
            let agent = Agent::spawn(pos, lifetime, AgentKind::Normal, &mut self.index)?;
            self.agents.push(agent);
        }
        self.spawned += count as u64;
        Ok(())
    }

    fn tick(&mut self) {
        // Field lookups are read-only, so forces are gathered in parallel
        // and applied afterwards.
        let field = &self.field;
        let forces: Vec<Vec2> = self
            .agents
            .par_iter()
            .map(|agent| agent.follow_field(field))
            .collect();

        let mut ctx = TickContext::new(self.dt, &mut self.index, &mut self.rng);
        for (agent, force) in self.agents.iter_mut().zip(forces) {
            agent.apply_force(force);
            agent.update(&mut ctx);
            agent.wrap(&self.bounds, steering::BOUNDS_MARGIN, ctx.index);
        }

        let before = self.agents.len();
        self.agents.retain(|agent| agent.is_alive());
        let expired = before - self.agents.len();
        if expired > 0 {
            debug!("Pruned {} expired agents", expired);
        }

        self.index
            .rebuild(self.agents.iter().map(|agent| agent.body.entry()));
    }

    fn snapshots(&self) -> Vec<BodySnapshot> {
        self.agents.iter().map(|agent| agent.body.snapshot()).collect()
    }
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Steering sim v{}", env!("CARGO_PKG_VERSION"));

    let config = SimConfig::load_or_default();
    config.validate().map_err(anyhow::Error::msg)?;
    info!(
        "Configuration loaded: {}x{} world, {} ticks, {} spawns/tick, seed={}",
        config.world_width, config.world_height, config.ticks, config.spawn_per_tick, config.seed
    );

    let mut sim = Simulation::new(&config)?;

    for tick in 1..=config.ticks {
        sim.spawn(config.spawn_per_tick, config.agent_lifetime)?;
        sim.tick();

        if tick % config.log_every == 0 {
            let stats = sim.index.stats();
            info!(
                "tick={} alive={} spawned={} cells={} max_per_cell={}",
                tick,
                sim.agents.len(),
                sim.spawned,
                stats.non_empty_cells,
                stats.max_per_cell
            );
        }
    }

    if let Some(path) = &config.snapshot_path {
        let file = File::create(path).with_context(|| format!("creating snapshot {}", path))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &sim.snapshots())
            .with_context(|| format!("writing snapshot {}", path))?;
        info!("Wrote {} agent snapshots to {}", sim.agents.len(), path);
    }

    info!("Simulation finished after {} ticks", config.ticks);
    Ok(())
}
