//! Autonomous agents: a kinematic body plus speed/force limits, age and a
//! behavior variant. Steering behaviors live in `steering.rs`.

use rand::Rng;
use tracing::debug;

use crate::config::WorldBounds;
use crate::sim::body::{BodyError, BodyId, KinematicBody};
use crate::sim::constants::{agent, target};
use crate::sim::context::TickContext;
use crate::sim::spatial::SpatialGrid;
use crate::util::vec2::Vec2;

/// Extra per-tick behavior layered on the base agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentKind {
    #[default]
    Normal,
    /// Dies as soon as any other live body comes within contact range
    Target,
}

#[derive(Debug, Clone)]
pub struct Agent {
    pub body: KinematicBody,
    pub max_speed: f64,
    pub max_force: f64,
    age: f64,
    /// In lifetime units; `f64::INFINITY` never expires
    lifetime: f64,
    /// Heading offset carried between `wander` calls
    pub(crate) wandering_angle: f64,
    kind: AgentKind,
}

impl Agent {
    pub fn new(pos: Vec2, mass: f64, lifetime: f64) -> Result<Self, BodyError> {
        Ok(Self {
            body: KinematicBody::new(pos, mass)?,
            max_speed: agent::MAX_SPEED,
            max_force: agent::MAX_FORCE,
            age: 0.0,
            lifetime,
            wandering_angle: 0.0,
            kind: AgentKind::Normal,
        })
    }

    /// Immortal agent with default mass
    pub fn immortal(pos: Vec2) -> Result<Self, BodyError> {
        Self::new(pos, agent::MASS, f64::INFINITY)
    }

    /// Create an agent with default mass and register it in the index
    pub fn spawn(
        pos: Vec2,
        lifetime: f64,
        kind: AgentKind,
        index: &mut SpatialGrid,
    ) -> Result<Self, BodyError> {
        let agent = Self::new(pos, agent::MASS, lifetime)?.with_kind(kind);
        agent.body.attach(index);
        Ok(agent)
    }

    pub fn with_kind(mut self, kind: AgentKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_max_speed(mut self, max_speed: f64) -> Self {
        self.max_speed = max_speed;
        self
    }

    pub fn with_max_force(mut self, max_force: f64) -> Self {
        self.max_force = max_force;
        self
    }

    #[inline]
    pub fn id(&self) -> BodyId {
        self.body.id()
    }

    #[inline]
    pub fn pos(&self) -> Vec2 {
        self.body.pos
    }

    #[inline]
    pub fn vel(&self) -> Vec2 {
        self.body.vel
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.body.is_alive()
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    pub fn age(&self) -> f64 {
        self.age
    }

    pub fn lifetime(&self) -> f64 {
        self.lifetime
    }

    pub fn wandering_angle(&self) -> f64 {
        self.wandering_angle
    }

    /// Direction of travel, `atan2(vel.y, vel.x)`
    #[inline]
    pub fn heading(&self) -> f64 {
        self.body.vel.heading()
    }

    /// Set the velocity, clamped to `max_speed`
    pub fn set_vel(&mut self, vel: Vec2) -> &mut Self {
        self.body.set_vel(vel.clamp_length(self.max_speed));
        self
    }

    /// Random heading at `max_speed`
    pub fn set_vel_random<R: Rng + ?Sized>(&mut self, rng: &mut R) -> &mut Self {
        self.body.set_vel_random(self.max_speed, rng);
        self
    }

    pub fn apply_force(&mut self, force: Vec2) -> &mut Self {
        self.body.apply_force(force);
        self
    }

    pub fn kill(&mut self, index: &mut SpatialGrid) {
        self.body.kill(index);
    }

    fn lifetime_expired(&self) -> bool {
        self.age * agent::LIFETIME_UNITS_PER_AGE >= self.lifetime
    }

    /// Age, integrate with the velocity capped at `max_speed`, then apply
    /// lifetime expiry and the kind-specific post-update check.
    pub fn update(&mut self, ctx: &mut TickContext<'_>) {
        if !self.is_alive() {
            return;
        }
        self.age += ctx.dt;
        // locked bodies skip integration but still respect the cap
        self.body.vel.limit(self.max_speed);
        self.body.integrate(ctx, Some(self.max_speed));

        if self.lifetime_expired() {
            debug!("Agent {} expired at age {:.2}", self.id(), self.age);
            self.body.kill(ctx.index);
            return;
        }

        match self.kind {
            AgentKind::Normal => {}
            AgentKind::Target => {
                let hits = self.body.collisions(ctx.index, target::CONTACT_RADIUS);
                if let Some(hit) = hits.first() {
                    debug!("Target {} hit by {}", self.id(), hit.id);
                    self.body.kill(ctx.index);
                }
            }
        }
    }

    /// Wrap around the edges of `bounds` once more than `margin` outside
    pub fn wrap(&mut self, bounds: &WorldBounds, margin: f64, index: &mut SpatialGrid) -> &mut Self {
        let pos = &mut self.body.pos;
        if pos.x < bounds.min.x - margin {
            pos.x = bounds.max.x;
        }
        if pos.x > bounds.max.x + margin {
            pos.x = bounds.min.x;
        }
        if pos.y < bounds.min.y - margin {
            pos.y = bounds.max.y;
        }
        if pos.y > bounds.max.y + margin {
            pos.y = bounds.min.y;
        }
        if self.body.is_alive() {
            index.update(self.body.id(), self.body.pos);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::constants::timing;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_seek_run_until_lifetime_expires() {
        let mut index = SpatialGrid::default();
        let mut rng = StdRng::seed_from_u64(11);
        let mut agent = Agent::spawn(Vec2::ZERO, 3.0, AgentKind::Normal, &mut index)
            .unwrap()
            .with_max_speed(2.0)
            .with_max_force(1.0);
        let dt = timing::dt_for_frame(timing::NOMINAL_FRAME_MS);
        let target = Vec2::new(100.0, 0.0);

        let mut ticks = 0;
        let mut last_speed = 0.0;
        while agent.is_alive() && ticks < 1000 {
            let force = agent.seek(target);
            agent.apply_force(force);
            let mut ctx = TickContext::new(dt, &mut index, &mut rng);
            agent.update(&mut ctx);
            ticks += 1;

            assert!(agent.vel().length() <= 2.0 + 1e-12);
            if ticks <= 3 {
                assert!(agent.vel().x > last_speed, "should accelerate toward the target");
                assert!(agent.pos().x > 0.0);
                last_speed = agent.vel().x;
            }
        }

        // three lifetime units at the nominal frame rate is 180 ticks
        assert!(!agent.is_alive());
        assert!((179..=181).contains(&ticks), "died after {} ticks", ticks);
        assert!(!index.contains(agent.id()));
    }

    #[test]
    fn test_speed_never_exceeds_max() {
        let mut index = SpatialGrid::default();
        let mut rng = StdRng::seed_from_u64(5);
        let mut agent = Agent::spawn(Vec2::ZERO, f64::INFINITY, AgentKind::Normal, &mut index).unwrap();

        for i in 0..200 {
            let force = Vec2::from_angle(i as f64 * 0.7) * (i as f64);
            agent.apply_force(force);
            let mut ctx = TickContext::new(1.5, &mut index, &mut rng);
            agent.update(&mut ctx);
            assert!(agent.vel().length() <= agent.max_speed + 1e-12);
        }
        assert!(agent.is_alive());
    }

    #[test]
    fn test_set_vel_clamps() {
        let mut agent = Agent::immortal(Vec2::ZERO).unwrap();
        agent.set_vel(Vec2::new(30.0, 40.0));
        assert!((agent.vel().length() - agent.max_speed).abs() < 1e-12);
    }

    #[test]
    fn test_target_dies_on_contact() {
        let mut index = SpatialGrid::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut target = Agent::spawn(Vec2::ZERO, f64::INFINITY, AgentKind::Target, &mut index).unwrap();
        let far = Agent::spawn(Vec2::new(50.0, 0.0), f64::INFINITY, AgentKind::Normal, &mut index).unwrap();

        let mut ctx = TickContext::new(1.0, &mut index, &mut rng);
        target.update(&mut ctx);
        assert!(target.is_alive());

        let mut near = Agent::spawn(Vec2::new(30.0, 0.0), f64::INFINITY, AgentKind::Normal, &mut index).unwrap();
        let mut ctx = TickContext::new(1.0, &mut index, &mut rng);
        target.update(&mut ctx);
        assert!(!target.is_alive());
        assert!(!index.contains(target.id()));

        // normal agents ignore contact
        let mut ctx = TickContext::new(1.0, &mut index, &mut rng);
        near.update(&mut ctx);
        assert!(near.is_alive());
        assert!(index.contains(far.id()));
    }

    #[test]
    fn test_dead_agent_is_inert() {
        let mut index = SpatialGrid::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut agent = Agent::spawn(Vec2::ZERO, f64::INFINITY, AgentKind::Normal, &mut index).unwrap();
        agent.set_vel(Vec2::new(1.0, 0.0));
        agent.kill(&mut index);

        let mut ctx = TickContext::new(1.0, &mut index, &mut rng);
        agent.update(&mut ctx);
        assert_eq!(agent.pos(), Vec2::ZERO);
        assert_eq!(agent.age(), 0.0);
        assert!(index.is_empty());
    }

    #[test]
    fn test_locked_agent_still_ages() {
        let mut index = SpatialGrid::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut agent = Agent::spawn(Vec2::ZERO, f64::INFINITY, AgentKind::Normal, &mut index).unwrap();
        agent.set_vel(Vec2::new(1.0, 0.0));
        agent.body.lock();

        let mut ctx = TickContext::new(2.0, &mut index, &mut rng);
        agent.update(&mut ctx);
        assert_eq!(agent.pos(), Vec2::ZERO);
        assert_eq!(agent.age(), 2.0);
    }

    #[test]
    fn test_locked_agent_velocity_capped() {
        let mut index = SpatialGrid::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut agent = Agent::spawn(Vec2::ZERO, f64::INFINITY, AgentKind::Normal, &mut index).unwrap();
        agent.set_vel(Vec2::new(2.0, 0.0));
        agent.max_speed = 1.0;
        agent.body.lock();

        let mut ctx = TickContext::new(1.0, &mut index, &mut rng);
        agent.update(&mut ctx);
        assert!(agent.vel().length() <= agent.max_speed + 1e-12);
        assert_eq!(agent.pos(), Vec2::ZERO);
    }

    #[test]
    fn test_wrap() {
        let mut index = SpatialGrid::default();
        let bounds = WorldBounds::new(Vec2::ZERO, Vec2::new(800.0, 600.0));
        let mut agent = Agent::spawn(Vec2::new(815.0, -20.0), f64::INFINITY, AgentKind::Normal, &mut index).unwrap();

        agent.wrap(&bounds, 10.0, &mut index);
        assert_eq!(agent.pos(), Vec2::new(0.0, 600.0));
        assert_eq!(index.position_of(agent.id()), Some(Vec2::new(0.0, 600.0)));
    }
}
