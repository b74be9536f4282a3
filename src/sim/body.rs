//! Kinematic bodies: point masses with semi-implicit Euler integration.

use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::f64::consts::TAU;

use crate::sim::context::TickContext;
use crate::sim::spatial::{SpatialEntry, SpatialGrid};
use crate::util::vec2::Vec2;

/// Identity of a body inside the spatial index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BodyId(uuid::Uuid);

impl BodyId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for BodyId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BodyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BodyError {
    #[error("Invalid mass {0}: mass must be finite and greater than zero")]
    InvalidMass(f64),
}

/// Neighbor lists are usually tiny
pub type Colliders = SmallVec<[SpatialEntry; 8]>;

/// Point mass with position, velocity and accumulated acceleration
///
/// The `prev_*` fields hold the state from before the last integration or
/// teleport, for trail and debug consumers.
#[derive(Debug, Clone)]
pub struct KinematicBody {
    pub pos: Vec2,
    pub vel: Vec2,
    pub acc: Vec2,
    pub prev_pos: Vec2,
    pub prev_vel: Vec2,
    pub prev_acc: Vec2,
    id: BodyId,
    mass: f64,
    alive: bool,
    locked: bool,
}

impl KinematicBody {
    pub fn new(pos: Vec2, mass: f64) -> Result<Self, BodyError> {
        if !(mass.is_finite() && mass > 0.0) {
            return Err(BodyError::InvalidMass(mass));
        }
        Ok(Self {
            pos,
            vel: Vec2::ZERO,
            acc: Vec2::ZERO,
            prev_pos: Vec2::ZERO,
            prev_vel: Vec2::ZERO,
            prev_acc: Vec2::ZERO,
            id: BodyId::new(),
            mass,
            alive: true,
            locked: false,
        })
    }

    #[inline]
    pub fn id(&self) -> BodyId {
        self.id
    }

    #[inline]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Index entry reflecting the current position
    pub fn entry(&self) -> SpatialEntry {
        SpatialEntry::new(self.id, self.pos)
    }

    /// Register this body in the index. Dead bodies are never re-inserted.
    pub fn attach(&self, index: &mut SpatialGrid) {
        if self.alive {
            index.insert(self.entry());
        }
    }

    pub fn apply_force(&mut self, force: Vec2) -> &mut Self {
        self.acc += force / self.mass;
        self
    }

    /// Apply a force of `magnitude` pointing from the body toward `point`
    pub fn apply_force_to(&mut self, point: Vec2, magnitude: f64) -> &mut Self {
        let force = (point - self.pos).with_magnitude(magnitude);
        self.apply_force(force)
    }

    pub fn set_vel(&mut self, vel: Vec2) -> &mut Self {
        self.vel = vel;
        self
    }

    /// Point the velocity in a uniformly random direction at `speed`
    pub fn set_vel_random<R: Rng + ?Sized>(&mut self, speed: f64, rng: &mut R) -> &mut Self {
        let angle = rng.gen_range(0.0..TAU);
        self.vel = Vec2::from_angle_with_magnitude(angle, speed);
        self
    }

    fn store_previous(&mut self) {
        self.prev_pos = self.pos;
        self.prev_vel = self.vel;
        self.prev_acc = self.acc;
    }

    /// Teleport to `pos` and resync the index entry
    pub fn set_pos(&mut self, pos: Vec2, index: &mut SpatialGrid) {
        if !self.alive {
            return;
        }
        self.store_previous();
        self.pos = pos;
        index.update(self.id, self.pos);
    }

    /// Advance one tick: `vel += acc * dt`, `pos += vel * dt`, `acc = 0`.
    pub fn update(&mut self, ctx: &mut TickContext<'_>) {
        self.integrate(ctx, None);
    }

    /// Semi-implicit Euler step with an optional cap applied to the velocity
    /// before it moves the position. Locked or dead bodies do not move.
    pub fn integrate(&mut self, ctx: &mut TickContext<'_>, max_speed: Option<f64>) {
        if !self.alive || self.locked {
            return;
        }
        self.store_previous();

        self.vel += self.acc * ctx.dt;
        if let Some(max_speed) = max_speed {
            self.vel.limit(max_speed);
        }
        self.pos += self.vel * ctx.dt;
        self.acc = Vec2::ZERO;

        ctx.index.update(self.id, self.pos);
    }

    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    /// Mark dead and drop out of the index
    pub fn kill(&mut self, index: &mut SpatialGrid) {
        self.alive = false;
        index.remove(self.id);
    }

    /// Indexed bodies strictly closer than `radius`, excluding this one
    pub fn collisions(&self, index: &SpatialGrid, radius: f64) -> Colliders {
        let radius_sq = radius * radius;
        index
            .query_radius(self.pos, radius)
            .filter(|e| e.id != self.id)
            .filter(|e| self.pos.distance_sq_to(e.position) < radius_sq)
            .copied()
            .collect()
    }

    pub fn snapshot(&self) -> BodySnapshot {
        BodySnapshot {
            id: self.id,
            pos: self.pos,
            vel: self.vel,
            prev_pos: self.prev_pos,
            prev_acc: self.prev_acc,
            heading: self.vel.heading(),
            alive: self.alive,
        }
    }
}

/// Read model for renderers, taken once per tick after integration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodySnapshot {
    pub id: BodyId,
    pub pos: Vec2,
    pub vel: Vec2,
    pub prev_pos: Vec2,
    pub prev_acc: Vec2,
    pub heading: f64,
    pub alive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn attached(pos: Vec2, mass: f64, index: &mut SpatialGrid) -> KinematicBody {
        let body = KinematicBody::new(pos, mass).unwrap();
        body.attach(index);
        body
    }

    #[test]
    fn test_zero_mass_rejected() {
        assert_eq!(
            KinematicBody::new(Vec2::ZERO, 0.0).unwrap_err(),
            BodyError::InvalidMass(0.0)
        );
        assert!(KinematicBody::new(Vec2::ZERO, -1.0).is_err());
        assert!(KinematicBody::new(Vec2::ZERO, f64::NAN).is_err());
        assert!(KinematicBody::new(Vec2::ZERO, 0.5).is_ok());
    }

    #[test]
    fn test_apply_force_divides_by_mass() {
        let mut body = KinematicBody::new(Vec2::ZERO, 2.0).unwrap();
        body.apply_force(Vec2::new(4.0, -2.0)).apply_force(Vec2::new(2.0, 0.0));
        assert_eq!(body.acc, Vec2::new(3.0, -1.0));
    }

    #[test]
    fn test_apply_force_to_point() {
        let mut body = KinematicBody::new(Vec2::new(10.0, 10.0), 1.0).unwrap();
        body.apply_force_to(Vec2::new(10.0, 30.0), 3.0);
        assert!(body.acc.approx_eq(Vec2::new(0.0, 3.0), 1e-12));
    }

    #[test]
    fn test_semi_implicit_euler() {
        let mut index = SpatialGrid::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut body = attached(Vec2::new(1.0, 1.0), 1.0, &mut index);
        body.vel = Vec2::new(1.0, 0.0);
        body.apply_force(Vec2::new(0.0, 2.0));

        let mut ctx = TickContext::new(0.5, &mut index, &mut rng);
        body.update(&mut ctx);

        // velocity first, then position with the new velocity
        assert_eq!(body.vel, Vec2::new(1.0, 1.0));
        assert_eq!(body.pos, Vec2::new(1.5, 1.5));
        assert_eq!(body.acc, Vec2::ZERO);
        assert_eq!(body.prev_pos, Vec2::new(1.0, 1.0));
        assert_eq!(body.prev_vel, Vec2::new(1.0, 0.0));
        assert_eq!(body.prev_acc, Vec2::new(0.0, 2.0));
        assert_eq!(index.position_of(body.id()), Some(body.pos));
    }

    #[test]
    fn test_integrate_caps_velocity() {
        let mut index = SpatialGrid::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut body = attached(Vec2::ZERO, 1.0, &mut index);
        body.apply_force(Vec2::new(100.0, 0.0));

        let mut ctx = TickContext::new(1.0, &mut index, &mut rng);
        body.integrate(&mut ctx, Some(2.0));

        assert_eq!(body.vel, Vec2::new(2.0, 0.0));
        assert_eq!(body.pos, Vec2::new(2.0, 0.0));
    }

    #[test]
    fn test_locked_body_does_not_move() {
        let mut index = SpatialGrid::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut body = attached(Vec2::new(5.0, 5.0), 1.0, &mut index);
        body.vel = Vec2::new(3.0, 0.0);
        body.lock();

        let mut ctx = TickContext::new(1.0, &mut index, &mut rng);
        body.update(&mut ctx);
        assert_eq!(body.pos, Vec2::new(5.0, 5.0));
        assert!(index.contains(body.id()));

        body.unlock();
        let mut ctx = TickContext::new(1.0, &mut index, &mut rng);
        body.update(&mut ctx);
        assert_eq!(body.pos, Vec2::new(8.0, 5.0));
    }

    #[test]
    fn test_set_pos_teleports_and_resyncs() {
        let mut index = SpatialGrid::default();
        let mut body = attached(Vec2::new(5.0, 5.0), 1.0, &mut index);

        body.set_pos(Vec2::new(900.0, -40.0), &mut index);
        assert_eq!(body.prev_pos, Vec2::new(5.0, 5.0));
        assert_eq!(index.position_of(body.id()), Some(Vec2::new(900.0, -40.0)));
    }

    #[test]
    fn test_kill_removes_from_index() {
        let mut index = SpatialGrid::default();
        let mut body = attached(Vec2::ZERO, 1.0, &mut index);
        body.kill(&mut index);

        assert!(!body.is_alive());
        assert!(!index.contains(body.id()));

        // never re-inserted afterwards
        body.attach(&mut index);
        body.set_pos(Vec2::new(1.0, 1.0), &mut index);
        assert!(index.is_empty());
    }

    #[test]
    fn test_collisions_exact_distance_and_excludes_self() {
        let mut index = SpatialGrid::new(10.0);
        let me = attached(Vec2::ZERO, 1.0, &mut index);
        let near = attached(Vec2::new(3.0, 4.0), 1.0, &mut index);
        let _corner = attached(Vec2::new(5.0, 5.0), 1.0, &mut index);

        let hits = me.collisions(&index, 6.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, near.id());
    }

    #[test]
    fn test_set_vel_random_speed() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut body = KinematicBody::new(Vec2::ZERO, 1.0).unwrap();
        body.set_vel_random(4.0, &mut rng);
        assert!((body.vel.length() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_snapshot_serializes() {
        let body = KinematicBody::new(Vec2::new(1.0, 2.0), 1.0).unwrap();
        let json = serde_json::to_string(&body.snapshot()).unwrap();
        let back: BodySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, body.snapshot());
    }
}
