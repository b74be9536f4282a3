//! Steering behaviors
//!
//! Every behavior returns a force and leaves position and velocity alone;
//! the caller sums the forces it wants and applies them to the body. The
//! `*_traced` variants also return the intermediate geometry so a renderer
//! can draw it.

use hashbrown::HashSet;
use rand::Rng;
use std::f64::consts::TAU;

use crate::config::WorldBounds;
use crate::sim::agent::Agent;
use crate::sim::body::{BodyId, Colliders, KinematicBody};
use crate::sim::constants::steering::*;
use crate::sim::context::TickContext;
use crate::sim::flow_field::FlowField;
use crate::sim::path::Path;
use crate::sim::spatial::SpatialGrid;
use crate::util::math::{constrain, map_range, wrap_angle};
use crate::util::vec2::Vec2;

/// How far ahead `pursue` and `evade` predict the other body
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Prediction {
    /// Fixed number of ticks
    Fixed(f64),
    /// Distance mapped linearly from `[0, max_dist]` onto `[0, max_ticks]`.
    /// Distances past `max_dist` extrapolate beyond `max_ticks`.
    Auto { max_dist: f64, max_ticks: f64 },
}

impl Prediction {
    pub fn auto() -> Self {
        Prediction::Auto {
            max_dist: PURSUE_MAX_DIST,
            max_ticks: PURSUE_MAX_PREDICTION_TICKS,
        }
    }
}

impl Default for Prediction {
    fn default() -> Self {
        Prediction::Fixed(PURSUE_PREDICTION_TICKS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WanderParams {
    /// Radius of the circle projected ahead of the agent
    pub big_radius: f64,
    /// Distance of that circle's center along the heading
    pub distance: f64,
    /// Jitter radius around the previous wander point
    pub small_radius: f64,
}

impl Default for WanderParams {
    fn default() -> Self {
        Self {
            big_radius: WANDER_BIG_RADIUS,
            distance: WANDER_DISTANCE,
            small_radius: WANDER_SMALL_RADIUS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WanderTrace {
    pub big_circle: Vec2,
    pub small_circle: Vec2,
    pub target: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeparationParams {
    pub radius: f64,
    /// Forward cone filter; `None` or `Some(0.0)` accepts every direction
    pub field_of_view: Option<f64>,
}

impl Default for SeparationParams {
    fn default() -> Self {
        Self {
            radius: SEPARATION_RADIUS,
            field_of_view: Some(SEPARATION_FIELD_OF_VIEW),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowParams {
    /// How far along the path past the normal point to aim
    pub offset: f64,
    /// How far ahead of the agent to project before snapping to the path
    pub look_ahead: f64,
    /// Steer even while inside the corridor
    pub apply_outside: bool,
}

impl Default for FollowParams {
    fn default() -> Self {
        Self {
            offset: FOLLOW_OFFSET,
            look_ahead: FOLLOW_LOOK_AHEAD,
            apply_outside: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathTrace {
    pub look_ahead: Vec2,
    pub normal_point: Vec2,
    pub target: Vec2,
    pub direction: i8,
}

/// Something an agent can follow
#[derive(Debug, Clone, Copy)]
pub enum Guide<'a> {
    Path(&'a Path),
    Field(&'a FlowField),
}

impl<'a> From<&'a Path> for Guide<'a> {
    fn from(path: &'a Path) -> Self {
        Guide::Path(path)
    }
}

impl<'a> From<&'a FlowField> for Guide<'a> {
    fn from(field: &'a FlowField) -> Self {
        Guide::Field(field)
    }
}

impl Agent {
    /// Full-speed seek with no arrival damping
    pub fn seek(&self, target: Vec2) -> Vec2 {
        self.seek_with(target, None, self.max_speed)
    }

    /// Seek that slows down linearly inside `radius`
    pub fn arrive(&self, target: Vec2, radius: f64) -> Vec2 {
        self.seek_with(target, Some(radius), self.max_speed)
    }

    /// Desired velocity toward `target` at `speed`, damped to
    /// `map(d, 0, arrival, 0, max_speed)` within the arrival radius.
    /// Returns `desired - vel`, limited to `max_force`.
    pub fn seek_with(&self, target: Vec2, arrival: Option<f64>, speed: f64) -> Vec2 {
        let pos = self.body.pos;
        let mut desired = (target - pos).with_magnitude(speed);

        if let Some(radius) = arrival {
            let d = pos.distance_to(target);
            if d < radius {
                desired.set_magnitude(map_range(d, 0.0, radius, 0.0, self.max_speed));
            }
        }

        let mut force = desired - self.body.vel;
        force.limit(self.max_force);
        force
    }

    pub fn flee(&self, target: Vec2) -> Vec2 {
        self.flee_with(target, self.max_speed)
    }

    /// Seek the point mirrored through the agent, away from `target`
    pub fn flee_with(&self, target: Vec2, magnitude: f64) -> Vec2 {
        let mirrored = self.body.pos * 2.0 - target;
        self.seek_with(mirrored, None, magnitude)
    }

    pub fn pursue(&self, other: &KinematicBody, prediction: Prediction) -> Vec2 {
        self.pursue_traced(other, prediction).0
    }

    /// Seek where `other` will be after the predicted number of ticks.
    /// Also returns that predicted point.
    pub fn pursue_traced(&self, other: &KinematicBody, prediction: Prediction) -> (Vec2, Vec2) {
        let ticks = match prediction {
            Prediction::Fixed(ticks) => ticks,
            Prediction::Auto {
                max_dist,
                max_ticks,
            } => {
                let d = other.pos.distance_to(self.body.pos);
                map_range(d, 0.0, max_dist, 0.0, max_ticks)
            }
        };
        let predicted = other.pos + other.vel * ticks;
        (self.seek(predicted), predicted)
    }

    /// Negated pursuit force
    pub fn evade(&self, other: &KinematicBody, prediction: Prediction) -> Vec2 {
        -self.pursue(other, prediction)
    }

    pub fn wander(&mut self, ctx: &mut TickContext<'_>, params: WanderParams) -> Vec2 {
        self.wander_traced(ctx, params).0
    }

    /// Random walk on a circle projected ahead of the agent.
    ///
    /// The previous wander direction is jittered by a point within
    /// `small_radius`, projected back onto the big circle, and remembered
    /// relative to the heading for the next call.
    pub fn wander_traced(
        &mut self,
        ctx: &mut TickContext<'_>,
        params: WanderParams,
    ) -> (Vec2, WanderTrace) {
        let angle = self.heading();
        let pos = self.body.pos;

        let big_circle = pos + Vec2::from_angle(angle) * params.distance;
        let small_circle =
            big_circle + Vec2::from_angle(angle + self.wandering_angle) * params.big_radius;
        let jitter = Vec2::from_angle(ctx.rng.gen_range(0.0..TAU)) * params.small_radius;
        let sample = small_circle + jitter;
        let target = big_circle + (sample - big_circle).with_magnitude(params.big_radius);

        self.wandering_angle = wrap_angle((target - big_circle).heading() - angle);

        let trace = WanderTrace {
            big_circle,
            small_circle,
            target,
        };
        (self.seek(target), trace)
    }

    /// Members of `group` strictly within `radius`, optionally restricted to
    /// a forward cone. A zero field of view disables the cone.
    ///
    /// The cone test compares the dot product of the unit bearing and the
    /// heading directly against `field_of_view / 2`, not its cosine.
    pub fn neighbors_in_fov(
        &self,
        index: &SpatialGrid,
        group: &HashSet<BodyId>,
        radius: f64,
        field_of_view: Option<f64>,
    ) -> Colliders {
        let pos = self.body.pos;
        let heading = Vec2::from_angle(self.heading());

        self.body
            .collisions(index, radius)
            .into_iter()
            .filter(|e| group.contains(&e.id))
            .filter(|e| match field_of_view {
                Some(fov) if fov != 0.0 => {
                    (e.position - pos).normalize().dot(heading) > fov / 2.0
                }
                _ => true,
            })
            .collect()
    }

    pub fn separation(
        &self,
        ctx: &TickContext<'_>,
        group: &HashSet<BodyId>,
        params: SeparationParams,
    ) -> Vec2 {
        self.separation_traced(ctx, group, params).0
    }

    /// Average of inverse-distance weighted flee forces from the visible
    /// neighbors, limited to `max_force`. Also returns those neighbors.
    pub fn separation_traced(
        &self,
        ctx: &TickContext<'_>,
        group: &HashSet<BodyId>,
        params: SeparationParams,
    ) -> (Vec2, Colliders) {
        let neighbors =
            self.neighbors_in_fov(&*ctx.index, group, params.radius, params.field_of_view);

        let mut force = Vec2::ZERO;
        for neighbor in &neighbors {
            let d = self.body.pos.distance_to(neighbor.position);
            // coincident bodies have no direction to flee in, but still count
            if d == 0.0 {
                continue;
            }
            force += self.flee(neighbor.position) / d;
        }

        force /= neighbors.len().max(1) as f64;
        force.limit(self.max_force);
        (force, neighbors)
    }

    /// Seek back inside `[min + radius, max - radius]` when closer than
    /// `radius` to any edge; zero otherwise.
    pub fn stay_within(&self, min: Vec2, max: Vec2, radius: f64) -> Vec2 {
        let p = self.body.pos;
        let near_edge = p.x < min.x + radius
            || p.x > max.x - radius
            || p.y < min.y + radius
            || p.y > max.y - radius;
        if !near_edge {
            return Vec2::ZERO;
        }

        let target = Vec2::new(
            constrain(p.x, min.x + radius, max.x - radius),
            constrain(p.y, min.y + radius, max.y - radius),
        );
        self.seek(target)
    }

    pub fn stay_within_bounds(&self, bounds: &WorldBounds, radius: f64) -> Vec2 {
        self.stay_within(bounds.min, bounds.max, radius)
    }

    pub fn follow<'a>(&self, guide: impl Into<Guide<'a>>, params: FollowParams) -> Vec2 {
        match guide.into() {
            Guide::Path(path) => self.follow_path(path, params),
            Guide::Field(field) => self.follow_field(field),
        }
    }

    pub fn follow_path(&self, path: &Path, params: FollowParams) -> Vec2 {
        self.follow_path_traced(path, params).0
    }

    /// Steer toward a point `offset` further along the path than the
    /// projection of the look-ahead point. Only active when the agent or its
    /// look-ahead point is outside the corridor, unless `apply_outside`.
    pub fn follow_path_traced(&self, path: &Path, params: FollowParams) -> (Vec2, PathTrace) {
        let pos = self.body.pos;
        let look_ahead = pos + self.body.vel.normalize() * params.look_ahead;
        let normal_point = path.normal_point(look_ahead);
        let direction = path.direction(self.body.vel, look_ahead);
        let target = path.next(normal_point, params.offset * direction as f64, None);

        let trace = PathTrace {
            look_ahead,
            normal_point,
            target,
            direction,
        };

        if params.apply_outside || !path.is_inside(pos) || !path.is_inside(look_ahead) {
            (self.seek(target), trace)
        } else {
            (Vec2::ZERO, trace)
        }
    }

    /// Match the field's direction at full speed: `sample * max_speed - vel`
    pub fn follow_field(&self, field: &FlowField) -> Vec2 {
        field.lookup(self.body.pos).with_magnitude(self.max_speed) - self.body.vel
    }
}
