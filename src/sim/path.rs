//! Piecewise-linear path corridors
//!
//! A [`Path`] is a polyline of [`PathSegment`]s, each thickened by a radius.
//! Agents project a look-ahead point onto the closest segment and aim a
//! little further along the path, handing off to the neighboring segment
//! when the aim point runs past a joint.

use std::f64::consts::PI;

use crate::util::math::sign;
use crate::util::vec2::Vec2;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PathError {
    #[error("A path needs at least two points, got {0}")]
    TooFewPoints(usize),
    #[error("Segment {index} has zero length")]
    InvalidSegment { index: usize },
}

/// One straight piece of a path, immutable after construction
#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    start: Vec2,
    end: Vec2,
    radius: f64,
    /// Unit vector from start to end
    direction: Vec2,
    /// `direction` rotated by +90 degrees
    normal: Vec2,
    /// `normal * radius`, the corridor half-width
    normal_range: Vec2,
    radius_sq: f64,
    length: f64,
    length_sq: f64,
}

impl PathSegment {
    pub fn new(start: Vec2, end: Vec2, radius: f64) -> Result<Self, PathError> {
        Self::indexed(start, end, radius, 0)
    }

    fn indexed(start: Vec2, end: Vec2, radius: f64, index: usize) -> Result<Self, PathError> {
        let delta = end - start;
        if delta.is_null() {
            return Err(PathError::InvalidSegment { index });
        }
        let direction = delta.normalize();
        let normal = direction.rotate(PI / 2.0);
        Ok(Self {
            start,
            end,
            radius,
            direction,
            normal,
            normal_range: normal * radius,
            radius_sq: radius * radius,
            length: delta.length(),
            length_sq: delta.length_sq(),
        })
    }

    pub fn start(&self) -> Vec2 {
        self.start
    }

    pub fn end(&self) -> Vec2 {
        self.end
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn radius_sq(&self) -> f64 {
        self.radius_sq
    }

    pub fn direction_vector(&self) -> Vec2 {
        self.direction
    }

    pub fn normal(&self) -> Vec2 {
        self.normal
    }

    pub fn normal_range(&self) -> Vec2 {
        self.normal_range
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn length_sq(&self) -> f64 {
        self.length_sq
    }

    /// Signed position of the projection of `point` along the segment
    #[inline]
    fn projection(&self, point: Vec2) -> f64 {
        (point - self.start).dot(self.direction)
    }

    /// Squared distance from `point` to the segment: perpendicular inside
    /// the span, nearest endpoint outside it
    pub fn distance_sq_to(&self, point: Vec2) -> f64 {
        let t = self.projection(point);
        if t < 0.0 || t > self.length {
            point
                .distance_sq_to(self.start)
                .min(point.distance_sq_to(self.end))
        } else {
            let cross = (point - self.start).cross(self.direction);
            cross * cross
        }
    }

    pub fn distance_to(&self, point: Vec2) -> f64 {
        self.distance_sq_to(point).sqrt()
    }

    /// Inside the corridor and strictly within the span (end caps excluded)
    pub fn contains(&self, point: Vec2) -> bool {
        let t = self.projection(point);
        self.distance_sq_to(point) < self.radius_sq && t > 0.0 && t < self.length
    }

    /// Perpendicular projection of `point`, clamped to the span
    pub fn normal_point(&self, point: Vec2) -> Vec2 {
        let t = self.projection(point).clamp(0.0, self.length);
        self.start + self.direction * t
    }

    /// Sign of `velocity` along the segment: 1 forward, -1 backward, 0 perpendicular
    pub fn direction(&self, velocity: Vec2) -> i8 {
        sign(self.direction.dot(velocity))
    }

    /// Move `point` by `amount` along the segment, clamped to its bounding box
    pub fn next(&self, point: Vec2, amount: f64) -> Vec2 {
        (point + self.direction * amount).constrain(self.start, self.end)
    }
}

/// Ordered chain of segments
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    segments: Vec<PathSegment>,
}

impl Path {
    /// Build a path through `points`, every segment sharing `radius`
    pub fn new(points: &[Vec2], radius: f64) -> Result<Self, PathError> {
        if points.len() < 2 {
            return Err(PathError::TooFewPoints(points.len()));
        }
        let segments = points
            .windows(2)
            .enumerate()
            .map(|(i, pair)| PathSegment::indexed(pair[0], pair[1], radius, i))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Index of the closest segment and the squared distance to it
    ///
    /// Ties go to the earlier segment.
    pub fn closest_segment(&self, point: Vec2) -> (usize, f64) {
        let mut best = (0, f64::INFINITY);
        for (i, segment) in self.segments.iter().enumerate() {
            let dist_sq = segment.distance_sq_to(point);
            if dist_sq < best.1 {
                best = (i, dist_sq);
            }
        }
        best
    }

    pub fn distance_sq_to(&self, point: Vec2) -> f64 {
        self.closest_segment(point).1
    }

    pub fn distance_to(&self, point: Vec2) -> f64 {
        self.distance_sq_to(point).sqrt()
    }

    /// Within the corridor of the closest segment
    pub fn is_inside(&self, point: Vec2) -> bool {
        let (index, dist_sq) = self.closest_segment(point);
        dist_sq < self.segments[index].radius_sq
    }

    pub fn normal_point(&self, point: Vec2) -> Vec2 {
        let (index, _) = self.closest_segment(point);
        self.segments[index].normal_point(point)
    }

    /// Direction of `velocity` along the segment closest to `point`
    pub fn direction(&self, velocity: Vec2, point: Vec2) -> i8 {
        let (index, _) = self.closest_segment(point);
        self.segments[index].direction(velocity)
    }

    /// Advance `point` by a signed `amount` along the path.
    ///
    /// Starts on `segment` (or the closest one). Whatever overshoots a
    /// segment end carries into the neighbor in the direction of travel;
    /// at the ends of the path the point is clamped. The hand-off visits
    /// each segment at most once.
    pub fn next(&self, point: Vec2, amount: f64, segment: Option<usize>) -> Vec2 {
        let mut index = segment
            .filter(|&i| i < self.segments.len())
            .unwrap_or_else(|| self.closest_segment(point).0);
        let mut point = point;
        let mut amount = amount;

        for _ in 0..self.segments.len() {
            let seg = &self.segments[index];
            let predicted = point + seg.direction * amount;
            let clamped = predicted.constrain(seg.start, seg.end);
            let leftover = predicted - clamped;
            if leftover.is_null() {
                return clamped;
            }

            let dir = sign(leftover.dot(seg.direction));
            let next_index = index as isize + dir as isize;
            if dir == 0 || next_index < 0 || next_index as usize >= self.segments.len() {
                return clamped;
            }

            index = next_index as usize;
            let next_seg = &self.segments[index];
            let remaining = leftover.length();
            if dir > 0 {
                point = next_seg.start;
                amount = remaining;
            } else {
                point = next_seg.end;
                amount = -remaining;
            }
        }

        // Only reachable on a path that keeps overshooting every segment
        let seg = &self.segments[index];
        seg.next(point, amount)
    }
}
