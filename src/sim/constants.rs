//! Behavior defaults and nominal rates.

/// Kinematic agent defaults
pub mod agent {
    /// Default top speed (world units per tick at dt = 1)
    pub const MAX_SPEED: f64 = 2.0;
    /// Default cap on each individual steering force
    pub const MAX_FORCE: f64 = 1.0;
    /// Default mass for spawned agents
    pub const MASS: f64 = 1.0;
    /// Lifetime units elapsed per unit of accumulated age.
    /// Elapsed time per tick is `frame_ms / 60`, so `age * 60 / 1000` is wall seconds.
    pub const LIFETIME_UNITS_PER_AGE: f64 = 60.0 / 1000.0;
}

/// Target variant (dies on contact)
pub mod target {
    /// Any live collider closer than this kills the target
    pub const CONTACT_RADIUS: f64 = 40.0;
}

/// Steering behavior defaults
pub mod steering {
    use std::f64::consts::PI;

    /// Fixed prediction horizon for pursue/evade, in ticks
    pub const PURSUE_PREDICTION_TICKS: f64 = 2.0;
    /// Distance mapped onto `PURSUE_MAX_PREDICTION_TICKS` in auto mode
    pub const PURSUE_MAX_DIST: f64 = 200.0;
    pub const PURSUE_MAX_PREDICTION_TICKS: f64 = 5.0;

    pub const WANDER_BIG_RADIUS: f64 = 50.0;
    pub const WANDER_DISTANCE: f64 = 100.0;
    pub const WANDER_SMALL_RADIUS: f64 = 10.0;

    pub const SEPARATION_RADIUS: f64 = 200.0;
    pub const SEPARATION_FIELD_OF_VIEW: f64 = PI / 2.0;

    pub const FOLLOW_OFFSET: f64 = 40.0;
    pub const FOLLOW_LOOK_AHEAD: f64 = 100.0;

    /// Inset used by `stay_within_bounds` when the caller has no preference
    pub const BOUNDS_MARGIN: f64 = 10.0;
}

/// Spatial index sizing
pub mod spatial {
    /// Default cell size for the agent grid (world units)
    pub const CELL_SIZE: f64 = 64.0;
}

/// Tick timing
pub mod timing {
    /// Nominal frame duration the elapsed-time scale is built around
    pub const NOMINAL_FRAME_MS: f64 = 1000.0 / 60.0;
    /// Elapsed time units per millisecond of frame time
    pub const DT_PER_MS: f64 = 1.0 / 60.0;
    /// Upper bound on elapsed time for a single tick
    pub const MAX_DT: f64 = 2.0;

    /// Elapsed-time value for a frame that took `frame_ms`
    pub fn dt_for_frame(frame_ms: f64) -> f64 {
        (frame_ms * DT_PER_MS).min(MAX_DT)
    }
}
