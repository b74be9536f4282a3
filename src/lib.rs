//! Steering Sim Library
//!
//! Autonomous 2D agents driven by combinable steering behaviors.
//!
//! # Modules
//!
//! - `sim` - Kinematic bodies, agents and their steering behaviors, plus the
//!   spatial index, paths and flow fields they steer against
//! - `util` - 2D vector type and scalar helpers
//! - `config` - Runner configuration and world bounds

pub mod config;
pub mod sim;
pub mod util;
