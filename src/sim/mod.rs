//! Simulation core: bodies, agents, steering and the structures they
//! steer against.

pub mod agent;
pub mod body;
pub mod constants;
pub mod context;
pub mod flow_field;
pub mod path;
pub mod spatial;
pub mod steering;
