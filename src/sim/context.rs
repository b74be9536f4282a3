use rand::rngs::StdRng;

use crate::sim::spatial::SpatialGrid;

/// Everything a body or agent needs from the outside world for one tick.
///
/// Owned by the orchestrator and lent to each `update`/steering call, so the
/// core never reaches for ambient state.
pub struct TickContext<'a> {
    /// Elapsed time for this tick
    pub dt: f64,
    pub index: &'a mut SpatialGrid,
    pub rng: &'a mut StdRng,
}

impl<'a> TickContext<'a> {
    pub fn new(dt: f64, index: &'a mut SpatialGrid, rng: &'a mut StdRng) -> Self {
        Self { dt, index, rng }
    }
}
