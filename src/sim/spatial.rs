//! Spatial hash grid for neighbor queries
//!
//! Divides the world into square cells and stores one entry per body.
//! Entries are keyed by [`BodyId`] so a moving body can resync its own
//! entry in place instead of being re-inserted. Range queries return every
//! entry in the cells overlapping the query box and may over-return:
//! callers filter by exact distance.

use hashbrown::HashMap;

use crate::sim::body::BodyId;
use crate::sim::constants::spatial::CELL_SIZE;
use crate::util::vec2::Vec2;

/// Initial capacity for grid cells (number of expected non-empty cells)
const GRID_INITIAL_CAPACITY: usize = 256;

/// Initial capacity for entity vectors within cells
const CELL_INITIAL_CAPACITY: usize = 8;

/// Grid cell key - (x, y) cell coordinates
pub type CellKey = (i32, i32);

/// Entry stored in the grid: a position and the body that owns it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialEntry {
    pub id: BodyId,
    pub position: Vec2,
}

impl SpatialEntry {
    pub fn new(id: BodyId, position: Vec2) -> Self {
        Self { id, position }
    }
}

/// Spatial hash grid over moving bodies
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    /// Cell size in world units (larger = fewer cells, more entities per cell)
    cell_size: f64,
    /// Inverse cell size for fast position-to-cell conversion
    inv_cell_size: f64,
    /// Map from cell key to entries in that cell
    cells: HashMap<CellKey, Vec<SpatialEntry>>,
    /// Which cell each body currently lives in
    locations: HashMap<BodyId, CellKey>,
}

impl SpatialGrid {
    /// Create a new spatial grid with the given cell size
    ///
    /// Queries cover `ceil(extent / cell_size)` cells in each direction, so
    /// the cell size only trades bucket count against bucket length.
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::with_capacity(GRID_INITIAL_CAPACITY),
            locations: HashMap::with_capacity(GRID_INITIAL_CAPACITY),
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Clear all entries from the grid, keeping cell allocations
    #[inline]
    pub fn clear(&mut self) {
        for cell in self.cells.values_mut() {
            cell.clear();
        }
        self.locations.clear();
    }

    /// Convert world position to cell key
    #[inline]
    fn position_to_cell(&self, position: Vec2) -> CellKey {
        (
            (position.x * self.inv_cell_size).floor() as i32,
            (position.y * self.inv_cell_size).floor() as i32,
        )
    }

    /// Insert an entry. A body that is already present is moved to the new position.
    pub fn insert(&mut self, entry: SpatialEntry) {
        if self.locations.contains_key(&entry.id) {
            self.update(entry.id, entry.position);
            return;
        }
        let cell_key = self.position_to_cell(entry.position);
        self.cells
            .entry(cell_key)
            .or_insert_with(|| Vec::with_capacity(CELL_INITIAL_CAPACITY))
            .push(entry);
        self.locations.insert(entry.id, cell_key);
    }

    /// Remove a body from the grid
    /// Returns true if the body was found and removed
    pub fn remove(&mut self, id: BodyId) -> bool {
        let Some(cell_key) = self.locations.remove(&id) else {
            return false;
        };
        if let Some(cell) = self.cells.get_mut(&cell_key) {
            if let Some(idx) = cell.iter().position(|e| e.id == id) {
                cell.swap_remove(idx);
                return true;
            }
        }
        false
    }

    /// Resync a body's entry with its current position
    /// Returns false if the body is not in the grid
    pub fn update(&mut self, id: BodyId, position: Vec2) -> bool {
        let Some(&old_key) = self.locations.get(&id) else {
            return false;
        };
        let new_key = self.position_to_cell(position);

        if old_key == new_key {
            if let Some(entry) = self
                .cells
                .get_mut(&old_key)
                .and_then(|cell| cell.iter_mut().find(|e| e.id == id))
            {
                entry.position = position;
                return true;
            }
            return false;
        }

        if let Some(cell) = self.cells.get_mut(&old_key) {
            if let Some(idx) = cell.iter().position(|e| e.id == id) {
                cell.swap_remove(idx);
            }
        }
        self.cells
            .entry(new_key)
            .or_insert_with(|| Vec::with_capacity(CELL_INITIAL_CAPACITY))
            .push(SpatialEntry::new(id, position));
        self.locations.insert(id, new_key);
        true
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.locations.contains_key(&id)
    }

    /// Current indexed position of a body
    pub fn position_of(&self, id: BodyId) -> Option<Vec2> {
        let cell_key = self.locations.get(&id)?;
        self.cells
            .get(cell_key)?
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.position)
    }

    /// Query all entries in cells overlapping the box `center ± half_extent`
    ///
    /// Boxes spanning more cells than are allocated scan the allocated
    /// cells instead, so huge or infinite extents stay bounded by the grid.
    pub fn query_radius(
        &self,
        center: Vec2,
        half_extent: f64,
    ) -> Box<dyn Iterator<Item = &SpatialEntry> + '_> {
        let (min_x, min_y) = self.position_to_cell(center - Vec2::ONE * half_extent);
        let (max_x, max_y) = self.position_to_cell(center + Vec2::ONE * half_extent);

        let span = |lo: i32, hi: i32| (i64::from(hi) - i64::from(lo) + 1).max(0) as u64;
        let covered = span(min_x, max_x).saturating_mul(span(min_y, max_y));

        if covered > self.cells.len() as u64 {
            return Box::new(
                self.cells
                    .iter()
                    .filter(move |((cx, cy), _)| {
                        (min_x..=max_x).contains(cx) && (min_y..=max_y).contains(cy)
                    })
                    .flat_map(|(_, cell)| cell.iter()),
            );
        }

        Box::new((min_x..=max_x).flat_map(move |cx| {
            (min_y..=max_y).flat_map(move |cy| {
                self.cells
                    .get(&(cx, cy))
                    .into_iter()
                    .flat_map(|cell| cell.iter())
            })
        }))
    }

    /// Rebuild the grid from a collection of entries
    pub fn rebuild(&mut self, entries: impl IntoIterator<Item = SpatialEntry>) {
        self.clear();
        for entry in entries {
            self.insert(entry);
        }
        tracing::trace!(entries = self.len(), "spatial grid rebuilt");
    }

    /// Total entries in the grid
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Get statistics about the grid
    pub fn stats(&self) -> SpatialGridStats {
        let non_empty_cells = self.cells.values().filter(|c| !c.is_empty()).count();
        let total_entities: usize = self.cells.values().map(|c| c.len()).sum();
        let max_per_cell = self.cells.values().map(|c| c.len()).max().unwrap_or(0);

        SpatialGridStats {
            non_empty_cells,
            total_entities,
            max_per_cell,
        }
    }
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(CELL_SIZE)
    }
}

/// Statistics about the spatial grid
#[derive(Debug, Clone)]
pub struct SpatialGridStats {
    pub non_empty_cells: usize,
    pub total_entities: usize,
    pub max_per_cell: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(x: f64, y: f64) -> SpatialEntry {
        SpatialEntry::new(BodyId::new(), Vec2::new(x, y))
    }

    #[test]
    fn test_insert_and_query() {
        let mut grid = SpatialGrid::new(64.0);
        let e = entry(100.0, 100.0);
        grid.insert(e);

        let results: Vec<_> = grid.query_radius(Vec2::new(100.0, 100.0), 20.0).collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, e.id);
    }

    #[test]
    fn test_query_spans_multiple_cells() {
        let mut grid = SpatialGrid::new(10.0);
        grid.insert(entry(0.0, 0.0));
        grid.insert(entry(45.0, 0.0));
        grid.insert(entry(0.0, -45.0));
        grid.insert(entry(200.0, 200.0));

        let results: Vec<_> = grid.query_radius(Vec2::ZERO, 50.0).collect();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_update_moves_between_cells() {
        let mut grid = SpatialGrid::new(64.0);
        let e = entry(10.0, 10.0);
        grid.insert(e);

        assert!(grid.update(e.id, Vec2::new(500.0, 500.0)));
        assert_eq!(grid.position_of(e.id), Some(Vec2::new(500.0, 500.0)));
        assert_eq!(grid.query_radius(Vec2::new(10.0, 10.0), 5.0).count(), 0);
        assert_eq!(grid.query_radius(Vec2::new(500.0, 500.0), 5.0).count(), 1);
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn test_update_within_cell_is_in_place() {
        let mut grid = SpatialGrid::new(64.0);
        let e = entry(10.0, 10.0);
        grid.insert(e);

        assert!(grid.update(e.id, Vec2::new(12.0, 11.0)));
        assert_eq!(grid.position_of(e.id), Some(Vec2::new(12.0, 11.0)));
        assert_eq!(grid.stats().total_entities, 1);
    }

    #[test]
    fn test_update_unknown_id() {
        let mut grid = SpatialGrid::new(64.0);
        assert!(!grid.update(BodyId::new(), Vec2::ZERO));
    }

    #[test]
    fn test_reinsert_does_not_duplicate() {
        let mut grid = SpatialGrid::new(64.0);
        let e = entry(10.0, 10.0);
        grid.insert(e);
        grid.insert(SpatialEntry::new(e.id, Vec2::new(300.0, 0.0)));

        assert_eq!(grid.len(), 1);
        assert_eq!(grid.stats().total_entities, 1);
        assert_eq!(grid.position_of(e.id), Some(Vec2::new(300.0, 0.0)));
    }

    #[test]
    fn test_remove() {
        let mut grid = SpatialGrid::new(64.0);
        let e = entry(100.0, 100.0);
        grid.insert(e);

        assert!(grid.remove(e.id));
        assert!(!grid.contains(e.id));
        assert!(!grid.remove(e.id));
        assert_eq!(grid.query_radius(Vec2::new(100.0, 100.0), 50.0).count(), 0);
    }

    #[test]
    fn test_clear_and_rebuild() {
        let mut grid = SpatialGrid::new(64.0);
        grid.insert(entry(0.0, 0.0));
        grid.insert(entry(10.0, 0.0));
        grid.clear();
        assert!(grid.is_empty());

        let fresh = vec![entry(500.0, 500.0), entry(-500.0, -500.0), entry(0.0, 1000.0)];
        grid.rebuild(fresh.clone());
        assert_eq!(grid.len(), 3);
        assert_eq!(grid.query_radius(Vec2::ZERO, 20.0).count(), 0);
        for e in fresh {
            assert_eq!(grid.position_of(e.id), Some(e.position));
        }
    }

    #[test]
    fn test_huge_radius_scans_allocated_cells() {
        let mut grid = SpatialGrid::new(64.0);
        grid.insert(entry(100.0, 100.0));
        grid.insert(entry(-3000.0, 4000.0));
        let far = entry(1e7, 1e7);
        grid.insert(far);

        assert_eq!(grid.query_radius(Vec2::ZERO, 1e6).count(), 2);
        assert_eq!(grid.query_radius(Vec2::ZERO, f64::INFINITY).count(), 3);
        assert_eq!(grid.query_radius(Vec2::new(50.0, 50.0), f64::MAX).count(), 3);

        // the occupied-cell scan must still honor the box
        let ids: Vec<_> = grid.query_radius(Vec2::new(1e7, 1e7), 1e5).map(|e| e.id).collect();
        assert_eq!(ids, vec![far.id]);
    }

    #[test]
    fn test_negative_coordinates() {
        let mut grid = SpatialGrid::new(64.0);
        let e = entry(-1.0, -1.0);
        grid.insert(e);

        let results: Vec<_> = grid.query_radius(Vec2::new(1.0, 1.0), 5.0).collect();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_stats() {
        let mut grid = SpatialGrid::new(64.0);
        for _ in 0..3 {
            grid.insert(entry(100.0, 100.0));
        }
        grid.insert(entry(500.0, 500.0));

        let stats = grid.stats();
        assert_eq!(stats.total_entities, 4);
        assert_eq!(stats.non_empty_cells, 2);
        assert_eq!(stats.max_per_cell, 3);
    }
}
