//! Uniform grid keyed by integer cell coordinates.
//!
//! Each entity category gets its own index, rebuilt from scratch every tick.
//! Queries return everything in the `(2 * ring + 1)^2` block of cells around the
//! query point; callers filter with an exact distance test.

use super::types::Point;
use std::collections::HashMap;

pub type CellKey = (i32, i32);

const CELL_INITIAL_CAPACITY: usize = 8;

#[derive(Debug, Clone)]
pub struct SpatialIndex<T> {
    inv_cell_size: f64,
    cells: HashMap<CellKey, Vec<T>>,
}

impl<T: Copy + PartialEq> SpatialIndex<T> {
    pub fn new(cell_size: f64) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            1.0
        };
        Self {
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::new(),
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cell_of(&self, x: f64, y: f64) -> CellKey {
        (
            (x * self.inv_cell_size).floor() as i32,
            (y * self.inv_cell_size).floor() as i32,
        )
    }

    /// Smallest ring radius that covers every point within `distance` of a query point.
    pub fn ring_for(&self, distance: f64) -> i32 {
        (distance.max(0.0) * self.inv_cell_size).ceil().max(1.0) as i32
    }

    pub fn clear(&mut self) {
        // Keep the per-cell allocations around for the next rebuild.
        for cell in self.cells.values_mut() {
            cell.clear();
        }
    }

    pub fn insert(&mut self, item: T, x: f64, y: f64) {
        let key = self.cell_of(x, y);
        self.cells
            .entry(key)
            .or_insert_with(|| Vec::with_capacity(CELL_INITIAL_CAPACITY))
            .push(item);
    }

    pub fn insert_at(&mut self, item: T, point: Point) {
        self.insert(item, point.x, point.y);
    }

    /// Removes one occurrence of `item` from the cell containing `(x, y)`.
    pub fn remove(&mut self, item: T, x: f64, y: f64) -> bool {
        let key = self.cell_of(x, y);
        let Some(cell) = self.cells.get_mut(&key) else { return false };
        let Some(position) = cell.iter().position(|candidate| *candidate == item) else {
            return false;
        };
        cell.swap_remove(position);
        true
    }

    /// Remove-then-reinsert for an item that moved within the tick.
    pub fn relocate(&mut self, item: T, from: Point, to: Point) {
        if self.cell_of(from.x, from.y) == self.cell_of(to.x, to.y) {
            return;
        }
        if self.remove(item, from.x, from.y) {
            self.insert(item, to.x, to.y);
        }
    }

    pub fn query(&self, x: f64, y: f64, ring: i32) -> impl Iterator<Item = &T> + '_ {
        let (cx, cy) = self.cell_of(x, y);
        let ring = ring.max(0);
        (cx - ring..=cx + ring).flat_map(move |gx| {
            (cy - ring..=cy + ring).flat_map(move |gy| {
                self.cells
                    .get(&(gx, gy))
                    .into_iter()
                    .flat_map(|cell| cell.iter())
            })
        })
    }

    pub fn query_point(&self, point: Point, ring: i32) -> impl Iterator<Item = &T> + '_ {
        self.query(point.x, point.y, ring)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_finds_items_within_ring_distance() {
        let mut index = SpatialIndex::new(10.0);
        index.insert(1u32, 5.0, 5.0);
        index.insert(2u32, 14.0, 5.0);
        index.insert(3u32, -9.0, -9.0);
        index.insert(4u32, 45.0, 45.0);

        let mut found: Vec<u32> = index.query(5.0, 5.0, 1).copied().collect();
        found.sort_unstable();
        assert_eq!(found, vec![1, 2, 3]);
    }

    #[test]
    fn ring_block_is_square() {
        let mut index = SpatialIndex::new(10.0);
        for gx in -3..=3 {
            for gy in -3..=3 {
                index.insert((gx, gy), gx as f64 * 10.0 + 5.0, gy as f64 * 10.0 + 5.0);
            }
        }
        assert_eq!(index.query(5.0, 5.0, 2).count(), 25);
        assert_eq!(index.query(5.0, 5.0, 0).count(), 1);
    }

    #[test]
    fn negative_coordinates_floor_into_their_own_cell() {
        let index: SpatialIndex<u8> = SpatialIndex::new(10.0);
        assert_eq!(index.cell_of(-0.5, 0.5), (-1, 0));
        assert_eq!(index.cell_of(-10.0, -10.1), (-1, -2));
    }

    #[test]
    fn remove_then_reinsert_moves_item() {
        let mut index = SpatialIndex::new(10.0);
        index.insert(7u32, 1.0, 1.0);
        index.relocate(7u32, Point { x: 1.0, y: 1.0 }, Point { x: 95.0, y: 95.0 });
        assert_eq!(index.query(1.0, 1.0, 1).count(), 0);
        assert_eq!(index.query(95.0, 95.0, 0).copied().collect::<Vec<_>>(), vec![7]);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn clear_empties_every_cell() {
        let mut index = SpatialIndex::new(10.0);
        index.insert(1u32, 1.0, 1.0);
        index.insert(2u32, 100.0, 100.0);
        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.query(1.0, 1.0, 20).count(), 0);
    }

    #[test]
    fn ring_for_covers_distance() {
        let index: SpatialIndex<u8> = SpatialIndex::new(64.0);
        assert_eq!(index.ring_for(10.0), 1);
        assert_eq!(index.ring_for(64.0), 1);
        assert_eq!(index.ring_for(65.0), 2);
    }
}
