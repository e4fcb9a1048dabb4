#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Coarse occupancy grid used to estimate how crowded a node's surroundings are.

use glam::Vec2;
use pulse_field_core::{GridCell, Screen};

/// Dense grid counting live nodes per coarse cell.
#[derive(Clone, Debug)]
pub struct OccupancyGrid {
    columns: u32,
    rows: u32,
    scale: f32,
    counts: Vec<u32>,
}

impl OccupancyGrid {
    /// Creates an empty grid covering the screen at the provided scale.
    ///
    /// Partial cells along the right and bottom edges are dropped; positions
    /// that fall into them are attributed to the last full cell.
    #[must_use]
    pub fn new(screen: Screen, scale: f32) -> Self {
        let columns = cells_along(screen.width(), scale);
        let rows = cells_along(screen.height(), scale);
        Self {
            columns,
            rows,
            scale,
            counts: vec![0; columns as usize * rows as usize],
        }
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Cell that owns the provided screen position.
    #[must_use]
    pub fn cell_for(&self, position: Vec2) -> GridCell {
        GridCell::new(
            scaled_index(position.x, self.scale, self.columns),
            scaled_index(position.y, self.scale, self.rows),
        )
    }

    /// Records a live node in the provided cell.
    pub fn increment(&mut self, cell: GridCell) {
        let index = self.index(cell);
        self.counts[index] += 1;
    }

    /// Removes a live node from the provided cell.
    ///
    /// # Panics
    ///
    /// Panics if the cell holds no live nodes.
    pub fn decrement(&mut self, cell: GridCell) {
        let index = self.index(cell);
        assert!(self.counts[index] > 0, "occupancy underflow at {cell:?}");
        self.counts[index] -= 1;
    }

    /// Number of live nodes recorded in the provided cell.
    #[must_use]
    pub fn count(&self, cell: GridCell) -> u32 {
        self.counts[self.index(cell)]
    }

    /// Number of live nodes recorded across the whole grid.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    /// Sum of the counts in the 3x3 neighbourhood around the cell, clipped to the grid.
    #[must_use]
    pub fn neighbourhood_sum(&self, cell: GridCell) -> u32 {
        let column = i64::from(cell.column());
        let row = i64::from(cell.row());
        let mut sum = 0;
        for neighbour_row in (row - 1)..=(row + 1) {
            for neighbour_column in (column - 1)..=(column + 1) {
                if neighbour_column < 0
                    || neighbour_row < 0
                    || neighbour_column >= i64::from(self.columns)
                    || neighbour_row >= i64::from(self.rows)
                {
                    continue;
                }
                sum += self.count(GridCell::new(neighbour_column as u32, neighbour_row as u32));
            }
        }
        sum
    }

    /// Crowding score in `0.0..=1.0` for a node stored in the provided cell.
    ///
    /// The node itself is excluded from the count, which is then normalised by
    /// the pool capacity.
    #[must_use]
    pub fn proximity_score(&self, cell: GridCell, capacity: usize) -> f32 {
        if capacity == 0 {
            return 0.0;
        }
        let others = i64::from(self.neighbourhood_sum(cell)) - 1;
        let clamped = others.clamp(0, capacity as i64);
        clamped as f32 / capacity as f32
    }

    /// Iterates over every cell in row-major order together with its count.
    pub fn iter(&self) -> impl Iterator<Item = (GridCell, u32)> + '_ {
        let columns = self.columns;
        self.counts.iter().enumerate().map(move |(index, count)| {
            let index = index as u32;
            (GridCell::new(index % columns, index / columns), *count)
        })
    }

    fn index(&self, cell: GridCell) -> usize {
        assert!(
            cell.column() < self.columns && cell.row() < self.rows,
            "cell {cell:?} outside {}x{} grid",
            self.columns,
            self.rows
        );
        cell.row() as usize * self.columns as usize + cell.column() as usize
    }
}

fn cells_along(extent: f32, scale: f32) -> u32 {
    (extent * scale).floor().max(1.0) as u32
}

fn scaled_index(coordinate: f32, scale: f32, cells: u32) -> u32 {
    let index = (coordinate * scale).floor().max(0.0) as u32;
    index.min(cells.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAPACITY: usize = 12;

    fn grid() -> OccupancyGrid {
        OccupancyGrid::new(Screen::new(400.0, 240.0), 0.01)
    }

    #[test]
    fn default_screen_produces_four_by_two_grid() {
        let grid = grid();
        assert_eq!(grid.columns(), 4);
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.iter().count(), 8);
    }

    #[test]
    fn positions_beyond_last_full_cell_are_clamped() {
        let grid = grid();
        assert_eq!(grid.cell_for(Vec2::new(399.0, 239.0)), GridCell::new(3, 1));
        assert_eq!(grid.cell_for(Vec2::new(400.0, 240.0)), GridCell::new(3, 1));
        assert_eq!(grid.cell_for(Vec2::new(0.0, 0.0)), GridCell::new(0, 0));
        assert_eq!(grid.cell_for(Vec2::new(150.0, 99.0)), GridCell::new(1, 0));
    }

    #[test]
    fn lone_node_scores_zero() {
        let mut grid = grid();
        let cell = GridCell::new(0, 0);
        grid.increment(cell);
        assert_eq!(grid.proximity_score(cell, CAPACITY), 0.0);
    }

    #[test]
    fn neighbours_are_counted_across_clipped_corner() {
        let mut grid = grid();
        grid.increment(GridCell::new(0, 0));
        grid.increment(GridCell::new(1, 1));
        grid.increment(GridCell::new(3, 1));
        let score = grid.proximity_score(GridCell::new(0, 0), CAPACITY);
        assert!((score - 1.0 / 12.0).abs() < 1e-6);
    }

    #[test]
    fn score_is_bounded_by_capacity() {
        let mut grid = grid();
        let cell = GridCell::new(1, 0);
        for _ in 0..40 {
            grid.increment(cell);
        }
        assert_eq!(grid.proximity_score(cell, CAPACITY), 1.0);
        assert_eq!(grid.proximity_score(GridCell::new(3, 1), CAPACITY), 0.0);
    }

    #[test]
    fn increments_and_decrements_balance() {
        let mut grid = grid();
        let cell = GridCell::new(2, 1);
        grid.increment(cell);
        grid.increment(cell);
        grid.decrement(cell);
        assert_eq!(grid.count(cell), 1);
        assert_eq!(grid.total(), 1);
    }

    #[test]
    #[should_panic(expected = "occupancy underflow")]
    fn decrementing_empty_cell_panics() {
        let mut grid = grid();
        grid.decrement(GridCell::new(0, 0));
    }
}
