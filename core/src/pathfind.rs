//! Coarse walkability grid and the path-cost oracle used to filter worlds.

use alloc::collections::BinaryHeap;
use alloc::vec;
use alloc::vec::Vec;
use core::cmp::Reverse;

use crate::constants::{LEVEL, WALK_GRID_CELLS};
use crate::field::Field;
use crate::fixed_point::MathTables;

const STRAIGHT_COST: u32 = 10;
const DIAGONAL_COST: u32 = 14;
const GRID_STEP: i64 = (1i64 << 32) / WALK_GRID_CELLS as i64;

/// Walkable cells of the map sampled on a square grid, with a blocked
/// one-cell border. Coordinates are `(x, y)` with y growing downward.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalkGrid {
    side: usize,
    cells: Vec<bool>,
}

impl WalkGrid {
    pub fn blocked(side: usize) -> Self {
        Self {
            side,
            cells: vec![false; side * side],
        }
    }

    /// Sample `field` below ground level. Rows start at world y = 0 and walk
    /// downward around the torus; columns span the full x range.
    pub fn from_field(field: &Field, t: &MathTables) -> Self {
        let mut grid = Self::blocked(WALK_GRID_CELLS + 2);

        let mut row = 1;
        let mut y: i64 = 0;
        while y > -(i32::MAX as i64) {
            let mut col = 1;
            let mut x = -(i32::MAX as i64);
            while x <= i32::MAX as i64 {
                grid.set(col, row, field.height(t, [x as i32, y as i32]) < LEVEL as i16);
                col += 1;
                x += GRID_STEP;
            }
            row += 1;
            y -= GRID_STEP;
        }

        let mut y = i32::MAX as i64;
        while y >= 0 {
            let mut col = 1;
            let mut x = -(i32::MAX as i64);
            while x < i32::MAX as i64 {
                grid.set(col, row, field.height(t, [x as i32, y as i32]) < LEVEL as i16);
                col += 1;
                x += GRID_STEP;
            }
            row += 1;
            y -= GRID_STEP;
        }

        grid
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn is_walkable(&self, x: usize, y: usize) -> bool {
        x < self.side && y < self.side && self.cells[y * self.side + x]
    }

    pub fn set(&mut self, x: usize, y: usize, walkable: bool) {
        if x < self.side && y < self.side {
            self.cells[y * self.side + x] = walkable;
        }
    }

    pub fn walkable_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }
}

/// Cheapest path cost between two grid cells, `None` when unreachable.
pub trait PathOracle {
    fn path_cost(&self, grid: &WalkGrid, start: (usize, usize), goal: (usize, usize))
        -> Option<u32>;
}

/// 8-connected A* with straight cost 10, diagonal cost 14 and no corner
/// cutting.
#[derive(Clone, Copy, Debug, Default)]
pub struct GridAStar;

impl PathOracle for GridAStar {
    fn path_cost(
        &self,
        grid: &WalkGrid,
        start: (usize, usize),
        goal: (usize, usize),
    ) -> Option<u32> {
        if !grid.is_walkable(start.0, start.1) || !grid.is_walkable(goal.0, goal.1) {
            return None;
        }

        let side = grid.side();
        let heuristic = |x: usize, y: usize| -> u32 {
            let dx = x.abs_diff(goal.0) as u32;
            let dy = y.abs_diff(goal.1) as u32;
            STRAIGHT_COST * dx.max(dy) + (DIAGONAL_COST - STRAIGHT_COST) * dx.min(dy)
        };

        let mut best = vec![u32::MAX; side * side];
        let mut open = BinaryHeap::new();
        best[start.1 * side + start.0] = 0;
        open.push(Reverse((heuristic(start.0, start.1), 0u32, start.0, start.1)));

        while let Some(Reverse((_, cost, x, y))) = open.pop() {
            if (x, y) == goal {
                return Some(cost);
            }
            if cost > best[y * side + x] {
                continue;
            }
            for dy in -1isize..=1 {
                for dx in -1isize..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let (Some(nx), Some(ny)) =
                        (x.checked_add_signed(dx), y.checked_add_signed(dy))
                    else {
                        continue;
                    };
                    if !grid.is_walkable(nx, ny) {
                        continue;
                    }
                    let diagonal = dx != 0 && dy != 0;
                    if diagonal && (!grid.is_walkable(nx, y) || !grid.is_walkable(x, ny)) {
                        continue;
                    }
                    let next = cost + if diagonal { DIAGONAL_COST } else { STRAIGHT_COST };
                    let slot = &mut best[ny * side + nx];
                    if next < *slot {
                        *slot = next;
                        open.push(Reverse((next + heuristic(nx, ny), next, nx, ny)));
                    }
                }
            }
        }
        None
    }
}

impl<P: PathOracle + ?Sized> PathOracle for &P {
    fn path_cost(&self, grid: &WalkGrid, start: (usize, usize), goal: (usize, usize))
        -> Option<u32> {
        (**self).path_cost(grid, start, goal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_grid(side: usize) -> WalkGrid {
        let mut grid = WalkGrid::blocked(side);
        for y in 1..side - 1 {
            for x in 1..side - 1 {
                grid.set(x, y, true);
            }
        }
        grid
    }

    #[test]
    fn test_straight_and_diagonal_costs() {
        let grid = open_grid(12);
        assert_eq!(GridAStar.path_cost(&grid, (1, 1), (5, 1)), Some(40));
        assert_eq!(GridAStar.path_cost(&grid, (1, 1), (4, 4)), Some(42));
        assert_eq!(GridAStar.path_cost(&grid, (1, 1), (7, 4)), Some(72));
        assert_eq!(GridAStar.path_cost(&grid, (3, 3), (3, 3)), Some(0));
    }

    #[test]
    fn test_blocked_endpoints() {
        let grid = open_grid(8);
        assert_eq!(GridAStar.path_cost(&grid, (0, 0), (3, 3)), None);
        assert_eq!(GridAStar.path_cost(&grid, (1, 1), (7, 7)), None);
    }

    #[test]
    fn test_wall_forces_detour() {
        let mut grid = open_grid(10);
        for y in 1..8 {
            grid.set(5, y, false);
        }
        // Around the bottom of the wall at (5, 8).
        let cost = GridAStar.path_cost(&grid, (4, 1), (6, 1)).unwrap();
        assert!(cost > 20, "detour expected, got {cost}");
        for y in 1..9 {
            grid.set(5, y, false);
        }
        assert_eq!(GridAStar.path_cost(&grid, (4, 1), (6, 1)), None);
    }

    #[test]
    fn test_no_corner_cutting() {
        let mut grid = open_grid(5);
        // Only a diagonal squeeze between (1,1) and (2,2).
        grid.set(2, 1, false);
        grid.set(1, 2, false);
        grid.set(3, 1, false);
        grid.set(3, 2, false);
        grid.set(1, 3, false);
        grid.set(2, 3, false);
        grid.set(3, 3, false);
        assert_eq!(GridAStar.path_cost(&grid, (1, 1), (2, 2)), None);
    }

    #[test]
    fn test_grid_from_flat_field() {
        let t = MathTables::shared();
        let mut field = Field::default();
        field.flatten_first_row();
        let grid = WalkGrid::from_field(&field, t);
        assert_eq!(grid.side(), WALK_GRID_CELLS + 2);
        assert!(!grid.is_walkable(0, 0));
        assert!(!grid.is_walkable(WALK_GRID_CELLS + 1, 5));
        assert!(grid.is_walkable(256, 1));
        assert!(grid.is_walkable(508, 464));
        assert_eq!(grid.walkable_count(), 250_368);
        assert_eq!(GridAStar.path_cost(&grid, (256, 1), (508, 464)), Some(5638));
        assert_eq!(GridAStar.path_cost(&grid, (256, 1), (4, 464)), Some(5638));
    }
}
