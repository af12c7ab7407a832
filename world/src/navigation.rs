//! Breadth-first path search over the occupancy grid.

use std::collections::VecDeque;

use settlement_core::{CellCoord, CellRectSize, EntityId, Path};

use crate::grid::SpatialGrid;

/// Breadth-first path finder with reusable scratch buffers.
///
/// The finder is stateless between calls apart from its buffers, which are
/// resized to the grid on every search. Neighbours are expanded up, right,
/// down, left so equal-length solutions resolve identically run to run.
#[derive(Clone, Debug, Default)]
pub struct PathFinder {
    predecessors: Vec<Option<CellCoord>>,
    discovered: Vec<bool>,
    frontier: VecDeque<CellCoord>,
}

impl PathFinder {
    /// Creates a finder with empty buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Searches for the shortest 4-connected route for a mover of the given
    /// footprint. Cells held by `mover` itself do not block.
    ///
    /// Returns `None` when the source equals the destination, the destination
    /// area leaves the grid, or the frontier empties first. `from` must lie
    /// inside the grid.
    pub fn find_path(
        &mut self,
        grid: &SpatialGrid,
        from: CellCoord,
        to: CellCoord,
        footprint: CellRectSize,
        mover: Option<EntityId>,
    ) -> Option<Path> {
        if from == to || grid.is_area_out_of_bounds(to, footprint) {
            return None;
        }

        let width = grid.width();
        let height = grid.height();
        self.reset(width, height);

        self.discovered[index(width, from)] = true;
        self.frontier.push_back(from);

        while let Some(current) = self.frontier.pop_front() {
            let came_from = self.predecessors[index(width, current)];

            for neighbor in neighbors(current, width, height) {
                if Some(neighbor) == came_from {
                    continue;
                }

                let neighbor_index = index(width, neighbor);
                if self.discovered[neighbor_index] {
                    continue;
                }

                if grid.is_area_out_of_bounds(neighbor, footprint)
                    || !grid.is_area_free(neighbor, footprint, mover)
                {
                    continue;
                }

                self.discovered[neighbor_index] = true;
                self.predecessors[neighbor_index] = Some(current);

                if neighbor == to {
                    return self.reconstruct(width, from, to);
                }

                self.frontier.push_back(neighbor);
            }
        }

        None
    }

    fn reset(&mut self, width: u32, height: u32) {
        let cell_count = width as usize * height as usize;
        self.predecessors.clear();
        self.predecessors.resize(cell_count, None);
        self.discovered.clear();
        self.discovered.resize(cell_count, false);
        self.frontier.clear();
    }

    fn reconstruct(&self, width: u32, from: CellCoord, to: CellCoord) -> Option<Path> {
        let mut cells = vec![to];
        let mut cursor = to;
        while cursor != from {
            cursor = self.predecessors[index(width, cursor)]?;
            cells.push(cursor);
        }
        cells.reverse();
        Path::new(cells)
    }
}

fn neighbors(cell: CellCoord, width: u32, height: u32) -> impl Iterator<Item = CellCoord> {
    let mut candidates = [None; 4];
    let mut count = 0;

    if let Some(y) = cell.y().checked_add(1) {
        if y < height {
            candidates[count] = Some(CellCoord::new(cell.x(), y));
            count += 1;
        }
    }

    if let Some(x) = cell.x().checked_add(1) {
        if x < width {
            candidates[count] = Some(CellCoord::new(x, cell.y()));
            count += 1;
        }
    }

    if let Some(y) = cell.y().checked_sub(1) {
        candidates[count] = Some(CellCoord::new(cell.x(), y));
        count += 1;
    }

    if let Some(x) = cell.x().checked_sub(1) {
        candidates[count] = Some(CellCoord::new(x, cell.y()));
        count += 1;
    }

    candidates.into_iter().take(count).flatten()
}

fn index(width: u32, cell: CellCoord) -> usize {
    cell.y() as usize * width as usize + cell.x() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use settlement_core::{BuildingId, CellRect, VehicleId};

    const ONE: CellRectSize = CellRectSize::new(1, 1);

    fn wall(grid: &mut SpatialGrid, id: u32, x: u32, y: u32) {
        grid.mark_occupied(
            EntityId::Building(BuildingId::new(id)),
            CellRect::from_origin_and_size(CellCoord::new(x, y), ONE),
        );
    }

    #[test]
    fn neighbors_follow_up_right_down_left() {
        let order: Vec<_> = neighbors(CellCoord::new(1, 1), 3, 3).collect();
        assert_eq!(
            order,
            vec![
                CellCoord::new(1, 2),
                CellCoord::new(2, 1),
                CellCoord::new(1, 0),
                CellCoord::new(0, 1),
            ]
        );
        assert_eq!(neighbors(CellCoord::new(0, 0), 1, 1).count(), 0);
    }

    #[test]
    fn prefers_upward_expansion_among_equal_routes() {
        let grid = SpatialGrid::new(3, 3);
        let mut finder = PathFinder::new();
        let path = finder
            .find_path(&grid, CellCoord::new(0, 0), CellCoord::new(1, 1), ONE, None)
            .expect("open grid has a path");
        assert_eq!(
            path.cells(),
            &[
                CellCoord::new(0, 0),
                CellCoord::new(0, 1),
                CellCoord::new(1, 1)
            ]
        );
    }

    #[test]
    fn routes_around_walls() {
        let mut grid = SpatialGrid::new(3, 3);
        wall(&mut grid, 1, 1, 0);
        wall(&mut grid, 2, 1, 1);
        let mut finder = PathFinder::new();

        let path = finder
            .find_path(&grid, CellCoord::new(0, 0), CellCoord::new(2, 0), ONE, None)
            .expect("detour over the top exists");
        assert_eq!(path.waypoint_count(), 7);
        assert!(path.cells().contains(&CellCoord::new(1, 2)));
    }

    #[test]
    fn mover_does_not_block_itself() {
        let mut grid = SpatialGrid::new(4, 1);
        let mover = EntityId::Vehicle(VehicleId::new(0));
        grid.mark_occupied(
            mover,
            CellRect::from_origin_and_size(CellCoord::new(0, 0), CellRectSize::new(2, 1)),
        );
        let mut finder = PathFinder::new();

        let path = finder.find_path(
            &grid,
            CellCoord::new(0, 0),
            CellCoord::new(2, 0),
            CellRectSize::new(2, 1),
            Some(mover),
        );
        assert_eq!(path.map(|path| path.waypoint_count()), Some(3));
    }

    #[test]
    fn same_cell_and_out_of_bounds_destinations_have_no_path() {
        let grid = SpatialGrid::new(3, 3);
        let mut finder = PathFinder::new();
        assert!(finder
            .find_path(&grid, CellCoord::new(1, 1), CellCoord::new(1, 1), ONE, None)
            .is_none());
        assert!(finder
            .find_path(&grid, CellCoord::new(0, 0), CellCoord::new(3, 0), ONE, None)
            .is_none());
    }
}
