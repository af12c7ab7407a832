//! Dense occupancy table backing every placement decision.

use settlement_core::{CellCoord, CellRect, CellRectSize, EntityId};

/// Single grid cell and the entity whose footprint currently covers it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    position: CellCoord,
    occupant: Option<EntityId>,
}

impl Cell {
    /// Coordinates of the cell.
    #[must_use]
    pub const fn position(&self) -> CellCoord {
        self.position
    }

    /// Entity covering the cell, if any.
    #[must_use]
    pub const fn occupant(&self) -> Option<EntityId> {
        self.occupant
    }

    /// Reports whether no entity covers the cell.
    #[must_use]
    pub const fn is_free(&self) -> bool {
        self.occupant.is_none()
    }
}

/// Row-major occupancy grid with `(0, 0)` at the bottom-left corner.
///
/// Every method that takes a coordinate or area expects it to lie inside the
/// grid. Callers check [`SpatialGrid::is_area_out_of_bounds`] first; indexing
/// outside the grid panics.
#[derive(Clone, Debug)]
pub struct SpatialGrid {
    width: u32,
    height: u32,
    cells: Vec<Cell>,
}

impl SpatialGrid {
    /// Creates an empty grid with the provided dimensions.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let mut cells = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                cells.push(Cell {
                    position: CellCoord::new(x, y),
                    occupant: None,
                });
            }
        }

        Self {
            width,
            height,
            cells,
        }
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.x() < self.width && cell.y() < self.height
    }

    /// Reports whether any part of the area falls outside the grid. Areas
    /// with a zero dimension count as out of bounds.
    #[must_use]
    pub fn is_area_out_of_bounds(&self, origin: CellCoord, size: CellRectSize) -> bool {
        if size.is_empty() {
            return true;
        }

        let right = u64::from(origin.x()) + u64::from(size.width());
        let top = u64::from(origin.y()) + u64::from(size.height());
        right > u64::from(self.width) || top > u64::from(self.height)
    }

    /// Reports whether every cell of the area is free or held by `exclude`.
    #[must_use]
    pub fn is_area_free(
        &self,
        origin: CellCoord,
        size: CellRectSize,
        exclude: Option<EntityId>,
    ) -> bool {
        let area = CellRect::from_origin_and_size(origin, size);
        !self.any_in(area, |cell| match cell.occupant {
            None => false,
            Some(occupant) => Some(occupant) != exclude,
        })
    }

    /// Marks every cell of `area` as covered by `entity`.
    pub fn mark_occupied(&mut self, entity: EntityId, area: CellRect) {
        self.for_each_in_mut(area, |cell| cell.occupant = Some(entity));
    }

    /// Clears every cell of `area`.
    pub fn mark_free(&mut self, area: CellRect) {
        self.for_each_in_mut(area, |cell| cell.occupant = None);
    }

    /// Returns the cell stored at `position`.
    #[must_use]
    pub fn cell_at(&self, position: CellCoord) -> &Cell {
        &self.cells[self.index(position)]
    }

    /// Returns whether `predicate` holds for any cell of `area`, stopping at
    /// the first match.
    pub fn any_in<F>(&self, area: CellRect, mut predicate: F) -> bool
    where
        F: FnMut(&Cell) -> bool,
    {
        area.cells().any(|position| predicate(self.cell_at(position)))
    }

    /// Applies `visitor` to every cell of `area`.
    pub fn for_each_in_mut<F>(&mut self, area: CellRect, mut visitor: F)
    where
        F: FnMut(&mut Cell),
    {
        for position in area.cells() {
            let index = self.index(position);
            visitor(&mut self.cells[index]);
        }
    }

    /// Iterates every cell in row-major order, bottom row first.
    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    fn index(&self, position: CellCoord) -> usize {
        assert!(
            self.contains(position),
            "cell {position} outside {}x{} grid",
            self.width,
            self.height
        );
        position.y() as usize * self.width as usize + position.x() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use settlement_core::BuildingId;

    fn building(value: u32) -> EntityId {
        EntityId::Building(BuildingId::new(value))
    }

    fn rect(x: u32, y: u32, width: u32, height: u32) -> CellRect {
        CellRect::from_origin_and_size(CellCoord::new(x, y), CellRectSize::new(width, height))
    }

    #[test]
    fn marks_and_frees_footprint() {
        let mut grid = SpatialGrid::new(6, 4);
        let area = rect(1, 1, 2, 2);
        grid.mark_occupied(building(3), area);

        for cell in area.cells() {
            assert_eq!(grid.cell_at(cell).occupant(), Some(building(3)));
        }
        assert!(!grid.is_area_free(area.origin(), area.size(), None));
        assert!(grid.is_area_free(CellCoord::new(3, 0), CellRectSize::new(3, 4), None));

        grid.mark_free(area);
        assert!(grid.iter().all(Cell::is_free));
    }

    #[test]
    fn excluded_entity_does_not_block() {
        let mut grid = SpatialGrid::new(4, 4);
        grid.mark_occupied(building(1), rect(0, 0, 2, 2));

        assert!(grid.is_area_free(CellCoord::new(1, 1), CellRectSize::new(2, 2), Some(building(1))));
        assert!(!grid.is_area_free(CellCoord::new(1, 1), CellRectSize::new(2, 2), Some(building(2))));
    }

    #[test]
    fn out_of_bounds_covers_edges_and_empty_sizes() {
        let grid = SpatialGrid::new(5, 3);
        assert!(!grid.is_area_out_of_bounds(CellCoord::new(3, 1), CellRectSize::new(2, 2)));
        assert!(grid.is_area_out_of_bounds(CellCoord::new(4, 1), CellRectSize::new(2, 2)));
        assert!(grid.is_area_out_of_bounds(CellCoord::new(0, 2), CellRectSize::new(1, 2)));
        assert!(grid.is_area_out_of_bounds(CellCoord::new(0, 0), CellRectSize::new(0, 1)));
        assert!(grid.is_area_out_of_bounds(CellCoord::new(u32::MAX, 0), CellRectSize::new(1, 1)));
    }

    #[test]
    fn cells_know_their_position() {
        let grid = SpatialGrid::new(3, 2);
        assert_eq!(grid.cell_at(CellCoord::new(2, 1)).position(), CellCoord::new(2, 1));
    }

    #[test]
    #[should_panic(expected = "outside 3x3 grid")]
    fn indexing_outside_the_grid_is_fatal() {
        let grid = SpatialGrid::new(3, 3);
        let _ = grid.cell_at(CellCoord::new(3, 0));
    }
}
