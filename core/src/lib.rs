#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the settlement simulation.
//!
//! This crate defines the value types that connect the authoritative world,
//! the task scheduler, the command layer and adapters. The world owns grid
//! occupancy and entities, commands mutate it synchronously at dispatch time,
//! tasks mutate it once per tick, and every observable change is reported as
//! an [`Event`] for diagnostic consumers.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod catalog;
pub mod resources;

pub use catalog::{
    BuildingKind, BuildingSpec, Catalog, CatalogError, ProductionSpec, VehicleKind, VehicleSpec,
};
pub use resources::{ResourceBundle, ResourceKind, ResourceLedger};

/// Location of a single grid cell. `(0, 0)` is the bottom-left cell and `y`
/// grows upwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    x: u32,
    y: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row index of the cell, counted from the bottom edge.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Reports whether `other` shares an edge with this cell.
    #[must_use]
    pub fn is_adjacent_to(self, other: CellCoord) -> bool {
        self.manhattan_distance(other) == 1
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Size of a [`CellRect`] measured in whole cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRectSize {
    width: u32,
    height: u32,
}

impl CellRectSize {
    /// Creates a new size descriptor with explicit dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width of the rectangle in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the rectangle in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Reports whether either dimension is zero.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Axis-aligned footprint anchored at its bottom-left cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRect {
    origin: CellCoord,
    size: CellRectSize,
}

impl CellRect {
    /// Constructs a rectangle from an origin cell and size.
    #[must_use]
    pub const fn from_origin_and_size(origin: CellCoord, size: CellRectSize) -> Self {
        Self { origin, size }
    }

    /// Bottom-left cell that anchors the rectangle.
    #[must_use]
    pub const fn origin(&self) -> CellCoord {
        self.origin
    }

    /// Dimensions of the rectangle measured in whole cells.
    #[must_use]
    pub const fn size(&self) -> CellRectSize {
        self.size
    }

    /// Reports whether the rectangle covers the provided cell.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.x() >= self.origin.x()
            && cell.y() >= self.origin.y()
            && cell.x() - self.origin.x() < self.size.width()
            && cell.y() - self.origin.y() < self.size.height()
    }

    /// Iterates every covered cell row by row, starting at the origin.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> {
        let origin = self.origin;
        let size = self.size;
        (0..size.height()).flat_map(move |dy| {
            (0..size.width()).map(move |dx| CellCoord::new(origin.x() + dx, origin.y() + dy))
        })
    }
}

impl fmt::Display for CellRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} at {}",
            self.size.width(),
            self.size.height(),
            self.origin
        )
    }
}

/// Unique identifier assigned to a building.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildingId(u32);

impl BuildingId {
    /// Creates a new building identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VehicleId(u32);

impl VehicleId {
    /// Creates a new vehicle identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Reference to any entity that can occupy grid cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityId {
    /// A placed building.
    Building(BuildingId),
    /// A vehicle travelling across the grid.
    Vehicle(VehicleId),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Building(id) => write!(f, "building#{}", id.get()),
            Self::Vehicle(id) => write!(f, "vehicle#{}", id.get()),
        }
    }
}

/// Identifier assigned by the task scheduler. Never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// Creates a new task identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Lifecycle state of a scheduled task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// Waiting for a predecessor; performs no effect yet.
    Pending,
    /// Running and advancing once per tick.
    Ongoing,
    /// Abort requested; finishing the current discrete step.
    Aborting,
    /// Finished. Removed from the scheduler.
    Completed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Ongoing => "ongoing",
            Self::Aborting => "aborting",
            Self::Completed => "completed",
        };
        f.write_str(label)
    }
}

/// Ordered sequence of at least two cells where every consecutive pair is
/// 4-adjacent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    cells: Vec<CellCoord>,
}

impl Path {
    /// Validates the provided waypoints, returning `None` when they are too
    /// short or contain a non-adjacent hop.
    #[must_use]
    pub fn new(cells: Vec<CellCoord>) -> Option<Self> {
        if cells.len() < 2 {
            return None;
        }

        if cells
            .windows(2)
            .any(|pair| !pair[0].is_adjacent_to(pair[1]))
        {
            return None;
        }

        Some(Self { cells })
    }

    /// Waypoints in travel order.
    #[must_use]
    pub fn cells(&self) -> &[CellCoord] {
        &self.cells
    }

    /// Number of waypoints, always at least two.
    #[must_use]
    pub fn waypoint_count(&self) -> usize {
        self.cells.len()
    }

    /// Cell the path starts from.
    #[must_use]
    pub fn source(&self) -> CellCoord {
        self.cells[0]
    }

    /// Cell the path ends at.
    #[must_use]
    pub fn destination(&self) -> CellCoord {
        self.cells[self.cells.len() - 1]
    }
}

/// Reasons a world entry point may refuse to place or move an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum PlacementError {
    /// The requested footprint extends beyond the grid or has no area.
    #[error("footprint {0} lies outside the grid")]
    OutOfBounds(CellRect),
    /// The requested footprint overlaps an occupied cell.
    #[error("footprint {0} overlaps an occupied cell")]
    Occupied(CellRect),
    /// The catalog has no entry for the requested building kind.
    #[error("no catalog entry for building kind {0}")]
    UnknownBuilding(BuildingKind),
    /// The catalog has no entry for the requested vehicle kind.
    #[error("no catalog entry for vehicle kind {0}")]
    UnknownVehicle(VehicleKind),
    /// No entity with the provided identifier exists.
    #[error("{0} does not exist")]
    MissingEntity(EntityId),
}

/// Events broadcast while commands execute and tasks advance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A building was created and its footprint marked occupied.
    BuildingPlaced {
        /// Identifier assigned to the building.
        building: BuildingId,
        /// Kind of building placed.
        kind: BuildingKind,
        /// Region of cells it occupies.
        region: CellRect,
    },
    /// A building was destroyed and its footprint released.
    BuildingRemoved {
        /// Identifier of the removed building.
        building: BuildingId,
        /// Region of cells it previously occupied.
        region: CellRect,
    },
    /// A building was relocated.
    BuildingMoved {
        /// Identifier of the moved building.
        building: BuildingId,
        /// Anchor before the move.
        from: CellCoord,
        /// Anchor after the move.
        to: CellCoord,
    },
    /// A construction countdown finished.
    BuildingConstructed {
        /// Identifier of the finished building.
        building: BuildingId,
    },
    /// A production countdown credited resources to the ledger.
    ResourcesProduced {
        /// Producing building.
        building: BuildingId,
        /// Resources credited.
        resources: ResourceBundle,
    },
    /// The globally selected vehicle changed.
    VehicleSelected {
        /// Newly selected vehicle, `None` when deselected.
        vehicle: Option<VehicleId>,
    },
    /// A vehicle's occupancy crossed from one cell to the next.
    VehicleStepped {
        /// Identifier of the vehicle.
        vehicle: VehicleId,
        /// Anchor released.
        from: CellCoord,
        /// Anchor claimed.
        to: CellCoord,
    },
    /// A scheduled task changed state.
    TaskStatusChanged {
        /// Identifier of the task.
        task: TaskId,
        /// State the task entered.
        status: TaskStatus,
    },
    /// The command history gained or lost an entry.
    HistoryChanged {
        /// Number of commands retained after the change.
        entries: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = CellCoord::new(1, 1);
        let destination = CellCoord::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    #[test]
    fn rect_cells_cover_footprint_in_row_order() {
        let rect = CellRect::from_origin_and_size(CellCoord::new(2, 1), CellRectSize::new(2, 2));
        let cells: Vec<_> = rect.cells().collect();
        assert_eq!(
            cells,
            vec![
                CellCoord::new(2, 1),
                CellCoord::new(3, 1),
                CellCoord::new(2, 2),
                CellCoord::new(3, 2),
            ]
        );
        assert!(rect.contains(CellCoord::new(3, 2)));
        assert!(!rect.contains(CellCoord::new(4, 2)));
        assert!(!rect.contains(CellCoord::new(1, 1)));
    }

    #[test]
    fn path_rejects_short_or_disjoint_waypoints() {
        assert!(Path::new(vec![CellCoord::new(0, 0)]).is_none());
        assert!(Path::new(vec![CellCoord::new(0, 0), CellCoord::new(1, 1)]).is_none());
        assert!(Path::new(vec![CellCoord::new(0, 0), CellCoord::new(0, 0)]).is_none());

        let path = Path::new(vec![
            CellCoord::new(0, 0),
            CellCoord::new(0, 1),
            CellCoord::new(1, 1),
        ])
        .expect("adjacent waypoints form a path");
        assert_eq!(path.source(), CellCoord::new(0, 0));
        assert_eq!(path.destination(), CellCoord::new(1, 1));
        assert_eq!(path.waypoint_count(), 3);
    }

    #[test]
    fn empty_size_reports_empty() {
        assert!(CellRectSize::new(0, 3).is_empty());
        assert!(!CellRectSize::new(1, 1).is_empty());
    }
}
