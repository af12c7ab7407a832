#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative settlement state: the occupancy grid, placed entities, the
//! resource ledger, the catalog and the vehicle selection.
//!
//! [`World`] is the explicit context object every command and task receives.
//! Mutating entry points keep the grid invariant intact: an entity's footprint
//! is always inside the grid and never overlaps another entity's footprint.

use std::collections::BTreeMap;

use glam::Vec2;
use settlement_core::{
    BuildingId, BuildingKind, CellCoord, CellRect, CellRectSize, Catalog, EntityId, Path,
    PlacementError, ResourceBundle, ResourceLedger, VehicleId, VehicleKind,
};
use tracing::debug;

pub mod grid;
pub mod navigation;

pub use grid::{Cell, SpatialGrid};
pub use navigation::PathFinder;

const DEFAULT_COLUMNS: u32 = 16;
const DEFAULT_ROWS: u32 = 12;
const DEFAULT_CELL_SIZE: f32 = 1.0;

/// Parameters used to create a [`World`].
#[derive(Clone, Debug)]
pub struct WorldConfig {
    /// Number of grid columns.
    pub columns: u32,
    /// Number of grid rows.
    pub rows: u32,
    /// Side length of a cell in world units.
    pub cell_size: f32,
    /// Static per-kind data.
    pub catalog: Catalog,
    /// Balances the ledger starts with.
    pub starting_resources: ResourceBundle,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS,
            rows: DEFAULT_ROWS,
            cell_size: DEFAULT_CELL_SIZE,
            catalog: Catalog::standard(),
            starting_resources: ResourceBundle::new(),
        }
    }
}

impl WorldConfig {
    /// Default configuration with custom grid dimensions.
    #[must_use]
    pub fn with_dimensions(columns: u32, rows: u32) -> Self {
        Self {
            columns,
            rows,
            ..Self::default()
        }
    }

    /// Replaces the starting balances.
    #[must_use]
    pub fn with_resources(mut self, starting_resources: ResourceBundle) -> Self {
        self.starting_resources = starting_resources;
        self
    }
}

/// A placed building.
#[derive(Clone, Debug, PartialEq)]
pub struct Building {
    id: BuildingId,
    kind: BuildingKind,
    origin: CellCoord,
    footprint: CellRectSize,
    constructed: bool,
}

impl Building {
    /// Identifier allocated by the world.
    #[must_use]
    pub const fn id(&self) -> BuildingId {
        self.id
    }

    /// Kind the building was created from.
    #[must_use]
    pub const fn kind(&self) -> BuildingKind {
        self.kind
    }

    /// Bottom-left anchor.
    #[must_use]
    pub const fn origin(&self) -> CellCoord {
        self.origin
    }

    /// Cells covered by the building.
    #[must_use]
    pub const fn region(&self) -> CellRect {
        CellRect::from_origin_and_size(self.origin, self.footprint)
    }

    /// Whether the construction countdown has finished.
    #[must_use]
    pub const fn is_constructed(&self) -> bool {
        self.constructed
    }
}

/// A vehicle on the grid.
#[derive(Clone, Debug, PartialEq)]
pub struct Vehicle {
    id: VehicleId,
    kind: VehicleKind,
    cell: CellCoord,
    footprint: CellRectSize,
    speed: f32,
    position: Vec2,
}

impl Vehicle {
    /// Identifier allocated by the world.
    #[must_use]
    pub const fn id(&self) -> VehicleId {
        self.id
    }

    /// Kind the vehicle was created from.
    #[must_use]
    pub const fn kind(&self) -> VehicleKind {
        self.kind
    }

    /// Anchor whose footprint the vehicle currently occupies.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// Footprint measured in cells.
    #[must_use]
    pub const fn footprint(&self) -> CellRectSize {
        self.footprint
    }

    /// Cells covered by the vehicle.
    #[must_use]
    pub const fn region(&self) -> CellRect {
        CellRect::from_origin_and_size(self.cell, self.footprint)
    }

    /// Travel speed in world units per second.
    #[must_use]
    pub const fn speed(&self) -> f32 {
        self.speed
    }

    /// Continuous anchor position in world units, interpolated while moving.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }
}

/// Represents the authoritative settlement state.
#[derive(Debug)]
pub struct World {
    grid: SpatialGrid,
    cell_size: f32,
    catalog: Catalog,
    ledger: ResourceLedger,
    buildings: BTreeMap<BuildingId, Building>,
    vehicles: BTreeMap<VehicleId, Vehicle>,
    next_building_id: BuildingId,
    next_vehicle_id: VehicleId,
    selected_vehicle: Option<VehicleId>,
    pathfinder: PathFinder,
}

impl World {
    /// Creates an empty world from the provided configuration.
    #[must_use]
    pub fn new(config: WorldConfig) -> Self {
        Self {
            grid: SpatialGrid::new(config.columns, config.rows),
            cell_size: config.cell_size,
            catalog: config.catalog,
            ledger: ResourceLedger::with_balances(config.starting_resources),
            buildings: BTreeMap::new(),
            vehicles: BTreeMap::new(),
            next_building_id: BuildingId::new(0),
            next_vehicle_id: VehicleId::new(0),
            selected_vehicle: None,
            pathfinder: PathFinder::new(),
        }
    }

    /// Read-only access to the occupancy grid.
    #[must_use]
    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    /// Side length of a cell in world units.
    #[must_use]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Static per-kind data.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Current resource balances.
    #[must_use]
    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    /// Mutable access to the resource balances.
    pub fn ledger_mut(&mut self) -> &mut ResourceLedger {
        &mut self.ledger
    }

    /// Converts a cell anchor into a world-space position.
    #[must_use]
    pub fn cell_to_world(&self, cell: CellCoord) -> Vec2 {
        Vec2::new(cell.x() as f32, cell.y() as f32) * self.cell_size
    }

    /// Creates a building at `origin` and marks its footprint occupied.
    pub fn build_building(
        &mut self,
        kind: BuildingKind,
        origin: CellCoord,
    ) -> Result<BuildingId, PlacementError> {
        let footprint = self
            .catalog
            .building(kind)
            .map(|spec| spec.footprint)
            .ok_or(PlacementError::UnknownBuilding(kind))?;
        self.check_area(origin, footprint, None)?;

        let id = self.next_building_id;
        self.next_building_id = BuildingId::new(id.get() + 1);
        let building = Building {
            id,
            kind,
            origin,
            footprint,
            constructed: false,
        };
        self.grid
            .mark_occupied(EntityId::Building(id), building.region());
        debug!(building = id.get(), %kind, %origin, "building placed");
        let _ = self.buildings.insert(id, building);
        Ok(id)
    }

    /// Destroys a building and frees its footprint.
    pub fn remove_building(&mut self, id: BuildingId) -> Option<Building> {
        let building = self.buildings.remove(&id)?;
        self.grid.mark_free(building.region());
        debug!(building = id.get(), "building removed");
        Some(building)
    }

    /// Moves a building to `to`, returning its previous anchor.
    pub fn move_building(
        &mut self,
        id: BuildingId,
        to: CellCoord,
    ) -> Result<CellCoord, PlacementError> {
        let entity = EntityId::Building(id);
        let (from, footprint) = self
            .buildings
            .get(&id)
            .map(|building| (building.origin, building.footprint))
            .ok_or(PlacementError::MissingEntity(entity))?;
        self.check_area(to, footprint, Some(entity))?;

        self.relocate(entity, from, to, footprint);
        if let Some(building) = self.buildings.get_mut(&id) {
            building.origin = to;
        }
        debug!(building = id.get(), %from, %to, "building moved");
        Ok(from)
    }

    /// Flags a building as constructed. Returns `false` when it no longer exists.
    pub fn mark_constructed(&mut self, id: BuildingId) -> bool {
        match self.buildings.get_mut(&id) {
            Some(building) => {
                building.constructed = true;
                true
            }
            None => false,
        }
    }

    /// Creates a vehicle at `origin` and marks its footprint occupied.
    pub fn build_vehicle(
        &mut self,
        kind: VehicleKind,
        origin: CellCoord,
    ) -> Result<VehicleId, PlacementError> {
        let (footprint, speed) = self
            .catalog
            .vehicle(kind)
            .map(|spec| (spec.footprint, spec.speed))
            .ok_or(PlacementError::UnknownVehicle(kind))?;
        self.check_area(origin, footprint, None)?;

        let id = self.next_vehicle_id;
        self.next_vehicle_id = VehicleId::new(id.get() + 1);
        let vehicle = Vehicle {
            id,
            kind,
            cell: origin,
            footprint,
            speed,
            position: self.cell_to_world(origin),
        };
        self.grid.mark_occupied(EntityId::Vehicle(id), vehicle.region());
        debug!(vehicle = id.get(), %kind, %origin, "vehicle placed");
        let _ = self.vehicles.insert(id, vehicle);
        Ok(id)
    }

    /// Destroys a vehicle, frees its footprint and drops it from the selection.
    pub fn remove_vehicle(&mut self, id: VehicleId) -> Option<Vehicle> {
        let vehicle = self.vehicles.remove(&id)?;
        self.grid.mark_free(vehicle.region());
        if self.selected_vehicle == Some(id) {
            self.selected_vehicle = None;
        }
        debug!(vehicle = id.get(), "vehicle removed");
        Some(vehicle)
    }

    /// Atomically transfers a vehicle's occupancy to `to`, returning the
    /// previous anchor. The continuous position is left untouched.
    pub fn transfer_vehicle(
        &mut self,
        id: VehicleId,
        to: CellCoord,
    ) -> Result<CellCoord, PlacementError> {
        let entity = EntityId::Vehicle(id);
        let (from, footprint) = self
            .vehicles
            .get(&id)
            .map(|vehicle| (vehicle.cell, vehicle.footprint))
            .ok_or(PlacementError::MissingEntity(entity))?;
        self.check_area(to, footprint, Some(entity))?;

        self.relocate(entity, from, to, footprint);
        if let Some(vehicle) = self.vehicles.get_mut(&id) {
            vehicle.cell = to;
        }
        Ok(from)
    }

    /// Updates a vehicle's continuous position.
    pub fn set_vehicle_position(&mut self, id: VehicleId, position: Vec2) {
        if let Some(vehicle) = self.vehicles.get_mut(&id) {
            vehicle.position = position;
        }
    }

    /// Replaces the selected vehicle, returning the previous selection.
    pub fn select_vehicle(&mut self, vehicle: Option<VehicleId>) -> Option<VehicleId> {
        std::mem::replace(&mut self.selected_vehicle, vehicle)
    }

    /// Searches a route for a vehicle from its current anchor to `to`.
    pub fn find_path(&mut self, id: VehicleId, to: CellCoord) -> Option<Path> {
        let vehicle = self.vehicles.get(&id)?;
        self.pathfinder.find_path(
            &self.grid,
            vehicle.cell,
            to,
            vehicle.footprint,
            Some(EntityId::Vehicle(id)),
        )
    }

    fn check_area(
        &self,
        origin: CellCoord,
        footprint: CellRectSize,
        exclude: Option<EntityId>,
    ) -> Result<(), PlacementError> {
        let region = CellRect::from_origin_and_size(origin, footprint);
        if self.grid.is_area_out_of_bounds(origin, footprint) {
            return Err(PlacementError::OutOfBounds(region));
        }
        if !self.grid.is_area_free(origin, footprint, exclude) {
            return Err(PlacementError::Occupied(region));
        }
        Ok(())
    }

    fn relocate(
        &mut self,
        entity: EntityId,
        from: CellCoord,
        to: CellCoord,
        footprint: CellRectSize,
    ) {
        self.grid
            .mark_free(CellRect::from_origin_and_size(from, footprint));
        self.grid
            .mark_occupied(entity, CellRect::from_origin_and_size(to, footprint));
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use settlement_core::{
        BuildingId, CellCoord, CellRect, CellRectSize, EntityId, ResourceBundle, VehicleId,
    };

    use super::{Building, Vehicle, World};

    /// Retrieves a building by identifier.
    #[must_use]
    pub fn building(world: &World, id: BuildingId) -> Option<&Building> {
        world.buildings.get(&id)
    }

    /// Iterates buildings in identifier order.
    pub fn buildings(world: &World) -> impl Iterator<Item = &Building> {
        world.buildings.values()
    }

    /// Retrieves a vehicle by identifier.
    #[must_use]
    pub fn vehicle(world: &World, id: VehicleId) -> Option<&Vehicle> {
        world.vehicles.get(&id)
    }

    /// Iterates vehicles in identifier order.
    pub fn vehicles(world: &World) -> impl Iterator<Item = &Vehicle> {
        world.vehicles.values()
    }

    /// Entity covering `cell`, or `None` when free or outside the grid.
    #[must_use]
    pub fn occupant(world: &World, cell: CellCoord) -> Option<EntityId> {
        if !world.grid.contains(cell) {
            return None;
        }
        world.grid.cell_at(cell).occupant()
    }

    /// Vehicle covering `cell`, if any.
    #[must_use]
    pub fn vehicle_at(world: &World, cell: CellCoord) -> Option<VehicleId> {
        match occupant(world, cell) {
            Some(EntityId::Vehicle(id)) => Some(id),
            _ => None,
        }
    }

    /// Building covering `cell`, if any.
    #[must_use]
    pub fn building_at(world: &World, cell: CellCoord) -> Option<BuildingId> {
        match occupant(world, cell) {
            Some(EntityId::Building(id)) => Some(id),
            _ => None,
        }
    }

    /// Currently selected vehicle.
    #[must_use]
    pub fn selected_vehicle(world: &World) -> Option<VehicleId> {
        world.selected_vehicle
    }

    /// Reports whether the area is inside the grid and free apart from
    /// `exclude`.
    #[must_use]
    pub fn is_area_available(
        world: &World,
        origin: CellCoord,
        size: CellRectSize,
        exclude: Option<EntityId>,
    ) -> bool {
        !world.grid.is_area_out_of_bounds(origin, size)
            && world.grid.is_area_free(origin, size, exclude)
    }

    /// Footprint an entity covers, if it exists.
    #[must_use]
    pub fn region_of(world: &World, entity: EntityId) -> Option<CellRect> {
        match entity {
            EntityId::Building(id) => building(world, id).map(Building::region),
            EntityId::Vehicle(id) => vehicle(world, id).map(Vehicle::region),
        }
    }

    /// Current resource balances.
    #[must_use]
    pub fn balances(world: &World) -> &ResourceBundle {
        world.ledger.balances()
    }

    /// Verifies that every occupied cell is covered by its occupant's
    /// footprint and every footprint cell names its entity.
    #[must_use]
    pub fn occupancy_is_consistent(world: &World) -> bool {
        let cells_match = world.grid.iter().all(|cell| match cell.occupant() {
            None => true,
            Some(entity) => {
                region_of(world, entity).is_some_and(|region| region.contains(cell.position()))
            }
        });

        let buildings_match = world.buildings.values().all(|building| {
            building.region().cells().all(|position| {
                world.grid.cell_at(position).occupant() == Some(EntityId::Building(building.id))
            })
        });

        let vehicles_match = world.vehicles.values().all(|vehicle| {
            vehicle.region().cells().all(|position| {
                world.grid.cell_at(position).occupant() == Some(EntityId::Vehicle(vehicle.id))
            })
        });

        cells_match && buildings_match && vehicles_match
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use settlement_core::ResourceKind;

    fn world() -> World {
        World::new(WorldConfig::with_dimensions(10, 8))
    }

    #[test]
    fn building_ids_increase_monotonically() {
        let mut world = world();
        let first = world
            .build_building(BuildingKind::House, CellCoord::new(0, 0))
            .expect("first house fits");
        let second = world
            .build_building(BuildingKind::House, CellCoord::new(4, 0))
            .expect("second house fits");
        assert!(second > first);
        let _ = world.remove_building(second);
        let third = world
            .build_building(BuildingKind::House, CellCoord::new(4, 0))
            .expect("third house fits");
        assert!(third > second, "identifiers are never reused");
    }

    #[test]
    fn rejects_overlap_and_out_of_bounds() {
        let mut world = world();
        let _ = world
            .build_building(BuildingKind::House, CellCoord::new(2, 2))
            .expect("house fits");

        assert!(matches!(
            world.build_building(BuildingKind::House, CellCoord::new(3, 3)),
            Err(PlacementError::Occupied(_))
        ));
        assert!(matches!(
            world.build_building(BuildingKind::House, CellCoord::new(9, 0)),
            Err(PlacementError::OutOfBounds(_))
        ));
        assert!(query::occupancy_is_consistent(&world));
    }

    #[test]
    fn move_building_may_overlap_its_own_footprint() {
        let mut world = world();
        let id = world
            .build_building(BuildingKind::House, CellCoord::new(0, 0))
            .expect("house fits");

        let previous = world
            .move_building(id, CellCoord::new(1, 0))
            .expect("shifting by one cell is allowed");
        assert_eq!(previous, CellCoord::new(0, 0));
        assert_eq!(query::occupant(&world, CellCoord::new(0, 0)), None);
        assert_eq!(
            query::building_at(&world, CellCoord::new(2, 1)),
            Some(id)
        );
        assert!(query::occupancy_is_consistent(&world));
    }

    #[test]
    fn removing_selected_vehicle_clears_selection() {
        let mut world = world();
        let id = world
            .build_vehicle(VehicleKind::Cart, CellCoord::new(5, 5))
            .expect("cart fits");
        let _ = world.select_vehicle(Some(id));
        assert_eq!(query::selected_vehicle(&world), Some(id));

        let _ = world.remove_vehicle(id);
        assert_eq!(query::selected_vehicle(&world), None);
        assert_eq!(query::occupant(&world, CellCoord::new(5, 5)), None);
    }

    #[test]
    fn transfer_vehicle_moves_occupancy() {
        let mut world = world();
        let id = world
            .build_vehicle(VehicleKind::Truck, CellCoord::new(0, 0))
            .expect("truck fits");
        let from = world
            .transfer_vehicle(id, CellCoord::new(0, 1))
            .expect("neighbour is free");
        assert_eq!(from, CellCoord::new(0, 0));
        assert_eq!(query::vehicle_at(&world, CellCoord::new(0, 1)), Some(id));
        assert_eq!(query::occupant(&world, CellCoord::new(0, 0)), None);
    }

    #[test]
    fn ledger_starts_with_configured_balances() {
        let world = World::new(
            WorldConfig::with_dimensions(4, 4)
                .with_resources(ResourceBundle::new().with(ResourceKind::Gold, 7)),
        );
        assert_eq!(world.ledger().balance(ResourceKind::Gold), 7);
    }
}
