//! Cell-by-cell vehicle traversal.

use std::time::Duration;

use settlement_core::{CellCoord, Event, Path, VehicleId};
use settlement_world::{query, World};
use tracing::{debug, trace};

use crate::Progress;

/// Progress within a transition at which occupancy moves to the next cell.
const HANDOVER_PROGRESS: f32 = 0.5;

/// Walks a vehicle along a path one 4-adjacent transition at a time.
///
/// The continuous position is interpolated between cell anchors. Occupancy
/// changes hands halfway through each transition; if the next cell is taken
/// by then, the vehicle snaps back and the task ends.
#[derive(Clone, Debug, PartialEq)]
pub struct MoveTask {
    vehicle: VehicleId,
    destination: CellCoord,
    waypoints: Vec<CellCoord>,
    segment: usize,
    elapsed: Duration,
    per_cell: Duration,
    handed_over: bool,
}

impl MoveTask {
    /// Creates a traversal along `path` taking `per_cell` per transition.
    #[must_use]
    pub fn new(vehicle: VehicleId, path: Path, per_cell: Duration) -> Self {
        Self {
            vehicle,
            destination: path.destination(),
            waypoints: path.cells().to_vec(),
            segment: 0,
            elapsed: Duration::ZERO,
            per_cell,
            handed_over: false,
        }
    }

    /// Time one transition takes for a vehicle of `speed` on cells of
    /// `cell_size` world units.
    #[must_use]
    pub fn per_cell_duration(cell_size: f32, speed: f32) -> Duration {
        if speed <= 0.0 || cell_size <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f32(cell_size / speed)
    }

    /// Vehicle being moved.
    #[must_use]
    pub fn vehicle(&self) -> VehicleId {
        self.vehicle
    }

    /// Final cell of the traversal.
    #[must_use]
    pub fn destination(&self) -> CellCoord {
        self.destination
    }

    /// Remaining waypoints, starting with the cell the current transition
    /// leaves from.
    #[must_use]
    pub fn remaining_waypoints(&self) -> &[CellCoord] {
        &self.waypoints[self.segment.min(self.waypoints.len())..]
    }

    /// Recomputes the route from the vehicle's current cell. Called when the
    /// task resumes after waiting, since the world may have changed.
    pub(crate) fn replan(&mut self, world: &mut World) {
        self.segment = 0;
        self.elapsed = Duration::ZERO;
        self.handed_over = false;
        self.waypoints = match world.find_path(self.vehicle, self.destination) {
            Some(path) => path.cells().to_vec(),
            None => Vec::new(),
        };
        debug!(
            vehicle = self.vehicle.get(),
            destination = %self.destination,
            waypoints = self.waypoints.len(),
            "move replanned"
        );
    }

    pub(crate) fn advance(
        &mut self,
        world: &mut World,
        dt: Duration,
        aborting: bool,
        events: &mut Vec<Event>,
    ) -> Progress {
        let Some(current) = query::vehicle(world, self.vehicle).map(|vehicle| vehicle.cell())
        else {
            return Progress::Finished { follow_up: None };
        };

        let untouched = self.segment == 0 && self.elapsed.is_zero();
        if untouched && aborting {
            debug!(vehicle = self.vehicle.get(), "move aborted before its first step");
            self.finish(world);
            return Progress::Finished { follow_up: None };
        }
        if untouched && self.waypoints.first() != Some(&current) {
            self.replan(world);
        }

        self.elapsed += dt;
        loop {
            if self.segment + 1 >= self.waypoints.len() {
                self.finish(world);
                return Progress::Finished { follow_up: None };
            }

            let from = self.waypoints[self.segment];
            let to = self.waypoints[self.segment + 1];
            let progress = self.progress();

            if !self.handed_over && progress >= HANDOVER_PROGRESS {
                if world.transfer_vehicle(self.vehicle, to).is_err() {
                    debug!(vehicle = self.vehicle.get(), %from, %to, "next cell blocked");
                    let anchor = world.cell_to_world(from);
                    world.set_vehicle_position(self.vehicle, anchor);
                    return Progress::Finished { follow_up: None };
                }
                self.handed_over = true;
                trace!(vehicle = self.vehicle.get(), %from, %to, "vehicle stepped");
                events.push(Event::VehicleStepped {
                    vehicle: self.vehicle,
                    from,
                    to,
                });
            }

            if progress < 1.0 {
                let position = world
                    .cell_to_world(from)
                    .lerp(world.cell_to_world(to), progress);
                world.set_vehicle_position(self.vehicle, position);
                return Progress::Running;
            }

            self.elapsed = self.elapsed.saturating_sub(self.per_cell);
            self.segment += 1;
            self.handed_over = false;

            if aborting {
                self.finish(world);
                return Progress::Finished { follow_up: None };
            }
        }
    }

    fn progress(&self) -> f32 {
        if self.per_cell.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.per_cell.as_secs_f32()).min(1.0)
    }

    fn finish(&mut self, world: &mut World) {
        self.elapsed = Duration::ZERO;
        if let Some(vehicle) = query::vehicle(world, self.vehicle) {
            let anchor = world.cell_to_world(vehicle.cell());
            world.set_vehicle_position(self.vehicle, anchor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use settlement_core::{BuildingKind, VehicleKind};
    use settlement_world::WorldConfig;

    const STEP: Duration = Duration::from_millis(100);

    fn setup() -> (World, VehicleId, MoveTask) {
        let mut world = World::new(WorldConfig::with_dimensions(6, 6));
        let cart = world
            .build_vehicle(VehicleKind::Cart, CellCoord::new(0, 0))
            .expect("cart fits");
        let path = world
            .find_path(cart, CellCoord::new(0, 3))
            .expect("column is open");
        let task = MoveTask::new(cart, path, Duration::from_secs(1));
        (world, cart, task)
    }

    fn cell_of(world: &World, vehicle: VehicleId) -> CellCoord {
        query::vehicle(world, vehicle).expect("vehicle").cell()
    }

    #[test]
    fn occupancy_changes_hands_at_midpoint() {
        let (mut world, cart, mut task) = setup();
        let mut events = Vec::new();

        let _ = task.advance(&mut world, Duration::from_millis(400), false, &mut events);
        assert_eq!(cell_of(&world, cart), CellCoord::new(0, 0));
        let position = query::vehicle(&world, cart).expect("vehicle").position();
        assert!((position - Vec2::new(0.0, 0.4)).length() < 1e-4);

        let _ = task.advance(&mut world, STEP, false, &mut events);
        assert_eq!(cell_of(&world, cart), CellCoord::new(0, 1));
        assert_eq!(events.len(), 1);
        assert!(query::occupancy_is_consistent(&world));
    }

    #[test]
    fn completes_at_destination_with_snapped_position() {
        let (mut world, cart, mut task) = setup();
        let mut events = Vec::new();

        let progress = task.advance(&mut world, Duration::from_secs(10), false, &mut events);
        assert!(matches!(progress, Progress::Finished { .. }));
        assert_eq!(cell_of(&world, cart), CellCoord::new(0, 3));
        assert_eq!(
            query::vehicle(&world, cart).expect("vehicle").position(),
            Vec2::new(0.0, 3.0)
        );
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn abort_finishes_current_transition_only() {
        let (mut world, cart, mut task) = setup();
        let mut events = Vec::new();

        let _ = task.advance(&mut world, Duration::from_millis(200), false, &mut events);
        let progress = task.advance(&mut world, Duration::from_secs(5), true, &mut events);
        assert!(matches!(progress, Progress::Finished { .. }));
        assert_eq!(cell_of(&world, cart), CellCoord::new(0, 1));
        assert_eq!(
            query::vehicle(&world, cart).expect("vehicle").position(),
            Vec2::new(0.0, 1.0)
        );
    }

    #[test]
    fn abort_before_any_progress_stays_put() {
        let (mut world, cart, mut task) = setup();
        let mut events = Vec::new();

        let progress = task.advance(&mut world, Duration::from_secs(5), true, &mut events);
        assert!(matches!(progress, Progress::Finished { .. }));
        assert_eq!(cell_of(&world, cart), CellCoord::new(0, 0));
        assert_eq!(
            query::vehicle(&world, cart).expect("vehicle").position(),
            Vec2::ZERO
        );
        assert!(events.is_empty());
    }

    #[test]
    fn blocked_next_cell_snaps_back_and_completes() {
        let (mut world, cart, mut task) = setup();
        let mut events = Vec::new();
        let _ = world
            .build_building(BuildingKind::House, CellCoord::new(0, 1))
            .expect("house fits in front of the cart");

        let progress = task.advance(&mut world, Duration::from_millis(700), false, &mut events);
        assert!(matches!(progress, Progress::Finished { .. }));
        assert_eq!(cell_of(&world, cart), CellCoord::new(0, 0));
        assert_eq!(
            query::vehicle(&world, cart).expect("vehicle").position(),
            Vec2::ZERO
        );
        assert!(events.is_empty());
    }

    #[test]
    fn per_cell_duration_follows_speed() {
        assert_eq!(
            MoveTask::per_cell_duration(1.0, 2.0),
            Duration::from_millis(500)
        );
        assert_eq!(MoveTask::per_cell_duration(1.0, 0.0), Duration::ZERO);
    }
}
