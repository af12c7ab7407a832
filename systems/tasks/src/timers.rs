//! Countdown tasks bound to buildings.

use std::time::Duration;

use settlement_core::{BuildingId, Event, ResourceBundle};
use settlement_world::{query, World};
use tracing::{debug, trace};

use crate::{Progress, Task, TaskKind};

/// Counts down a building's construction and flags it constructed.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstructionTask {
    building: BuildingId,
    remaining: Duration,
}

impl ConstructionTask {
    /// Creates a countdown of `duration` for `building`.
    #[must_use]
    pub fn new(building: BuildingId, duration: Duration) -> Self {
        Self {
            building,
            remaining: duration,
        }
    }

    /// Building under construction.
    #[must_use]
    pub fn building(&self) -> BuildingId {
        self.building
    }

    /// Time left on the countdown.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub(crate) fn advance(
        &mut self,
        world: &mut World,
        dt: Duration,
        aborting: bool,
        events: &mut Vec<Event>,
    ) -> Progress {
        if aborting || query::building(world, self.building).is_none() {
            return Progress::Finished { follow_up: None };
        }

        if dt < self.remaining {
            self.remaining -= dt;
            return Progress::Running;
        }

        self.remaining = Duration::ZERO;
        if !world.mark_constructed(self.building) {
            return Progress::Finished { follow_up: None };
        }
        debug!(building = self.building.get(), "construction finished");
        events.push(Event::BuildingConstructed {
            building: self.building,
        });

        let follow_up = query::building(world, self.building)
            .and_then(|building| world.catalog().building(building.kind()))
            .and_then(|spec| spec.production.as_ref())
            .map(|production| {
                Task::new(TaskKind::Production(ProductionTask::new(
                    self.building,
                    production.output.clone(),
                    production.interval(),
                    production.looping,
                )))
            });
        Progress::Finished { follow_up }
    }
}

/// Credits a resource bundle to the ledger every time its countdown elapses.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductionTask {
    building: BuildingId,
    output: ResourceBundle,
    interval: Duration,
    remaining: Duration,
    looping: bool,
}

impl ProductionTask {
    /// Creates a production cycle for `building`.
    #[must_use]
    pub fn new(
        building: BuildingId,
        output: ResourceBundle,
        interval: Duration,
        looping: bool,
    ) -> Self {
        Self {
            building,
            output,
            interval,
            remaining: interval,
            looping,
        }
    }

    /// Producing building.
    #[must_use]
    pub fn building(&self) -> BuildingId {
        self.building
    }

    /// Resources credited per cycle.
    #[must_use]
    pub fn output(&self) -> &ResourceBundle {
        &self.output
    }

    /// Time left until the next credit.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Whether the countdown re-arms after firing.
    #[must_use]
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub(crate) fn advance(
        &mut self,
        world: &mut World,
        dt: Duration,
        aborting: bool,
        events: &mut Vec<Event>,
    ) -> Progress {
        if aborting || query::building(world, self.building).is_none() {
            return Progress::Finished { follow_up: None };
        }

        let mut elapsed = dt;
        loop {
            if elapsed < self.remaining {
                self.remaining -= elapsed;
                return Progress::Running;
            }
            elapsed -= self.remaining;

            world.ledger_mut().credit(&self.output);
            trace!(building = self.building.get(), output = %self.output, "production cycle");
            events.push(Event::ResourcesProduced {
                building: self.building,
                resources: self.output.clone(),
            });

            if !self.looping {
                self.remaining = Duration::ZERO;
                return Progress::Finished { follow_up: None };
            }

            self.remaining = self.interval;
            // A zero interval fires once per tick.
            if self.interval.is_zero() {
                return Progress::Running;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use settlement_core::{BuildingKind, CellCoord, ResourceKind};
    use settlement_world::WorldConfig;

    fn world_with_farm() -> (World, BuildingId) {
        let mut world = World::new(WorldConfig::with_dimensions(8, 8));
        let farm = world
            .build_building(BuildingKind::Farm, CellCoord::new(0, 0))
            .expect("farm fits");
        (world, farm)
    }

    fn food(amount: u32) -> ResourceBundle {
        ResourceBundle::new().with(ResourceKind::Food, amount)
    }

    #[test]
    fn construction_fires_when_countdown_crosses_zero() {
        let (mut world, farm) = world_with_farm();
        let mut task = ConstructionTask::new(farm, Duration::from_millis(300));
        let mut events = Vec::new();

        let first = task.advance(&mut world, Duration::from_millis(200), false, &mut events);
        assert!(matches!(first, Progress::Running));
        assert!(!query::building(&world, farm).expect("farm").is_constructed());

        let second = task.advance(&mut world, Duration::from_millis(200), false, &mut events);
        match second {
            Progress::Finished {
                follow_up: Some(task),
            } => assert!(matches!(task.kind(), TaskKind::Production(_))),
            other => panic!("expected production follow-up, got {other:?}"),
        }
        assert!(query::building(&world, farm).expect("farm").is_constructed());
        assert_eq!(events, vec![Event::BuildingConstructed { building: farm }]);
    }

    #[test]
    fn aborted_construction_never_fires() {
        let (mut world, farm) = world_with_farm();
        let mut task = ConstructionTask::new(farm, Duration::ZERO);
        let mut events = Vec::new();

        let progress = task.advance(&mut world, Duration::from_secs(1), true, &mut events);
        assert!(matches!(progress, Progress::Finished { follow_up: None }));
        assert!(events.is_empty());
        assert!(!query::building(&world, farm).expect("farm").is_constructed());
    }

    #[test]
    fn looping_production_carries_leftover_time() {
        let (mut world, farm) = world_with_farm();
        let mut task = ProductionTask::new(farm, food(2), Duration::from_secs(1), true);
        let mut events = Vec::new();

        let progress = task.advance(&mut world, Duration::from_millis(2500), false, &mut events);
        assert!(matches!(progress, Progress::Running));
        assert_eq!(world.ledger().balance(ResourceKind::Food), 4);
        assert_eq!(events.len(), 2);
        assert_eq!(task.remaining(), Duration::from_millis(500));
    }

    #[test]
    fn one_shot_production_completes_after_first_credit() {
        let (mut world, farm) = world_with_farm();
        let mut task = ProductionTask::new(farm, food(3), Duration::from_secs(1), false);
        let mut events = Vec::new();

        let progress = task.advance(&mut world, Duration::from_secs(5), false, &mut events);
        assert!(matches!(progress, Progress::Finished { follow_up: None }));
        assert_eq!(world.ledger().balance(ResourceKind::Food), 3);
    }

    #[test]
    fn production_stops_when_building_is_gone() {
        let (mut world, farm) = world_with_farm();
        let _ = world.remove_building(farm);
        let mut task = ProductionTask::new(farm, food(3), Duration::ZERO, true);
        let mut events = Vec::new();

        let progress = task.advance(&mut world, Duration::from_secs(1), false, &mut events);
        assert!(matches!(progress, Progress::Finished { follow_up: None }));
        assert!(events.is_empty());
    }
}
