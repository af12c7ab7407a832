//! Placing new buildings.

use std::fmt;

use settlement_core::{
    BuildingId, BuildingKind, CellCoord, CellRect, EntityId, Event, ResourceBundle, TaskId,
};
use settlement_system_tasks::{ConstructionTask, Task, TaskKind};
use settlement_world::{query, World};
use tracing::{debug, warn};

use crate::{
    context_cell, CommandContext, CommandFault, CommandKind, InputState, Reversible, Target,
};

/// Places a building of one kind, pays for it and starts its construction.
#[derive(Clone, Debug)]
pub struct ConstructBuilding {
    kind: BuildingKind,
    target: Target,
    placed: Option<Placed>,
}

#[derive(Clone, Debug)]
struct Placed {
    building: BuildingId,
    origin: CellCoord,
    paid: ResourceBundle,
    task: TaskId,
}

impl ConstructBuilding {
    /// Creates a command that places `kind` with its origin at `target`.
    #[must_use]
    pub fn new(kind: BuildingKind, target: impl Into<Target>) -> Self {
        Self {
            kind,
            target: target.into(),
            placed: None,
        }
    }

    /// Kind of building to place.
    #[must_use]
    pub fn building_kind(&self) -> BuildingKind {
        self.kind
    }

    /// Building created by the last successful call.
    #[must_use]
    pub fn building(&self) -> Option<BuildingId> {
        self.placed.as_ref().map(|placed| placed.building)
    }

    /// Construction task started by the last successful call.
    #[must_use]
    pub fn task(&self) -> Option<TaskId> {
        self.placed.as_ref().map(|placed| placed.task)
    }

    fn conditions_at(&self, world: &World, origin: CellCoord) -> bool {
        let Some(spec) = world.catalog().building(self.kind) else {
            return false;
        };
        query::is_area_available(world, origin, spec.footprint, None)
            && world.ledger().can_afford(&spec.cost)
    }
}

impl Reversible for ConstructBuilding {
    fn kind(&self) -> CommandKind {
        CommandKind::ConstructBuilding
    }

    fn is_succeeded(&self) -> bool {
        self.placed.is_some()
    }

    fn check_execution_context(&self, world: &World, input: &dyn InputState) -> bool {
        let (Some(origin), Some(spec)) = (
            context_cell(&self.target, input),
            world.catalog().building(self.kind),
        ) else {
            return false;
        };
        !world.grid().is_area_out_of_bounds(origin, spec.footprint)
    }

    fn check_conditions(&self, world: &World) -> bool {
        self.target
            .resolve()
            .is_some_and(|origin| self.conditions_at(world, origin))
    }

    fn call(&mut self, ctx: &mut CommandContext<'_>) -> Result<bool, CommandFault> {
        if self.is_succeeded() || !self.check_execution_context(ctx.world, ctx.input) {
            return Ok(false);
        }
        let origin = self.target.resolve().ok_or(CommandFault::UnresolvedTarget)?;
        if !self.conditions_at(ctx.world, origin) {
            return Ok(false);
        }
        let Some(spec) = ctx.world.catalog().building(self.kind).cloned() else {
            return Ok(false);
        };

        let building = ctx.world.build_building(self.kind, origin)?;
        if !ctx.world.ledger_mut().debit(&spec.cost) {
            let _ = ctx.world.remove_building(building);
            return Ok(false);
        }
        ctx.events.push(Event::BuildingPlaced {
            building,
            kind: self.kind,
            region: CellRect::from_origin_and_size(origin, spec.footprint),
        });

        let task = ctx.scheduler.schedule(
            Task::new(TaskKind::Construction(ConstructionTask::new(
                building,
                spec.construction_time(),
            ))),
            ctx.events,
        );
        debug!(building = building.get(), kind = %self.kind, %origin, task = task.get(), "construct building");

        self.placed = Some(Placed {
            building,
            origin,
            paid: spec.cost,
            task,
        });
        Ok(true)
    }

    fn undo(&mut self, ctx: &mut CommandContext<'_>) -> bool {
        let Some(placed) = self.placed.take() else {
            return false;
        };

        let _ = ctx
            .scheduler
            .abort_bound_to(EntityId::Building(placed.building), ctx.events);
        match ctx.world.remove_building(placed.building) {
            Some(building) => ctx.events.push(Event::BuildingRemoved {
                building: placed.building,
                region: building.region(),
            }),
            None => warn!(building = placed.building.get(), "undone building was already gone"),
        }
        ctx.world.ledger_mut().credit(&placed.paid);
        debug!(building = placed.building.get(), refund = %placed.paid, "undo construct building");
        true
    }
}

impl fmt::Display for ConstructBuilding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.placed {
            Some(placed) => write!(
                f,
                "construct {} building#{} at {}",
                self.kind,
                placed.building.get(),
                placed.origin
            ),
            None => write!(f, "construct {} at {}", self.kind, self.target),
        }
    }
}
