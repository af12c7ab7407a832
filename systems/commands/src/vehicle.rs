//! Selecting and driving vehicles.

use std::fmt;

use settlement_core::{CellCoord, EntityId, Event, TaskId, VehicleId};
use settlement_system_tasks::{MoveTask, Task, TaskKind};
use settlement_world::{query, World};
use tracing::debug;

use crate::{
    context_cell, CommandContext, CommandFault, CommandKind, InputState, Reversible, Target,
};

/// Makes one vehicle the single selected vehicle.
#[derive(Clone, Debug)]
pub struct SelectVehicle {
    vehicle: VehicleId,
    succeeded: bool,
}

impl SelectVehicle {
    /// Creates a command selecting `vehicle`.
    #[must_use]
    pub fn new(vehicle: VehicleId) -> Self {
        Self {
            vehicle,
            succeeded: false,
        }
    }

    /// Vehicle to select.
    #[must_use]
    pub fn vehicle(&self) -> VehicleId {
        self.vehicle
    }
}

impl Reversible for SelectVehicle {
    fn kind(&self) -> CommandKind {
        CommandKind::SelectVehicle
    }

    fn is_succeeded(&self) -> bool {
        self.succeeded
    }

    fn check_execution_context(&self, _world: &World, input: &dyn InputState) -> bool {
        !input.pointer_over_ui()
    }

    fn check_conditions(&self, world: &World) -> bool {
        query::vehicle(world, self.vehicle).is_some()
    }

    fn call(&mut self, ctx: &mut CommandContext<'_>) -> Result<bool, CommandFault> {
        if self.succeeded
            || !self.check_execution_context(ctx.world, ctx.input)
            || !self.check_conditions(ctx.world)
        {
            return Ok(false);
        }

        let _ = ctx.world.select_vehicle(Some(self.vehicle));
        ctx.events.push(Event::VehicleSelected {
            vehicle: Some(self.vehicle),
        });
        debug!(vehicle = self.vehicle.get(), "select vehicle");
        self.succeeded = true;
        Ok(true)
    }

    fn undo(&mut self, ctx: &mut CommandContext<'_>) -> bool {
        if !self.succeeded {
            return false;
        }

        let _ = ctx.world.select_vehicle(None);
        ctx.events.push(Event::VehicleSelected { vehicle: None });
        debug!(vehicle = self.vehicle.get(), "undo select vehicle");
        self.succeeded = false;
        true
    }
}

impl fmt::Display for SelectVehicle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "select vehicle#{}", self.vehicle.get())
    }
}

/// Sends a vehicle to a destination along a freshly searched path.
///
/// When the vehicle is already moving, the new traversal waits for the
/// in-flight one, which is aborted so it stops after its current step.
#[derive(Clone, Debug)]
pub struct MoveVehicle {
    vehicle: VehicleId,
    target: Target,
    dispatched: Option<Dispatched>,
}

#[derive(Clone, Debug)]
struct Dispatched {
    destination: CellCoord,
    task: TaskId,
    superseded: Option<TaskId>,
}

impl MoveVehicle {
    /// Creates a command sending `vehicle` to `target`.
    #[must_use]
    pub fn new(vehicle: VehicleId, target: impl Into<Target>) -> Self {
        Self {
            vehicle,
            target: target.into(),
            dispatched: None,
        }
    }

    /// Vehicle to move.
    #[must_use]
    pub fn vehicle(&self) -> VehicleId {
        self.vehicle
    }

    /// Move task scheduled by the last successful call.
    #[must_use]
    pub fn task(&self) -> Option<TaskId> {
        self.dispatched.as_ref().map(|dispatched| dispatched.task)
    }

    /// In-flight move the scheduled task waits for, if any.
    #[must_use]
    pub fn superseded(&self) -> Option<TaskId> {
        self.dispatched
            .as_ref()
            .and_then(|dispatched| dispatched.superseded)
    }

    fn conditions_at(&self, world: &World, to: CellCoord) -> bool {
        query::vehicle(world, self.vehicle).is_some_and(|vehicle| {
            query::is_area_available(
                world,
                to,
                vehicle.footprint(),
                Some(EntityId::Vehicle(self.vehicle)),
            )
        })
    }
}

impl Reversible for MoveVehicle {
    fn kind(&self) -> CommandKind {
        CommandKind::MoveVehicle
    }

    fn is_succeeded(&self) -> bool {
        self.dispatched.is_some()
    }

    fn check_execution_context(&self, world: &World, input: &dyn InputState) -> bool {
        let (Some(to), Some(vehicle)) = (
            context_cell(&self.target, input),
            query::vehicle(world, self.vehicle),
        ) else {
            return false;
        };
        !world.grid().is_area_out_of_bounds(to, vehicle.footprint())
    }

    fn check_conditions(&self, world: &World) -> bool {
        self.target
            .resolve()
            .is_some_and(|to| self.conditions_at(world, to))
    }

    fn call(&mut self, ctx: &mut CommandContext<'_>) -> Result<bool, CommandFault> {
        if self.is_succeeded() || !self.check_execution_context(ctx.world, ctx.input) {
            return Ok(false);
        }
        let destination = self.target.resolve().ok_or(CommandFault::UnresolvedTarget)?;
        if !self.conditions_at(ctx.world, destination) {
            return Ok(false);
        }
        let Some(speed) = query::vehicle(ctx.world, self.vehicle).map(|vehicle| vehicle.speed())
        else {
            return Ok(false);
        };
        let Some(path) = ctx.world.find_path(self.vehicle, destination) else {
            debug!(vehicle = self.vehicle.get(), %destination, "no path");
            return Ok(false);
        };

        let per_cell = MoveTask::per_cell_duration(ctx.world.cell_size(), speed);
        let kind = TaskKind::Move(MoveTask::new(self.vehicle, path, per_cell));
        let superseded = ctx.scheduler.supersede_moves(self.vehicle, ctx.events);
        let task = match superseded {
            Some(predecessor) => Task::after(kind, predecessor),
            None => Task::new(kind),
        };
        let task = ctx.scheduler.schedule(task, ctx.events);
        debug!(
            vehicle = self.vehicle.get(),
            %destination,
            task = task.get(),
            superseded = superseded.map(|id| id.get()),
            "move vehicle"
        );

        self.dispatched = Some(Dispatched {
            destination,
            task,
            superseded,
        });
        Ok(true)
    }

    fn undo(&mut self, ctx: &mut CommandContext<'_>) -> bool {
        let Some(dispatched) = self.dispatched.take() else {
            return false;
        };

        let _ = ctx.scheduler.abort(dispatched.task, ctx.events);
        debug!(vehicle = self.vehicle.get(), task = dispatched.task.get(), "undo move vehicle");
        true
    }
}

impl fmt::Display for MoveVehicle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.dispatched {
            Some(dispatched) => write!(
                f,
                "move vehicle#{} to {} ({})",
                self.vehicle.get(),
                dispatched.destination,
                dispatched.task
            ),
            None => write!(f, "move vehicle#{} to {}", self.vehicle.get(), self.target),
        }
    }
}
