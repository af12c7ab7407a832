//! Relocating existing buildings.

use std::fmt;

use settlement_core::{BuildingId, CellCoord, EntityId, Event, ResourceBundle};
use settlement_world::{query, World};
use tracing::{debug, warn};

use crate::{
    context_cell, CommandContext, CommandFault, CommandKind, InputState, Reversible, Target,
};

/// Moves a building to a new origin and pays its relocation cost.
#[derive(Clone, Debug)]
pub struct MoveBuilding {
    building: BuildingId,
    target: Target,
    moved: Option<Moved>,
}

#[derive(Clone, Debug)]
struct Moved {
    from: CellCoord,
    to: CellCoord,
    paid: ResourceBundle,
}

impl MoveBuilding {
    /// Creates a command that moves `building` so its origin lands on `target`.
    #[must_use]
    pub fn new(building: BuildingId, target: impl Into<Target>) -> Self {
        Self {
            building,
            target: target.into(),
            moved: None,
        }
    }

    /// Building being moved.
    #[must_use]
    pub fn building(&self) -> BuildingId {
        self.building
    }

    /// Origin the building occupied before the last successful call.
    #[must_use]
    pub fn previous_origin(&self) -> Option<CellCoord> {
        self.moved.as_ref().map(|moved| moved.from)
    }

    fn conditions_at(&self, world: &World, to: CellCoord) -> bool {
        let Some(building) = query::building(world, self.building) else {
            return false;
        };
        let Some(spec) = world.catalog().building(building.kind()) else {
            return false;
        };
        to != building.origin()
            && query::is_area_available(
                world,
                to,
                building.region().size(),
                Some(EntityId::Building(self.building)),
            )
            && world.ledger().can_afford(&spec.relocation_cost)
    }
}

impl Reversible for MoveBuilding {
    fn kind(&self) -> CommandKind {
        CommandKind::MoveBuilding
    }

    fn is_succeeded(&self) -> bool {
        self.moved.is_some()
    }

    fn check_execution_context(&self, world: &World, input: &dyn InputState) -> bool {
        let (Some(to), Some(region)) = (
            context_cell(&self.target, input),
            query::region_of(world, EntityId::Building(self.building)),
        ) else {
            return false;
        };
        !world.grid().is_area_out_of_bounds(to, region.size())
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
        let to = self.target.resolve().ok_or(CommandFault::UnresolvedTarget)?;
        if !self.conditions_at(ctx.world, to) {
            return Ok(false);
        }
        let Some(cost) = query::building(ctx.world, self.building)
            .and_then(|building| ctx.world.catalog().building(building.kind()))
            .map(|spec| spec.relocation_cost.clone())
        else {
            return Ok(false);
        };

        if !ctx.world.ledger_mut().debit(&cost) {
            return Ok(false);
        }
        let from = match ctx.world.move_building(self.building, to) {
            Ok(from) => from,
            Err(error) => {
                ctx.world.ledger_mut().credit(&cost);
                return Err(error.into());
            }
        };
        ctx.events.push(Event::BuildingMoved {
            building: self.building,
            from,
            to,
        });
        debug!(building = self.building.get(), %from, %to, cost = %cost, "move building");

        self.moved = Some(Moved {
            from,
            to,
            paid: cost,
        });
        Ok(true)
    }

    fn undo(&mut self, ctx: &mut CommandContext<'_>) -> bool {
        let Some(moved) = self.moved.as_ref() else {
            return false;
        };

        match ctx.world.move_building(self.building, moved.from) {
            Ok(_) => {}
            Err(error) => {
                warn!(building = self.building.get(), %error, "cannot move building back");
                return false;
            }
        }
        ctx.world.ledger_mut().credit(&moved.paid);
        ctx.events.push(Event::BuildingMoved {
            building: self.building,
            from: moved.to,
            to: moved.from,
        });
        debug!(building = self.building.get(), to = %moved.from, "undo move building");
        self.moved = None;
        true
    }
}

impl fmt::Display for MoveBuilding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.moved {
            Some(moved) => write!(
                f,
                "move building#{} from {} to {}",
                self.building.get(),
                moved.from,
                moved.to
            ),
            None => write!(f, "move building#{} to {}", self.building.get(), self.target),
        }
    }
}
