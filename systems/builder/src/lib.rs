#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Builder-mode system translating clicks into commands, plus the session
//! that wires world, scheduler, history and pointer state together.

use settlement_core::{BuildingId, BuildingKind, CellCoord, CellRect, EntityId};
use settlement_system_commands::{
    Command, ConstructBuilding, CursorTarget, MoveBuilding, MoveVehicle, SelectVehicle, Target,
};
use settlement_world::{query, World};

pub mod session;

pub use session::Session;

/// Active builder tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Tool {
    /// Clicks select vehicles and send the selected vehicle elsewhere.
    #[default]
    Select,
    /// Clicks place buildings of the given kind.
    Construct(BuildingKind),
    /// The next click moves the given building.
    Relocate(BuildingId),
}

/// Declarative placement preview describing a potential building placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlacementPreview {
    /// Kind of building proposed for placement.
    pub kind: BuildingKind,
    /// Origin cell anchoring the proposed footprint.
    pub origin: CellCoord,
    /// Region of cells the building would occupy.
    pub region: CellRect,
    /// Indicates whether the preview represents a valid placement.
    pub placeable: bool,
}

/// Input snapshot distilled from adapter-provided frame input data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuilderInput {
    /// Indicates whether the player confirmed an action on this frame.
    pub confirm_action: bool,
    /// Indicates whether the player cancelled the active tool on this frame.
    pub cancel_action: bool,
    /// Cell currently hovered by the cursor.
    pub cursor_cell: Option<CellCoord>,
}

/// Builder-mode system that translates the active tool and input into
/// commands.
#[derive(Clone, Debug, Default)]
pub struct Builder {
    tool: Tool,
}

impl Builder {
    /// Creates a builder with the selection tool active.
    #[must_use]
    pub const fn new() -> Self {
        Self { tool: Tool::Select }
    }

    /// Currently active tool.
    #[must_use]
    pub const fn tool(&self) -> Tool {
        self.tool
    }

    /// Switches the active tool.
    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    /// Describes what the active tool would place at `cursor`.
    #[must_use]
    pub fn preview(&self, world: &World, cursor: CellCoord) -> Option<PlacementPreview> {
        let (kind, exclude) = match self.tool {
            Tool::Select => return None,
            Tool::Construct(kind) => (kind, None),
            Tool::Relocate(building) => (
                query::building(world, building)?.kind(),
                Some(EntityId::Building(building)),
            ),
        };
        let spec = world.catalog().building(kind)?;
        let cost = match self.tool {
            Tool::Relocate(_) => &spec.relocation_cost,
            _ => &spec.cost,
        };

        Some(PlacementPreview {
            kind,
            origin: cursor,
            region: CellRect::from_origin_and_size(cursor, spec.footprint),
            placeable: query::is_area_available(world, cursor, spec.footprint, exclude)
                && world.ledger().can_afford(cost),
        })
    }

    /// Consumes input to emit builder commands.
    ///
    /// Emitted commands read their destination from `target` when called,
    /// so the caller must keep it in sync with the hovered cell.
    pub fn handle(
        &mut self,
        world: &World,
        input: BuilderInput,
        target: &CursorTarget,
        out: &mut Vec<Command>,
    ) {
        if input.cancel_action {
            self.tool = Tool::Select;
        }

        if !input.confirm_action {
            return;
        }
        let Some(cell) = input.cursor_cell else {
            return;
        };
        let deferred = Target::Deferred(target.clone());

        match self.tool {
            Tool::Construct(kind) => {
                if self
                    .preview(world, cell)
                    .is_some_and(|preview| preview.placeable)
                {
                    out.push(ConstructBuilding::new(kind, deferred).into());
                }
            }
            Tool::Relocate(building) => {
                if self
                    .preview(world, cell)
                    .is_some_and(|preview| preview.placeable)
                {
                    out.push(MoveBuilding::new(building, deferred).into());
                    self.tool = Tool::Select;
                }
            }
            Tool::Select => {
                if let Some(vehicle) = query::vehicle_at(world, cell) {
                    if query::selected_vehicle(world) != Some(vehicle) {
                        out.push(SelectVehicle::new(vehicle).into());
                    }
                } else if let Some(selected) = query::selected_vehicle(world) {
                    out.push(MoveVehicle::new(selected, deferred).into());
                }
            }
        }
    }
}
