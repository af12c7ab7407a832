#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Reversible player commands and the history that undoes them.
//!
//! Every command follows the same protocol: an execution-context check over
//! ambient input, a condition check over the world, a single `call` that
//! applies the effect, and an `undo` that reverses it exactly. Commands that
//! schedule tasks abort them when undone.

use std::{cell::Cell, fmt, rc::Rc};

use settlement_core::{CellCoord, Event, PlacementError};
use settlement_system_tasks::TaskScheduler;
use settlement_world::World;
use thiserror::Error;

pub mod construct;
pub mod history;
pub mod relocate;
pub mod vehicle;

pub use construct::ConstructBuilding;
pub use history::CommandHistory;
pub use relocate::MoveBuilding;
pub use vehicle::{MoveVehicle, SelectVehicle};

/// Ambient input consulted before a command may run.
pub trait InputState {
    /// Whether the pointer currently rests on an interface element.
    fn pointer_over_ui(&self) -> bool;

    /// Grid cell under the cursor, if any.
    fn cursor_cell(&self) -> Option<CellCoord>;
}

/// Plain snapshot of pointer input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PointerState {
    /// Whether the pointer rests on an interface element.
    pub over_ui: bool,
    /// Grid cell under the cursor.
    pub cursor: Option<CellCoord>,
}

impl InputState for PointerState {
    fn pointer_over_ui(&self) -> bool {
        self.over_ui
    }

    fn cursor_cell(&self) -> Option<CellCoord> {
        self.cursor
    }
}

/// Shared, externally updated "current target cell".
///
/// Clones share the same slot, so a command holding a clone observes the
/// value at the moment it runs rather than when it was created.
#[derive(Clone, Debug, Default)]
pub struct CursorTarget {
    cell: Rc<Cell<Option<CellCoord>>>,
}

impl CursorTarget {
    /// Creates an unresolved target.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the shared value.
    pub fn set(&self, cell: Option<CellCoord>) {
        self.cell.set(cell);
    }

    /// Current shared value.
    #[must_use]
    pub fn get(&self) -> Option<CellCoord> {
        self.cell.get()
    }
}

/// Destination of a command, fixed up front or read when the command runs.
#[derive(Clone, Debug)]
pub enum Target {
    /// Cell chosen when the command was created.
    Known(CellCoord),
    /// Cell read from the shared cursor slot at call time.
    Deferred(CursorTarget),
}

impl Target {
    /// Resolves the target to a cell.
    #[must_use]
    pub fn resolve(&self) -> Option<CellCoord> {
        match self {
            Self::Known(cell) => Some(*cell),
            Self::Deferred(cursor) => cursor.get(),
        }
    }
}

impl From<CellCoord> for Target {
    fn from(cell: CellCoord) -> Self {
        Self::Known(cell)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.resolve() {
            Some(cell) => write!(f, "{cell}"),
            None => f.write_str("cursor"),
        }
    }
}

/// Cell the execution context is judged at: the fixed cell, or the cursor
/// cell for a deferred target. `None` while the pointer rests on the
/// interface.
fn context_cell(target: &Target, input: &dyn InputState) -> Option<CellCoord> {
    if input.pointer_over_ui() {
        return None;
    }
    match target {
        Target::Known(cell) => Some(*cell),
        Target::Deferred(_) => input.cursor_cell(),
    }
}

/// Failures that indicate a broken command invariant rather than a declined
/// request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum CommandFault {
    /// The deferred target had no value after the context check passed.
    #[error("deferred target is unresolved")]
    UnresolvedTarget,
    /// The world refused an effect the checks had accepted.
    #[error("world rejected a checked command: {0}")]
    Rejected(#[from] PlacementError),
}

/// Mutable state a command acts upon.
pub struct CommandContext<'a> {
    /// Authoritative settlement state.
    pub world: &'a mut World,
    /// Scheduler receiving tasks the command starts.
    pub scheduler: &'a mut TaskScheduler,
    /// Ambient input snapshot.
    pub input: &'a dyn InputState,
    /// Sink for emitted events.
    pub events: &'a mut Vec<Event>,
}

impl fmt::Debug for CommandContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("pointer_over_ui", &self.input.pointer_over_ui())
            .field("cursor_cell", &self.input.cursor_cell())
            .field("tasks", &self.scheduler.len())
            .finish_non_exhaustive()
    }
}

/// Discriminates command variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Places a new building.
    ConstructBuilding,
    /// Relocates an existing building.
    MoveBuilding,
    /// Changes the selected vehicle.
    SelectVehicle,
    /// Sends a vehicle along a path.
    MoveVehicle,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ConstructBuilding => "construct building",
            Self::MoveBuilding => "move building",
            Self::SelectVehicle => "select vehicle",
            Self::MoveVehicle => "move vehicle",
        };
        f.write_str(label)
    }
}

/// Validate, execute and undo protocol shared by every command.
pub trait Reversible {
    /// Variant discriminator.
    fn kind(&self) -> CommandKind;

    /// Whether the last `call` succeeded and has not been undone.
    fn is_succeeded(&self) -> bool;

    /// Pure predicate over ambient input: the pointer is free of the
    /// interface, the cursor names a cell and the area there lies in bounds.
    /// A deferred target is judged at the cursor cell, not at its shared slot.
    fn check_execution_context(&self, world: &World, input: &dyn InputState) -> bool;

    /// Pure predicate over domain state such as free cells and balances.
    fn check_conditions(&self, world: &World) -> bool;

    /// Applies the effect. Returns `Ok(false)` without mutating anything when
    /// the command already succeeded or a check fails, and
    /// `Err(CommandFault::UnresolvedTarget)` when the context passed but a
    /// deferred target has no value.
    fn call(&mut self, ctx: &mut CommandContext<'_>) -> Result<bool, CommandFault>;

    /// Reverses a succeeded call. Returns `false` when nothing was undone.
    fn undo(&mut self, ctx: &mut CommandContext<'_>) -> bool;
}

/// Any command the history can hold.
#[derive(Clone, Debug)]
pub enum Command {
    /// See [`ConstructBuilding`].
    ConstructBuilding(ConstructBuilding),
    /// See [`MoveBuilding`].
    MoveBuilding(MoveBuilding),
    /// See [`SelectVehicle`].
    SelectVehicle(SelectVehicle),
    /// See [`MoveVehicle`].
    MoveVehicle(MoveVehicle),
}

impl Command {
    fn inner(&self) -> &dyn Reversible {
        match self {
            Self::ConstructBuilding(command) => command,
            Self::MoveBuilding(command) => command,
            Self::SelectVehicle(command) => command,
            Self::MoveVehicle(command) => command,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Reversible {
        match self {
            Self::ConstructBuilding(command) => command,
            Self::MoveBuilding(command) => command,
            Self::SelectVehicle(command) => command,
            Self::MoveVehicle(command) => command,
        }
    }
}

impl Reversible for Command {
    fn kind(&self) -> CommandKind {
        self.inner().kind()
    }

    fn is_succeeded(&self) -> bool {
        self.inner().is_succeeded()
    }

    fn check_execution_context(&self, world: &World, input: &dyn InputState) -> bool {
        self.inner().check_execution_context(world, input)
    }

    fn check_conditions(&self, world: &World) -> bool {
        self.inner().check_conditions(world)
    }

    fn call(&mut self, ctx: &mut CommandContext<'_>) -> Result<bool, CommandFault> {
        self.inner_mut().call(ctx)
    }

    fn undo(&mut self, ctx: &mut CommandContext<'_>) -> bool {
        self.inner_mut().undo(ctx)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConstructBuilding(command) => fmt::Display::fmt(command, f),
            Self::MoveBuilding(command) => fmt::Display::fmt(command, f),
            Self::SelectVehicle(command) => fmt::Display::fmt(command, f),
            Self::MoveVehicle(command) => fmt::Display::fmt(command, f),
        }
    }
}

impl From<ConstructBuilding> for Command {
    fn from(command: ConstructBuilding) -> Self {
        Self::ConstructBuilding(command)
    }
}

impl From<MoveBuilding> for Command {
    fn from(command: MoveBuilding) -> Self {
        Self::MoveBuilding(command)
    }
}

impl From<SelectVehicle> for Command {
    fn from(command: SelectVehicle) -> Self {
        Self::SelectVehicle(command)
    }
}

impl From<MoveVehicle> for Command {
    fn from(command: MoveVehicle) -> Self {
        Self::MoveVehicle(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deferred_target_reads_latest_cursor_value() {
        let cursor = CursorTarget::new();
        let target = Target::Deferred(cursor.clone());
        assert_eq!(target.resolve(), None);
        assert_eq!(target.to_string(), "cursor");

        cursor.set(Some(CellCoord::new(2, 5)));
        assert_eq!(target.resolve(), Some(CellCoord::new(2, 5)));
        assert_eq!(target.clone().resolve(), Some(CellCoord::new(2, 5)));
    }

    #[test]
    fn pointer_over_ui_blocks_context() {
        let target = Target::Known(CellCoord::new(0, 0));
        let mut input = PointerState::default();
        assert_eq!(context_cell(&target, &input), Some(CellCoord::new(0, 0)));

        input.over_ui = true;
        assert_eq!(context_cell(&target, &input), None);
    }

    #[test]
    fn deferred_context_reads_the_cursor_not_the_slot() {
        let slot = CursorTarget::new();
        slot.set(Some(CellCoord::new(7, 7)));
        let target = Target::Deferred(slot);

        assert_eq!(context_cell(&target, &PointerState::default()), None);
        let input = PointerState {
            over_ui: false,
            cursor: Some(CellCoord::new(1, 2)),
        };
        assert_eq!(context_cell(&target, &input), Some(CellCoord::new(1, 2)));
    }
}
