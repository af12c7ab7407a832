//! One player's view of a world: state, tasks, undo history and pointer.

use std::time::Duration;

use settlement_core::{CellCoord, Event};
use settlement_system_commands::{
    Command, CommandContext, CommandFault, CommandHistory, CursorTarget, PointerState, Reversible,
};
use settlement_system_tasks::TaskScheduler;
use settlement_world::{World, WorldConfig};
use tracing::debug;

use crate::{Builder, BuilderInput, PlacementPreview, Tool};

/// Owns everything a command needs and dispatches input to it.
#[derive(Debug)]
pub struct Session {
    world: World,
    scheduler: TaskScheduler,
    history: CommandHistory,
    pointer: PointerState,
    cursor: CursorTarget,
    builder: Builder,
    events: Vec<Event>,
}

impl Session {
    /// Creates a session over a fresh world.
    #[must_use]
    pub fn new(config: WorldConfig) -> Self {
        Self::with_world(World::new(config))
    }

    /// Creates a session over an existing world.
    #[must_use]
    pub fn with_world(world: World) -> Self {
        Self {
            world,
            scheduler: TaskScheduler::new(),
            history: CommandHistory::new(),
            pointer: PointerState::default(),
            cursor: CursorTarget::new(),
            builder: Builder::new(),
            events: Vec::new(),
        }
    }

    /// Authoritative state.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable state for entity lifecycle calls that bypass commands.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Running tasks.
    #[must_use]
    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    /// Succeeded commands.
    #[must_use]
    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    /// Active builder tool.
    #[must_use]
    pub fn tool(&self) -> Tool {
        self.builder.tool()
    }

    /// Switches the active builder tool.
    pub fn set_tool(&mut self, tool: Tool) {
        self.builder.set_tool(tool);
    }

    /// Moves the cursor. Commands created earlier with a deferred target see
    /// the new cell when they run.
    pub fn hover(&mut self, cell: Option<CellCoord>) {
        self.pointer.cursor = cell;
        self.cursor.set(cell);
    }

    /// Reports whether the pointer rests on an interface element.
    pub fn set_pointer_over_ui(&mut self, over_ui: bool) {
        self.pointer.over_ui = over_ui;
    }

    /// Preview of the active tool at the hovered cell.
    #[must_use]
    pub fn preview(&self) -> Option<PlacementPreview> {
        self.builder.preview(&self.world, self.pointer.cursor?)
    }

    /// Calls a command and records it when it succeeds.
    pub fn execute(&mut self, command: impl Into<Command>) -> Result<bool, CommandFault> {
        let mut command = command.into();
        let mut ctx = CommandContext {
            world: &mut self.world,
            scheduler: &mut self.scheduler,
            input: &self.pointer,
            events: &mut self.events,
        };
        if !command.call(&mut ctx)? {
            debug!(command = %command, "command declined");
            return Ok(false);
        }
        Ok(self.history.record(command, &mut self.events))
    }

    /// Confirms the active tool at the hovered cell. Returns how many
    /// commands succeeded.
    pub fn click(&mut self) -> Result<usize, CommandFault> {
        let mut commands = Vec::new();
        self.builder.handle(
            &self.world,
            BuilderInput {
                confirm_action: true,
                cancel_action: false,
                cursor_cell: self.pointer.cursor,
            },
            &self.cursor,
            &mut commands,
        );

        let mut succeeded = 0;
        for command in commands {
            if self.execute(command)? {
                succeeded += 1;
            }
        }
        Ok(succeeded)
    }

    /// Drops back to the selection tool.
    pub fn cancel(&mut self) {
        let mut commands = Vec::new();
        self.builder.handle(
            &self.world,
            BuilderInput {
                cancel_action: true,
                ..BuilderInput::default()
            },
            &self.cursor,
            &mut commands,
        );
    }

    /// Advances every task by `dt`.
    pub fn tick(&mut self, dt: Duration) {
        self.scheduler.tick(&mut self.world, dt, &mut self.events);
    }

    /// Undoes the most recent command.
    pub fn undo_last(&mut self) -> bool {
        let mut ctx = CommandContext {
            world: &mut self.world,
            scheduler: &mut self.scheduler,
            input: &self.pointer,
            events: &mut self.events,
        };
        self.history.undo_last(&mut ctx)
    }

    /// Events emitted since the last drain.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Takes every event emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}
