//! Single-step undo over succeeded commands.

use settlement_core::Event;
use tracing::{debug, warn};

use crate::{Command, CommandContext, Reversible};

/// Ordered log of succeeded commands.
#[derive(Clone, Debug, Default)]
pub struct CommandHistory {
    entries: Vec<Command>,
}

impl CommandHistory {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a succeeded command. Commands that have not succeeded are
    /// rejected and `false` is returned.
    pub fn record(&mut self, command: Command, events: &mut Vec<Event>) -> bool {
        if !command.is_succeeded() {
            warn!(command = %command, "refusing to record unsucceeded command");
            return false;
        }

        debug!(command = %command, "command recorded");
        self.entries.push(command);
        events.push(Event::HistoryChanged {
            entries: self.entries.len(),
        });
        true
    }

    /// Undoes the most recent command. The entry is removed only when its
    /// undo succeeds; an empty history or a failed undo returns `false`.
    pub fn undo_last(&mut self, ctx: &mut CommandContext<'_>) -> bool {
        let Some(last) = self.entries.last_mut() else {
            return false;
        };

        if !last.undo(ctx) {
            warn!(command = %last, "undo failed");
            return false;
        }

        debug!(command = %last, "command undone");
        let _ = self.entries.pop();
        ctx.events.push(Event::HistoryChanged {
            entries: self.entries.len(),
        });
        true
    }

    /// Most recent command.
    #[must_use]
    pub fn last(&self) -> Option<&Command> {
        self.entries.last()
    }

    /// Commands from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.entries.iter()
    }

    /// Number of recorded commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether nothing is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One human-readable line per command, oldest first.
    #[must_use]
    pub fn listing(&self) -> Vec<String> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, command)| format!("{:>3}. {command}", index + 1))
            .collect()
    }
}
