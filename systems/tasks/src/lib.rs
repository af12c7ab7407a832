#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Cooperative per-tick tasks and the scheduler that drives them.
//!
//! A [`Task`] is a small state machine advanced once per tick by the
//! [`TaskScheduler`]. Tasks move through `Pending -> Ongoing -> Completed`,
//! or `Ongoing -> Aborting -> Completed` when cancelled. A task may wait for
//! a single predecessor; it stays `Pending` and has no effect until that
//! predecessor completes.

use std::{fmt, time::Duration};

use settlement_core::{EntityId, Event, TaskId, TaskStatus};
use settlement_world::World;

pub mod movement;
pub mod scheduler;
pub mod timers;

pub use movement::MoveTask;
pub use scheduler::TaskScheduler;
pub use timers::{ConstructionTask, ProductionTask};

/// Behaviour-specific state of a task.
#[derive(Clone, Debug, PartialEq)]
pub enum TaskKind {
    /// Countdown that marks a building constructed.
    Construction(ConstructionTask),
    /// Countdown that credits resources, optionally looping.
    Production(ProductionTask),
    /// Vehicle traversal along a path.
    Move(MoveTask),
}

impl TaskKind {
    /// Entity whose state the task drives.
    #[must_use]
    pub fn bound_entity(&self) -> EntityId {
        match self {
            Self::Construction(task) => EntityId::Building(task.building()),
            Self::Production(task) => EntityId::Building(task.building()),
            Self::Move(task) => EntityId::Vehicle(task.vehicle()),
        }
    }

    fn resume(&mut self, world: &mut World) {
        if let Self::Move(task) = self {
            task.replan(world);
        }
    }

    fn advance(
        &mut self,
        world: &mut World,
        dt: Duration,
        aborting: bool,
        events: &mut Vec<Event>,
    ) -> Progress {
        match self {
            Self::Construction(task) => task.advance(world, dt, aborting, events),
            Self::Production(task) => task.advance(world, dt, aborting, events),
            Self::Move(task) => task.advance(world, dt, aborting, events),
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Construction(task) => write!(
                f,
                "construct building#{} ({:.1}s left)",
                task.building().get(),
                task.remaining().as_secs_f32()
            ),
            Self::Production(task) => write!(
                f,
                "produce {} at building#{} ({:.1}s left{})",
                task.output(),
                task.building().get(),
                task.remaining().as_secs_f32(),
                if task.is_looping() { ", looping" } else { "" }
            ),
            Self::Move(task) => write!(
                f,
                "move vehicle#{} to {}",
                task.vehicle().get(),
                task.destination()
            ),
        }
    }
}

/// Outcome of advancing a task variant by one tick.
#[derive(Debug)]
pub(crate) enum Progress {
    Running,
    Finished { follow_up: Option<Task> },
}

/// A schedulable unit of timed work.
#[derive(Clone, Debug, PartialEq)]
pub struct Task {
    status: TaskStatus,
    waiting_for: Option<TaskId>,
    aborted: bool,
    kind: TaskKind,
}

impl Task {
    /// Creates a task that starts `Ongoing`.
    #[must_use]
    pub fn new(kind: TaskKind) -> Self {
        Self {
            status: TaskStatus::Ongoing,
            waiting_for: None,
            aborted: false,
            kind,
        }
    }

    /// Creates a task that stays `Pending` until `predecessor` completes.
    #[must_use]
    pub fn after(kind: TaskKind, predecessor: TaskId) -> Self {
        Self {
            status: TaskStatus::Pending,
            waiting_for: Some(predecessor),
            aborted: false,
            kind,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Predecessor the task waits for, if any.
    #[must_use]
    pub fn waiting_for(&self) -> Option<TaskId> {
        self.waiting_for
    }

    /// Whether an abort was requested while the task was running.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Behaviour-specific state.
    #[must_use]
    pub fn kind(&self) -> &TaskKind {
        &self.kind
    }

    /// Requests cancellation. A `Pending` task completes at once; a running
    /// task finishes its current step first. Returns whether the status
    /// changed.
    pub fn abort(&mut self) -> bool {
        match self.status {
            TaskStatus::Pending => {
                self.waiting_for = None;
                self.status = TaskStatus::Completed;
                true
            }
            TaskStatus::Ongoing => {
                self.aborted = true;
                self.status = TaskStatus::Aborting;
                true
            }
            TaskStatus::Aborting | TaskStatus::Completed => false,
        }
    }

    pub(crate) fn update(
        &mut self,
        world: &mut World,
        dt: Duration,
        predecessor_completed: bool,
        events: &mut Vec<Event>,
    ) -> Option<Task> {
        match self.status {
            TaskStatus::Completed => return None,
            TaskStatus::Pending => {
                if !predecessor_completed {
                    return None;
                }
                self.waiting_for = None;
                self.status = TaskStatus::Ongoing;
                self.kind.resume(world);
            }
            TaskStatus::Ongoing | TaskStatus::Aborting => {}
        }

        match self.kind.advance(world, dt, self.aborted, events) {
            Progress::Running => None,
            Progress::Finished { follow_up } => {
                self.status = TaskStatus::Completed;
                follow_up
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use settlement_core::BuildingId;

    fn construction() -> TaskKind {
        TaskKind::Construction(ConstructionTask::new(
            BuildingId::new(0),
            Duration::from_secs(1),
        ))
    }

    #[test]
    fn aborting_pending_task_completes_immediately() {
        let mut task = Task::after(construction(), TaskId::new(4));
        assert_eq!(task.status(), TaskStatus::Pending);

        assert!(task.abort());
        assert_eq!(task.status(), TaskStatus::Completed);
        assert!(!task.is_aborted(), "nothing was in flight");
        assert_eq!(task.waiting_for(), None);
    }

    #[test]
    fn aborting_running_task_sets_flag() {
        let mut task = Task::new(construction());
        assert!(task.abort());
        assert_eq!(task.status(), TaskStatus::Aborting);
        assert!(task.is_aborted());
        assert!(!task.abort(), "second abort is a no-op");
    }

    #[test]
    fn bound_entity_matches_variant() {
        assert_eq!(
            construction().bound_entity(),
            EntityId::Building(BuildingId::new(0))
        );
    }
}
