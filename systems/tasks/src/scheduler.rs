//! Double-buffered task scheduler.

use std::time::Duration;

use settlement_core::{EntityId, Event, TaskId, TaskStatus, VehicleId};
use settlement_world::World;
use tracing::{debug, warn};

use crate::{Task, TaskKind};

#[derive(Clone, Debug)]
struct Entry {
    id: TaskId,
    task: Task,
}

/// Advances every active task once per tick.
///
/// Tasks scheduled while a tick is in progress land in a pending buffer and
/// join the active set after the update pass, so they first run on the next
/// tick. Completed tasks are dropped during the pass that completes them.
#[derive(Clone, Debug, Default)]
pub struct TaskScheduler {
    active: Vec<Entry>,
    pending: Vec<Entry>,
    last_issued: Option<TaskId>,
}

impl TaskScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a task and returns its identifier. Identifiers increase
    /// monotonically and are never reused.
    ///
    /// # Panics
    ///
    /// Panics if the task waits for an identifier that has not been issued
    /// yet, since that would allow dependency cycles.
    pub fn schedule(&mut self, task: Task, events: &mut Vec<Event>) -> TaskId {
        let id = self
            .last_issued
            .map_or(TaskId::new(0), |last| TaskId::new(last.get() + 1));
        if let Some(predecessor) = task.waiting_for() {
            assert!(
                predecessor < id,
                "{id} cannot wait for unissued {predecessor}"
            );
        }
        self.last_issued = Some(id);

        debug!(task = id.get(), kind = %task.kind(), status = %task.status(), "task scheduled");
        events.push(Event::TaskStatusChanged {
            task: id,
            status: task.status(),
        });
        self.pending.push(Entry { id, task });
        id
    }

    /// Advances every active task by `dt`, then promotes pending tasks.
    pub fn tick(&mut self, world: &mut World, dt: Duration, events: &mut Vec<Event>) {
        let mut follow_ups = Vec::new();
        let mut index = 0;

        while index < self.active.len() {
            let predecessor_completed = match self.active[index].task.waiting_for() {
                Some(predecessor) => self.status_of(predecessor) == TaskStatus::Completed,
                None => true,
            };

            let entry = &mut self.active[index];
            let before = entry.task.status();
            if let Some(task) = entry.task.update(world, dt, predecessor_completed, events) {
                follow_ups.push(task);
            }
            let after = entry.task.status();
            let id = entry.id;

            if after != before {
                debug!(task = id.get(), from = %before, to = %after, "task status changed");
                events.push(Event::TaskStatusChanged {
                    task: id,
                    status: after,
                });
            }

            if after == TaskStatus::Completed {
                let _ = self.active.remove(index);
            } else {
                index += 1;
            }
        }

        for task in follow_ups {
            let _ = self.schedule(task, events);
        }
        self.active.append(&mut self.pending);
    }

    /// Requests cancellation of a task. Returns `false` when the task is not
    /// live or already aborting.
    pub fn abort(&mut self, id: TaskId, events: &mut Vec<Event>) -> bool {
        let Some(entry) = self
            .active
            .iter_mut()
            .chain(self.pending.iter_mut())
            .find(|entry| entry.id == id)
        else {
            return false;
        };

        if !entry.task.abort() {
            return false;
        }
        let status = entry.task.status();
        debug!(task = id.get(), %status, "task aborted");
        events.push(Event::TaskStatusChanged { task: id, status });

        if status == TaskStatus::Completed {
            self.active.retain(|entry| entry.id != id);
            self.pending.retain(|entry| entry.id != id);
        }
        true
    }

    /// Aborts every live task driving `entity`. Returns how many changed.
    pub fn abort_bound_to(&mut self, entity: EntityId, events: &mut Vec<Event>) -> usize {
        let ids: Vec<TaskId> = self
            .entries()
            .filter(|entry| entry.task.kind().bound_entity() == entity)
            .map(|entry| entry.id)
            .collect();
        ids.into_iter()
            .filter(|&id| self.abort(id, events))
            .count()
    }

    /// Aborts every live move task of `vehicle` and returns the one still in
    /// flight, if any. A new move for the vehicle should wait for it.
    pub fn supersede_moves(&mut self, vehicle: VehicleId, events: &mut Vec<Event>) -> Option<TaskId> {
        let moves: Vec<TaskId> = self
            .entries()
            .filter(|entry| is_move_of(&entry.task, vehicle))
            .map(|entry| entry.id)
            .collect();

        for &id in &moves {
            let _ = self.abort(id, events);
        }

        let in_flight: Vec<TaskId> = moves
            .into_iter()
            .filter(|&id| self.status_of(id) == TaskStatus::Aborting)
            .collect();
        if in_flight.len() > 1 {
            warn!(vehicle = vehicle.get(), count = in_flight.len(), "several moves in flight");
        }
        in_flight.last().copied()
    }

    /// Newest live move task of `vehicle`.
    #[must_use]
    pub fn move_task_for(&self, vehicle: VehicleId) -> Option<TaskId> {
        self.entries()
            .filter(|entry| is_move_of(&entry.task, vehicle))
            .map(|entry| entry.id)
            .max()
    }

    /// Status of a task. Tasks the scheduler no longer holds report
    /// `Completed`.
    #[must_use]
    pub fn status_of(&self, id: TaskId) -> TaskStatus {
        self.get(id).map_or(TaskStatus::Completed, Task::status)
    }

    /// Live task with the given identifier.
    #[must_use]
    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.entries()
            .find(|entry| entry.id == id)
            .map(|entry| &entry.task)
    }

    /// Whether the task takes part in the next update pass.
    #[must_use]
    pub fn is_active(&self, id: TaskId) -> bool {
        self.active.iter().any(|entry| entry.id == id)
    }

    /// Whether the task waits in the buffer for the next promotion.
    #[must_use]
    pub fn is_pending(&self, id: TaskId) -> bool {
        self.pending.iter().any(|entry| entry.id == id)
    }

    /// Number of live tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len() + self.pending.len()
    }

    /// Reports whether no task is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One human-readable line per live task, ordered by identifier.
    #[must_use]
    pub fn listing(&self) -> Vec<String> {
        let mut entries: Vec<&Entry> = self.entries().collect();
        entries.sort_by_key(|entry| entry.id);
        entries
            .into_iter()
            .map(|entry| {
                let mut line = format!("{} [{}] {}", entry.id, entry.task.status(), entry.task.kind());
                if let Some(predecessor) = entry.task.waiting_for() {
                    line.push_str(&format!(" after {predecessor}"));
                }
                line
            })
            .collect()
    }

    fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.active.iter().chain(self.pending.iter())
    }
}

fn is_move_of(task: &Task, vehicle: VehicleId) -> bool {
    matches!(task.kind(), TaskKind::Move(movement) if movement.vehicle() == vehicle)
}
