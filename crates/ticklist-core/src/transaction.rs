use ticklist_shared::{Task, TaskId, TaskPatch};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Snapshot {
    Completion {
        id: TaskId,
        previous: bool,
    },
    Removal {
        task: Task,
        index: usize,
        after: Option<TaskId>,
        before: Option<TaskId>,
    },
}

/// An optimistic change that has been applied to the local list but not yet
/// confirmed by the task service.
///
/// Holds just enough of the pre-change state to undo itself. It must end in
/// exactly one of [`Transaction::commit`] or [`Transaction::rollback`].
#[derive(Debug)]
#[must_use = "an applied transaction must be committed or rolled back"]
pub struct Transaction {
    op_id: Uuid,
    snapshot: Snapshot,
}

impl Transaction {
    /// Flips `is_completed` on the task with `id` and returns the patch that
    /// carries the new value to the server.
    pub fn toggle(tasks: &mut [Task], id: TaskId) -> Option<(Self, TaskPatch)> {
        let task = tasks.iter_mut().find(|task| task.id == id)?;
        let previous = task.is_completed;
        task.is_completed = !previous;

        let tx = Self {
            op_id: Uuid::new_v4(),
            snapshot: Snapshot::Completion { id, previous },
        };
        debug!(op_id = %tx.op_id, task_id = %id, from = previous, to = !previous, "applied completion locally");
        Some((tx, TaskPatch::completion(!previous)))
    }

    /// Removes the task with `id`, remembering where it stood.
    pub fn remove(tasks: &mut Vec<Task>, id: TaskId) -> Option<Self> {
        let index = tasks.iter().position(|task| task.id == id)?;
        let after = index
            .checked_sub(1)
            .and_then(|prev| tasks.get(prev))
            .map(|task| task.id);
        let before = tasks.get(index + 1).map(|task| task.id);
        let task = tasks.remove(index);

        let tx = Self {
            op_id: Uuid::new_v4(),
            snapshot: Snapshot::Removal {
                task,
                index,
                after,
                before,
            },
        };
        debug!(op_id = %tx.op_id, task_id = %id, index, "removed task locally");
        Some(tx)
    }

    pub fn op_id(&self) -> Uuid {
        self.op_id
    }

    pub fn task_id(&self) -> TaskId {
        match &self.snapshot {
            Snapshot::Completion { id, .. } => *id,
            Snapshot::Removal { task, .. } => task.id,
        }
    }

    /// The server agreed; the local list already shows the confirmed value.
    pub fn commit(self) {
        debug!(op_id = %self.op_id, task_id = %self.task_id(), "optimistic change confirmed");
    }

    /// Puts the affected task back the way it was. Other tasks are left alone
    /// so concurrent changes to them survive. Returns whether anything was
    /// restored.
    pub fn rollback(self, tasks: &mut Vec<Task>) -> bool {
        let op_id = self.op_id;
        match self.snapshot {
            Snapshot::Completion { id, previous } => {
                match tasks.iter_mut().find(|task| task.id == id) {
                    Some(task) => {
                        task.is_completed = previous;
                        debug!(%op_id, task_id = %id, restored = previous, "completion rolled back");
                        true
                    }
                    None => {
                        warn!(%op_id, task_id = %id, "task vanished before completion rollback");
                        false
                    }
                }
            }
            Snapshot::Removal {
                task,
                index,
                after,
                before,
            } => {
                if tasks.iter().any(|existing| existing.id == task.id) {
                    warn!(%op_id, task_id = %task.id, "task already present; skipping reinsert");
                    return false;
                }

                let position = restore_position(tasks, index, after, before);
                debug!(%op_id, task_id = %task.id, position, "removal rolled back");
                tasks.insert(position, task);
                true
            }
        }
    }
}

fn restore_position(
    tasks: &[Task],
    index: usize,
    after: Option<TaskId>,
    before: Option<TaskId>,
) -> usize {
    let locate = |id: TaskId| tasks.iter().position(|task| task.id == id);

    if let Some(pos) = after.and_then(locate) {
        return pos + 1;
    }
    if let Some(pos) = before.and_then(locate) {
        return pos;
    }
    index.min(tasks.len())
}
