use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use chrono::NaiveDate;
use ticklist_shared::{NewTask, Task, TaskId};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::store::{StoreError, TaskStore};
use crate::transaction::Transaction;

/// Load status of the list, shown on top of whatever tasks are held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    Loading,
    Ready,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Fetch,
    Create,
    Update,
    Delete,
}

impl NoticeKind {
    fn of(err: &StoreError) -> Self {
        match err {
            StoreError::Fetch(_) => NoticeKind::Fetch,
            StoreError::Create(_) => NoticeKind::Create,
            StoreError::Update { .. } => NoticeKind::Update,
            StoreError::Delete { .. } => NoticeKind::Delete,
        }
    }
}

/// A dismissible, non-fatal error for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Blank title; nothing was sent.
    Rejected,
    Created(Task),
    Failed(StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Unknown task; nothing was applied or sent.
    Skipped,
    Confirmed,
    RolledBack(StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    pub total: usize,
    pub completed: usize,
    pub remaining: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct ListState {
    tasks: Vec<Task>,
    view: ViewState,
    notices: Vec<Notice>,
    next_notice_id: u64,
}

type Listener = Rc<dyn Fn()>;

/// Owns the task list and keeps it in step with the task service.
///
/// Toggle and delete are applied locally before the request goes out and
/// undone if the request fails. Add waits for the server-assigned id. Intents
/// on the same task run one after another; intents on different tasks
/// interleave freely.
///
/// The controller is single-threaded: share it with `Rc` and drive its
/// futures on one executor.
pub struct TaskListController<S> {
    store: S,
    state: RefCell<ListState>,
    task_locks: RefCell<HashMap<TaskId, Rc<Mutex<()>>>>,
    listeners: RefCell<Vec<(ListenerId, Listener)>>,
    next_listener_id: Cell<u64>,
}

impl<S: TaskStore> TaskListController<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            state: RefCell::new(ListState {
                tasks: Vec::new(),
                view: ViewState::Loading,
                notices: Vec::new(),
                next_notice_id: 1,
            }),
            task_locks: RefCell::new(HashMap::new()),
            listeners: RefCell::new(Vec::new()),
            next_listener_id: Cell::new(1),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetches the full list. On failure the previous tasks stay in place and
    /// the view enters `Error`; call again to retry.
    ///
    /// Tasks with a toggle or delete still in flight keep their local state,
    /// so the server's pre-change copy never overwrites an optimistic change.
    /// That change is then committed or rolled back as usual.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<(), StoreError> {
        self.state.borrow_mut().view = ViewState::Loading;
        self.notify();

        match self.store.list_tasks().await {
            Ok(fetched) => {
                let tasks = self.keep_in_flight(dedupe_by_id(fetched));
                info!(count = tasks.len(), "task list loaded");
                {
                    let mut state = self.state.borrow_mut();
                    state.tasks = tasks;
                    state.view = ViewState::Ready;
                }
                self.notify();
                Ok(())
            }
            Err(err) => {
                self.state.borrow_mut().view = ViewState::Error(err.to_string());
                self.report(&err);
                Err(err)
            }
        }
    }

    /// Creates a task. The list only changes once the server has answered
    /// with the new record.
    #[instrument(skip(self, title), fields(title_len = title.len()))]
    pub async fn add(&self, title: &str, due_date: Option<NaiveDate>) -> AddOutcome {
        let title = title.trim();
        if title.is_empty() {
            debug!("ignoring add with blank title");
            return AddOutcome::Rejected;
        }

        match self.store.create_task(NewTask::new(title, due_date)).await {
            Ok(task) => {
                {
                    let mut state = self.state.borrow_mut();
                    let before = state.tasks.len();
                    state.tasks.retain(|existing| existing.id != task.id);
                    if state.tasks.len() != before {
                        warn!(task_id = %task.id, "server reused an id already in the list; replacing stale entry");
                    }
                    state.tasks.insert(0, task.clone());
                }
                info!(task_id = %task.id, "task added");
                self.notify();
                AddOutcome::Created(task)
            }
            Err(err) => {
                self.report(&err);
                AddOutcome::Failed(err)
            }
        }
    }

    /// Flips completion locally, then asks the server to agree.
    #[instrument(skip(self), fields(task_id = %id))]
    pub async fn toggle(&self, id: TaskId) -> MutationOutcome {
        let lock = self.task_lock(id);
        let guard = lock.lock().await;

        let applied = Transaction::toggle(&mut self.state.borrow_mut().tasks, id);
        let Some((tx, patch)) = applied else {
            debug!("toggle on unknown task; skipping");
            drop(guard);
            self.release_task_lock(id, lock);
            return MutationOutcome::Skipped;
        };
        self.notify();

        let result = match self.store.update_task(id, patch).await {
            Ok(confirmed) => {
                if let Some(server) = confirmed.as_ref() {
                    debug!(op_id = %tx.op_id(), server_completed = server.is_completed, "server returned updated task");
                }
                tx.commit();
                Ok(())
            }
            Err(err) => {
                tx.rollback(&mut self.state.borrow_mut().tasks);
                Err(err)
            }
        };

        drop(guard);
        self.release_task_lock(id, lock);
        self.settle(result)
    }

    /// Removes the task locally, then asks the server to delete it. An id the
    /// list no longer holds is still sent so the server can report it.
    #[instrument(skip(self), fields(task_id = %id))]
    pub async fn delete(&self, id: TaskId) -> MutationOutcome {
        let lock = self.task_lock(id);
        let guard = lock.lock().await;

        let applied = Transaction::remove(&mut self.state.borrow_mut().tasks, id);
        if applied.is_some() {
            self.notify();
        } else {
            debug!("delete for task not in list; sending anyway");
        }

        let result = match self.store.delete_task(id).await {
            Ok(()) => {
                if let Some(tx) = applied {
                    tx.commit();
                }
                info!("task deleted");
                Ok(())
            }
            Err(err) => {
                if let Some(tx) = applied {
                    tx.rollback(&mut self.state.borrow_mut().tasks);
                }
                Err(err)
            }
        };

        drop(guard);
        self.release_task_lock(id, lock);
        self.settle(result)
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.borrow().tasks.clone()
    }

    pub fn with_tasks<R>(&self, f: impl FnOnce(&[Task]) -> R) -> R {
        f(&self.state.borrow().tasks)
    }

    pub fn task(&self, id: TaskId) -> Option<Task> {
        self.state
            .borrow()
            .tasks
            .iter()
            .find(|task| task.id == id)
            .cloned()
    }

    pub fn view_state(&self) -> ViewState {
        self.state.borrow().view.clone()
    }

    pub fn summary(&self) -> Summary {
        let state = self.state.borrow();
        let completed = state.tasks.iter().filter(|task| task.is_completed).count();
        Summary {
            total: state.tasks.len(),
            completed,
            remaining: state.tasks.len() - completed,
        }
    }

    /// Whether an intent on `id` is in flight or queued.
    pub fn is_pending(&self, id: TaskId) -> bool {
        self.task_locks.borrow().contains_key(&id)
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.state.borrow().notices.clone()
    }

    pub fn dismiss_notice(&self, notice_id: u64) -> bool {
        let removed = {
            let mut state = self.state.borrow_mut();
            let before = state.notices.len();
            state.notices.retain(|notice| notice.id != notice_id);
            state.notices.len() != before
        };
        if removed {
            self.notify();
        }
        removed
    }

    pub fn clear_notices(&self) {
        let had_any = {
            let mut state = self.state.borrow_mut();
            let had_any = !state.notices.is_empty();
            state.notices.clear();
            had_any
        };
        if had_any {
            self.notify();
        }
    }

    /// Registers a callback run after every change to tasks, view state or
    /// notices. Callbacks may read the controller but must not hold on to a
    /// borrow of it.
    pub fn subscribe(&self, listener: impl Fn() + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener_id.get());
        self.next_listener_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.listeners
            .borrow_mut()
            .retain(|(listener_id, _)| *listener_id != id);
    }

    fn notify(&self) {
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener();
        }
    }

    fn report(&self, err: &StoreError) {
        let kind = NoticeKind::of(err);
        warn!(?kind, error = %err, "remote call failed");
        {
            let mut state = self.state.borrow_mut();
            let id = state.next_notice_id;
            state.next_notice_id += 1;
            state.notices.push(Notice {
                id,
                kind,
                message: err.to_string(),
            });
        }
        self.notify();
    }

    /// Announces the end of an optimistic change once its lock is released,
    /// so listeners see the task as no longer pending.
    fn settle(&self, result: Result<(), StoreError>) -> MutationOutcome {
        match result {
            Ok(()) => {
                self.notify();
                MutationOutcome::Confirmed
            }
            Err(err) => {
                self.report(&err);
                MutationOutcome::RolledBack(err)
            }
        }
    }

    fn keep_in_flight(&self, fetched: Vec<Task>) -> Vec<Task> {
        let locks = self.task_locks.borrow();
        if locks.is_empty() {
            return fetched;
        }
        let state = self.state.borrow();
        fetched
            .into_iter()
            .filter_map(|task| {
                if !locks.contains_key(&task.id) {
                    return Some(task);
                }
                // Absent locally means a delete is pending.
                let local = state.tasks.iter().find(|held| held.id == task.id).cloned();
                debug!(task_id = %task.id, kept = local.is_some(), "reload kept in-flight task state");
                local
            })
            .collect()
    }

    fn task_lock(&self, id: TaskId) -> Rc<Mutex<()>> {
        Rc::clone(
            self.task_locks
                .borrow_mut()
                .entry(id)
                .or_insert_with(|| Rc::new(Mutex::new(()))),
        )
    }

    fn release_task_lock(&self, id: TaskId, lock: Rc<Mutex<()>>) {
        // One reference in the map plus ours means nobody else is queued.
        if Rc::strong_count(&lock) == 2 {
            self.task_locks.borrow_mut().remove(&id);
        }
    }
}

fn dedupe_by_id(tasks: Vec<Task>) -> Vec<Task> {
    let mut seen = HashSet::with_capacity(tasks.len());
    tasks
        .into_iter()
        .filter(|task| {
            let fresh = seen.insert(task.id);
            if !fresh {
                warn!(task_id = %task.id, "dropping duplicate task from server list");
            }
            fresh
        })
        .collect()
}
