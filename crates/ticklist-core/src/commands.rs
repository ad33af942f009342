use anyhow::Context;
use tracing::{info, warn};

use crate::cli::Command;
use crate::controller::{AddOutcome, MutationOutcome, TaskListController};
use crate::datetime::{parse_due_input, today_local};
use crate::render::Renderer;
use crate::store::TaskStore;

/// Loads the list, applies one intent and prints the result. Returns `false`
/// when the load failed or the intent did not go through. A malformed `--due`
/// is an error before anything is sent.
#[tracing::instrument(skip(controller, renderer))]
pub async fn dispatch<S: TaskStore>(
    controller: &TaskListController<S>,
    renderer: &Renderer,
    command: Command,
) -> anyhow::Result<bool> {
    let today = today_local();
    let due_date = match &command {
        Command::Add { due: Some(raw), .. } => {
            Some(parse_due_input(raw, today).context("invalid --due value")?)
        }
        _ => None,
    };

    if controller.load().await.is_err() {
        renderer.print_notices(&controller.notices())?;
        return Ok(false);
    }

    let succeeded = match command {
        Command::List => true,
        Command::Add { title, .. } => {
            match controller.add(&title.join(" "), due_date).await {
                AddOutcome::Created(task) => {
                    info!(task_id = %task.id, "created task");
                    println!("Created task {}.", task.id);
                    true
                }
                AddOutcome::Rejected => {
                    warn!("blank title rejected");
                    eprintln!("error: task title cannot be blank");
                    false
                }
                AddOutcome::Failed(_) => false,
            }
        }
        Command::Toggle { id } => match controller.toggle(id).await {
            MutationOutcome::Confirmed => {
                let done = controller.task(id).is_some_and(|task| task.is_completed);
                let state = if done { "done" } else { "not done" };
                println!("Marked task {id} {state}.");
                true
            }
            MutationOutcome::Skipped => {
                eprintln!("error: no task with id {id}");
                false
            }
            MutationOutcome::RolledBack(_) => false,
        },
        Command::Delete { id } => match controller.delete(id).await {
            MutationOutcome::Confirmed => {
                println!("Deleted task {id}.");
                true
            }
            MutationOutcome::Skipped | MutationOutcome::RolledBack(_) => false,
        },
    };

    controller.with_tasks(|tasks| renderer.print_task_table(tasks, controller.summary(), today))?;
    renderer.print_notices(&controller.notices())?;
    Ok(succeeded)
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use async_trait::async_trait;
    use ticklist_shared::{NewTask, Task, TaskId, TaskPatch};

    use super::dispatch;
    use crate::cli::Command;
    use crate::config::Config;
    use crate::controller::TaskListController;
    use crate::render::Renderer;
    use crate::store::{RemoteFailure, StoreError, TaskStore};

    struct OneTaskStore {
        tasks: RefCell<Vec<Task>>,
        reject_deletes: bool,
        requests: Cell<usize>,
    }

    #[async_trait(?Send)]
    impl TaskStore for OneTaskStore {
        async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
            self.requests.set(self.requests.get() + 1);
            Ok(self.tasks.borrow().clone())
        }

        async fn create_task(&self, new_task: NewTask) -> Result<Task, StoreError> {
            let task = Task {
                id: TaskId(99),
                title: new_task.title,
                is_completed: new_task.is_completed,
                due_date: new_task.due_date,
                created_at: None,
            };
            self.tasks.borrow_mut().insert(0, task.clone());
            Ok(task)
        }

        async fn update_task(
            &self,
            _id: TaskId,
            _patch: TaskPatch,
        ) -> Result<Option<Task>, StoreError> {
            Ok(None)
        }

        async fn delete_task(&self, id: TaskId) -> Result<(), StoreError> {
            if self.reject_deletes {
                return Err(StoreError::Delete {
                    id,
                    failure: RemoteFailure::Status {
                        status: 500,
                        body: String::new(),
                    },
                });
            }
            Ok(())
        }
    }

    fn store(reject_deletes: bool) -> OneTaskStore {
        OneTaskStore {
            tasks: RefCell::new(vec![Task {
                id: TaskId(1),
                title: "water plants".to_string(),
                is_completed: false,
                due_date: None,
                created_at: None,
            }]),
            reject_deletes,
            requests: Cell::new(0),
        }
    }

    #[tokio::test]
    async fn add_and_toggle_report_success() {
        let controller = TaskListController::new(store(false));
        let renderer = Renderer::plain(&Config::default());

        let added = dispatch(
            &controller,
            &renderer,
            Command::Add {
                due: Some("2025-03-10".to_string()),
                title: vec!["buy".to_string(), "milk".to_string()],
            },
        )
        .await
        .expect("dispatch add");
        assert!(added);
        assert_eq!(controller.tasks()[0].title, "buy milk");

        let toggled = dispatch(&controller, &renderer, Command::Toggle { id: TaskId(1) })
            .await
            .expect("dispatch toggle");
        assert!(toggled);
    }

    #[tokio::test]
    async fn failed_intents_report_failure() {
        let controller = TaskListController::new(store(true));
        let renderer = Renderer::plain(&Config::default());

        let deleted = dispatch(&controller, &renderer, Command::Delete { id: TaskId(1) })
            .await
            .expect("dispatch delete");
        assert!(!deleted);
        assert_eq!(controller.tasks().len(), 1);

        let missing = dispatch(&controller, &renderer, Command::Toggle { id: TaskId(7) })
            .await
            .expect("dispatch toggle");
        assert!(!missing);

        let blank = dispatch(
            &controller,
            &renderer,
            Command::Add {
                due: None,
                title: vec!["  ".to_string()],
            },
        )
        .await
        .expect("dispatch add");
        assert!(!blank);
    }

    #[tokio::test]
    async fn malformed_due_fails_before_any_request() {
        let controller = TaskListController::new(store(false));
        let renderer = Renderer::plain(&Config::default());

        let bad_due = dispatch(
            &controller,
            &renderer,
            Command::Add {
                due: Some("someday".to_string()),
                title: vec!["x".to_string()],
            },
        )
        .await;

        assert!(bad_due.is_err());
        assert_eq!(controller.store().requests.get(), 0);
        assert!(controller.tasks().is_empty());
    }
}
