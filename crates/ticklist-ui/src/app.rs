use std::rc::Rc;

use gloo::timers::future::TimeoutFuture;
use ticklist_core::datetime::{
  DEFAULT_DISPLAY_FORMAT,
  today_local
};
use ticklist_core::{
  AddOutcome,
  HttpTaskStore,
  MutationOutcome,
  TaskId,
  TaskListController,
  ViewState
};
use yew::{
  Callback,
  Html,
  function_component,
  html,
  use_effect_with,
  use_force_update,
  use_memo,
  use_mut_ref
};

use crate::api::task_store;
use crate::components::{
  AddRequest,
  AddTaskForm,
  NoticeBar,
  TaskList
};

type Controller =
  TaskListController<HttpTaskStore>;

const NOTICE_TIMEOUT_MS: u32 = 6_000;

#[function_component(App)]
pub fn app() -> Html {
  let controller: Rc<Controller> =
    use_memo((), |_| {
      TaskListController::new(
        task_store()
      )
    });
  let redraw = use_force_update();

  {
    let controller = controller.clone();
    let redraw = redraw.clone();
    use_effect_with((), move |_| {
      let listener = controller
        .subscribe(move || {
          redraw.force_update()
        });
      tracing::debug!(
        "subscribed to task list \
         changes"
      );

      let loader = controller.clone();
      wasm_bindgen_futures::spawn_local(
        async move {
          if let Err(err) =
            loader.load().await
          {
            tracing::warn!(
              error = %err,
              "initial load failed"
            );
          }
        }
      );

      move || {
        controller
          .unsubscribe(listener)
      }
    });
  }

  let notices = controller.notices();
  let notice_ids: Vec<u64> = notices
    .iter()
    .map(|notice| notice.id)
    .collect();
  // Notice ids only grow, so every id
  // above this one still needs a timer.
  let last_timed_notice =
    use_mut_ref(|| 0_u64);

  {
    let controller = controller.clone();
    use_effect_with(
      notice_ids,
      move |ids| {
        let mut last =
          last_timed_notice.borrow_mut();
        let (fresh, newest) =
          untimed_notices(ids, *last);
        *last = newest;
        for notice_id in fresh {
          let controller =
            controller.clone();
          wasm_bindgen_futures::spawn_local(
            async move {
              TimeoutFuture::new(
                NOTICE_TIMEOUT_MS
              )
              .await;
              controller
                .dismiss_notice(
                  notice_id
                );
            }
          );
        }
        || ()
      }
    );
  }

  let on_add = {
    let controller = controller.clone();
    Callback::from(
      move |(title, due, done): AddRequest| {
        let controller =
          controller.clone();
        wasm_bindgen_futures::spawn_local(
          async move {
            match controller
              .add(&title, due)
              .await
            {
              | AddOutcome::Created(
                task
              ) => {
                tracing::info!(
                  task_id = %task.id,
                  "task created"
                );
                done.emit(());
              }
              | AddOutcome::Rejected => {
                tracing::debug!(
                  "ignored blank title"
                );
              }
              | AddOutcome::Failed(
                err
              ) => {
                tracing::warn!(
                  error = %err,
                  "create failed"
                );
              }
            }
          }
        );
      }
    )
  };

  let on_toggle = {
    let controller = controller.clone();
    Callback::from(move |id: TaskId| {
      let controller =
        controller.clone();
      wasm_bindgen_futures::spawn_local(
        async move {
          log_mutation(
            "toggle",
            id,
            controller
              .toggle(id)
              .await
          );
        }
      );
    })
  };

  let on_delete = {
    let controller = controller.clone();
    Callback::from(move |id: TaskId| {
      let controller =
        controller.clone();
      wasm_bindgen_futures::spawn_local(
        async move {
          log_mutation(
            "delete",
            id,
            controller
              .delete(id)
              .await
          );
        }
      );
    })
  };

  let on_dismiss = {
    let controller = controller.clone();
    Callback::from(
      move |notice_id: u64| {
        controller
          .dismiss_notice(notice_id);
      }
    )
  };

  let on_retry = {
    let controller = controller.clone();
    Callback::from(
      move |_: yew::MouseEvent| {
        let controller =
          controller.clone();
        wasm_bindgen_futures::spawn_local(
          async move {
            let _ =
              controller.load().await;
          }
        );
      }
    )
  };

  let today = today_local();
  let tasks = controller.tasks();
  let pending: Vec<TaskId> = tasks
    .iter()
    .map(|task| task.id)
    .filter(|id| {
      controller.is_pending(*id)
    })
    .collect();
  let summary = controller.summary();

  let body = match controller
    .view_state()
  {
    | ViewState::Loading
      if tasks.is_empty() =>
    {
      html! {
          <div class="status loading">{ "Loading tasks…" }</div>
      }
    }
    | ViewState::Error(message) => {
      html! {
          <div class="status error">
              <div>{ format!("Could not load tasks: {message}") }</div>
              <button class="btn" onclick={on_retry}>{ "Retry" }</button>
          </div>
      }
    }
    | ViewState::Loading
    | ViewState::Ready => {
      html! {
          <TaskList
              tasks={tasks}
              pending={pending}
              today={today}
              date_format={DEFAULT_DISPLAY_FORMAT}
              on_toggle={on_toggle}
              on_delete={on_delete}
          />
      }
    }
  };

  html! {
      <div class="app">
          <header class="header">
              <h1>{ "Tasks" }</h1>
              <span class="badge">
                  { format!("{} of {} done", summary.completed, summary.total) }
              </span>
          </header>
          <NoticeBar notices={notices} on_dismiss={on_dismiss} />
          <AddTaskForm on_add={on_add} />
          { body }
      </div>
  }
}

fn log_mutation(
  action: &'static str,
  id: TaskId,
  outcome: MutationOutcome
) {
  match outcome {
    | MutationOutcome::Confirmed => {
      tracing::debug!(
        action,
        task_id = %id,
        "change confirmed"
      );
    }
    | MutationOutcome::Skipped => {
      tracing::debug!(
        action,
        task_id = %id,
        "task no longer listed"
      );
    }
    | MutationOutcome::RolledBack(
      err
    ) => {
      tracing::warn!(
        action,
        task_id = %id,
        error = %err,
        "change rolled back"
      );
    }
  }
}

/// Splits out the notice ids that have
/// no dismiss timer yet, and returns the
/// new high-water mark.
fn untimed_notices(
  ids: &[u64],
  last_timed: u64
) -> (Vec<u64>, u64) {
  let fresh: Vec<u64> = ids
    .iter()
    .copied()
    .filter(|id| *id > last_timed)
    .collect();
  let newest = fresh
    .iter()
    .copied()
    .max()
    .unwrap_or(last_timed);
  (fresh, newest)
}

#[cfg(test)]
mod tests {
  use super::untimed_notices;

  #[test]
  fn every_new_notice_in_a_batch_gets_a_timer()
  {
    assert_eq!(
      untimed_notices(&[1, 2, 3], 0),
      (vec![1, 2, 3], 3)
    );
    assert_eq!(
      untimed_notices(&[2, 3, 4, 5], 3),
      (vec![4, 5], 5)
    );
  }

  #[test]
  fn dismissed_notices_do_not_rewind() {
    assert_eq!(
      untimed_notices(&[], 5),
      (vec![], 5)
    );
    assert_eq!(
      untimed_notices(&[4], 5),
      (vec![], 5)
    );
  }
}
