use chrono::NaiveDate;
use ticklist_core::datetime::format_due;
use ticklist_core::{Notice, NoticeKind, Task, TaskId};
use ticklist_shared::date_only;
use web_sys::HtmlInputElement;
use yew::{
    Callback, Html, Properties, TargetCast, classes, function_component, html, use_state,
};

#[derive(Properties, PartialEq)]
pub struct TaskListProps {
    pub tasks: Vec<Task>,
    pub pending: Vec<TaskId>,
    pub today: NaiveDate,
    pub date_format: &'static str,
    pub on_toggle: Callback<TaskId>,
    pub on_delete: Callback<TaskId>,
}

#[function_component(TaskList)]
pub fn task_list(props: &TaskListProps) -> Html {
    if props.tasks.is_empty() {
        return html! {
            <div class="panel list empty">{ "Nothing to do." }</div>
        };
    }

    html! {
        <div class="panel list">
            {
                for props.tasks.iter().map(|task| html! {
                    <TaskListRow
                        key={task.id.0}
                        task={task.clone()}
                        pending={props.pending.contains(&task.id)}
                        today={props.today}
                        date_format={props.date_format}
                        on_toggle={props.on_toggle.clone()}
                        on_delete={props.on_delete.clone()}
                    />
                })
            }
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct TaskListRowProps {
    pub task: Task,
    pub pending: bool,
    pub today: NaiveDate,
    pub date_format: &'static str,
    pub on_toggle: Callback<TaskId>,
    pub on_delete: Callback<TaskId>,
}

#[function_component(TaskListRow)]
pub fn task_list_row(props: &TaskListRowProps) -> Html {
    let id = props.task.id;
    let on_toggle = props.on_toggle.clone();
    let on_delete = props.on_delete.clone();

    let class = classes!(
        "row",
        props.task.is_completed.then_some("done"),
        props.pending.then_some("pending"),
    );
    let due = props.task.due_date.map(|date| {
        let overdue = props.task.is_overdue(props.today);
        html! {
            <span class={classes!("badge", overdue.then_some("overdue"))}>
                { format_due(date, props.date_format) }
            </span>
        }
    });

    html! {
        <div class={class}>
            <input
                type="checkbox"
                checked={props.task.is_completed}
                onclick={move |_| on_toggle.emit(id)}
            />
            <span
                class="title"
                style={if props.task.is_completed { "text-decoration:line-through;" } else { "" }}
            >
                { &props.task.title }
            </span>
            { due.unwrap_or_default() }
            <button
                class="btn danger"
                type="button"
                title="Delete"
                onclick={move |_| on_delete.emit(id)}
            >
                { "Delete" }
            </button>
        </div>
    }
}

/// Title, optional due date and a callback the form uses to clear itself
/// once the task exists.
pub type AddRequest = (String, Option<NaiveDate>, Callback<()>);

#[derive(Properties, PartialEq)]
pub struct AddTaskFormProps {
    pub on_add: Callback<AddRequest>,
}

#[function_component(AddTaskForm)]
pub fn add_task_form(props: &AddTaskFormProps) -> Html {
    let title = use_state(String::new);
    let due = use_state(String::new);

    let on_title = {
        let title = title.clone();
        Callback::from(move |e: yew::InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            title.set(input.value());
        })
    };
    let on_due = {
        let due = due.clone();
        Callback::from(move |e: yew::Event| {
            let input: HtmlInputElement = e.target_unchecked_into();
            due.set(input.value());
        })
    };
    let on_submit = {
        let title = title.clone();
        let due = due.clone();
        let on_add = props.on_add.clone();
        Callback::from(move |e: yew::SubmitEvent| {
            e.prevent_default();
            if title.trim().is_empty() {
                return;
            }
            // The date input yields `YYYY-MM-DD` or an empty string.
            let due_date = date_only::parse(&due).ok();
            let clear = {
                let title = title.clone();
                let due = due.clone();
                Callback::from(move |()| {
                    title.set(String::new());
                    due.set(String::new());
                })
            };
            on_add.emit(((*title).clone(), due_date, clear));
        })
    };

    html! {
        <form class="add-task" onsubmit={on_submit}>
            <input
                class="input"
                type="text"
                placeholder="What needs doing?"
                value={(*title).clone()}
                oninput={on_title}
            />
            <input
                class="input"
                type="date"
                value={(*due).clone()}
                onchange={on_due}
            />
            <button class="btn ok" type="submit" disabled={title.trim().is_empty()}>
                { "Add" }
            </button>
        </form>
    }
}

#[derive(Properties, PartialEq)]
pub struct NoticeBarProps {
    pub notices: Vec<Notice>,
    pub on_dismiss: Callback<u64>,
}

#[function_component(NoticeBar)]
pub fn notice_bar(props: &NoticeBarProps) -> Html {
    if props.notices.is_empty() {
        return html! {};
    }

    html! {
        <div class="notices">
            {
                for props.notices.iter().map(|notice| {
                    let notice_id = notice.id;
                    let on_dismiss = props.on_dismiss.clone();
                    let label = match notice.kind {
                        NoticeKind::Fetch => "Load failed",
                        NoticeKind::Create => "Add failed",
                        NoticeKind::Update => "Update failed",
                        NoticeKind::Delete => "Delete failed",
                    };
                    html! {
                        <div class="notice error" key={notice_id}>
                            <strong>{ label }</strong>
                            <span>{ &notice.message }</span>
                            <button
                                class="btn"
                                type="button"
                                title="Dismiss"
                                onclick={move |_| on_dismiss.emit(notice_id)}
                            >
                                { "X" }
                            </button>
                        </div>
                    }
                })
            }
        </div>
    }
}
