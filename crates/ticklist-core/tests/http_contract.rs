use chrono::NaiveDate;
use serde_json::json;
use ticklist_core::datetime::format_due;
use ticklist_core::{
    HttpTaskStore, MutationOutcome, NewTask, RemoteFailure, StoreError, TaskId,
    TaskListController, TaskPatch, TaskStore,
};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn march_tenth() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).expect("valid date")
}

#[tokio::test]
async fn list_decodes_tasks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/todos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 2, "title": "pay rent", "isCompleted": false, "dueDate": "2025-03-10",
             "createdAt": "2025-03-01T09:00:00.000Z"},
            {"id": 1, "title": "walk", "isCompleted": true, "dueDate": null}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let store = HttpTaskStore::new(server.uri());
    let tasks = store.list_tasks().await.expect("list");

    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].id, TaskId(2));
    assert_eq!(tasks[0].due_date, Some(march_tenth()));
    assert!(tasks[0].created_at.is_some());
    assert!(tasks[1].is_completed);
    assert_eq!(tasks[1].due_date, None);
}

#[tokio::test]
async fn create_posts_title_completion_and_date() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/todos"))
        .and(body_json(json!({
            "title": "pay rent",
            "isCompleted": false,
            "dueDate": "2025-03-10"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 9, "title": "pay rent", "isCompleted": false, "dueDate": "2025-03-10"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = HttpTaskStore::new(format!("{}/", server.uri()));
    let created = store
        .create_task(NewTask::new("pay rent", Some(march_tenth())))
        .await
        .expect("create");

    assert_eq!(created.id, TaskId(9));
    assert_eq!(created.due_date, Some(march_tenth()));
}

#[tokio::test]
async fn update_sends_only_the_changed_field() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/todos/5"))
        .and(body_json(json!({"isCompleted": true})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = HttpTaskStore::new(server.uri());
    let updated = store
        .update_task(TaskId(5), TaskPatch::completion(true))
        .await
        .expect("update");

    assert_eq!(updated, None);
}

#[tokio::test]
async fn update_accepts_record_or_write_summary() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/todos/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 5, "title": "walk", "isCompleted": true, "dueDate": null
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/todos/6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "generatedMaps": [], "raw": [], "affected": 1
        })))
        .mount(&server)
        .await;

    let store = HttpTaskStore::new(server.uri());
    let record = store
        .update_task(TaskId(5), TaskPatch::completion(true))
        .await
        .expect("update with record");
    let summary = store
        .update_task(TaskId(6), TaskPatch::completion(false))
        .await
        .expect("update with summary");

    assert!(record.expect("record returned").is_completed);
    assert_eq!(summary, None);
}

#[tokio::test]
async fn delete_maps_missing_task_to_delete_error() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/todos/3"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/todos/4"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&server)
        .await;

    let store = HttpTaskStore::new(server.uri());
    store.delete_task(TaskId(3)).await.expect("delete");

    let err = store
        .delete_task(TaskId(4))
        .await
        .expect_err("missing task");
    assert_eq!(
        err,
        StoreError::Delete {
            id: TaskId(4),
            failure: RemoteFailure::Status {
                status: 404,
                body: "Not Found".to_string(),
            },
        }
    );
}

#[tokio::test]
async fn list_failures_are_fetch_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/todos"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/todos"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let store = HttpTaskStore::new(server.uri());

    let status = store.list_tasks().await.expect_err("500");
    assert!(matches!(
        status,
        StoreError::Fetch(RemoteFailure::Status { status: 500, .. })
    ));

    let decode = store.list_tasks().await.expect_err("bad body");
    assert!(matches!(decode, StoreError::Fetch(RemoteFailure::Decode(_))));
}

#[tokio::test]
async fn unreachable_server_is_a_transport_failure() {
    // Grab a free port, then close it so nothing is listening there.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);

    let store = HttpTaskStore::new(format!("http://127.0.0.1:{port}"));
    let err = store.list_tasks().await.expect_err("server is gone");

    assert!(matches!(err, StoreError::Fetch(RemoteFailure::Transport(_))));
}

#[tokio::test]
async fn controller_over_http_keeps_dates_and_rolls_back() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/todos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "title": "pay rent", "isCompleted": false,
             "dueDate": "2025-03-10T00:00:00.000Z"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/todos/1"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let controller = TaskListController::new(HttpTaskStore::new(server.uri()));
    controller.load().await.expect("load");

    let due = controller.tasks()[0].due_date.expect("due date");
    assert_eq!(format_due(due, "%d/%m/%Y"), "10/03/2025");

    let outcome = controller.toggle(TaskId(1)).await;
    assert!(matches!(outcome, MutationOutcome::RolledBack(_)));
    assert!(!controller.tasks()[0].is_completed);
    assert_eq!(controller.notices().len(), 1);
}
