use ticklist_core::HttpTaskStore;

/// Base URL of the task service, fixed
/// when the bundle is built.
pub const API_URL: &str =
  match option_env!("TICKLIST_API_URL") {
    | Some(url) => url,
    | None => "http://localhost:3000"
  };

pub fn task_store() -> HttpTaskStore {
  HttpTaskStore::new(API_URL)
}
