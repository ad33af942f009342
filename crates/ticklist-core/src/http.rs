use async_trait::async_trait;
use reqwest::{Client, Method, header};
use serde::de::DeserializeOwned;
use ticklist_shared::{NewTask, Task, TaskId, TaskPatch};
use tracing::{debug, instrument, warn};

use crate::store::{RemoteFailure, StoreError, TaskStore};

const TODOS_PATH: &str = "todos";

/// `TaskStore` over the `/todos` REST resource.
#[derive(Debug, Clone)]
pub struct HttpTaskStore {
    client: Client,
    base_url: String,
}

impl HttpTaskStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> String {
        format!("{}/{TODOS_PATH}", self.base_url)
    }

    fn item_url(&self, id: TaskId) -> String {
        format!("{}/{TODOS_PATH}/{id}", self.base_url)
    }

    async fn round_trip(
        &self,
        method: Method,
        url: String,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, RemoteFailure> {
        let mut request = self.client.request(method.clone(), &url);
        if let Some(body) = body {
            request = request
                .header(header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|err| RemoteFailure::Transport(err.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| RemoteFailure::Transport(err.to_string()))?;

        debug!(%method, %url, status = status.as_u16(), body_len = bytes.len(), "task service responded");

        if !status.is_success() {
            return Err(RemoteFailure::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).trim().to_string(),
            });
        }

        Ok(bytes.to_vec())
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, RemoteFailure> {
    serde_json::to_vec(value).map_err(|err| RemoteFailure::Decode(err.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, RemoteFailure> {
    serde_json::from_slice(bytes).map_err(|err| RemoteFailure::Decode(err.to_string()))
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}

#[async_trait(?Send)]
impl TaskStore for HttpTaskStore {
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let bytes = self
            .round_trip(Method::GET, self.collection_url(), None)
            .await
            .map_err(StoreError::Fetch)?;
        let tasks: Vec<Task> = decode(&bytes).map_err(StoreError::Fetch)?;
        debug!(count = tasks.len(), "decoded task list");
        Ok(tasks)
    }

    #[instrument(skip(self, new_task), fields(base_url = %self.base_url, title_len = new_task.title.len(), has_due = new_task.due_date.is_some()))]
    async fn create_task(&self, new_task: NewTask) -> Result<Task, StoreError> {
        let body = encode(&new_task).map_err(StoreError::Create)?;
        let bytes = self
            .round_trip(Method::POST, self.collection_url(), Some(body))
            .await
            .map_err(StoreError::Create)?;
        let task: Task = decode(&bytes).map_err(StoreError::Create)?;
        debug!(task_id = %task.id, "task created");
        Ok(task)
    }

    #[instrument(skip(self), fields(base_url = %self.base_url, task_id = %id))]
    async fn update_task(
        &self,
        id: TaskId,
        patch: TaskPatch,
    ) -> Result<Option<Task>, StoreError> {
        let to_update_error = |failure| StoreError::Update { id, failure };
        let body = encode(&patch).map_err(to_update_error)?;
        let bytes = self
            .round_trip(Method::PUT, self.item_url(id), Some(body))
            .await
            .map_err(to_update_error)?;

        if is_blank(&bytes) {
            return Ok(None);
        }

        // Some backends answer with a write summary instead of the record.
        match decode::<Task>(&bytes) {
            Ok(task) => Ok(Some(task)),
            Err(err) => {
                warn!(error = %err, "update succeeded but body is not a task; ignoring it");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self), fields(base_url = %self.base_url, task_id = %id))]
    async fn delete_task(&self, id: TaskId) -> Result<(), StoreError> {
        self.round_trip(Method::DELETE, self.item_url(id), None)
            .await
            .map_err(|failure| StoreError::Delete { id, failure })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::HttpTaskStore;
    use ticklist_shared::TaskId;

    #[test]
    fn urls_ignore_trailing_slash() {
        let store = HttpTaskStore::new("http://localhost:3000/");
        assert_eq!(store.base_url(), "http://localhost:3000");
        assert_eq!(store.collection_url(), "http://localhost:3000/todos");
        assert_eq!(store.item_url(TaskId(12)), "http://localhost:3000/todos/12");
    }
}
