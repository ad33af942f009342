use async_trait::async_trait;
use thiserror::Error;
use ticklist_shared::{NewTask, Task, TaskId, TaskPatch};

/// Why a single round trip to the task service did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteFailure {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("server responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl RemoteFailure {
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteFailure::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Remote call failures, tagged with the operation that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("could not load tasks: {0}")]
    Fetch(#[source] RemoteFailure),

    #[error("could not create task: {0}")]
    Create(#[source] RemoteFailure),

    #[error("could not update task {id}: {failure}")]
    Update {
        id: TaskId,
        #[source]
        failure: RemoteFailure,
    },

    #[error("could not delete task {id}: {failure}")]
    Delete {
        id: TaskId,
        #[source]
        failure: RemoteFailure,
    },
}

impl StoreError {
    pub fn failure(&self) -> &RemoteFailure {
        match self {
            StoreError::Fetch(failure) | StoreError::Create(failure) => failure,
            StoreError::Update { failure, .. } | StoreError::Delete { failure, .. } => failure,
        }
    }
}

/// CRUD surface of the task service.
///
/// Every call is one round trip: no caching, retry or batching. Futures are
/// not required to be `Send` so implementations can sit on the browser event
/// loop.
#[async_trait(?Send)]
pub trait TaskStore {
    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError>;

    async fn create_task(&self, new_task: NewTask) -> Result<Task, StoreError>;

    /// Sends only the fields set in `patch`. Servers may answer with the
    /// updated record or an empty body.
    async fn update_task(&self, id: TaskId, patch: TaskPatch)
    -> Result<Option<Task>, StoreError>;

    async fn delete_task(&self, id: TaskId) -> Result<(), StoreError>;
}

#[async_trait(?Send)]
impl<S> TaskStore for std::rc::Rc<S>
where
    S: TaskStore + ?Sized,
{
    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        (**self).list_tasks().await
    }

    async fn create_task(&self, new_task: NewTask) -> Result<Task, StoreError> {
        (**self).create_task(new_task).await
    }

    async fn update_task(
        &self,
        id: TaskId,
        patch: TaskPatch,
    ) -> Result<Option<Task>, StoreError> {
        (**self).update_task(id, patch).await
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), StoreError> {
        (**self).delete_task(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::{RemoteFailure, StoreError};
    use ticklist_shared::TaskId;

    #[test]
    fn messages_name_the_failed_operation() {
        let err = StoreError::Delete {
            id: TaskId(4),
            failure: RemoteFailure::Status {
                status: 404,
                body: "Not Found".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "could not delete task 4: server responded with status 404: Not Found"
        );
        assert_eq!(err.failure().status(), Some(404));

        let fetch = StoreError::Fetch(RemoteFailure::Transport("connection refused".into()));
        assert_eq!(
            fetch.to_string(),
            "could not load tasks: request failed: connection refused"
        );
        assert_eq!(fetch.failure().status(), None);
    }
}
