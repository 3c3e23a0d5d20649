//! Error types for the task catalog

use crate::model::TaskId;

/// Catalog errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// No task with this name
    #[error("task not found: {name}")]
    TaskNotFound {
        /// Requested name
        name: String,
    },

    /// Stale or foreign task id
    #[error("unknown task id: {0}")]
    UnknownTask(TaskId),

    /// The same task name appears twice in one payload
    #[error("duplicate task name in payload: {0}")]
    DuplicateName(String),

    /// A task declared no compatible versions
    #[error("task {task} declares no compatible versions")]
    EmptyVersionList {
        /// Task name
        task: String,
    },

    /// Unrecognized version string
    #[error("unknown target version: {0}")]
    UnknownVersion(String),

    /// Payload is not valid interchange YAML
    #[error("invalid task payload: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CatalogError {
    /// Create a task-not-found error
    #[inline]
    pub fn task_not_found(name: impl Into<String>) -> Self {
        Self::TaskNotFound { name: name.into() }
    }

    /// Whether the caller supplied bad input
    #[inline]
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::UnknownTask(_))
    }
}
