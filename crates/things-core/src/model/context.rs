use serde::{Deserialize, Serialize};

use super::id::Id;

/// A named, user-ordered grouping of tasks.
///
/// `task_ids` never holds duplicates; order is insertion order as adjusted
/// by explicit reorders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    pub id: Id,
    pub name: String,
    #[serde(rename = "taskIDs")]
    pub task_ids: Vec<Id>,
}

impl Context {
    pub fn new(id: Id, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            task_ids: Vec::new(),
        }
    }

    #[must_use]
    pub fn contains(&self, task_id: &Id) -> bool {
        self.task_ids.contains(task_id)
    }

    /// Position of `task_id` within the context, if present.
    #[must_use]
    pub fn position(&self, task_id: &Id) -> Option<usize> {
        self.task_ids.iter().position(|id| id == task_id)
    }
}
