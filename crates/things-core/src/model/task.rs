use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::Id;

/// A single to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Id,
    pub name: String,
    pub checked: bool,
    pub due_date: Option<DateTime<Utc>>,
}

impl Task {
    /// A freshly created task: unchecked, no due date.
    pub fn new(id: Id, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            checked: false,
            due_date: None,
        }
    }

    /// Whether the due date lies strictly before `now`.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.checked && self.due_date.is_some_and(|due| due < now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn new_task_defaults() {
        let task = Task::new(Id::new("t1"), "Buy milk");
        assert_eq!(task.name, "Buy milk");
        assert!(!task.checked);
        assert!(task.due_date.is_none());
    }

    #[test]
    fn overdue_requires_unchecked_past_due_date() {
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap();
        let mut task = Task::new(Id::new("t1"), "File taxes");
        assert!(!task.is_overdue(now));

        task.due_date = Some(Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap());
        assert!(task.is_overdue(now));

        task.checked = true;
        assert!(!task.is_overdue(now));
    }
}
