/// Query and aggregation engine
///
/// Read-only views derived from a store [`Snapshot`](crate::store::backend::Snapshot).
/// Every function here is pure: the same snapshot and the same query always
/// produce the same output, with no clock reads and no randomness. Callers
/// get a consistent snapshot through [`Store::read`](crate::store::Store::read).
///
/// # Modules
///
/// - [`stats`]: system-wide statistics and per-user detail
/// - [`listing`]: admin task and user listings with filter, search and sort
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tasklane_shared::query::stats::system_stats;
/// use tasklane_shared::store::{backend::MemoryBackend, Store};
///
/// # async fn example() {
/// let store = Store::open(Arc::new(MemoryBackend::new())).await;
/// let stats = store.read(system_stats).await;
/// assert_eq!(stats.total_users, 0);
/// # }
/// ```

pub mod listing;
pub mod stats;

use std::str::FromStr;

use crate::models::task::{Task, TaskStatus, UnknownVariant};

/// Error type for malformed query parameters
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error("Unknown sort field: {0}")]
    UnknownSortField(String),

    #[error("Unknown sort order: {0} (expected asc or desc)")]
    UnknownSortOrder(String),

    #[error("Unknown {field} filter: {value}")]
    UnknownFilter { field: String, value: String },
}

/// Parses an optional enum filter where `all` or blank means "no filter"
///
/// # Example
///
/// ```
/// use tasklane_shared::models::task::TaskStatus;
/// use tasklane_shared::query::parse_filter;
///
/// assert_eq!(parse_filter::<TaskStatus>(Some("all")).unwrap(), None);
/// assert_eq!(
///     parse_filter::<TaskStatus>(Some("completed")).unwrap(),
///     Some(TaskStatus::Completed)
/// );
/// assert!(parse_filter::<TaskStatus>(Some("done")).is_err());
/// ```
pub fn parse_filter<T>(raw: Option<&str>) -> Result<Option<T>, QueryError>
where
    T: FromStr<Err = UnknownVariant>,
{
    match raw.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(value) => value.parse::<T>().map(Some).map_err(|err| {
            QueryError::UnknownFilter {
                field: err.kind.to_string(),
                value: err.value,
            }
        }),
    }
}

/// Per-status task tally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCounts {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub cancelled: usize,
}

impl TaskCounts {
    pub fn record(&mut self, task: &Task) {
        self.total += 1;
        match task.status {
            TaskStatus::Pending => self.pending += 1,
            TaskStatus::InProgress => self.in_progress += 1,
            TaskStatus::Completed => self.completed += 1,
            TaskStatus::Cancelled => self.cancelled += 1,
        }
    }

    /// Completed over total, or 0 when there are no tasks
    pub fn completion_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

impl<'a> FromIterator<&'a Task> for TaskCounts {
    fn from_iter<I: IntoIterator<Item = &'a Task>>(iter: I) -> Self {
        let mut counts = TaskCounts::default();
        for task in iter {
            counts.record(task);
        }
        counts
    }
}
