/// Domain records held by the store
///
/// # Models
///
/// - `user`: registered accounts and their credential-stripped public view
/// - `task`: to-do items, their enums, creation input and update patch
///
/// Both records serialize to the flat key/value layout used by the durable
/// snapshot, so the same types are read from and written to disk.
///
/// # Example
///
/// ```
/// use tasklane_shared::models::task::{TaskPriority, TaskStatus};
///
/// assert_eq!(TaskStatus::InProgress.as_str(), "in_progress");
/// assert_eq!("urgent".parse::<TaskPriority>().unwrap(), TaskPriority::Urgent);
/// ```

pub mod task;
pub mod user;
