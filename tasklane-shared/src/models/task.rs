/// Task model
///
/// A task is a personal to-do item owned by exactly one user. Tasks are
/// created, read, updated and deleted by their owner; admins may read and
/// delete any task.
///
/// # Status lifecycle
///
/// ```text
/// pending ⇄ in_progress ⇄ completed ⇄ cancelled   (any → any)
/// ```
///
/// Any status may move to any other. `completed_at` is set when a task
/// enters `completed` and cleared when it leaves, so at all times
/// `status == completed` exactly when `completed_at` is present.
///
/// # Snapshot layout
///
/// ```json
/// {
///   "id": 3,
///   "user_id": 1,
///   "title": "Write report",
///   "description": null,
///   "status": "in_progress",
///   "priority": "high",
///   "due_date": "2024-02-01T00:00:00Z",
///   "estimated_hours": 2.5,
///   "tags": ["work"],
///   "created_at": "2024-01-31T08:00:00Z",
///   "updated_at": "2024-01-31T09:30:00Z",
///   "completed_at": null
/// }
/// ```

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single input field failed validation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct InvalidField {
    /// Field name as it appears in request payloads
    pub field: &'static str,

    /// Human-readable reason
    pub message: String,
}

impl InvalidField {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// A string did not name any variant of an enum
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Task progress state
///
/// Declaration order is the sort order used by listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started (initial state)
    Pending,

    /// Being worked on
    InProgress,

    /// Done; `completed_at` is set
    Completed,

    /// Abandoned
    Cancelled,
}

impl TaskStatus {
    /// Every status, in sort order
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "status",
                value: s.to_string(),
            })
    }
}

/// Task urgency
///
/// Declaration order is the sort order used by listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    /// Every priority, in sort order
    pub const ALL: [TaskPriority; 4] = [
        TaskPriority::Low,
        TaskPriority::Medium,
        TaskPriority::High,
        TaskPriority::Urgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
        }
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskPriority::ALL
            .into_iter()
            .find(|priority| priority.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "priority",
                value: s.to_string(),
            })
    }
}

/// Task record as stored in the snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task ID, allocated by the store
    pub id: i64,

    /// Owning user (back-reference, not an owning pointer)
    pub user_id: i64,

    /// Non-empty title
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub priority: TaskPriority,

    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,

    /// Positive number of hours when present
    #[serde(default)]
    pub estimated_hours: Option<f64>,

    /// Free-form labels, in the order given by the owner
    #[serde(default)]
    pub tags: Vec<String>,

    pub created_at: DateTime<Utc>,

    /// Never earlier than `created_at`; strictly increases on every update
    pub updated_at: DateTime<Utc>,

    /// Present exactly when `status` is `completed`
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Input for creating a task
///
/// The owner is not part of the input: the store takes it from the
/// authenticated principal.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,

    /// Defaults to `medium`
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_hours: Option<f64>,
    pub tags: Vec<String>,
}

impl NewTask {
    /// Creates input with only a title set
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Validates and normalizes the input into a pending task
    ///
    /// Title and description are trimmed, an empty description is dropped,
    /// tags are trimmed and empty tags removed.
    pub fn into_task(
        self,
        id: i64,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Task, InvalidField> {
        let title = normalize_title(&self.title)?;
        if let Some(hours) = self.estimated_hours {
            check_hours(hours)?;
        }

        Ok(Task {
            id,
            user_id,
            title,
            description: normalize_description(self.description),
            status: TaskStatus::Pending,
            priority: self.priority.unwrap_or_default(),
            due_date: self.due_date,
            estimated_hours: self.estimated_hours,
            tags: normalize_tags(self.tags),
            created_at: now,
            updated_at: now,
            completed_at: None,
        })
    }
}

/// Partial update of a task's mutable fields
///
/// Only the fields listed here can change; `id`, `user_id` and the
/// timestamps are owned by the store. For nullable fields the outer `Option`
/// means "change this field" and the inner one is the new value, so
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub estimated_hours: Option<Option<f64>>,
    pub tags: Option<Vec<String>>,
}

impl TaskPatch {
    /// Patch that only moves the task to `status`
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Checks every present field without touching any task
    pub fn validate(&self) -> Result<(), InvalidField> {
        if let Some(title) = &self.title {
            normalize_title(title)?;
        }
        if let Some(Some(hours)) = self.estimated_hours {
            check_hours(hours)?;
        }
        Ok(())
    }
}

impl Task {
    /// Applies `patch`, refreshing `updated_at` and maintaining `completed_at`
    ///
    /// The patch is validated up front, so on error the task is unchanged.
    /// `updated_at` always moves forward, by one microsecond if the clock
    /// has not advanced past the previous value.
    pub fn apply(&mut self, patch: TaskPatch, now: DateTime<Utc>) -> Result<(), InvalidField> {
        patch.validate()?;

        let stamp = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::microseconds(1)
        };

        if let Some(title) = patch.title {
            self.title = normalize_title(&title)?;
        }
        if let Some(description) = patch.description {
            self.description = normalize_description(description);
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(hours) = patch.estimated_hours {
            self.estimated_hours = hours;
        }
        if let Some(tags) = patch.tags {
            self.tags = normalize_tags(tags);
        }
        if let Some(status) = patch.status {
            if status == TaskStatus::Completed {
                // Re-completing keeps the original completion time
                if self.completed_at.is_none() {
                    self.completed_at = Some(stamp);
                }
            } else {
                self.completed_at = None;
            }
            self.status = status;
        }

        self.updated_at = stamp;
        Ok(())
    }

    /// Case-insensitive substring match over title, description and tags
    ///
    /// `needle` must already be lowercase.
    pub fn matches_text(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(needle))
            || self.tags.iter().any(|tag| tag.to_lowercase().contains(needle))
    }
}

/// Narrowing applied to a user's own task list
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,

    /// Free text; blank means no text filter
    pub search: Option<String>,
}

impl TaskFilter {
    /// Lowercased search needle, or `None` when there is nothing to match
    pub fn needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    pub fn matches(&self, task: &Task, needle: Option<&str>) -> bool {
        self.status.map_or(true, |s| task.status == s)
            && self.priority.map_or(true, |p| task.priority == p)
            && needle.map_or(true, |n| task.matches_text(n))
    }
}

/// Splits a comma-separated tag string
pub fn split_tags(raw: &str) -> Vec<String> {
    normalize_tags(raw.split(',').map(str::to_string).collect())
}

/// Trims tags and drops empty ones, keeping order
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Parses a due date given as RFC 3339 or as a bare `YYYY-MM-DD` date
///
/// A bare date means midnight UTC. An empty string means "no due date".
pub fn parse_due_date(raw: &str) -> Result<Option<DateTime<Utc>>, InvalidField> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(at.with_timezone(&Utc)));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Some(naive.and_utc()))
        .ok_or_else(|| {
            InvalidField::new("due_date", "Expected an RFC 3339 timestamp or YYYY-MM-DD")
        })
}

/// Parses an hour estimate given as text; empty means "no estimate"
pub fn parse_estimated_hours(raw: &str) -> Result<Option<f64>, InvalidField> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let hours: f64 = raw
        .parse()
        .map_err(|_| InvalidField::new("estimated_hours", "Must be a number"))?;
    check_hours(hours)?;
    Ok(Some(hours))
}

fn normalize_title(title: &str) -> Result<String, InvalidField> {
    let title = title.trim();
    if title.is_empty() {
        return Err(InvalidField::new("title", "Title must not be empty"));
    }
    Ok(title.to_string())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

fn check_hours(hours: f64) -> Result<(), InvalidField> {
    if !hours.is_finite() || hours <= 0.0 {
        return Err(InvalidField::new("estimated_hours", "Must be a positive number"));
    }
    Ok(())
}
