/// Record store
///
/// Authoritative in-memory state for users and tasks, mirrored to a durable
/// snapshot after every mutation. Lookups are linear scans; the dataset is
/// expected to be small.
///
/// # Ownership
///
/// Task mutations take both the task ID and the acting user's ID and only
/// touch a task when both match. A task owned by someone else is reported as
/// [`StoreError::NotFound`], exactly like a task that does not exist.
///
/// # Persistence
///
/// Every mutation holds the write lock while the snapshot is saved, so
/// mutations never interleave. A failed save is logged and remembered (see
/// [`Store::persistence_error`]) but does not fail the mutation: the memory
/// state is authoritative and the next successful save catches the file up.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tasklane_shared::models::task::{NewTask, TaskFilter};
/// use tasklane_shared::models::user::NewUser;
/// use tasklane_shared::store::{backend::MemoryBackend, Store};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Store::open(Arc::new(MemoryBackend::new())).await;
///
/// let user = store
///     .create_user(NewUser {
///         username: "alice".to_string(),
///         email: "alice@example.com".to_string(),
///         password_hash: "$argon2id$...".to_string(),
///     })
///     .await?;
///
/// store.create_task(user.id, NewTask::titled("Buy milk")).await?;
/// let tasks = store.tasks_for_user(user.id, &TaskFilter::default()).await;
/// assert_eq!(tasks.len(), 1);
/// # Ok(())
/// # }
/// ```

pub mod backend;

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::{
    task::{InvalidField, NewTask, Task, TaskFilter, TaskPatch},
    user::{NewUser, User},
};
use backend::{Snapshot, SnapshotBackend};

/// Error type for store operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// Record is absent, or belongs to someone other than the caller
    #[error("Record not found")]
    NotFound,

    /// Input failed validation
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// A unique field is already taken
    #[error("{0}")]
    Conflict(String),

    /// Snapshot could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<InvalidField> for StoreError {
    fn from(err: InvalidField) -> Self {
        StoreError::Validation {
            field: err.field.to_string(),
            message: err.message,
        }
    }
}

/// Result of removing a user together with their tasks
#[derive(Debug, Clone)]
pub struct CascadeDeletion {
    pub user: User,
    pub removed_tasks: usize,
}

#[derive(Debug)]
struct StoreState {
    snapshot: Snapshot,
    next_user_id: i64,
    next_task_id: i64,
    persist_error: Option<String>,
}

impl StoreState {
    fn new(snapshot: Snapshot) -> Self {
        // IDs start at 1; 0 is reserved for configured admin accounts
        let next_user_id = snapshot.users.iter().map(|u| u.id).max().unwrap_or(0).max(0) + 1;
        let next_task_id = snapshot.tasks.iter().map(|t| t.id).max().unwrap_or(0).max(0) + 1;

        Self {
            snapshot,
            next_user_id,
            next_task_id,
            persist_error: None,
        }
    }

    fn allocate_user_id(&mut self) -> i64 {
        let id = self.next_user_id;
        self.next_user_id += 1;
        id
    }

    fn allocate_task_id(&mut self) -> i64 {
        let id = self.next_task_id;
        self.next_task_id += 1;
        id
    }

    fn owned_task_index(&self, task_id: i64, user_id: i64) -> Option<usize> {
        self.snapshot
            .tasks
            .iter()
            .position(|t| t.id == task_id && t.user_id == user_id)
    }
}

/// Handle to the shared store
///
/// Cloning is cheap; all clones see the same state.
#[derive(Clone)]
pub struct Store {
    state: Arc<RwLock<StoreState>>,
    backend: Arc<dyn SnapshotBackend>,
}

impl Store {
    /// Loads the snapshot from `backend`, or starts empty
    ///
    /// A missing snapshot starts empty silently. An unreadable or corrupt
    /// snapshot is logged and also starts empty; it will be overwritten by
    /// the first mutation.
    pub async fn open(backend: Arc<dyn SnapshotBackend>) -> Self {
        let snapshot = match backend.load().await {
            Ok(Some(snapshot)) => {
                tracing::info!(
                    backend = %backend.describe(),
                    users = snapshot.users.len(),
                    tasks = snapshot.tasks.len(),
                    "Loaded snapshot"
                );
                snapshot
            }
            Ok(None) => {
                tracing::info!(backend = %backend.describe(), "No snapshot found, starting empty");
                Snapshot::default()
            }
            Err(err) => {
                tracing::warn!(
                    backend = %backend.describe(),
                    error = %err,
                    "Snapshot unusable, starting empty"
                );
                Snapshot::default()
            }
        };

        Self {
            state: Arc::new(RwLock::new(StoreState::new(snapshot))),
            backend,
        }
    }

    /// Describes the persistence backend, for logs and health output
    pub fn backend_description(&self) -> String {
        self.backend.describe()
    }

    /// Error from the most recent save, if it failed
    pub async fn persistence_error(&self) -> Option<String> {
        self.state.read().await.persist_error.clone()
    }

    /// Runs `f` against a consistent view of the whole state
    pub async fn read<R>(&self, f: impl FnOnce(&Snapshot) -> R) -> R {
        let state = self.state.read().await;
        f(&state.snapshot)
    }

    async fn persist(&self, state: &mut StoreState) {
        match self.backend.save(&state.snapshot).await {
            Ok(()) => {
                if state.persist_error.take().is_some() {
                    tracing::info!(
                        backend = %self.backend.describe(),
                        "Snapshot persistence recovered"
                    );
                }
                tracing::debug!(
                    users = state.snapshot.users.len(),
                    tasks = state.snapshot.tasks.len(),
                    "Snapshot persisted"
                );
            }
            Err(err) => {
                tracing::warn!(
                    backend = %self.backend.describe(),
                    error = %err,
                    "Failed to persist snapshot; keeping in-memory state"
                );
                state.persist_error = Some(err.to_string());
            }
        }
    }

    /// Creates a user with a fresh ID and registration time
    ///
    /// Uniqueness is checked under the write lock, so two concurrent
    /// registrations for the same email cannot both succeed.
    ///
    /// # Errors
    ///
    /// - `Validation` if username, email or password hash is blank
    /// - `Conflict` if the email (case-insensitive) or username is taken;
    ///   email is checked first
    pub async fn create_user(&self, data: NewUser) -> Result<User, StoreError> {
        for (field, value) in [
            ("username", &data.username),
            ("email", &data.email),
            ("password_hash", &data.password_hash),
        ] {
            if value.trim().is_empty() {
                return Err(InvalidField::new(field, "Required").into());
            }
        }

        let mut state = self.state.write().await;

        if state
            .snapshot
            .users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&data.email))
        {
            return Err(StoreError::Conflict("Email already registered".to_string()));
        }
        if state.snapshot.users.iter().any(|u| u.username == data.username) {
            return Err(StoreError::Conflict("Username already taken".to_string()));
        }

        let user = User {
            id: state.allocate_user_id(),
            username: data.username,
            email: data.email,
            password_hash: data.password_hash,
            created_at: Utc::now(),
        };
        state.snapshot.users.push(user.clone());
        self.persist(&mut state).await;

        tracing::info!(user_id = user.id, username = %user.username, "User created");
        Ok(user)
    }

    /// Finds a user by email (ASCII case-insensitive)
    pub async fn find_user_by_email(&self, email: &str) -> Option<User> {
        let state = self.state.read().await;
        state
            .snapshot
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
    }

    pub async fn find_user_by_username(&self, username: &str) -> Option<User> {
        let state = self.state.read().await;
        state
            .snapshot
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned()
    }

    pub async fn find_user_by_id(&self, id: i64) -> Option<User> {
        let state = self.state.read().await;
        state.snapshot.users.iter().find(|u| u.id == id).cloned()
    }

    /// Creates a pending task owned by `user_id`
    ///
    /// # Errors
    ///
    /// - `NotFound` if no user has `user_id`
    /// - `Validation` if the input is invalid
    pub async fn create_task(&self, user_id: i64, data: NewTask) -> Result<Task, StoreError> {
        let mut state = self.state.write().await;

        if !state.snapshot.users.iter().any(|u| u.id == user_id) {
            return Err(StoreError::NotFound);
        }

        // Validate before allocating so rejected input does not burn an ID
        let id = state.next_task_id;
        let task = data.into_task(id, user_id, Utc::now())?;
        state.allocate_task_id();

        state.snapshot.tasks.push(task.clone());
        self.persist(&mut state).await;

        tracing::debug!(task_id = task.id, user_id, "Task created");
        Ok(task)
    }

    /// Lists a user's tasks, newest first
    ///
    /// Tasks with equal `created_at` keep their store order.
    pub async fn tasks_for_user(&self, user_id: i64, filter: &TaskFilter) -> Vec<Task> {
        let needle = filter.needle();
        let state = self.state.read().await;

        let mut tasks: Vec<Task> = state
            .snapshot
            .tasks
            .iter()
            .filter(|t| t.user_id == user_id && filter.matches(t, needle.as_deref()))
            .cloned()
            .collect();

        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tasks
    }

    /// Applies `patch` to a task owned by `user_id`
    ///
    /// # Errors
    ///
    /// - `NotFound` unless a task matches both `task_id` and `user_id`
    /// - `Validation` if the patch is invalid (task unchanged)
    pub async fn update_task(
        &self,
        task_id: i64,
        user_id: i64,
        patch: TaskPatch,
    ) -> Result<Task, StoreError> {
        let mut state = self.state.write().await;

        let index = state
            .owned_task_index(task_id, user_id)
            .ok_or(StoreError::NotFound)?;

        let task = &mut state.snapshot.tasks[index];
        task.apply(patch, Utc::now())?;
        let updated = task.clone();

        self.persist(&mut state).await;

        tracing::debug!(task_id, user_id, status = %updated.status, "Task updated");
        Ok(updated)
    }

    /// Deletes a task owned by `user_id`
    ///
    /// # Errors
    ///
    /// `NotFound` unless a task matches both `task_id` and `user_id`.
    pub async fn delete_task(&self, task_id: i64, user_id: i64) -> Result<(), StoreError> {
        let mut state = self.state.write().await;

        let index = state
            .owned_task_index(task_id, user_id)
            .ok_or(StoreError::NotFound)?;
        state.snapshot.tasks.remove(index);

        self.persist(&mut state).await;

        tracing::debug!(task_id, user_id, "Task deleted");
        Ok(())
    }

    /// Deletes any task regardless of owner (admin path)
    pub async fn delete_task_any(&self, task_id: i64) -> Result<Task, StoreError> {
        let mut state = self.state.write().await;

        let index = state
            .snapshot
            .tasks
            .iter()
            .position(|t| t.id == task_id)
            .ok_or(StoreError::NotFound)?;
        let removed = state.snapshot.tasks.remove(index);

        self.persist(&mut state).await;

        tracing::info!(task_id, owner = removed.user_id, "Task deleted by admin");
        Ok(removed)
    }

    /// Removes a user and every task they own in one step
    ///
    /// Both removals happen under one write lock and are persisted with a
    /// single save, so no reader observes the user without their tasks or
    /// the reverse.
    pub async fn delete_user_cascade(&self, user_id: i64) -> Result<CascadeDeletion, StoreError> {
        let mut state = self.state.write().await;

        let index = state
            .snapshot
            .users
            .iter()
            .position(|u| u.id == user_id)
            .ok_or(StoreError::NotFound)?;

        let before = state.snapshot.tasks.len();
        state.snapshot.tasks.retain(|t| t.user_id != user_id);
        let removed_tasks = before - state.snapshot.tasks.len();
        let user = state.snapshot.users.remove(index);

        self.persist(&mut state).await;

        tracing::info!(user_id, removed_tasks, "User deleted with tasks");
        Ok(CascadeDeletion {
            user,
            removed_tasks,
        })
    }
}
