/// Admin endpoints
///
/// Mounted behind the JWT layer and the admin gate, so every handler here
/// can assume an admin [`AuthContext`].
///
/// # Endpoints
///
/// - `GET    /api/admin/stats` - System-wide statistics
/// - `GET    /api/admin/users?search&sort&order` - All users with task counts
/// - `GET    /api/admin/users/:user_id` - One user with statistics
/// - `DELETE /api/admin/users/:user_id` - Delete a user and their tasks
/// - `GET    /api/admin/tasks?userId&status&priority&search&sort&order` - All tasks
/// - `DELETE /api/admin/tasks/:task_id` - Delete any task

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::DataResponse,
};
use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tasklane_shared::{
    auth::{authorization::forbid_self_deletion, context::AuthContext},
    query::{
        listing::{self, AdminTaskView, TaskListQuery, UserListQuery, UserSummary},
        parse_filter,
        stats::{self, SystemStats, UserDetail},
        QueryError,
    },
    store::StoreError,
};

/// Query parameters for the user listing
#[derive(Debug, Default, Deserialize)]
pub struct UserListParams {
    /// Case-insensitive text over username and email
    pub search: Option<String>,

    /// Sort field, default `created_at`
    pub sort: Option<String>,

    /// `asc` or `desc`, default `desc`
    pub order: Option<String>,
}

/// Query parameters for the task listing
#[derive(Debug, Default, Deserialize)]
pub struct TaskListParams {
    /// Owner filter; `all` or empty for none
    #[serde(alias = "userId")]
    pub user_id: Option<String>,

    pub status: Option<String>,
    pub priority: Option<String>,

    /// Case-insensitive text over title, description and owner username
    pub search: Option<String>,

    pub sort: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeletedUser {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// Response for a cascading user deletion
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUserResponse {
    pub message: String,
    pub deleted_user: DeletedUser,

    /// Number of tasks removed with the user
    pub deleted_tasks: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeletedTask {
    pub id: i64,
    pub title: String,
    pub user_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTaskResponse {
    pub message: String,
    pub deleted_task: DeletedTask,
}

/// Parses an optional query value, falling back to the default when blank
fn parse_or_default<T>(raw: Option<&str>) -> Result<T, QueryError>
where
    T: FromStr<Err = QueryError> + Default,
{
    match raw.map(str::trim) {
        None | Some("") => Ok(T::default()),
        Some(value) => value.parse(),
    }
}

fn parse_owner(raw: Option<&str>) -> Result<Option<i64>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ApiError::invalid_field("userId", "Must be a user id")),
    }
}

fn non_blank(search: Option<String>) -> Option<String> {
    search.filter(|s| !s.trim().is_empty())
}

/// System-wide statistics
pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<SystemStats>> {
    Ok(Json(state.store.read(stats::system_stats).await))
}

/// List every user with task counts and last activity
///
/// # Errors
///
/// - `400 Bad Request`: Unknown sort field or order
pub async fn list_users(
    State(state): State<AppState>,
    params: Result<Query<UserListParams>, QueryRejection>,
) -> ApiResult<Json<DataResponse<UserSummary>>> {
    let Query(params) = params?;

    let query = UserListQuery {
        search: non_blank(params.search),
        sort: parse_or_default(params.sort.as_deref())?,
        order: parse_or_default(params.order.as_deref())?,
    };

    let users = state.store.read(|snapshot| listing::list_users(snapshot, &query)).await;
    Ok(Json(users.into()))
}

/// One user with statistics and their most recent tasks
///
/// # Errors
///
/// - `404 Not Found`: No such user
pub async fn get_user(
    State(state): State<AppState>,
    user_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<UserDetail>> {
    let Path(user_id) = user_id?;

    state
        .store
        .read(|snapshot| stats::user_detail(snapshot, user_id))
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

/// Delete a user together with every task they own
///
/// # Errors
///
/// - `403 Forbidden`: The target is the calling admin
/// - `404 Not Found`: No such user
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    user_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<DeleteUserResponse>> {
    let Path(user_id) = user_id?;
    forbid_self_deletion(&auth, user_id)?;

    let deletion = state
        .store
        .delete_user_cascade(user_id)
        .await
        .map_err(|err| match err {
            StoreError::NotFound => ApiError::NotFound("User not found".to_string()),
            other => other.into(),
        })?;

    tracing::info!(
        admin = %auth.username,
        user_id,
        deleted_tasks = deletion.removed_tasks,
        "Admin deleted user"
    );

    Ok(Json(DeleteUserResponse {
        message: format!(
            "User {} and {} associated task(s) deleted successfully",
            deletion.user.username, deletion.removed_tasks
        ),
        deleted_user: DeletedUser {
            id: deletion.user.id,
            username: deletion.user.username,
            email: deletion.user.email,
        },
        deleted_tasks: deletion.removed_tasks,
    }))
}

/// List every task with its owner's name and email
///
/// # Errors
///
/// - `400 Bad Request`: Unknown filter value, sort field or order
pub async fn list_tasks(
    State(state): State<AppState>,
    params: Result<Query<TaskListParams>, QueryRejection>,
) -> ApiResult<Json<DataResponse<AdminTaskView>>> {
    let Query(params) = params?;

    let query = TaskListQuery {
        user_id: parse_owner(params.user_id.as_deref())?,
        status: parse_filter(params.status.as_deref())?,
        priority: parse_filter(params.priority.as_deref())?,
        search: non_blank(params.search),
        sort: parse_or_default(params.sort.as_deref())?,
        order: parse_or_default(params.order.as_deref())?,
    };

    let tasks = state.store.read(|snapshot| listing::list_tasks(snapshot, &query)).await;
    Ok(Json(tasks.into()))
}

/// Delete any task regardless of owner
///
/// # Errors
///
/// - `404 Not Found`: No such task
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    task_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<DeleteTaskResponse>> {
    let Path(task_id) = task_id?;

    let task = state
        .store
        .delete_task_any(task_id)
        .await
        .map_err(|err| match err {
            StoreError::NotFound => ApiError::NotFound("Task not found".to_string()),
            other => other.into(),
        })?;

    tracing::info!(admin = %auth.username, task_id, owner = task.user_id, "Admin deleted task");

    Ok(Json(DeleteTaskResponse {
        message: "Task deleted successfully".to_string(),
        deleted_task: DeletedTask {
            id: task.id,
            title: task.title,
            user_id: task.user_id,
        },
    }))
}
