/// Task endpoints for the authenticated user
///
/// Every handler is scoped to the caller's own tasks: a task that exists but
/// belongs to someone else answers exactly like a missing one (404).
///
/// # Endpoints
///
/// - `GET    /api/tasks?status&priority&search` - List own tasks
/// - `POST   /api/tasks` - Create a task
/// - `PUT    /api/tasks/:id` - Update a task
/// - `DELETE /api/tasks/:id` - Delete a task
///
/// # Input formats
///
/// - `tags`: a JSON list or a comma-separated string
/// - `estimated_hours`: a number or a numeric string, must be positive
/// - `due_date`: RFC 3339 or `YYYY-MM-DD`; an empty string means none
/// - On update, `null` clears `description`, `due_date`, `estimated_hours`
///   and `tags`; an absent field is left unchanged

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{DataResponse, MessageResponse},
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Deserializer};
use std::str::FromStr;
use tasklane_shared::{
    auth::context::AuthContext,
    models::task::{
        parse_due_date, parse_estimated_hours, split_tags, InvalidField, NewTask, Task,
        TaskFilter, TaskPatch, TaskPriority, TaskStatus, UnknownVariant,
    },
    query::parse_filter,
    store::StoreError,
};
use validator::Validate;

const MAX_DESCRIPTION_LENGTH: usize = 2000;

/// Tags as a list or as `"a, b, c"`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Text(String),
}

impl TagsInput {
    fn into_tags(self) -> Vec<String> {
        match self {
            TagsInput::List(tags) => tags,
            TagsInput::Text(raw) => split_tags(&raw),
        }
    }
}

/// Hour estimate as a number or as numeric text
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HoursInput {
    Number(f64),
    Text(String),
}

impl HoursInput {
    fn into_hours(self) -> Result<Option<f64>, InvalidField> {
        match self {
            // Range is checked by the model
            HoursInput::Number(hours) => Ok(Some(hours)),
            HoursInput::Text(raw) => parse_estimated_hours(&raw),
        }
    }
}

/// Distinguishes an explicit `null` from an absent field
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn parse_variant<T>(field: &'static str, raw: &str) -> Result<T, InvalidField>
where
    T: FromStr<Err = UnknownVariant>,
{
    raw.trim()
        .parse()
        .map_err(|err: UnknownVariant| InvalidField::new(field, err.to_string()))
}

fn check_description(description: Option<&str>) -> Result<(), InvalidField> {
    match description {
        Some(d) if d.chars().count() > MAX_DESCRIPTION_LENGTH => Err(InvalidField::new(
            "description",
            format!(
                "Description must be at most {} characters",
                MAX_DESCRIPTION_LENGTH
            ),
        )),
        _ => Ok(()),
    }
}

/// Query parameters for listing own tasks
#[derive(Debug, Default, Deserialize)]
pub struct TaskListParams {
    /// Status filter; `all` or empty for none
    pub status: Option<String>,

    /// Priority filter; `all` or empty for none
    pub priority: Option<String>,

    /// Case-insensitive text over title, description and tags
    pub search: Option<String>,
}

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[serde(default)]
    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    pub title: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    pub priority: Option<String>,
    pub due_date: Option<String>,
    pub estimated_hours: Option<HoursInput>,
    pub tags: Option<TagsInput>,
}

impl CreateTaskRequest {
    fn into_new_task(self) -> Result<NewTask, InvalidField> {
        let priority = match self.priority.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_variant::<TaskPriority>("priority", raw)?),
        };
        let due_date = match self.due_date.as_deref() {
            None => None,
            Some(raw) => parse_due_date(raw)?,
        };
        let estimated_hours = match self.estimated_hours {
            None => None,
            Some(hours) => hours.into_hours()?,
        };

        Ok(NewTask {
            title: self.title,
            description: self.description,
            priority,
            due_date,
            estimated_hours,
            tags: self.tags.map(TagsInput::into_tags).unwrap_or_default(),
        })
    }
}

/// Update task request; only present fields change
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,

    pub status: Option<String>,
    pub priority: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub due_date: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub estimated_hours: Option<Option<HoursInput>>,

    #[serde(default, deserialize_with = "nullable")]
    pub tags: Option<Option<TagsInput>>,
}

impl UpdateTaskRequest {
    fn into_patch(self) -> Result<TaskPatch, InvalidField> {
        if let Some(description) = &self.description {
            check_description(description.as_deref())?;
        }

        let status = self
            .status
            .as_deref()
            .map(|raw| parse_variant::<TaskStatus>("status", raw))
            .transpose()?;
        let priority = self
            .priority
            .as_deref()
            .map(|raw| parse_variant::<TaskPriority>("priority", raw))
            .transpose()?;
        let due_date = match self.due_date {
            None => None,
            Some(None) => Some(None),
            Some(Some(raw)) => Some(parse_due_date(&raw)?),
        };
        let estimated_hours = match self.estimated_hours {
            None => None,
            Some(None) => Some(None),
            Some(Some(hours)) => Some(hours.into_hours()?),
        };

        Ok(TaskPatch {
            title: self.title,
            description: self.description,
            status,
            priority,
            due_date,
            estimated_hours,
            tags: self
                .tags
                .map(|tags| tags.map(TagsInput::into_tags).unwrap_or_default()),
        })
    }
}

/// List the caller's tasks, newest first
///
/// # Errors
///
/// - `400 Bad Request`: Unknown status or priority filter
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    params: Result<Query<TaskListParams>, QueryRejection>,
) -> ApiResult<Json<DataResponse<Task>>> {
    let Query(params) = params?;

    let filter = TaskFilter {
        status: parse_filter(params.status.as_deref())?,
        priority: parse_filter(params.priority.as_deref())?,
        search: params.search,
    };

    let tasks = state.store.tasks_for_user(auth.user_id, &filter).await;
    Ok(Json(tasks.into()))
}

/// Create a task owned by the caller
///
/// # Endpoint
///
/// ```text
/// POST /api/tasks
/// Content-Type: application/json
///
/// {
///   "title": "Write report",
///   "priority": "high",
///   "due_date": "2024-03-01",
///   "estimated_hours": "2.5",
///   "tags": "work, writing"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing title or malformed field
/// - `404 Not Found`: The caller's account no longer exists
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let Json(req) = payload?;
    req.validate()?;

    let new_task = req.into_new_task()?;
    let task = state
        .store
        .create_task(auth.user_id, new_task)
        .await
        .map_err(|err| match err {
            StoreError::NotFound => ApiError::NotFound("User not found".to_string()),
            other => other.into(),
        })?;

    Ok((StatusCode::CREATED, Json(task)))
}

/// Update one of the caller's tasks
///
/// # Errors
///
/// - `400 Bad Request`: Malformed field (task unchanged)
/// - `404 Not Found`: No such task owned by the caller
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> ApiResult<Json<Task>> {
    let Path(task_id) = id?;
    let Json(req) = payload?;
    req.validate()?;

    let patch = req.into_patch()?;
    let task = state
        .store
        .update_task(task_id, auth.user_id, patch)
        .await
        .map_err(task_not_found)?;

    Ok(Json(task))
}

/// Delete one of the caller's tasks
///
/// # Errors
///
/// - `404 Not Found`: No such task owned by the caller
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Path(task_id) = id?;

    state
        .store
        .delete_task(task_id, auth.user_id)
        .await
        .map_err(task_not_found)?;

    Ok(Json(MessageResponse {
        message: "Task deleted successfully".to_string(),
    }))
}

fn task_not_found(err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound => ApiError::NotFound("Task not found".to_string()),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn update(value: serde_json::Value) -> UpdateTaskRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_tags_accept_list_or_text() {
        let req: CreateTaskRequest =
            serde_json::from_value(json!({ "title": "t", "tags": "a, ,b" })).unwrap();
        assert_eq!(req.into_new_task().unwrap().tags, vec!["a", "b"]);

        let req: CreateTaskRequest =
            serde_json::from_value(json!({ "title": "t", "tags": ["x", "y"] })).unwrap();
        assert_eq!(req.into_new_task().unwrap().tags, vec!["x", "y"]);
    }

    #[test]
    fn test_hours_accept_number_or_text() {
        let req: CreateTaskRequest =
            serde_json::from_value(json!({ "title": "t", "estimated_hours": "2.5" })).unwrap();
        assert_eq!(req.into_new_task().unwrap().estimated_hours, Some(2.5));

        let req: CreateTaskRequest =
            serde_json::from_value(json!({ "title": "t", "estimated_hours": 3 })).unwrap();
        assert_eq!(req.into_new_task().unwrap().estimated_hours, Some(3.0));

        let req: CreateTaskRequest =
            serde_json::from_value(json!({ "title": "t", "estimated_hours": "lots" })).unwrap();
        assert_eq!(req.into_new_task().unwrap_err().field, "estimated_hours");
    }

    #[test]
    fn test_unknown_priority_is_field_error() {
        let req: CreateTaskRequest =
            serde_json::from_value(json!({ "title": "t", "priority": "asap" })).unwrap();
        assert_eq!(req.into_new_task().unwrap_err().field, "priority");
    }

    #[test]
    fn test_blank_priority_defaults() {
        let req: CreateTaskRequest =
            serde_json::from_value(json!({ "title": "t", "priority": "" })).unwrap();
        assert_eq!(req.into_new_task().unwrap().priority, None);
    }

    #[test]
    fn test_update_null_clears_absent_keeps() {
        let patch = update(json!({ "description": null })).into_patch().unwrap();
        assert_eq!(patch.description, Some(None));
        assert_eq!(patch.due_date, None);

        let patch = update(json!({})).into_patch().unwrap();
        assert_eq!(patch, TaskPatch::default());
    }

    #[test]
    fn test_update_parses_status() {
        let patch = update(json!({ "status": "completed" })).into_patch().unwrap();
        assert_eq!(patch.status, Some(TaskStatus::Completed));

        let err = update(json!({ "status": "done" })).into_patch().unwrap_err();
        assert_eq!(err.field, "status");
    }

    #[test]
    fn test_update_null_tags_clears() {
        let patch = update(json!({ "tags": null })).into_patch().unwrap();
        assert_eq!(patch.tags, Some(vec![]));
    }

    #[test]
    fn test_update_description_too_long() {
        let err = update(json!({ "description": "x".repeat(2001) }))
            .into_patch()
            .unwrap_err();
        assert_eq!(err.field, "description");
    }
}
