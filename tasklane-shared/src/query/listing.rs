/// Admin listings over every user's data
///
/// Both listings filter first, then sort with a stable sort so records
/// with equal keys keep their store order in either direction. Optional
/// fields sort with `None` first when ascending and last when descending.
/// Enum fields sort by declaration order (`pending` < `in_progress` <
/// `completed` < `cancelled`, `low` < ... < `urgent`), not alphabetically.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

use super::{stats::counts_by_user, QueryError, TaskCounts};
use crate::models::{
    task::{Task, TaskPriority, TaskStatus},
    user::{PublicUser, User},
};
use crate::store::backend::Snapshot;

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(QueryError::UnknownSortOrder(other.to_string())),
        }
    }
}

/// Fields the admin task listing can sort by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskSortField {
    Id,
    UserId,
    Title,
    Description,
    Status,
    Priority,
    DueDate,
    EstimatedHours,
    #[default]
    CreatedAt,
    UpdatedAt,
    CompletedAt,
    Username,
    UserEmail,
}

impl FromStr for TaskSortField {
    type Err = QueryError;

    /// Accepts snake_case names and their camelCase spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let field = match s.trim() {
            "id" => TaskSortField::Id,
            "user_id" | "userId" => TaskSortField::UserId,
            "title" => TaskSortField::Title,
            "description" => TaskSortField::Description,
            "status" => TaskSortField::Status,
            "priority" => TaskSortField::Priority,
            "due_date" | "dueDate" => TaskSortField::DueDate,
            "estimated_hours" | "estimatedHours" => TaskSortField::EstimatedHours,
            "created_at" | "createdAt" => TaskSortField::CreatedAt,
            "updated_at" | "updatedAt" => TaskSortField::UpdatedAt,
            "completed_at" | "completedAt" => TaskSortField::CompletedAt,
            "username" => TaskSortField::Username,
            "user_email" | "userEmail" => TaskSortField::UserEmail,
            other => return Err(QueryError::UnknownSortField(other.to_string())),
        };
        Ok(field)
    }
}

/// Fields the admin user listing can sort by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UserSortField {
    Id,
    Username,
    Email,
    #[default]
    CreatedAt,
    TaskCount,
    CompletedTasks,
    LastActive,
}

impl FromStr for UserSortField {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let field = match s.trim() {
            "id" => UserSortField::Id,
            "username" => UserSortField::Username,
            "email" => UserSortField::Email,
            "created_at" | "createdAt" => UserSortField::CreatedAt,
            "task_count" | "taskCount" => UserSortField::TaskCount,
            "completed_tasks" | "completedTasks" => UserSortField::CompletedTasks,
            "last_active" | "lastActive" => UserSortField::LastActive,
            other => return Err(QueryError::UnknownSortField(other.to_string())),
        };
        Ok(field)
    }
}

/// Parameters for [`list_tasks`]
#[derive(Debug, Clone, Default)]
pub struct TaskListQuery {
    pub user_id: Option<i64>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,

    /// Matches title, description or owner username
    pub search: Option<String>,

    pub sort: TaskSortField,
    pub order: SortOrder,
}

/// Parameters for [`list_users`]
#[derive(Debug, Clone, Default)]
pub struct UserListQuery {
    /// Matches username or email
    pub search: Option<String>,

    pub sort: UserSortField,
    pub order: SortOrder,
}

/// Task enriched with its owner's identity
///
/// `username` and `user_email` are `None` if the owner no longer exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminTaskView {
    #[serde(flatten)]
    pub task: Task,

    pub username: Option<String>,
    pub user_email: Option<String>,
}

/// User enriched with task activity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSummary {
    #[serde(flatten)]
    pub user: PublicUser,

    pub task_count: usize,
    pub completed_tasks: usize,

    /// Latest `updated_at` across the user's tasks, else registration time
    pub last_active: DateTime<Utc>,
}

fn needle(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Orders `None` before any `Some`
fn cmp_option<T>(a: Option<T>, b: Option<T>, cmp: impl Fn(&T, &T) -> Ordering) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => cmp(&a, &b),
    }
}

fn compare_tasks(a: &AdminTaskView, b: &AdminTaskView, field: TaskSortField) -> Ordering {
    match field {
        TaskSortField::Id => a.task.id.cmp(&b.task.id),
        TaskSortField::UserId => a.task.user_id.cmp(&b.task.user_id),
        TaskSortField::Title => a.task.title.cmp(&b.task.title),
        TaskSortField::Description => cmp_option(
            a.task.description.as_deref(),
            b.task.description.as_deref(),
            Ord::cmp,
        ),
        TaskSortField::Status => a.task.status.cmp(&b.task.status),
        TaskSortField::Priority => a.task.priority.cmp(&b.task.priority),
        TaskSortField::DueDate => cmp_option(a.task.due_date, b.task.due_date, Ord::cmp),
        TaskSortField::EstimatedHours => cmp_option(
            a.task.estimated_hours,
            b.task.estimated_hours,
            f64::total_cmp,
        ),
        TaskSortField::CreatedAt => a.task.created_at.cmp(&b.task.created_at),
        TaskSortField::UpdatedAt => a.task.updated_at.cmp(&b.task.updated_at),
        TaskSortField::CompletedAt => {
            cmp_option(a.task.completed_at, b.task.completed_at, Ord::cmp)
        }
        TaskSortField::Username => {
            cmp_option(a.username.as_deref(), b.username.as_deref(), Ord::cmp)
        }
        TaskSortField::UserEmail => {
            cmp_option(a.user_email.as_deref(), b.user_email.as_deref(), Ord::cmp)
        }
    }
}

fn compare_users(a: &UserSummary, b: &UserSummary, field: UserSortField) -> Ordering {
    match field {
        UserSortField::Id => a.user.id.cmp(&b.user.id),
        UserSortField::Username => a.user.username.cmp(&b.user.username),
        UserSortField::Email => a.user.email.cmp(&b.user.email),
        UserSortField::CreatedAt => a.user.created_at.cmp(&b.user.created_at),
        UserSortField::TaskCount => a.task_count.cmp(&b.task_count),
        UserSortField::CompletedTasks => a.completed_tasks.cmp(&b.completed_tasks),
        UserSortField::LastActive => a.last_active.cmp(&b.last_active),
    }
}

/// Applies `order` on top of an ascending comparison
///
/// Descending flips the comparison instead of reversing the sorted vector,
/// so ties keep store order both ways.
fn directed(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

/// Lists every task with its owner, filtered and sorted
pub fn list_tasks(snapshot: &Snapshot, query: &TaskListQuery) -> Vec<AdminTaskView> {
    let owners: HashMap<i64, &User> = snapshot.users.iter().map(|u| (u.id, u)).collect();
    let needle = needle(query.search.as_deref());

    let mut views: Vec<AdminTaskView> = snapshot
        .tasks
        .iter()
        .filter(|t| query.user_id.map_or(true, |id| t.user_id == id))
        .filter(|t| query.status.map_or(true, |s| t.status == s))
        .filter(|t| query.priority.map_or(true, |p| t.priority == p))
        .map(|t| {
            let owner = owners.get(&t.user_id);
            AdminTaskView {
                task: t.clone(),
                username: owner.map(|u| u.username.clone()),
                user_email: owner.map(|u| u.email.clone()),
            }
        })
        .filter(|view| {
            needle.as_deref().map_or(true, |n| {
                contains(&view.task.title, n)
                    || view.task.description.as_deref().is_some_and(|d| contains(d, n))
                    || view.username.as_deref().is_some_and(|u| contains(u, n))
            })
        })
        .collect();

    views.sort_by(|a, b| directed(compare_tasks(a, b, query.sort), query.order));
    views
}

/// Lists every user with task activity, filtered and sorted
pub fn list_users(snapshot: &Snapshot, query: &UserListQuery) -> Vec<UserSummary> {
    let per_user = counts_by_user(&snapshot.tasks);
    let mut last_update: HashMap<i64, DateTime<Utc>> = HashMap::new();
    for task in &snapshot.tasks {
        last_update
            .entry(task.user_id)
            .and_modify(|latest| *latest = (*latest).max(task.updated_at))
            .or_insert(task.updated_at);
    }
    let needle = needle(query.search.as_deref());

    let mut summaries: Vec<UserSummary> = snapshot
        .users
        .iter()
        .filter(|u| {
            needle
                .as_deref()
                .map_or(true, |n| contains(&u.username, n) || contains(&u.email, n))
        })
        .map(|u| {
            let counts: TaskCounts = per_user.get(&u.id).copied().unwrap_or_default();
            UserSummary {
                user: PublicUser::from(u),
                task_count: counts.total,
                completed_tasks: counts.completed,
                last_active: last_update.get(&u.id).copied().unwrap_or(u.created_at),
            }
        })
        .collect();

    summaries.sort_by(|a, b| directed(compare_users(a, b, query.sort), query.order));
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{NewTask, TaskPatch};
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    fn user(id: i64, name: &str, created_hour: u32) -> User {
        User {
            id,
            username: name.to_string(),
            email: format!("{}@example.com", name),
            password_hash: "hash".to_string(),
            created_at: at(created_hour),
        }
    }

    fn task(id: i64, user_id: i64, title: &str, created_hour: u32) -> Task {
        NewTask::titled(title)
            .into_task(id, user_id, at(created_hour))
            .unwrap()
    }

    fn sample() -> Snapshot {
        let mut hours = task(3, 2, "Garden", 3);
        hours.estimated_hours = Some(2.5);
        let mut done = task(2, 1, "Report", 2);
        done.apply(TaskPatch::status(TaskStatus::Completed), at(8))
            .unwrap();

        Snapshot {
            users: vec![user(1, "alice", 0), user(2, "bob", 1), user(3, "carol", 2)],
            tasks: vec![task(1, 1, "Groceries", 1), done, hours],
        }
    }

    fn ids(views: &[AdminTaskView]) -> Vec<i64> {
        views.iter().map(|v| v.task.id).collect()
    }

    #[test]
    fn test_sort_order_parse() {
        assert_eq!("ASC".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert_eq!("desc".parse::<SortOrder>().unwrap(), SortOrder::Desc);
        assert!(matches!(
            "up".parse::<SortOrder>(),
            Err(QueryError::UnknownSortOrder(_))
        ));
    }

    #[test]
    fn test_sort_field_parse() {
        assert_eq!("dueDate".parse::<TaskSortField>().unwrap(), TaskSortField::DueDate);
        assert_eq!("user_email".parse::<TaskSortField>().unwrap(), TaskSortField::UserEmail);
        assert_eq!("last_active".parse::<UserSortField>().unwrap(), UserSortField::LastActive);
        assert_eq!(
            "password_hash".parse::<UserSortField>().unwrap_err(),
            QueryError::UnknownSortField("password_hash".to_string())
        );
    }

    #[test]
    fn test_list_tasks_default_newest_first() {
        let views = list_tasks(&sample(), &TaskListQuery::default());

        assert_eq!(ids(&views), vec![3, 2, 1]);
        assert_eq!(views[0].username.as_deref(), Some("bob"));
        assert_eq!(views[0].user_email.as_deref(), Some("bob@example.com"));
    }

    #[test]
    fn test_list_tasks_ascending_is_reverse_of_descending() {
        let snapshot = sample();
        let asc = list_tasks(
            &snapshot,
            &TaskListQuery {
                order: SortOrder::Asc,
                ..Default::default()
            },
        );
        assert_eq!(ids(&asc), vec![1, 2, 3]);
    }

    #[test]
    fn test_list_tasks_sort_by_title() {
        let views = list_tasks(
            &sample(),
            &TaskListQuery {
                sort: TaskSortField::Title,
                order: SortOrder::Asc,
                ..Default::default()
            },
        );
        assert_eq!(ids(&views), vec![3, 1, 2]);
    }

    #[test]
    fn test_list_tasks_optional_fields_none_first_ascending() {
        let snapshot = sample();
        let query = |order| TaskListQuery {
            sort: TaskSortField::EstimatedHours,
            order,
            ..Default::default()
        };

        let asc = list_tasks(&snapshot, &query(SortOrder::Asc));
        assert_eq!(asc.last().unwrap().task.id, 3);

        let desc = list_tasks(&snapshot, &query(SortOrder::Desc));
        assert_eq!(desc[0].task.id, 3);
        // Ties keep store order in both directions
        assert_eq!(ids(&asc)[..2], [1, 2]);
        assert_eq!(ids(&desc)[1..], [1, 2]);
    }

    #[test]
    fn test_list_tasks_status_sorts_by_lifecycle() {
        let views = list_tasks(
            &sample(),
            &TaskListQuery {
                sort: TaskSortField::Status,
                order: SortOrder::Desc,
                ..Default::default()
            },
        );
        assert_eq!(views[0].task.status, TaskStatus::Completed);
    }

    #[test]
    fn test_list_tasks_filters() {
        let snapshot = sample();

        let by_user = list_tasks(
            &snapshot,
            &TaskListQuery {
                user_id: Some(1),
                ..Default::default()
            },
        );
        assert_eq!(ids(&by_user), vec![2, 1]);

        let by_status = list_tasks(
            &snapshot,
            &TaskListQuery {
                status: Some(TaskStatus::Completed),
                ..Default::default()
            },
        );
        assert_eq!(ids(&by_status), vec![2]);

        let by_priority = list_tasks(
            &snapshot,
            &TaskListQuery {
                priority: Some(TaskPriority::Urgent),
                ..Default::default()
            },
        );
        assert!(by_priority.is_empty());
    }

    #[test]
    fn test_list_tasks_search_matches_owner_username() {
        let snapshot = sample();
        let search = |s: &str| {
            list_tasks(
                &snapshot,
                &TaskListQuery {
                    search: Some(s.to_string()),
                    ..Default::default()
                },
            )
        };

        assert_eq!(ids(&search("BOB")), vec![3]);
        assert_eq!(ids(&search("report")), vec![2]);
        assert_eq!(ids(&search("   ")).len(), 3);
    }

    #[test]
    fn test_list_tasks_orphan_has_no_owner() {
        let mut snapshot = sample();
        snapshot.users.retain(|u| u.id != 2);

        let views = list_tasks(&snapshot, &TaskListQuery::default());
        assert!(views[0].username.is_none());

        let json = serde_json::to_value(&views[0]).unwrap();
        assert!(json["username"].is_null());
        assert_eq!(json["title"], "Garden");
    }

    #[test]
    fn test_list_users_enrichment() {
        let users = list_users(&sample(), &UserListQuery::default());

        // Newest registration first
        assert_eq!(users[0].user.username, "carol");
        let alice = users.iter().find(|u| u.user.id == 1).unwrap();
        assert_eq!(alice.task_count, 2);
        assert_eq!(alice.completed_tasks, 1);
        assert_eq!(alice.last_active, at(8));

        let carol = &users[0];
        assert_eq!(carol.task_count, 0);
        assert_eq!(carol.last_active, carol.user.created_at);
    }

    #[test]
    fn test_list_users_search_and_sort() {
        let snapshot = sample();

        let found = list_users(
            &snapshot,
            &UserListQuery {
                search: Some("CAROL@".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(found.len(), 1);

        let by_tasks = list_users(
            &snapshot,
            &UserListQuery {
                sort: UserSortField::TaskCount,
                order: SortOrder::Asc,
                ..Default::default()
            },
        );
        let names: Vec<&str> = by_tasks.iter().map(|u| u.user.username.as_str()).collect();
        assert_eq!(names, vec!["carol", "bob", "alice"]);
    }

    #[test]
    fn test_list_users_hides_hash() {
        let json = serde_json::to_value(list_users(&sample(), &UserListQuery::default())).unwrap();
        assert!(json[0].get("password_hash").is_none());
        assert!(json[0]["last_active"].is_string());
    }
}
