/// System-wide statistics and per-user detail
///
/// # Output
///
/// ```json
/// {
///   "totalUsers": 2,
///   "totalTasks": 3,
///   "activeUsers": 1,
///   "tasksByStatus": { "pending": 2, "in_progress": 0, "completed": 1, "cancelled": 0 },
///   "tasksByPriority": { "low": 0, "medium": 3, "high": 0, "urgent": 0 },
///   "recentRegistrations": [ { "id": 2, "username": "bob", "task_count": 0, ... } ],
///   "topActiveUsers": [ { "id": 1, "total_tasks": 3, "completion_rate": 0.33, ... } ]
/// }
/// ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::TaskCounts;
use crate::models::{
    task::{Task, TaskPriority, TaskStatus},
    user::PublicUser,
};
use crate::store::backend::Snapshot;

/// Number of users in `recentRegistrations`
pub const RECENT_REGISTRATIONS: usize = 5;

/// Number of users in `topActiveUsers`
pub const TOP_ACTIVE_USERS: usize = 10;

/// Number of tasks in a user's `recent_tasks`
pub const RECENT_TASKS: usize = 10;

/// Aggregate view over the whole store
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub total_users: usize,
    pub total_tasks: usize,

    /// Users owning at least one task
    pub active_users: usize,

    /// Every status, including those with no tasks
    pub tasks_by_status: BTreeMap<TaskStatus, usize>,

    /// Every priority, including those with no tasks
    pub tasks_by_priority: BTreeMap<TaskPriority, usize>,

    /// Newest registrations first
    pub recent_registrations: Vec<RecentRegistration>,

    /// Most tasks first
    pub top_active_users: Vec<UserActivity>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentRegistration {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub task_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserActivity {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub completion_rate: f64,
}

/// Admin view of one user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: PublicUser,

    pub statistics: UserStatistics,

    /// Newest first
    pub recent_tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStatistics {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub in_progress_tasks: usize,
    pub pending_tasks: usize,
    pub cancelled_tasks: usize,
    pub completion_rate: f64,

    /// Mean hours from creation to completion over completed tasks
    pub avg_completion_hours: Option<f64>,
}

/// Tallies tasks per owner in one pass
pub(crate) fn counts_by_user(tasks: &[Task]) -> HashMap<i64, TaskCounts> {
    let mut counts: HashMap<i64, TaskCounts> = HashMap::new();
    for task in tasks {
        counts.entry(task.user_id).or_default().record(task);
    }
    counts
}

/// Computes system-wide statistics
///
/// Rankings are stable: users with equal keys keep their store order.
pub fn system_stats(snapshot: &Snapshot) -> SystemStats {
    let per_user = counts_by_user(&snapshot.tasks);
    let counts_for = |id: i64| per_user.get(&id).copied().unwrap_or_default();

    let mut tasks_by_status: BTreeMap<TaskStatus, usize> =
        TaskStatus::ALL.into_iter().map(|s| (s, 0)).collect();
    let mut tasks_by_priority: BTreeMap<TaskPriority, usize> =
        TaskPriority::ALL.into_iter().map(|p| (p, 0)).collect();
    for task in &snapshot.tasks {
        *tasks_by_status.entry(task.status).or_default() += 1;
        *tasks_by_priority.entry(task.priority).or_default() += 1;
    }

    let active_users = snapshot
        .users
        .iter()
        .filter(|u| counts_for(u.id).total > 0)
        .count();

    let mut by_registration: Vec<_> = snapshot.users.iter().collect();
    by_registration.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let recent_registrations = by_registration
        .into_iter()
        .take(RECENT_REGISTRATIONS)
        .map(|u| RecentRegistration {
            id: u.id,
            username: u.username.clone(),
            email: u.email.clone(),
            created_at: u.created_at,
            task_count: counts_for(u.id).total,
        })
        .collect();

    let mut top_active_users: Vec<UserActivity> = snapshot
        .users
        .iter()
        .map(|u| {
            let counts = counts_for(u.id);
            UserActivity {
                id: u.id,
                username: u.username.clone(),
                email: u.email.clone(),
                total_tasks: counts.total,
                completed_tasks: counts.completed,
                completion_rate: counts.completion_rate(),
            }
        })
        .collect();
    top_active_users.sort_by(|a, b| b.total_tasks.cmp(&a.total_tasks));
    top_active_users.truncate(TOP_ACTIVE_USERS);

    SystemStats {
        total_users: snapshot.users.len(),
        total_tasks: snapshot.tasks.len(),
        active_users,
        tasks_by_status,
        tasks_by_priority,
        recent_registrations,
        top_active_users,
    }
}

/// Computes the admin detail view for one user, or `None` if absent
pub fn user_detail(snapshot: &Snapshot, user_id: i64) -> Option<UserDetail> {
    let user = snapshot.users.iter().find(|u| u.id == user_id)?;

    let mut tasks: Vec<&Task> = snapshot
        .tasks
        .iter()
        .filter(|t| t.user_id == user_id)
        .collect();
    let counts: TaskCounts = tasks.iter().copied().collect();

    let durations: Vec<f64> = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .filter_map(|t| t.completed_at.map(|done| done - t.created_at))
        .map(|elapsed| elapsed.num_milliseconds() as f64 / 3_600_000.0)
        .collect();
    let avg_completion_hours = if durations.is_empty() {
        None
    } else {
        Some(durations.iter().sum::<f64>() / durations.len() as f64)
    };

    tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let recent_tasks = tasks.into_iter().take(RECENT_TASKS).cloned().collect();

    Some(UserDetail {
        user: PublicUser::from(user),
        statistics: UserStatistics {
            total_tasks: counts.total,
            completed_tasks: counts.completed,
            in_progress_tasks: counts.in_progress,
            pending_tasks: counts.pending,
            cancelled_tasks: counts.cancelled,
            completion_rate: counts.completion_rate(),
            avg_completion_hours,
        },
        recent_tasks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{NewTask, TaskPatch};
    use crate::models::user::User;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap()
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

    fn task(id: i64, user_id: i64, created_hour: u32) -> Task {
        NewTask::titled(format!("task {}", id))
            .into_task(id, user_id, at(created_hour))
            .unwrap()
    }

    fn completed(mut task: Task, done_hour: u32) -> Task {
        task.apply(TaskPatch::status(TaskStatus::Completed), at(done_hour))
            .unwrap();
        task
    }

    #[test]
    fn test_stats_two_users_one_active() {
        let snapshot = Snapshot {
            users: vec![user(1, "alice", 1), user(2, "bob", 2)],
            tasks: vec![task(1, 1, 3), task(2, 1, 4), completed(task(3, 1, 5), 6)],
        };

        let stats = system_stats(&snapshot);

        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.active_users, 1);
        assert_eq!(stats.total_tasks, 3);
        assert_eq!(stats.tasks_by_status[&TaskStatus::Pending], 2);
        assert_eq!(stats.tasks_by_status[&TaskStatus::Completed], 1);
        assert_eq!(stats.tasks_by_status[&TaskStatus::Cancelled], 0);
        assert_eq!(stats.tasks_by_priority[&TaskPriority::Medium], 3);

        assert_eq!(stats.recent_registrations[0].username, "bob");
        assert_eq!(stats.recent_registrations[1].task_count, 3);

        let top = &stats.top_active_users[0];
        assert_eq!(top.username, "alice");
        assert_eq!(top.total_tasks, 3);
        assert!((top.completion_rate - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.top_active_users[1].completion_rate, 0.0);
    }

    #[test]
    fn test_stats_rankings_are_truncated() {
        let users: Vec<User> = (1..=12).map(|i| user(i, &format!("u{}", i), i as u32)).collect();
        let snapshot = Snapshot {
            users,
            tasks: vec![],
        };

        let stats = system_stats(&snapshot);
        assert_eq!(stats.recent_registrations.len(), RECENT_REGISTRATIONS);
        assert_eq!(stats.recent_registrations[0].id, 12);
        assert_eq!(stats.top_active_users.len(), TOP_ACTIVE_USERS);
        // Equal task counts keep store order
        assert_eq!(stats.top_active_users[0].id, 1);
    }

    #[test]
    fn test_stats_serialize_camel_case_top_level() {
        let json = serde_json::to_value(system_stats(&Snapshot::default())).unwrap();

        assert_eq!(json["totalUsers"], 0);
        assert_eq!(json["tasksByStatus"]["in_progress"], 0);
        assert_eq!(json["tasksByPriority"]["urgent"], 0);
        assert!(json["topActiveUsers"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_stats_are_deterministic() {
        let snapshot = Snapshot {
            users: vec![user(1, "alice", 1), user(2, "bob", 1)],
            tasks: vec![task(1, 2, 3), task(2, 1, 3)],
        };

        assert_eq!(system_stats(&snapshot), system_stats(&snapshot));
    }

    #[test]
    fn test_user_detail() {
        let snapshot = Snapshot {
            users: vec![user(1, "alice", 0)],
            tasks: vec![
                completed(task(1, 1, 1), 3),
                completed(task(2, 1, 2), 6),
                task(3, 1, 7),
            ],
        };

        let detail = user_detail(&snapshot, 1).unwrap();

        assert_eq!(detail.user.username, "alice");
        assert_eq!(detail.statistics.total_tasks, 3);
        assert_eq!(detail.statistics.completed_tasks, 2);
        assert_eq!(detail.statistics.pending_tasks, 1);
        assert_eq!(detail.statistics.avg_completion_hours, Some(3.0));
        assert_eq!(detail.recent_tasks[0].id, 3);
        assert_eq!(detail.recent_tasks.len(), 3);
    }

    #[test]
    fn test_user_detail_caps_recent_tasks() {
        let tasks = (1..=15).map(|i| task(i, 1, (i % 24) as u32)).collect();
        let snapshot = Snapshot {
            users: vec![user(1, "alice", 0)],
            tasks,
        };

        let detail = user_detail(&snapshot, 1).unwrap();
        assert_eq!(detail.recent_tasks.len(), RECENT_TASKS);
        assert!(detail.statistics.avg_completion_hours.is_none());
        assert!(detail
            .recent_tasks
            .windows(2)
            .all(|w| w[0].created_at >= w[1].created_at));
    }

    #[test]
    fn test_user_detail_missing_user() {
        assert!(user_detail(&Snapshot::default(), 1).is_none());
    }

    #[test]
    fn test_user_detail_hides_hash() {
        let snapshot = Snapshot {
            users: vec![user(1, "alice", 0)],
            tasks: vec![],
        };

        let json = serde_json::to_value(user_detail(&snapshot, 1).unwrap()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "alice");
        assert_eq!(json["statistics"]["completion_rate"], 0.0);
        assert!(json["statistics"]["avg_completion_hours"].is_null());
    }
}
