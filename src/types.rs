//! Core domain types for users, tasks, and dashboard rows.

use serde::{Deserialize, Serialize};

/// A registered user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Argon2id hash in PHC string format. Never rendered.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

/// A to-do item owned by exactly one user.
///
/// `user_id` is `None` only for legacy rows imported without an owner;
/// such rows are invisible to every per-user query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub user_id: Option<i64>,
    pub title: String,
    pub text: String,
    pub complete: bool,
    /// Set once at creation, immutable afterwards.
    pub date_created: i64,
    pub date_planned_completion: Option<i64>,
    /// Stamped when `complete` flips to true, cleared when it flips back.
    pub date_completion: Option<i64>,
}

/// A user's ordered task list with per-request summary counts.
#[derive(Debug, Clone, Serialize)]
pub struct TaskList {
    /// Incomplete tasks first, then by planned completion ascending.
    pub tasks: Vec<Task>,
    pub incomplete: i64,
    pub complete: i64,
}

/// Per-user counters for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserTaskCounts {
    pub user_id: i64,
    pub username: String,
    pub total: i64,
    pub complete: i64,
    pub incomplete: i64,
    /// Incomplete with a planned completion strictly before the query cutoff.
    pub overdue: i64,
}

/// Fields a task owner may change. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub text: Option<String>,
    pub date_planned_completion: Option<Option<i64>>,
    pub complete: Option<bool>,
}

/// A login session bound to a user, expiring at `expires_at`.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub created_at: i64,
    pub expires_at: i64,
}
