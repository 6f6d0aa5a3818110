//! HTML templates for the web UI.
//!
//! Templates are embedded at compile time using `include_str!`. Pages are
//! produced by substituting `{{placeholder}}` slots in the base layout and
//! in the per-page fragments.

/// The base HTML layout with navigation and styles.
pub const BASE_TEMPLATE: &str = include_str!("templates/base.html");

/// The public landing page.
pub const HOME_TEMPLATE: &str = include_str!("templates/home.html");

/// The login form.
pub const LOGIN_TEMPLATE: &str = include_str!("templates/login.html");

/// The registration form.
pub const REGISTER_TEMPLATE: &str = include_str!("templates/register.html");

/// The task list page with summary counts.
pub const TASKS_TEMPLATE: &str = include_str!("templates/tasks.html");

/// The add-task form.
pub const ADD_TASK_TEMPLATE: &str = include_str!("templates/add_task.html");

/// The edit-task form.
pub const EDIT_TASK_TEMPLATE: &str = include_str!("templates/edit_task.html");

/// The task detail page.
pub const DETAIL_TASK_TEMPLATE: &str = include_str!("templates/detail_task.html");

/// The delete confirmation page.
pub const DELETE_TASK_TEMPLATE: &str = include_str!("templates/delete_task.html");

/// The admin user overview.
pub const USERLIST_TEMPLATE: &str = include_str!("templates/userlist.html");

/// The generic not-found page.
pub const NOT_FOUND_TEMPLATE: &str = include_str!("templates/not_found.html");
