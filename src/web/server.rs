//! HTTP server for the task UI.
//!
//! This module provides the axum-based HTTP server that serves the
//! server-rendered pages: registration, login, per-user task CRUD, and the
//! admin overview.

use axum::{
    Router,
    extract::{Form, Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::templates;
use crate::db::{Database, now_ms};
use crate::error::{AppError, AppResult};
use crate::types::{Task, TaskUpdate, User};

/// Name of the session cookie.
const SESSION_COOKIE: &str = "taskboard_session";

/// Web server state shared across handlers.
#[derive(Clone)]
pub struct WebServer {
    /// Reference to the task database.
    db: Arc<Database>,
    /// Port the server is listening on.
    port: u16,
    /// Session lifetime in milliseconds.
    session_ttl_ms: i64,
}

impl WebServer {
    /// Create a new web server instance.
    pub fn new(db: Arc<Database>, port: u16, session_ttl_ms: i64) -> Self {
        Self {
            db,
            port,
            session_ttl_ms,
        }
    }

    /// Get the database reference.
    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    /// Get the configured port.
    pub fn port(&self) -> u16 {
        self.port
    }
}

/// Escape HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Format a millisecond timestamp for display, "-" when absent.
fn format_timestamp(ts: Option<i64>) -> String {
    match ts.and_then(chrono::DateTime::from_timestamp_millis) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => "-".to_string(),
    }
}

/// Format a millisecond timestamp for a datetime-local input value.
fn format_datetime_local(ts: Option<i64>) -> String {
    match ts.and_then(chrono::DateTime::from_timestamp_millis) {
        Some(dt) => dt.format("%Y-%m-%dT%H:%M").to_string(),
        None => String::new(),
    }
}

/// Parse a datetime-local input value into epoch milliseconds.
/// Empty or malformed values read as "no planned completion".
fn parse_datetime_local(value: &str) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
        .ok()
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// Render a page into the base layout.
fn render_page(title: &str, user: Option<&User>, content: &str) -> Html<String> {
    let nav = match user {
        Some(user) => {
            let admin_link = if user.is_admin {
                r#"<a href="/userlist">Users</a>"#
            } else {
                ""
            };
            format!(
                r#"<a href="/task">Tasks</a><a href="/add_task">Add task</a>{}<span class="spacer"></span><span class="muted">{}</span><form method="post" action="/logout"><button class="link" type="submit">Log out</button></form>"#,
                admin_link,
                html_escape(&user.username)
            )
        }
        None => {
            r#"<a href="/">Home</a><span class="spacer"></span><a href="/login">Log in</a><a href="/register">Register</a>"#.to_string()
        }
    };

    Html(
        templates::BASE_TEMPLATE
            .replace("{{title}}", &html_escape(title))
            .replace("{{nav}}", &nav)
            .replace("{{content}}", content),
    )
}

/// An error banner fragment, or nothing for an empty message.
fn error_banner(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(
            r#"<div class="message message-error">{}</div>"#,
            html_escape(message)
        )
    }
}

/// Extract the session token from the Cookie header.
fn session_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    for pair in cookies.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        if parts.next() == Some(SESSION_COOKIE) {
            return parts.next().map(str::to_string);
        }
    }
    None
}

/// Resolve the authenticated user for a request.
///
/// Missing, stale, and unknown tokens all come back as `Unauthenticated`;
/// handlers surface that as a redirect to the login page.
fn authenticate(state: &WebServer, headers: &HeaderMap) -> AppResult<User> {
    let token = session_token(headers).ok_or_else(AppError::unauthenticated)?;
    state
        .db()
        .session_user(&token, now_ms())?
        .ok_or_else(AppError::unauthenticated)
}

/// Attach a session cookie to a response.
fn with_session_cookie(response: Response, token: &str, max_age_seconds: i64) -> Response {
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_seconds
    );
    let mut response = response;
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

/// The generic not-found page. Used for missing and foreign-owned tasks
/// alike, so existence never leaks.
fn not_found_page(user: Option<&User>) -> Response {
    (
        StatusCode::NOT_FOUND,
        render_page("Not found", user, templates::NOT_FOUND_TEMPLATE),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Public pages
// ---------------------------------------------------------------------------

/// Landing page.
async fn home_page(State(state): State<WebServer>, headers: HeaderMap) -> Html<String> {
    let user = authenticate(&state, &headers).ok();
    let cta = if user.is_some() {
        r#"<a class="btn" href="/task">Go to your tasks</a>"#
    } else {
        r#"<a class="btn" href="/login">Log in</a> or <a href="/register">register</a> to get started."#
    };
    let content = templates::HOME_TEMPLATE.replace("{{cta}}", cta);
    render_page("Home", user.as_ref(), &content)
}

/// Health check endpoint.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ---------------------------------------------------------------------------
// Registration and login
// ---------------------------------------------------------------------------

fn register_form(message: &str, username: &str) -> String {
    templates::REGISTER_TEMPLATE
        .replace("{{message}}", &error_banner(message))
        .replace("{{username}}", &html_escape(username))
}

async fn register_page() -> Html<String> {
    render_page("Register", None, &register_form("", ""))
}

/// Form data for registration.
#[derive(Debug, serde::Deserialize)]
struct RegisterForm {
    username: String,
    password: String,
    password2: String,
}

async fn register_submit(
    State(state): State<WebServer>,
    Form(form): Form<RegisterForm>,
) -> Response {
    if form.password != form.password2 {
        return render_page(
            "Register",
            None,
            &register_form("Passwords do not match", &form.username),
        )
        .into_response();
    }

    match state.db().create_user(&form.username, &form.password) {
        Ok(user) => {
            info!(username = %user.username, "registered new user");
            Redirect::to("/login").into_response()
        }
        Err(e) => {
            render_page("Register", None, &register_form(&e.message, &form.username))
                .into_response()
        }
    }
}

fn login_form(message: &str, username: &str) -> String {
    templates::LOGIN_TEMPLATE
        .replace("{{message}}", &error_banner(message))
        .replace("{{username}}", &html_escape(username))
}

async fn login_page(State(state): State<WebServer>, headers: HeaderMap) -> Response {
    // Already logged in: straight to the list.
    if authenticate(&state, &headers).is_ok() {
        return Redirect::to("/task").into_response();
    }
    render_page("Log in", None, &login_form("", "")).into_response()
}

/// Form data for login.
#[derive(Debug, serde::Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login_submit(State(state): State<WebServer>, Form(form): Form<LoginForm>) -> Response {
    let user = match state.db().verify_credentials(&form.username, &form.password) {
        Ok(user) => user,
        Err(e) => {
            return render_page("Log in", None, &login_form(&e.message, &form.username))
                .into_response();
        }
    };

    match state.db().create_session(user.id, state.session_ttl_ms) {
        Ok(session) => {
            info!(username = %user.username, "user logged in");
            with_session_cookie(
                Redirect::to("/task").into_response(),
                &session.token,
                state.session_ttl_ms / 1000,
            )
        }
        Err(e) => {
            tracing::error!("failed to create session: {}", e);
            render_page("Log in", None, &login_form("Login failed, try again", ""))
                .into_response()
        }
    }
}

async fn logout(State(state): State<WebServer>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        let _ = state.db().delete_session(&token);
    }
    // Expire the cookie immediately.
    with_session_cookie(Redirect::to("/login").into_response(), "", 0)
}

// ---------------------------------------------------------------------------
// Task pages
// ---------------------------------------------------------------------------

/// One row of the task list table.
fn task_row(task: &Task, now: i64) -> String {
    let badge = if task.complete {
        r#"<span class="badge badge-done">done</span>"#
    } else if task.date_planned_completion.is_some_and(|p| p < now) {
        r#"<span class="badge badge-overdue">overdue</span>"#
    } else {
        r#"<span class="badge badge-open">open</span>"#
    };

    format!(
        r#"<tr><td><a href="/detail_task/{id}">{title}</a></td><td>{badge}</td><td>{planned}</td><td class="actions"><a href="/edit_task/{id}">edit</a><a href="/delete_task/{id}">delete</a></td></tr>"#,
        id = task.id,
        title = html_escape(&task.title),
        badge = badge,
        planned = format_timestamp(task.date_planned_completion),
    )
}

async fn tasks_page(State(state): State<WebServer>, headers: HeaderMap) -> Response {
    let Ok(user) = authenticate(&state, &headers) else {
        return Redirect::to("/login").into_response();
    };

    let list = match state.db().list_tasks(user.id) {
        Ok(list) => list,
        Err(e) => {
            tracing::error!("task list query failed: {}", e);
            return render_page("Tasks", Some(&user), &error_banner("Could not load tasks"))
                .into_response();
        }
    };

    let rows = if list.tasks.is_empty() {
        r#"<p class="muted">Nothing here yet.</p>"#.to_string()
    } else {
        let now = now_ms();
        let mut html = String::from(
            "<table><thead><tr><th>Task</th><th>Status</th><th>Planned</th><th></th></tr></thead><tbody>",
        );
        for task in &list.tasks {
            html.push_str(&task_row(task, now));
        }
        html.push_str("</tbody></table>");
        html
    };

    let content = templates::TASKS_TEMPLATE
        .replace("{{incomplete}}", &list.incomplete.to_string())
        .replace("{{complete}}", &list.complete.to_string())
        .replace("{{message}}", "")
        .replace("{{rows}}", &rows);

    render_page("Tasks", Some(&user), &content).into_response()
}

/// Form data for task create and edit submissions.
#[derive(Debug, serde::Deserialize)]
struct TaskForm {
    title: String,
    text: String,
    date_planned_completion: Option<String>,
    complete: Option<String>,
}

fn add_task_form(message: &str, title: &str, text: &str, planned: &str) -> String {
    templates::ADD_TASK_TEMPLATE
        .replace("{{message}}", &error_banner(message))
        .replace("{{title}}", &html_escape(title))
        .replace("{{text}}", &html_escape(text))
        .replace("{{planned}}", &html_escape(planned))
}

async fn add_task_page(State(state): State<WebServer>, headers: HeaderMap) -> Response {
    let Ok(user) = authenticate(&state, &headers) else {
        return Redirect::to("/login").into_response();
    };
    render_page("Add task", Some(&user), &add_task_form("", "", "", "")).into_response()
}

async fn add_task_submit(
    State(state): State<WebServer>,
    headers: HeaderMap,
    Form(form): Form<TaskForm>,
) -> Response {
    let Ok(user) = authenticate(&state, &headers) else {
        return Redirect::to("/login").into_response();
    };

    let planned = form
        .date_planned_completion
        .as_deref()
        .and_then(parse_datetime_local);

    // Owner comes from the session, never from the form.
    match state.db().create_task(user.id, &form.title, &form.text, planned) {
        Ok(task) => {
            info!(task_id = task.id, user_id = user.id, "created task");
            Redirect::to("/task").into_response()
        }
        Err(e) => render_page(
            "Add task",
            Some(&user),
            &add_task_form(
                &e.message,
                &form.title,
                &form.text,
                form.date_planned_completion.as_deref().unwrap_or(""),
            ),
        )
        .into_response(),
    }
}

fn edit_task_form(
    message: &str,
    id: i64,
    title: &str,
    text: &str,
    planned: &str,
    complete: bool,
) -> String {
    templates::EDIT_TASK_TEMPLATE
        .replace("{{message}}", &error_banner(message))
        .replace("{{id}}", &id.to_string())
        .replace("{{title}}", &html_escape(title))
        .replace("{{text}}", &html_escape(text))
        .replace("{{planned}}", &html_escape(planned))
        .replace("{{complete_checked}}", if complete { "checked" } else { "" })
}

async fn edit_task_page(
    State(state): State<WebServer>,
    Path(task_id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let Ok(user) = authenticate(&state, &headers) else {
        return Redirect::to("/login").into_response();
    };

    let task = match state.db().get_task(user.id, task_id) {
        Ok(task) => task,
        Err(e) if e.is_not_found() => return not_found_page(Some(&user)),
        Err(e) => {
            tracing::error!("task lookup failed: {}", e);
            return render_page("Error", Some(&user), &error_banner("Something went wrong"))
                .into_response();
        }
    };

    let content = edit_task_form(
        "",
        task.id,
        &task.title,
        &task.text,
        &format_datetime_local(task.date_planned_completion),
        task.complete,
    );
    render_page("Edit task", Some(&user), &content).into_response()
}

async fn edit_task_submit(
    State(state): State<WebServer>,
    Path(task_id): Path<i64>,
    headers: HeaderMap,
    Form(form): Form<TaskForm>,
) -> Response {
    let Ok(user) = authenticate(&state, &headers) else {
        return Redirect::to("/login").into_response();
    };

    let planned = form
        .date_planned_completion
        .as_deref()
        .and_then(parse_datetime_local);
    let complete = form.complete.is_some();

    let update = TaskUpdate {
        title: Some(form.title.clone()),
        text: Some(form.text.clone()),
        date_planned_completion: Some(planned),
        complete: Some(complete),
    };

    match state.db().update_task(user.id, task_id, update) {
        Ok(task) => {
            info!(task_id = task.id, user_id = user.id, "updated task");
            Redirect::to(&format!("/detail_task/{}", task.id)).into_response()
        }
        Err(e) if e.is_validation() => {
            let content = edit_task_form(
                &e.message,
                task_id,
                &form.title,
                &form.text,
                form.date_planned_completion.as_deref().unwrap_or(""),
                complete,
            );
            render_page("Edit task", Some(&user), &content).into_response()
        }
        Err(e) if e.is_not_found() => not_found_page(Some(&user)),
        Err(e) => {
            tracing::error!("task update failed: {}", e);
            render_page("Error", Some(&user), &error_banner("Something went wrong"))
                .into_response()
        }
    }
}

async fn detail_task_page(
    State(state): State<WebServer>,
    Path(task_id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let Ok(user) = authenticate(&state, &headers) else {
        return Redirect::to("/login").into_response();
    };

    let task = match state.db().get_task(user.id, task_id) {
        Ok(task) => task,
        Err(e) if e.is_not_found() => return not_found_page(Some(&user)),
        Err(e) => {
            tracing::error!("task lookup failed: {}", e);
            return render_page("Error", Some(&user), &error_banner("Something went wrong"))
                .into_response();
        }
    };

    let status = if task.complete { "Complete" } else { "Incomplete" };
    let content = templates::DETAIL_TASK_TEMPLATE
        .replace("{{id}}", &task.id.to_string())
        .replace("{{title}}", &html_escape(&task.title))
        .replace("{{text}}", &html_escape(&task.text))
        .replace("{{status}}", status)
        .replace("{{created}}", &format_timestamp(Some(task.date_created)))
        .replace("{{planned}}", &format_timestamp(task.date_planned_completion))
        .replace("{{completed}}", &format_timestamp(task.date_completion));

    render_page(&task.title, Some(&user), &content).into_response()
}

async fn delete_task_page(
    State(state): State<WebServer>,
    Path(task_id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let Ok(user) = authenticate(&state, &headers) else {
        return Redirect::to("/login").into_response();
    };

    let task = match state.db().get_task(user.id, task_id) {
        Ok(task) => task,
        Err(e) if e.is_not_found() => return not_found_page(Some(&user)),
        Err(e) => {
            tracing::error!("task lookup failed: {}", e);
            return render_page("Error", Some(&user), &error_banner("Something went wrong"))
                .into_response();
        }
    };

    let content = templates::DELETE_TASK_TEMPLATE
        .replace("{{id}}", &task.id.to_string())
        .replace("{{title}}", &html_escape(&task.title));
    render_page("Delete task", Some(&user), &content).into_response()
}

async fn delete_task_submit(
    State(state): State<WebServer>,
    Path(task_id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let Ok(user) = authenticate(&state, &headers) else {
        return Redirect::to("/login").into_response();
    };

    match state.db().delete_task(user.id, task_id) {
        Ok(()) => {
            info!(task_id, user_id = user.id, "deleted task");
            Redirect::to("/task").into_response()
        }
        Err(e) if e.is_not_found() => not_found_page(Some(&user)),
        Err(e) => {
            tracing::error!("task delete failed: {}", e);
            render_page("Error", Some(&user), &error_banner("Something went wrong"))
                .into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

async fn userlist_page(State(state): State<WebServer>, headers: HeaderMap) -> Response {
    let Ok(user) = authenticate(&state, &headers) else {
        return Redirect::to("/login").into_response();
    };
    if !user.is_admin {
        return Redirect::to("/task").into_response();
    }

    let rows = match state.db().admin_dashboard(now_ms()) {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("admin dashboard query failed: {}", e);
            return render_page("Users", Some(&user), &error_banner("Could not load overview"))
                .into_response();
        }
    };

    let mut html = String::new();
    for row in &rows {
        let overdue = if row.overdue > 0 {
            format!(
                r#"<span class="badge badge-overdue">{}</span>"#,
                row.overdue
            )
        } else {
            row.overdue.to_string()
        };
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            html_escape(&row.username),
            row.total,
            row.complete,
            row.incomplete,
            overdue,
        ));
    }

    let content = templates::USERLIST_TEMPLATE.replace("{{rows}}", &html);
    render_page("Users", Some(&user), &content).into_response()
}

// ---------------------------------------------------------------------------
// Router and lifecycle
// ---------------------------------------------------------------------------

/// Build the router with all routes.
fn build_router(state: WebServer) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Public pages
        .route("/", get(home_page))
        .route("/register", get(register_page).post(register_submit))
        .route("/login", get(login_page).post(login_submit))
        .route("/logout", post(logout))
        // Task pages
        .route("/task", get(tasks_page))
        .route("/add_task", get(add_task_page).post(add_task_submit))
        .route(
            "/edit_task/{task_id}",
            get(edit_task_page).post(edit_task_submit),
        )
        .route("/detail_task/{task_id}", get(detail_task_page))
        .route(
            "/delete_task/{task_id}",
            get(delete_task_page).post(delete_task_submit),
        )
        // Admin
        .route("/userlist", get(userlist_page))
        // API
        .route("/health", get(health))
        // Add middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server on the specified port.
///
/// Returns a oneshot sender used to signal shutdown and the bound address.
pub async fn start_server(
    db: Arc<Database>,
    port: u16,
    session_ttl_ms: i64,
) -> anyhow::Result<(oneshot::Sender<()>, SocketAddr)> {
    let state = WebServer::new(db, port, session_ttl_ms);
    let app = build_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    info!("Taskboard listening on http://{}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("Web server shutting down");
            })
            .await
        {
            tracing::error!("Web server error: {}", e);
        }
    });

    Ok((shutdown_tx, bound_addr))
}
