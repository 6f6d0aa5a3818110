//! Task CRUD, ownership scoping, and the per-user list query.

use super::{Database, now_ms};
use crate::error::{AppError, AppResult};
use crate::types::{Task, TaskList, TaskUpdate};
use crate::validate::validate_task_fields;
use anyhow::Result;
use rusqlite::{params, Connection, Row};

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        title: row.get("title")?,
        text: row.get("text")?,
        complete: row.get("complete")?,
        date_created: row.get("date_created")?,
        date_planned_completion: row.get("date_planned_completion")?,
        date_completion: row.get("date_completion")?,
    })
}

/// Ownership-scoped lookup. Rows owned by anyone else (or by nobody) are
/// invisible, so "not yours" and "does not exist" read identically.
fn get_task_internal(conn: &Connection, user_id: i64, task_id: i64) -> Result<Option<Task>> {
    let mut stmt = conn.prepare("SELECT * FROM tasks WHERE id = ?1 AND user_id = ?2")?;

    match stmt.query_row(params![task_id, user_id], parse_task_row) {
        Ok(task) => Ok(Some(task)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl Database {
    /// Create a task for a user.
    ///
    /// The owner is always the `user_id` argument, taken from the
    /// authenticated caller; no client-supplied owner is accepted anywhere
    /// upstream of this call.
    pub fn create_task(
        &self,
        user_id: i64,
        title: &str,
        text: &str,
        date_planned_completion: Option<i64>,
    ) -> AppResult<Task> {
        validate_task_fields(title, text)?;

        let now = now_ms();

        let task = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (user_id, title, text, complete, date_created, date_planned_completion)
                 VALUES (?1, ?2, ?3, 0, ?4, ?5)",
                params![user_id, title, text, now, date_planned_completion],
            )?;

            let id = conn.last_insert_rowid();
            Ok(Task {
                id,
                user_id: Some(user_id),
                title: title.to_string(),
                text: text.to_string(),
                complete: false,
                date_created: now,
                date_planned_completion,
                date_completion: None,
            })
        })?;

        Ok(task)
    }

    /// Fetch one of the caller's tasks.
    pub fn get_task(&self, user_id: i64, task_id: i64) -> AppResult<Task> {
        let task = self.with_conn(|conn| get_task_internal(conn, user_id, task_id))?;
        task.ok_or_else(|| AppError::task_not_found(task_id))
    }

    /// The user's tasks, incomplete before complete, then by planned
    /// completion ascending (NULL planned dates sort first, SQLite default).
    /// Counts are recomputed on every call.
    pub fn list_tasks(&self, user_id: i64) -> AppResult<TaskList> {
        let tasks = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM tasks WHERE user_id = ?1
                 ORDER BY complete ASC, date_planned_completion ASC",
            )?;

            let tasks: Vec<Task> = stmt
                .query_map(params![user_id], parse_task_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(tasks)
        })?;

        let complete = tasks.iter().filter(|t| t.complete).count() as i64;
        let incomplete = tasks.len() as i64 - complete;

        Ok(TaskList {
            tasks,
            incomplete,
            complete,
        })
    }

    /// Apply a partial update to one of the caller's tasks.
    ///
    /// `date_created` is never touched. Flipping `complete` on stamps
    /// `date_completion`; flipping it off clears it.
    pub fn update_task(&self, user_id: i64, task_id: i64, fields: TaskUpdate) -> AppResult<Task> {
        let now = now_ms();

        let task = self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let Some(mut task) = get_task_internal(&tx, user_id, task_id)? else {
                return Err(AppError::task_not_found(task_id).into());
            };

            if let Some(title) = fields.title {
                task.title = title;
            }
            if let Some(text) = fields.text {
                task.text = text;
            }
            validate_task_fields(&task.title, &task.text)?;

            if let Some(planned) = fields.date_planned_completion {
                task.date_planned_completion = planned;
            }
            if let Some(complete) = fields.complete {
                if complete && !task.complete {
                    task.date_completion = Some(now);
                } else if !complete {
                    task.date_completion = None;
                }
                task.complete = complete;
            }

            tx.execute(
                "UPDATE tasks
                 SET title = ?1, text = ?2, complete = ?3,
                     date_planned_completion = ?4, date_completion = ?5
                 WHERE id = ?6 AND user_id = ?7",
                params![
                    task.title,
                    task.text,
                    task.complete,
                    task.date_planned_completion,
                    task.date_completion,
                    task_id,
                    user_id,
                ],
            )?;

            tx.commit()?;
            Ok(task)
        })?;

        Ok(task)
    }

    /// Delete one of the caller's tasks.
    pub fn delete_task(&self, user_id: i64, task_id: i64) -> AppResult<()> {
        let deleted = self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
                params![task_id, user_id],
            )?;
            Ok(n)
        })?;

        if deleted == 0 {
            return Err(AppError::task_not_found(task_id));
        }
        Ok(())
    }
}
