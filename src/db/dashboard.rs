//! Admin overview: per-user task counters.

use super::Database;
use crate::error::AppResult;
use crate::types::UserTaskCounts;
use rusqlite::params;
use std::collections::HashMap;

impl Database {
    /// Per-user total/complete/incomplete/overdue counters, most overdue
    /// first.
    ///
    /// The cutoff is the single `now` argument, captured once by the caller,
    /// so every row of one invocation shares the same notion of "overdue".
    /// Counters are accumulated in one pass over the owned task rows rather
    /// than pushed into store-specific conditional aggregates. Ties on the
    /// overdue count keep user-id order (stable sort).
    pub fn admin_dashboard(&self, now: i64) -> AppResult<Vec<UserTaskCounts>> {
        let mut rows = self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, username FROM users ORDER BY id ASC")?;
            let users: Vec<(i64, String)> = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            // Unowned rows carry no user_id and are excluded here.
            let mut stmt = conn.prepare(
                "SELECT user_id, complete, date_planned_completion
                 FROM tasks WHERE user_id IS NOT NULL",
            )?;
            let tasks: Vec<(i64, bool, Option<i64>)> = stmt
                .query_map(params![], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut by_user: HashMap<i64, (i64, i64, i64, i64)> = HashMap::new();
            for (user_id, complete, planned) in tasks {
                let counts = by_user.entry(user_id).or_default();
                counts.0 += 1;
                if complete {
                    counts.1 += 1;
                } else {
                    counts.2 += 1;
                    if planned.is_some_and(|p| p < now) {
                        counts.3 += 1;
                    }
                }
            }

            let rows: Vec<UserTaskCounts> = users
                .into_iter()
                .map(|(user_id, username)| {
                    let (total, complete, incomplete, overdue) =
                        by_user.get(&user_id).copied().unwrap_or_default();
                    UserTaskCounts {
                        user_id,
                        username,
                        total,
                        complete,
                        incomplete,
                        overdue,
                    }
                })
                .collect();

            Ok(rows)
        })?;

        rows.sort_by(|a, b| b.overdue.cmp(&a.overdue));
        Ok(rows)
    }
}
