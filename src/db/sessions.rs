//! Login sessions backed by random tokens in the database.

use super::users::parse_user_row;
use super::{Database, now_ms};
use crate::error::AppResult;
use crate::types::{Session, User};
use rusqlite::params;
use uuid::Uuid;

impl Database {
    /// Create a session for a user, valid for `ttl_ms` milliseconds.
    pub fn create_session(&self, user_id: i64, ttl_ms: i64) -> AppResult<Session> {
        let token = Uuid::new_v4().to_string();
        let now = now_ms();
        let expires_at = now + ttl_ms;

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (token, user_id, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![token, user_id, now, expires_at],
            )?;
            Ok(())
        })?;

        Ok(Session {
            token,
            user_id,
            created_at: now,
            expires_at,
        })
    }

    /// Resolve a session token to its user, if the session is still live.
    ///
    /// An expired token is deleted on sight and treated as absent.
    pub fn session_user(&self, token: &str, now: i64) -> AppResult<Option<User>> {
        let user = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.*, s.expires_at FROM sessions s
                 JOIN users u ON u.id = s.user_id
                 WHERE s.token = ?1",
            )?;

            let result = stmt.query_row(params![token], |row| {
                let expires_at: i64 = row.get("expires_at")?;
                let user = parse_user_row(row)?;
                Ok((user, expires_at))
            });

            match result {
                Ok((user, expires_at)) => {
                    if expires_at <= now {
                        conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
                        Ok(None)
                    } else {
                        Ok(Some(user))
                    }
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })?;
        Ok(user)
    }

    /// Drop a session (logout). Unknown tokens are a no-op.
    pub fn delete_session(&self, token: &str) -> AppResult<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
            Ok(())
        })?;
        Ok(())
    }

    /// Remove every expired session. Returns the number removed.
    pub fn purge_expired_sessions(&self, now: i64) -> AppResult<usize> {
        let removed = self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now])?;
            Ok(n)
        })?;
        Ok(removed)
    }
}
