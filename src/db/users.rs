//! User accounts and credential verification.

use super::{Database, now_ms};
use crate::error::{AppError, AppResult};
use crate::types::User;
use anyhow::Result;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::password_hash::rand_core::OsRng;
use argon2::Argon2;
use rusqlite::{params, Connection, Row};

/// Minimum username length in characters.
pub const USERNAME_MIN_CHARS: usize = 3;
/// Minimum password length in characters.
pub const PASSWORD_MIN_CHARS: usize = 8;

pub fn parse_user_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        password_hash: row.get("password_hash")?,
        is_admin: row.get("is_admin")?,
        created_at: row.get("created_at")?,
    })
}

/// Hash a password with Argon2id and default parameters.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(AppError::internal)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC hash string.
fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Internal helper to look a user up by id on an existing connection.
pub(crate) fn get_user_internal(conn: &Connection, user_id: i64) -> Result<Option<User>> {
    let mut stmt = conn.prepare("SELECT * FROM users WHERE id = ?1")?;

    match stmt.query_row(params![user_id], parse_user_row) {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl Database {
    /// Register a new user with a hashed password.
    pub fn create_user(&self, username: &str, password: &str) -> AppResult<User> {
        self.create_user_with_role(username, password, false)
    }

    /// Register a user, optionally granting the admin role.
    pub fn create_user_with_role(
        &self,
        username: &str,
        password: &str,
        is_admin: bool,
    ) -> AppResult<User> {
        let username = username.trim();
        if username.chars().count() < USERNAME_MIN_CHARS {
            return Err(AppError::invalid_value(
                "username",
                format!("Username must be at least {} characters", USERNAME_MIN_CHARS),
            ));
        }
        if password.chars().count() < PASSWORD_MIN_CHARS {
            return Err(AppError::invalid_value(
                "password",
                format!("Password must be at least {} characters", PASSWORD_MIN_CHARS),
            ));
        }

        let password_hash = hash_password(password)?;
        let now = now_ms();

        let user = self.with_conn(|conn| {
            let result = conn.execute(
                "INSERT INTO users (username, password_hash, is_admin, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![username, password_hash, is_admin, now],
            );

            match result {
                Ok(_) => {}
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    return Err(AppError::username_taken(username).into());
                }
                Err(e) => return Err(e.into()),
            }

            let id = conn.last_insert_rowid();
            Ok(User {
                id,
                username: username.to_string(),
                password_hash: password_hash.clone(),
                is_admin,
                created_at: now,
            })
        })?;

        Ok(user)
    }

    /// Look a user up by id.
    pub fn get_user(&self, user_id: i64) -> AppResult<Option<User>> {
        Ok(self.with_conn(|conn| get_user_internal(conn, user_id))?)
    }

    /// Look a user up by username.
    pub fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM users WHERE username = ?1")?;

            match stmt.query_row(params![username], parse_user_row) {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })?;
        Ok(user)
    }

    /// Check a username/password pair against stored credentials.
    ///
    /// Unknown username and wrong password produce the same error.
    pub fn verify_credentials(&self, username: &str, password: &str) -> AppResult<User> {
        let user = self
            .get_user_by_username(username.trim())?
            .ok_or_else(AppError::invalid_credentials)?;

        if verify_password(password, &user.password_hash) {
            Ok(user)
        } else {
            Err(AppError::invalid_credentials())
        }
    }
}
