//! Integration tests for the database layer.
//!
//! These tests verify the core operations using an in-memory SQLite
//! database. Tests are organized by module and functionality.

use taskboard::db::{Database, now_ms};
use taskboard::error::ErrorCode;
use taskboard::types::{TaskUpdate, User};

/// Helper to create a fresh in-memory database for testing.
fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

/// Helper to register a user with a valid password.
fn make_user(db: &Database, name: &str) -> User {
    db.create_user(name, "hunter2hunter2")
        .expect("Failed to create user")
}

mod persistence_tests {
    use super::*;

    #[test]
    fn on_disk_database_survives_reopen() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("taskboard.db");

        let (user_id, task_id) = {
            let db = Database::open(&path).expect("Failed to open database");
            let user = make_user(&db, "alice");
            let task = db
                .create_task(user.id, "Persisted", "survives a process restart", Some(9_000))
                .unwrap();
            (user.id, task.id)
        };

        // Reopen: migrations are already applied, data is still there.
        let db = Database::open(&path).expect("Failed to reopen database");
        let task = db.get_task(user_id, task_id).unwrap();

        assert_eq!(task.title, "Persisted");
        assert_eq!(task.date_planned_completion, Some(9_000));
    }
}

mod user_tests {
    use super::*;

    #[test]
    fn create_user_returns_account_with_id() {
        let db = setup_db();

        let user = make_user(&db, "alice");

        assert!(user.id > 0);
        assert_eq!(user.username, "alice");
        assert!(!user.is_admin);
        assert!(user.created_at > 0);
    }

    #[test]
    fn create_user_rejects_duplicate_username() {
        let db = setup_db();
        make_user(&db, "alice");

        let err = db.create_user("alice", "anotherpassword").unwrap_err();

        assert_eq!(err.code, ErrorCode::UsernameTaken);
    }

    #[test]
    fn create_user_rejects_short_username_and_password() {
        let db = setup_db();

        let err = db.create_user("ab", "longenoughpw").unwrap_err();
        assert_eq!(err.field.as_deref(), Some("username"));

        let err = db.create_user("alice", "short").unwrap_err();
        assert_eq!(err.field.as_deref(), Some("password"));
    }

    #[test]
    fn password_is_stored_hashed() {
        let db = setup_db();

        let user = make_user(&db, "alice");

        assert_ne!(user.password_hash, "hunter2hunter2");
        assert!(user.password_hash.starts_with("$argon2"));
    }

    #[test]
    fn verify_credentials_accepts_correct_password() {
        let db = setup_db();
        make_user(&db, "alice");

        let user = db.verify_credentials("alice", "hunter2hunter2").unwrap();

        assert_eq!(user.username, "alice");
    }

    #[test]
    fn verify_credentials_rejects_wrong_password_and_unknown_user_alike() {
        let db = setup_db();
        make_user(&db, "alice");

        let wrong = db.verify_credentials("alice", "wrongpassword").unwrap_err();
        let unknown = db.verify_credentials("nobody", "whatever123").unwrap_err();

        assert_eq!(wrong.code, ErrorCode::InvalidCredentials);
        assert_eq!(unknown.code, ErrorCode::InvalidCredentials);
        assert_eq!(wrong.message, unknown.message);
    }

    #[test]
    fn admin_role_is_persisted() {
        let db = setup_db();

        let admin = db
            .create_user_with_role("root", "supersecret1", true)
            .unwrap();

        assert!(admin.is_admin);
        assert!(db.get_user(admin.id).unwrap().unwrap().is_admin);
    }
}

mod session_tests {
    use super::*;

    #[test]
    fn session_resolves_to_its_user() {
        let db = setup_db();
        let user = make_user(&db, "alice");

        let session = db.create_session(user.id, 60_000).unwrap();
        let found = db.session_user(&session.token, now_ms()).unwrap();

        assert_eq!(found.unwrap().id, user.id);
    }

    #[test]
    fn unknown_token_resolves_to_none() {
        let db = setup_db();

        assert!(db.session_user("no-such-token", now_ms()).unwrap().is_none());
    }

    #[test]
    fn expired_session_is_rejected_and_purged() {
        let db = setup_db();
        let user = make_user(&db, "alice");
        let session = db.create_session(user.id, 1_000).unwrap();

        let later = session.expires_at + 1;
        assert!(db.session_user(&session.token, later).unwrap().is_none());
        // Gone for good, even with an earlier clock.
        assert!(
            db.session_user(&session.token, session.created_at)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn delete_session_logs_out() {
        let db = setup_db();
        let user = make_user(&db, "alice");
        let session = db.create_session(user.id, 60_000).unwrap();

        db.delete_session(&session.token).unwrap();

        assert!(db.session_user(&session.token, now_ms()).unwrap().is_none());
    }

    #[test]
    fn purge_removes_only_expired_sessions() {
        let db = setup_db();
        let user = make_user(&db, "alice");
        let stale = db.create_session(user.id, 1_000).unwrap();
        let live = db.create_session(user.id, 600_000).unwrap();

        let removed = db.purge_expired_sessions(stale.expires_at + 1).unwrap();

        assert_eq!(removed, 1);
        assert!(
            db.session_user(&live.token, stale.expires_at + 1)
                .unwrap()
                .is_some()
        );
    }
}

mod task_tests {
    use super::*;

    #[test]
    fn create_task_stamps_owner_and_creation_time() {
        let db = setup_db();
        let user = make_user(&db, "alice");

        let task = db
            .create_task(user.id, "Groceries", "Milk, eggs, bread, coffee", None)
            .unwrap();

        assert_eq!(task.user_id, Some(user.id));
        assert!(!task.complete);
        assert!(task.date_created > 0);
        assert!(task.date_completion.is_none());
    }

    #[test]
    fn create_task_rejects_short_title() {
        let db = setup_db();
        let user = make_user(&db, "alice");

        let err = db
            .create_task(user.id, "abc", "a body long enough", None)
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::InvalidFieldValue);
        assert_eq!(err.field.as_deref(), Some("title"));
    }

    #[test]
    fn create_task_rejects_short_text() {
        let db = setup_db();
        let user = make_user(&db, "alice");

        let err = db.create_task(user.id, "Groceries", "short", None).unwrap_err();

        assert_eq!(err.field.as_deref(), Some("text"));
    }

    #[test]
    fn get_task_is_scoped_to_owner() {
        let db = setup_db();
        let alice = make_user(&db, "alice");
        let bob = make_user(&db, "bob");
        let task = db
            .create_task(alice.id, "Groceries", "Milk, eggs, bread", None)
            .unwrap();

        assert!(db.get_task(alice.id, task.id).is_ok());

        let err = db.get_task(bob.id, task.id).unwrap_err();
        assert_eq!(err.code, ErrorCode::TaskNotFound);
    }

    #[test]
    fn foreign_task_and_missing_task_read_identically() {
        let db = setup_db();
        let alice = make_user(&db, "alice");
        let bob = make_user(&db, "bob");
        let task = db
            .create_task(alice.id, "Groceries", "Milk, eggs, bread", None)
            .unwrap();

        let foreign = db.get_task(bob.id, task.id).unwrap_err();
        let missing = db.get_task(bob.id, 424242).unwrap_err();

        assert_eq!(foreign.code, missing.code);
    }

    #[test]
    fn unowned_rows_are_invisible() {
        let db = setup_db();
        let user = make_user(&db, "alice");

        // Legacy row with no owner, inserted behind the API's back.
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (user_id, title, text, complete, date_created)
                 VALUES (NULL, 'orphan', 'no owner at all', 0, 1)",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        assert!(db.list_tasks(user.id).unwrap().tasks.is_empty());
    }

    #[test]
    fn update_task_changes_fields_but_not_creation_time() {
        let db = setup_db();
        let user = make_user(&db, "alice");
        let task = db
            .create_task(user.id, "Groceries", "Milk, eggs, bread", Some(1_000))
            .unwrap();

        let updated = db
            .update_task(
                user.id,
                task.id,
                TaskUpdate {
                    title: Some("Shopping".to_string()),
                    text: Some("Milk, eggs, bread, butter".to_string()),
                    date_planned_completion: Some(Some(2_000)),
                    complete: None,
                },
            )
            .unwrap();

        assert_eq!(updated.title, "Shopping");
        assert_eq!(updated.date_planned_completion, Some(2_000));
        assert_eq!(updated.date_created, task.date_created);
    }

    #[test]
    fn update_task_validates_merged_fields() {
        let db = setup_db();
        let user = make_user(&db, "alice");
        let task = db
            .create_task(user.id, "Groceries", "Milk, eggs, bread", None)
            .unwrap();

        let err = db
            .update_task(
                user.id,
                task.id,
                TaskUpdate {
                    title: Some("ab".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();

        assert_eq!(err.field.as_deref(), Some("title"));
        // Nothing was written.
        assert_eq!(db.get_task(user.id, task.id).unwrap().title, "Groceries");
    }

    #[test]
    fn update_task_is_scoped_to_owner() {
        let db = setup_db();
        let alice = make_user(&db, "alice");
        let bob = make_user(&db, "bob");
        let task = db
            .create_task(alice.id, "Groceries", "Milk, eggs, bread", None)
            .unwrap();

        let err = db
            .update_task(
                bob.id,
                task.id,
                TaskUpdate {
                    complete: Some(true),
                    ..Default::default()
                },
            )
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::TaskNotFound);
    }

    #[test]
    fn completing_a_task_stamps_completion_time() {
        let db = setup_db();
        let user = make_user(&db, "alice");
        let task = db
            .create_task(user.id, "Groceries", "Milk, eggs, bread", None)
            .unwrap();

        let done = db
            .update_task(
                user.id,
                task.id,
                TaskUpdate {
                    complete: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(done.complete);
        assert!(done.date_completion.is_some());

        let reopened = db
            .update_task(
                user.id,
                task.id,
                TaskUpdate {
                    complete: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(!reopened.complete);
        assert!(reopened.date_completion.is_none());
    }

    #[test]
    fn delete_task_removes_own_task() {
        let db = setup_db();
        let user = make_user(&db, "alice");
        let task = db
            .create_task(user.id, "Groceries", "Milk, eggs, bread", None)
            .unwrap();

        db.delete_task(user.id, task.id).unwrap();

        assert!(db.get_task(user.id, task.id).is_err());
    }

    #[test]
    fn delete_task_fails_for_another_users_task_even_if_it_exists() {
        let db = setup_db();
        let alice = make_user(&db, "alice");
        let bob = make_user(&db, "bob");
        let task = db
            .create_task(alice.id, "Groceries", "Milk, eggs, bread", None)
            .unwrap();

        let err = db.delete_task(bob.id, task.id).unwrap_err();

        assert_eq!(err.code, ErrorCode::TaskNotFound);
        // Still there for its owner.
        assert!(db.get_task(alice.id, task.id).is_ok());
    }
}

mod list_tests {
    use super::*;

    #[test]
    fn list_returns_only_own_tasks() {
        let db = setup_db();
        let alice = make_user(&db, "alice");
        let bob = make_user(&db, "bob");

        db.create_task(alice.id, "Alice 1", "belongs to alice", None)
            .unwrap();
        db.create_task(bob.id, "Bob 1", "belongs to bob only", None)
            .unwrap();

        let list = db.list_tasks(alice.id).unwrap();

        assert_eq!(list.tasks.len(), 1);
        assert!(list.tasks.iter().all(|t| t.user_id == Some(alice.id)));
    }

    #[test]
    fn list_orders_incomplete_first_then_by_planned_date() {
        let db = setup_db();
        let user = make_user(&db, "alice");

        let late = db
            .create_task(user.id, "Late one", "planned far out", Some(3_000))
            .unwrap();
        let early = db
            .create_task(user.id, "Early one", "planned soonest", Some(1_000))
            .unwrap();
        let done = db
            .create_task(user.id, "Done one", "already finished", Some(2_000))
            .unwrap();
        db.update_task(
            user.id,
            done.id,
            TaskUpdate {
                complete: Some(true),
                ..Default::default()
            },
        )
        .unwrap();

        let list = db.list_tasks(user.id).unwrap();
        let ids: Vec<i64> = list.tasks.iter().map(|t| t.id).collect();

        assert_eq!(ids, vec![early.id, late.id, done.id]);
    }

    #[test]
    fn counts_match_task_partition() {
        let db = setup_db();
        let user = make_user(&db, "alice");

        for i in 0..5 {
            let task = db
                .create_task(user.id, &format!("Task {}", i), "body text here", None)
                .unwrap();
            if i % 2 == 0 {
                db.update_task(
                    user.id,
                    task.id,
                    TaskUpdate {
                        complete: Some(true),
                        ..Default::default()
                    },
                )
                .unwrap();
            }
        }

        let list = db.list_tasks(user.id).unwrap();

        assert_eq!(list.complete, 3);
        assert_eq!(list.incomplete, 2);
        assert_eq!(
            list.incomplete + list.complete,
            list.tasks.len() as i64
        );
    }

    #[test]
    fn created_task_round_trips_through_list() {
        let db = setup_db();
        let user = make_user(&db, "alice");

        let created = db
            .create_task(user.id, "Round trip", "all fields preserved", Some(7_500))
            .unwrap();

        let list = db.list_tasks(user.id).unwrap();
        let found = list
            .tasks
            .iter()
            .find(|t| t.id == created.id)
            .expect("created task missing from list");

        assert_eq!(*found, created);
    }
}

mod dashboard_tests {
    use super::*;

    #[test]
    fn dashboard_counts_and_ordering_match_scenario() {
        let db = setup_db();
        let alice = make_user(&db, "alice");
        let bob = make_user(&db, "bob");
        let now = now_ms();

        // Alice: one complete, one incomplete-overdue, one incomplete-future.
        let done = db
            .create_task(alice.id, "Finished", "already wrapped up", Some(now - 10_000))
            .unwrap();
        db.update_task(
            alice.id,
            done.id,
            TaskUpdate {
                complete: Some(true),
                ..Default::default()
            },
        )
        .unwrap();
        db.create_task(alice.id, "Overdue", "should have been done", Some(now - 5_000))
            .unwrap();
        db.create_task(alice.id, "Upcoming", "still has time left", Some(now + 60_000))
            .unwrap();

        let rows = db.admin_dashboard(now).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].user_id, alice.id);
        assert_eq!(rows[0].total, 3);
        assert_eq!(rows[0].complete, 1);
        assert_eq!(rows[0].incomplete, 2);
        assert_eq!(rows[0].overdue, 1);

        assert_eq!(rows[1].user_id, bob.id);
        assert_eq!(rows[1].total, 0);
        assert_eq!(rows[1].complete, 0);
        assert_eq!(rows[1].incomplete, 0);
        assert_eq!(rows[1].overdue, 0);
    }

    #[test]
    fn overdue_requires_incomplete_and_past_planned_date() {
        let db = setup_db();
        let user = make_user(&db, "alice");
        let now = now_ms();

        // Complete and past-due: not overdue.
        let done = db
            .create_task(user.id, "Done late", "finished after the plan", Some(now - 1_000))
            .unwrap();
        db.update_task(
            user.id,
            done.id,
            TaskUpdate {
                complete: Some(true),
                ..Default::default()
            },
        )
        .unwrap();
        // Incomplete without a planned date: not overdue.
        db.create_task(user.id, "No plan", "whenever it happens", None)
            .unwrap();
        // Planned exactly at the cutoff: strictly-before means not overdue.
        db.create_task(user.id, "On the dot", "due right now exactly", Some(now))
            .unwrap();

        let rows = db.admin_dashboard(now).unwrap();

        assert_eq!(rows[0].overdue, 0);
    }

    #[test]
    fn dashboard_orders_most_overdue_first_with_stable_ties() {
        let db = setup_db();
        let a = make_user(&db, "amy");
        let b = make_user(&db, "ben");
        let c = make_user(&db, "cal");
        let now = now_ms();

        // ben: two overdue; amy and cal: none (tie, keep id order).
        db.create_task(b.id, "First late", "one of two late", Some(now - 2_000))
            .unwrap();
        db.create_task(b.id, "Second late", "two of two late", Some(now - 1_000))
            .unwrap();
        db.create_task(c.id, "Fine task", "comfortably on time", Some(now + 1_000))
            .unwrap();

        let rows = db.admin_dashboard(now).unwrap();
        let order: Vec<i64> = rows.iter().map(|r| r.user_id).collect();

        assert_eq!(order, vec![b.id, a.id, c.id]);
    }

    #[test]
    fn dashboard_cutoff_is_the_invocation_argument() {
        let db = setup_db();
        let user = make_user(&db, "alice");

        db.create_task(user.id, "Planned", "due at a fixed time", Some(5_000))
            .unwrap();

        assert_eq!(db.admin_dashboard(5_000).unwrap()[0].overdue, 0);
        assert_eq!(db.admin_dashboard(5_001).unwrap()[0].overdue, 1);
    }

    #[test]
    fn unowned_rows_count_for_nobody() {
        let db = setup_db();
        let user = make_user(&db, "alice");

        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (user_id, title, text, complete, date_created, date_planned_completion)
                 VALUES (NULL, 'orphan', 'no owner at all', 0, 1, 1)",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        let rows = db.admin_dashboard(now_ms()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_id, user.id);
        assert_eq!(rows[0].total, 0);
    }
}
