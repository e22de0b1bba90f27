// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2026 sbmod contributors

//! SQLite-backed storage for work that has to wait.
//!
//! Reddit limits how many approved users a subreddit can add per hour.
//! When a verified account cannot be added because of that limit, the add
//! is saved here and retried later by the bot.

use crate::clock::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::{fs, io};
use thiserror::Error;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS add_contributor_tasks (
    username TEXT PRIMARY KEY NOT NULL,
    report TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);
"#;

/// Database errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The database's directory could not be created.
    #[error("Could not create {}: {source}", path.display())]
    Directory {
        /// The directory.
        path: PathBuf,

        /// The underlying I/O error.
        source: io::Error,
    },

    /// A task for the user is already queued.
    #[error("A task for u/{0} is already queued")]
    Duplicate(String),

    /// SQLite reported an error.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Standard result type for the task store.
pub type Result<T> = std::result::Result<T, Error>;

/// A deferred request to add a verified account as an approved user.
#[derive(Clone, Debug, PartialEq)]
pub struct AddContributorTask {
    /// The account to add.
    pub username: String,

    /// The verification report to post once the account is added.
    pub report: String,

    /// When the task was queued.
    pub created_at: DateTime<Utc>,
}

/// Queue of [`AddContributorTask`]s.
#[derive(Debug)]
pub struct TaskStore {
    conn: Connection,
}

impl TaskStore {
    /// Opens the store at `path`, creating the file and its table if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| Error::Directory {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        log::debug!("opening task store at {}", path.display());
        Self::initialize(Connection::open(path)?)
    }

    /// Opens a store that lives only as long as the returned value.
    pub fn open_in_memory() -> Result<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Queues a task for `username`.
    ///
    /// Only one task per user may be queued at a time.
    pub fn insert(&self, username: &str, report: &str) -> Result<()> {
        let result = self.conn.execute(
            "INSERT INTO add_contributor_tasks (username, report) VALUES (?1, ?2)",
            params![username, report],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::Duplicate(username.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// The oldest queued task, which stays queued until it is deleted.
    pub fn next_task(&self) -> Result<Option<AddContributorTask>> {
        let task = self
            .conn
            .query_row(
                "SELECT username, report, created_at FROM add_contributor_tasks
                 ORDER BY created_at, rowid LIMIT 1",
                [],
                |row| {
                    Ok(AddContributorTask {
                        username: row.get(0)?,
                        report: row.get(1)?,
                        created_at: parse_timestamp(2, &row.get::<_, String>(2)?)?,
                    })
                },
            )
            .optional()?;
        Ok(task)
    }

    /// Removes the task for `username`, returning true if there was one.
    pub fn delete(&self, username: &str) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM add_contributor_tasks WHERE username = ?1",
            params![username],
        )?;
        Ok(deleted > 0)
    }

    /// Number of queued tasks.
    pub fn len(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM add_contributor_tasks", [], |row| {
                    row.get(0)
                })?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

fn parse_timestamp(column: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|date| date.with_timezone(&Utc))
        .map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err))
        })
}
