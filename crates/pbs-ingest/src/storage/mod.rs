//! SQLite sink
//!
//! One exclusively-owned connection per run. Foreign-key enforcement stays
//! off while loading so parent tables can be dropped and recreated in any
//! state; declared constraints are still written to the DDL and checked with
//! [`SqliteSink::foreign_key_violations`] once everything is loaded.

pub mod table;
pub mod value;

use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode};
use sqlx::{ConnectOptions, Connection, Sqlite, Transaction};
use tracing::{debug, info};

use crate::error::Result;

pub use table::{ColumnInfo, ForeignKeyInfo, ForeignKeyViolation, MAX_BIND_PARAMETERS};
pub use value::SqlValue;

/// Destination database for one import run
pub struct SqliteSink {
    conn: SqliteConnection,
    path: Option<PathBuf>,
}

impl SqliteSink {
    /// Open (and create if needed) the database file at `path`
    ///
    /// With `fresh`, an existing file is removed first so the run starts from
    /// an empty database.
    pub async fn open(path: &Path, fresh: bool) -> Result<Self> {
        if fresh && path.exists() {
            info!(path = %path.display(), "Removing existing database");
            std::fs::remove_file(path)?;
        }

        let conn = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(false)
            .journal_mode(SqliteJournalMode::Delete)
            .connect()
            .await?;

        debug!(path = %path.display(), "Opened SQLite database");
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Private in-memory database
    pub async fn open_in_memory() -> Result<Self> {
        let conn = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(false)
            .connect()
            .await?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The underlying connection, for the operations in [`table`]
    pub fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    pub async fn begin(&mut self) -> Result<Transaction<'_, Sqlite>> {
        Ok(self.conn.begin().await?)
    }

    /// Run a multi-statement SQL script
    pub async fn execute_script(&mut self, script: &str) -> Result<()> {
        sqlx::raw_sql(script).execute(&mut self.conn).await?;
        Ok(())
    }

    /// Refresh query planner statistics
    pub async fn analyze(&mut self) -> Result<()> {
        debug!("Running ANALYZE");
        sqlx::query("ANALYZE").execute(&mut self.conn).await?;
        Ok(())
    }

    pub async fn foreign_key_violations(&mut self) -> Result<Vec<ForeignKeyViolation>> {
        table::foreign_key_violations(&mut self.conn).await
    }

    pub async fn close(self) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }
}
