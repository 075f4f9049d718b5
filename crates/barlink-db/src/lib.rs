pub mod filter;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod seats;
pub mod tables;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use thiserror::Error;
use tracing::info;

pub use messages::MessageStore;
pub use models::{Entity, MessageRecord};
pub use seats::SeatStore;
pub use tables::TableStore;

/// Error kinds surfaced by the storage port. Handlers branch on the kind
/// instead of parsing error text.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Create hit an existing (partition, row) key.
    #[error("entity already exists")]
    Conflict,

    /// The referenced entity does not exist.
    #[error("entity not found")]
    NotFound,

    #[error("invalid filter expression: {0}")]
    InvalidFilter(String),

    /// The underlying store rejected the call.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::Unavailable(e.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Unavailable(e.to_string())
    }
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database for tests.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StorageError::Unavailable(format!("DB lock poisoned: {e}")))?;
        f(&conn)
    }
}
