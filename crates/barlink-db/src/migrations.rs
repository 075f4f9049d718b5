use rusqlite::Connection;
use tracing::info;

use crate::StorageError;

pub fn run(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS entities (
            table_name      TEXT NOT NULL,
            partition_key   TEXT NOT NULL,
            row_key         TEXT NOT NULL,
            fields          TEXT NOT NULL DEFAULT '{}',
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (table_name, partition_key, row_key)
        );

        CREATE INDEX IF NOT EXISTS idx_entities_partition
            ON entities(table_name, partition_key);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
