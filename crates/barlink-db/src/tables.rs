use rusqlite::{Connection, ErrorCode};
use serde_json::Map;

use crate::filter::Filter;
use crate::models::Entity;
use crate::{Database, StorageError};

/// The storage port: entity CRUD and filtered query over named tables.
/// Injected into the stores as `Arc<dyn TableStore>` so nothing in the
/// handler layer touches a process-wide connection.
pub trait TableStore: Send + Sync {
    /// Insert a new entity. `Conflict` when the (partition, row) key exists.
    fn create(&self, table: &str, entity: &Entity) -> Result<(), StorageError>;

    fn read(&self, table: &str, partition_key: &str, row_key: &str)
    -> Result<Entity, StorageError>;

    /// Merge the entity's fields into an existing row. `NotFound` if absent.
    fn update(&self, table: &str, entity: &Entity) -> Result<(), StorageError>;

    /// Merge the entity's fields into a row, creating the row if absent.
    fn upsert(&self, table: &str, entity: &Entity) -> Result<(), StorageError>;

    fn delete(&self, table: &str, partition_key: &str, row_key: &str)
    -> Result<(), StorageError>;

    /// Evaluate a filter expression (see [`crate::filter`]) over the table.
    fn query(&self, table: &str, filter: &str) -> Result<Vec<Entity>, StorageError>;
}

impl TableStore for Database {
    fn create(&self, table: &str, entity: &Entity) -> Result<(), StorageError> {
        let fields = serde_json::to_string(&entity.fields)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO entities (table_name, partition_key, row_key, fields)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![table, entity.partition_key, entity.row_key, fields],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(f, _) if f.code == ErrorCode::ConstraintViolation => {
                    StorageError::Conflict
                }
                other => other.into(),
            })?;
            Ok(())
        })
    }

    fn read(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Entity, StorageError> {
        self.with_conn(|conn| {
            load_entity(conn, table, partition_key, row_key)?.ok_or(StorageError::NotFound)
        })
    }

    fn update(&self, table: &str, entity: &Entity) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            let existing = load_entity(conn, table, &entity.partition_key, &entity.row_key)?
                .ok_or(StorageError::NotFound)?;
            let merged = merge_fields(existing.fields, &entity.fields)?;
            conn.execute(
                "UPDATE entities SET fields = ?4
                 WHERE table_name = ?1 AND partition_key = ?2 AND row_key = ?3",
                rusqlite::params![table, entity.partition_key, entity.row_key, merged],
            )?;
            Ok(())
        })
    }

    fn upsert(&self, table: &str, entity: &Entity) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            match load_entity(conn, table, &entity.partition_key, &entity.row_key)? {
                Some(existing) => {
                    let merged = merge_fields(existing.fields, &entity.fields)?;
                    conn.execute(
                        "UPDATE entities SET fields = ?4
                         WHERE table_name = ?1 AND partition_key = ?2 AND row_key = ?3",
                        rusqlite::params![table, entity.partition_key, entity.row_key, merged],
                    )?;
                }
                None => {
                    let fields = serde_json::to_string(&entity.fields)?;
                    conn.execute(
                        "INSERT INTO entities (table_name, partition_key, row_key, fields)
                         VALUES (?1, ?2, ?3, ?4)",
                        rusqlite::params![table, entity.partition_key, entity.row_key, fields],
                    )?;
                }
            }
            Ok(())
        })
    }

    fn delete(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            let rows = conn.execute(
                "DELETE FROM entities
                 WHERE table_name = ?1 AND partition_key = ?2 AND row_key = ?3",
                rusqlite::params![table, partition_key, row_key],
            )?;
            if rows == 0 {
                return Err(StorageError::NotFound);
            }
            Ok(())
        })
    }

    fn query(&self, table: &str, filter: &str) -> Result<Vec<Entity>, StorageError> {
        let filter = Filter::parse(filter)?;

        let rows: Vec<(String, String, String)> = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT partition_key, row_key, fields FROM entities
                 WHERE table_name = ?1
                 ORDER BY partition_key, row_key",
            )?;
            let rows = stmt
                .query_map([table], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        let mut entities = Vec::new();
        for (partition_key, row_key, fields) in rows {
            let entity = Entity {
                partition_key,
                row_key,
                fields: serde_json::from_str(&fields)?,
            };
            if filter.matches(&entity) {
                entities.push(entity);
            }
        }

        Ok(entities)
    }
}

fn load_entity(
    conn: &Connection,
    table: &str,
    partition_key: &str,
    row_key: &str,
) -> Result<Option<Entity>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT fields FROM entities
         WHERE table_name = ?1 AND partition_key = ?2 AND row_key = ?3",
    )?;

    let fields: Option<String> =
        match stmt.query_row(rusqlite::params![table, partition_key, row_key], |row| {
            row.get(0)
        }) {
            Ok(v) => Some(v),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(e.into()),
        };

    match fields {
        Some(text) => Ok(Some(Entity {
            partition_key: partition_key.to_string(),
            row_key: row_key.to_string(),
            fields: serde_json::from_str(&text)?,
        })),
        None => Ok(None),
    }
}

/// Overlay `patch` onto `base` and serialize. Fields present in the patch
/// replace the stored value; everything else is kept (merge semantics).
fn merge_fields(
    mut base: Map<String, serde_json::Value>,
    patch: &Map<String, serde_json::Value>,
) -> Result<String, StorageError> {
    for (k, v) in patch {
        base.insert(k.clone(), v.clone());
    }
    Ok(serde_json::to_string(&base)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn create_then_read_round_trips() {
        let db = store();
        let entity = Entity::new("p1", "r1").with_field("name", "alice");
        db.create("Profiles", &entity).unwrap();

        let got = db.read("Profiles", "p1", "r1").unwrap();
        assert_eq!(got, entity);
    }

    #[test]
    fn create_duplicate_is_conflict() {
        let db = store();
        let entity = Entity::new("p1", "r1");
        db.create("Profiles", &entity).unwrap();
        assert!(matches!(
            db.create("Profiles", &entity),
            Err(StorageError::Conflict)
        ));
    }

    #[test]
    fn tables_are_isolated() {
        let db = store();
        db.create("A", &Entity::new("p", "r")).unwrap();
        assert!(matches!(db.read("B", "p", "r"), Err(StorageError::NotFound)));
    }

    #[test]
    fn update_merges_fields() {
        let db = store();
        db.create(
            "Profiles",
            &Entity::new("p1", "r1")
                .with_field("name", "alice")
                .with_field("age", 30),
        )
        .unwrap();

        db.update("Profiles", &Entity::new("p1", "r1").with_field("age", 31))
            .unwrap();

        let got = db.read("Profiles", "p1", "r1").unwrap();
        assert_eq!(got.fields.get("name").unwrap(), "alice");
        assert_eq!(got.fields.get("age").unwrap(), 31);
    }

    #[test]
    fn update_missing_is_not_found() {
        let db = store();
        assert!(matches!(
            db.update("Profiles", &Entity::new("p", "r")),
            Err(StorageError::NotFound)
        ));
    }

    #[test]
    fn upsert_creates_then_merges() {
        let db = store();
        db.upsert("Seats", &Entity::new("bar_1", "seat_3").with_field("connectedUser", "alice"))
            .unwrap();
        db.upsert("Seats", &Entity::new("bar_1", "seat_3").with_field("connectedUser", ""))
            .unwrap();

        let got = db.read("Seats", "bar_1", "seat_3").unwrap();
        assert_eq!(got.fields.get("connectedUser").unwrap(), "");
    }

    #[test]
    fn delete_removes_and_missing_is_not_found() {
        let db = store();
        db.create("Profiles", &Entity::new("p", "r")).unwrap();
        db.delete("Profiles", "p", "r").unwrap();
        assert!(matches!(
            db.delete("Profiles", "p", "r"),
            Err(StorageError::NotFound)
        ));
    }

    #[test]
    fn query_applies_filter() {
        let db = store();
        db.create("T", &Entity::new("p1", "a").with_field("isRead", false))
            .unwrap();
        db.create("T", &Entity::new("p1", "b").with_field("isRead", true))
            .unwrap();
        db.create("T", &Entity::new("p2", "c").with_field("isRead", false))
            .unwrap();

        let all = db.query("T", "").unwrap();
        assert_eq!(all.len(), 3);

        let unread_p1 = db
            .query("T", "PartitionKey eq 'p1' and isRead eq false")
            .unwrap();
        assert_eq!(unread_p1.len(), 1);
        assert_eq!(unread_p1[0].row_key, "a");
    }

    #[test]
    fn query_bad_filter_is_invalid() {
        let db = store();
        assert!(matches!(
            db.query("T", "isRead neq false"),
            Err(StorageError::InvalidFilter(_))
        ));
    }
}
