use std::sync::Arc;

use serde_json::Value;

use crate::StorageError;
use crate::models::Entity;
use crate::tables::TableStore;

/// Field holding the occupant id on a seat row. Empty string means vacant;
/// the clients already key off this name.
pub const FIELD_OCCUPANT: &str = "connectedUser";

/// Seat-to-user assignments, partitioned by venue.
///
/// No optimistic-concurrency check is applied: a concurrent assign and
/// release of the same seat race and the last writer wins. Contention on a
/// physical seat is serialized by the person sitting down on it, so this is
/// a documented weakness rather than a fixed one.
#[derive(Clone)]
pub struct SeatStore {
    tables: Arc<dyn TableStore>,
    table: String,
}

impl SeatStore {
    pub fn new(tables: Arc<dyn TableStore>, table: impl Into<String>) -> Self {
        Self {
            tables,
            table: table.into(),
        }
    }

    /// Merge-upsert the seat row with the occupant. Re-assigning the same
    /// occupant confirms the state and nothing more.
    pub fn assign(&self, venue: &str, seat: &str, occupant: &str) -> Result<(), StorageError> {
        let entity = Entity::new(venue, seat).with_field(FIELD_OCCUPANT, occupant);
        self.tables.upsert(&self.table, &entity)
    }

    /// Clear the seat's occupant. Releasing a never-assigned seat creates
    /// the row already vacant; the two cases end in the same state.
    pub fn release(&self, venue: &str, seat: &str) -> Result<(), StorageError> {
        let entity = Entity::new(venue, seat).with_field(FIELD_OCCUPANT, "");
        self.tables.upsert(&self.table, &entity)
    }

    /// Current occupant, `None` when the seat has no row or is vacant.
    pub fn occupant(&self, venue: &str, seat: &str) -> Result<Option<String>, StorageError> {
        let entity = match self.tables.read(&self.table, venue, seat) {
            Ok(e) => e,
            Err(StorageError::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };

        Ok(entity
            .fields
            .get(FIELD_OCCUPANT)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    fn seat_store() -> SeatStore {
        SeatStore::new(Arc::new(Database::open_in_memory().unwrap()), "BarTable")
    }

    #[test]
    fn assign_then_release_leaves_seat_vacant() {
        let store = seat_store();
        store.assign("bar_1", "seat_3", "alice").unwrap();
        assert_eq!(
            store.occupant("bar_1", "seat_3").unwrap(),
            Some("alice".to_string())
        );

        store.release("bar_1", "seat_3").unwrap();
        assert_eq!(store.occupant("bar_1", "seat_3").unwrap(), None);
    }

    #[test]
    fn release_without_assign_is_idempotent() {
        let store = seat_store();
        store.release("bar_1", "seat_9").unwrap();
        assert_eq!(store.occupant("bar_1", "seat_9").unwrap(), None);

        // Releasing again changes nothing.
        store.release("bar_1", "seat_9").unwrap();
        assert_eq!(store.occupant("bar_1", "seat_9").unwrap(), None);
    }

    #[test]
    fn reassign_same_occupant_is_idempotent() {
        let store = seat_store();
        store.assign("bar_1", "seat_3", "alice").unwrap();
        store.assign("bar_1", "seat_3", "alice").unwrap();
        assert_eq!(
            store.occupant("bar_1", "seat_3").unwrap(),
            Some("alice".to_string())
        );
    }

    #[test]
    fn venues_are_separate_partitions() {
        let store = seat_store();
        store.assign("bar_1", "seat_3", "alice").unwrap();
        store.assign("bar_2", "seat_3", "bob").unwrap();

        assert_eq!(
            store.occupant("bar_1", "seat_3").unwrap(),
            Some("alice".to_string())
        );
        assert_eq!(
            store.occupant("bar_2", "seat_3").unwrap(),
            Some("bob".to_string())
        );
    }
}
