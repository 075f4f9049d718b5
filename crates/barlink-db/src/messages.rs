use std::sync::Arc;

use tracing::warn;

use barlink_types::conversation::ConversationKey;

use crate::models::{Entity, FIELD_IS_READ, FIELD_MESSAGE, FIELD_SENDER, FIELD_SENT_AT, MessageRecord};
use crate::tables::TableStore;
use crate::{StorageError, filter};

/// How many alternate row keys `append` tries when the millisecond
/// timestamp collides with an existing message in the conversation.
const APPEND_RETRY_LIMIT: u32 = 10;

/// Chat message persistence over the injected table store.
#[derive(Clone)]
pub struct MessageStore {
    tables: Arc<dyn TableStore>,
    table: String,
}

impl MessageStore {
    pub fn new(tables: Arc<dyn TableStore>, table: impl Into<String>) -> Self {
        Self {
            tables,
            table: table.into(),
        }
    }

    /// Append a message to a conversation.
    ///
    /// The row key is the send time as a fixed-width zero-padded millisecond
    /// count, so lexicographic row-key order is chronological. Two sends in
    /// the same millisecond collide on the key; the store retries with a
    /// counter suffix that preserves the ordering rather than dropping the
    /// message. Exhausting the retries surfaces `Conflict`.
    pub fn append(
        &self,
        key: &ConversationKey,
        sender: &str,
        body: &str,
        sent_at: i64,
    ) -> Result<MessageRecord, StorageError> {
        for attempt in 0..=APPEND_RETRY_LIMIT {
            let message_id = if attempt == 0 {
                format!("{sent_at:013}")
            } else {
                format!("{sent_at:013}-{attempt:02}")
            };

            let entity = Entity::new(key.as_str(), &message_id)
                .with_field(FIELD_SENDER, sender)
                .with_field(FIELD_MESSAGE, body)
                .with_field(FIELD_SENT_AT, sent_at)
                .with_field(FIELD_IS_READ, false);

            match self.tables.create(&self.table, &entity) {
                Ok(()) => {
                    return Ok(MessageRecord {
                        conversation_key: key.as_str().to_string(),
                        message_id,
                        sender: sender.to_string(),
                        body: body.to_string(),
                        sent_at,
                        is_read: false,
                    });
                }
                Err(StorageError::Conflict) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(StorageError::Conflict)
    }

    /// Flip `isRead` on every message in the conversation authored by
    /// someone other than `reader`. Returns how many updates succeeded.
    ///
    /// Zero unread messages is a normal outcome (returns 0). A failure on
    /// one record is logged and skipped rather than rolled back: the store
    /// has no cross-record transaction, so partial success is reportable,
    /// not fatal.
    pub fn mark_conversation_read(
        &self,
        key: &ConversationKey,
        reader: &str,
    ) -> Result<usize, StorageError> {
        let expr = format!(
            "PartitionKey eq {} and {FIELD_IS_READ} eq false",
            filter::quote(key.as_str())
        );
        let unread = self.tables.query(&self.table, &expr)?;

        let mut updated = 0;
        for entity in unread {
            let sender = entity.fields.get(FIELD_SENDER).and_then(|v| v.as_str());
            if sender == Some(reader) {
                continue;
            }

            let patch = Entity::new(&entity.partition_key, &entity.row_key)
                .with_field(FIELD_IS_READ, true);
            match self.tables.update(&self.table, &patch) {
                Ok(()) => updated += 1,
                Err(e) => warn!(
                    "failed to mark message {}/{} read: {e}",
                    entity.partition_key, entity.row_key
                ),
            }
        }

        Ok(updated)
    }

    /// Run a caller-supplied filter against the conversation's partition.
    /// The expression is forwarded to the store untouched beyond the
    /// partition scoping.
    pub fn query(
        &self,
        key: &ConversationKey,
        filter_expr: &str,
    ) -> Result<Vec<MessageRecord>, StorageError> {
        let partition = format!("PartitionKey eq {}", filter::quote(key.as_str()));
        let scoped = if filter_expr.trim().is_empty() {
            partition
        } else {
            format!("{partition} and {filter_expr}")
        };

        let entities = self.tables.query(&self.table, &scoped)?;
        Ok(entities.iter().filter_map(MessageRecord::from_entity).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    fn message_store() -> MessageStore {
        MessageStore::new(Arc::new(Database::open_in_memory().unwrap()), "BarTable")
    }

    fn key(a: &str, b: &str) -> ConversationKey {
        ConversationKey::derive(a, b).unwrap()
    }

    #[test]
    fn append_then_query_returns_unread_record() {
        let store = message_store();
        let k = key("alice", "bob");

        let appended = store.append(&k, "alice", "hi", 1000).unwrap();
        assert!(!appended.is_read);

        let records = store.query(&k, "").unwrap();
        assert_eq!(records, vec![appended]);
    }

    #[test]
    fn mark_read_with_no_unread_returns_zero() {
        let store = message_store();
        let k = key("alice", "bob");

        assert_eq!(store.mark_conversation_read(&k, "bob").unwrap(), 0);

        // A message the reader authored themselves also stays untouched.
        store.append(&k, "bob", "hey", 1000).unwrap();
        assert_eq!(store.mark_conversation_read(&k, "bob").unwrap(), 0);
        assert!(!store.query(&k, "").unwrap()[0].is_read);
    }

    #[test]
    fn mark_read_flips_only_other_senders_messages() {
        let store = message_store();
        let k = key("alice", "bob");

        store.append(&k, "alice", "hi", 1000).unwrap();
        store.append(&k, "bob", "hey", 1001).unwrap();

        assert_eq!(store.mark_conversation_read(&k, "bob").unwrap(), 1);

        let records = store.query(&k, "").unwrap();
        let alice_msg = records.iter().find(|r| r.sender == "alice").unwrap();
        let bob_msg = records.iter().find(|r| r.sender == "bob").unwrap();
        assert!(alice_msg.is_read);
        assert!(!bob_msg.is_read);

        // Second call finds nothing left to flip.
        assert_eq!(store.mark_conversation_read(&k, "bob").unwrap(), 0);
    }

    #[test]
    fn same_millisecond_appends_get_distinct_ordered_ids() {
        let store = message_store();
        let k = key("alice", "bob");

        let first = store.append(&k, "alice", "one", 1000).unwrap();
        let second = store.append(&k, "bob", "two", 1000).unwrap();
        let later = store.append(&k, "alice", "three", 1001).unwrap();

        assert_ne!(first.message_id, second.message_id);
        assert!(first.message_id < second.message_id);
        assert!(second.message_id < later.message_id);
        assert_eq!(store.query(&k, "").unwrap().len(), 3);
    }

    #[test]
    fn query_forwards_caller_filter() {
        let store = message_store();
        let k = key("alice", "bob");

        store.append(&k, "alice", "hi", 1000).unwrap();
        store.append(&k, "bob", "hey", 1001).unwrap();

        let from_bob = store.query(&k, "Sender eq 'bob'").unwrap();
        assert_eq!(from_bob.len(), 1);
        assert_eq!(from_bob[0].body, "hey");

        // Conversations are isolated by partition.
        let other = key("alice", "carol");
        assert!(store.query(&other, "").unwrap().is_empty());
    }
}
