use serde_json::{Map, Value};

// Field names under which chat messages store their payload. These match
// the wire shape the mobile clients already read back from table queries.
pub const FIELD_SENDER: &str = "Sender";
pub const FIELD_MESSAGE: &str = "Message";
pub const FIELD_SENT_AT: &str = "sentAt";
pub const FIELD_IS_READ: &str = "isRead";

/// A stored table entity: compound (partition, row) key plus a free-form
/// field map.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub partition_key: String,
    pub row_key: String,
    pub fields: Map<String, Value>,
}

impl Entity {
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// JSON object with PartitionKey/RowKey alongside the fields — the shape
    /// table-query clients receive.
    pub fn to_json(&self) -> Value {
        let mut obj = self.fields.clone();
        obj.insert("PartitionKey".into(), self.partition_key.clone().into());
        obj.insert("RowKey".into(), self.row_key.clone().into());
        Value::Object(obj)
    }
}

/// One chat message. Created once by the sender's append; mutated only by
/// the read-receipt flip; never deleted outside administrative table access.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRecord {
    pub conversation_key: String,
    pub message_id: String,
    pub sender: String,
    pub body: String,
    pub sent_at: i64,
    pub is_read: bool,
}

impl MessageRecord {
    /// `None` when the entity lacks the message fields (e.g. a seat row
    /// sharing the table).
    pub fn from_entity(entity: &Entity) -> Option<Self> {
        Some(Self {
            conversation_key: entity.partition_key.clone(),
            message_id: entity.row_key.clone(),
            sender: entity.fields.get(FIELD_SENDER)?.as_str()?.to_string(),
            body: entity.fields.get(FIELD_MESSAGE)?.as_str()?.to_string(),
            sent_at: entity.fields.get(FIELD_SENT_AT)?.as_i64()?,
            is_read: entity
                .fields
                .get(FIELD_IS_READ)
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })
    }
}
