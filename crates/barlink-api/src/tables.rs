use axum::Json;
use axum::extract::State;
use serde_json::{Map, Value};
use tracing::info;

use barlink_db::Entity;
use barlink_types::api::{DeleteEntityRequest, QueryEntitiesRequest, UpsertEntityRequest};

use crate::error::{ApiError, join_error, require};
use crate::state::AppState;

/// Administrative table access: create or update an arbitrary entity.
/// The entity object carries its own `PartitionKey` and `RowKey`.
pub async fn upsert_entity(
    State(state): State<AppState>,
    Json(req): Json<UpsertEntityRequest>,
) -> Result<&'static str, ApiError> {
    let table = require(req.table_name, "table_name")?;
    let action = require(req.action, "action")?;
    let mut fields = req
        .entity
        .ok_or_else(|| ApiError::invalid("missing required field 'entity'"))?;

    let partition_key = take_key(&mut fields, "PartitionKey")?;
    let row_key = take_key(&mut fields, "RowKey")?;
    let entity = Entity {
        partition_key,
        row_key,
        fields,
    };

    let tables = state.tables.clone();
    match action.as_str() {
        "create" => {
            tokio::task::spawn_blocking(move || tables.create(&table, &entity))
                .await
                .map_err(join_error)??;
        }
        "update" => {
            tokio::task::spawn_blocking(move || tables.update(&table, &entity))
                .await
                .map_err(join_error)??;
        }
        other => return Err(ApiError::invalid(format!("unknown action '{other}'"))),
    }

    Ok("entity stored")
}

pub async fn query_entities(
    State(state): State<AppState>,
    Json(req): Json<QueryEntitiesRequest>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let table = require(req.table_name, "table_name")?;
    let filter = req.query_filter.unwrap_or_default();

    let tables = state.tables.clone();
    let entities = tokio::task::spawn_blocking(move || tables.query(&table, &filter))
        .await
        .map_err(join_error)??;

    Ok(Json(entities.iter().map(Entity::to_json).collect()))
}

pub async fn delete_entity(
    State(state): State<AppState>,
    Json(req): Json<DeleteEntityRequest>,
) -> Result<&'static str, ApiError> {
    let table = require(req.table_name, "table_name")?;
    let partition_key = require(req.partition_key, "partition_key")?;
    let row_key = require(req.row_key, "row_key")?;

    info!("deleting entity {partition_key}/{row_key} from {table}");

    let tables = state.tables.clone();
    tokio::task::spawn_blocking(move || tables.delete(&table, &partition_key, &row_key))
        .await
        .map_err(join_error)??;

    Ok("entity deleted")
}

fn take_key(fields: &mut Map<String, Value>, name: &str) -> Result<String, ApiError> {
    match fields.remove(name) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        _ => Err(ApiError::invalid(format!(
            "entity is missing string field '{name}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn take_key_extracts_and_removes() {
        let mut fields = match json!({"PartitionKey": "p", "RowKey": "r", "name": "x"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        assert_eq!(take_key(&mut fields, "PartitionKey").unwrap(), "p");
        assert_eq!(take_key(&mut fields, "RowKey").unwrap(), "r");
        assert!(!fields.contains_key("PartitionKey"));
        assert!(fields.contains_key("name"));
    }

    #[test]
    fn take_key_rejects_missing_or_nonstring() {
        let mut fields = match json!({"PartitionKey": 7}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        assert!(take_key(&mut fields, "PartitionKey").is_err());
        assert!(take_key(&mut fields, "RowKey").is_err());
    }
}
