use serde::{Deserialize, Serialize};

// Request fields are all optional at the serde layer; handlers validate and
// turn absences into a 400 with a structured body instead of letting the
// JSON layer reject the request.

// -- Seats --

#[derive(Debug, Deserialize)]
pub struct SeatRequest {
    pub user: Option<String>,
    pub seat: Option<String>,
    pub action: Option<String>,
    /// Venue scope for the seat row. Falls back to the server's configured
    /// default venue when absent.
    pub venue: Option<String>,
}

// -- Generic table access --

#[derive(Debug, Deserialize)]
pub struct UpsertEntityRequest {
    pub table_name: Option<String>,
    pub entity: Option<serde_json::Map<String, serde_json::Value>>,
    pub action: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueryEntitiesRequest {
    pub table_name: Option<String>,
    pub query_filter: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteEntityRequest {
    pub table_name: Option<String>,
    pub partition_key: Option<String>,
    pub row_key: Option<String>,
}

// -- Chat --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub user: Option<String>,
    pub other_user: Option<String>,
    pub message: Option<String>,
    /// Client-reported send time, milliseconds since epoch.
    pub timestamp: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRequest {
    pub user: Option<String>,
    pub other_user: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub conversation_key: String,
    pub message_id: String,
    pub sender: String,
    pub message: String,
    pub sent_at: i64,
    pub is_read: bool,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub updated: usize,
}

#[derive(Debug, Serialize)]
pub struct GroupResponse {
    pub group: String,
}

// -- Blobs --

#[derive(Debug, Deserialize)]
pub struct UploadBlobRequest {
    pub image_data: Option<String>,
    pub blob_name: Option<String>,
    pub container_name: Option<String>,
}

// -- QR --

#[derive(Debug, Deserialize)]
pub struct QrRequest {
    pub data: Option<String>,
}

// -- Email --

#[derive(Debug, Deserialize)]
pub struct EmailPdfRequest {
    pub pdf: Option<String>,
    pub email: Option<String>,
}

// -- Negotiate --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiateResponse {
    pub url: String,
    pub access_token: String,
}
