use axum::Json;
use axum::extract::Query;
use axum::http::header;
use axum::response::IntoResponse;
use qrcode::QrCode;
use serde_json::{Value, json};
use tracing::error;

use barlink_types::api::QrRequest;

use crate::error::{ApiError, require};

// The `data` parameter is accepted either as a query string (GET) or a JSON
// body (POST); both routes share the same logic.

pub async fn generate_query(Query(req): Query<QrRequest>) -> Result<impl IntoResponse, ApiError> {
    generate(req.data)
}

pub async fn generate_body(Json(req): Json<QrRequest>) -> Result<impl IntoResponse, ApiError> {
    generate(req.data)
}

pub async fn decode_query(Query(req): Query<QrRequest>) -> Result<Json<Value>, ApiError> {
    decode(req.data)
}

pub async fn decode_body(Json(req): Json<QrRequest>) -> Result<Json<Value>, ApiError> {
    decode(req.data)
}

fn generate(data: Option<String>) -> Result<impl IntoResponse, ApiError> {
    let data = require(data, "data")?;

    let code = QrCode::new(data.as_bytes())
        .map_err(|e| ApiError::invalid(format!("cannot encode data as a QR code: {e}")))?;
    let img = code
        .render::<image::Luma<u8>>()
        .min_dimensions(200, 200)
        .build();

    let mut png = Vec::new();
    image::DynamicImage::ImageLuma8(img)
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| {
            error!("PNG encode failed: {e}");
            ApiError::Upstream
        })?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

fn decode(data: Option<String>) -> Result<Json<Value>, ApiError> {
    let data = require(data, "data")?;
    Ok(Json(json!({ "embedded_info": embedded_info(&data) })))
}

/// Scanned QR payloads are usually JSON; anything that does not parse is
/// echoed back as a plain string.
fn embedded_info(data: &str) -> Value {
    serde_json::from_str(data).unwrap_or_else(|_| Value::String(data.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_payload_is_parsed() {
        let info = embedded_info(r#"{"user":"alice","seat":"seat_3"}"#);
        assert_eq!(info, json!({"user": "alice", "seat": "seat_3"}));
    }

    #[test]
    fn plain_text_payload_is_echoed() {
        assert_eq!(embedded_info("hello"), Value::String("hello".into()));
    }

    #[test]
    fn missing_data_is_invalid_request() {
        assert!(matches!(decode(None), Err(ApiError::InvalidRequest(_))));
    }
}
