use axum::Json;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use tracing::{error, info};

use barlink_types::api::UploadBlobRequest;

use crate::error::{ApiError, require};
use crate::state::AppState;
use crate::storage::valid_component;

const DEFAULT_CONTAINER: &str = "uploads";

/// Store a base64 photo and respond with the URL it is served from.
pub async fn upload_blob(
    State(state): State<AppState>,
    Json(req): Json<UploadBlobRequest>,
) -> Result<String, ApiError> {
    let image_data = require(req.image_data, "image_data")?;
    let blob_name = require(req.blob_name, "blob_name")?;
    let container = req
        .container_name
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CONTAINER.to_string());

    if !valid_component(&container) || !valid_component(&blob_name) {
        return Err(ApiError::invalid(
            "container and blob names must be plain file names",
        ));
    }

    let bytes = B64
        .decode(image_data.as_bytes())
        .map_err(|_| ApiError::invalid("image_data is not valid base64"))?;

    state.blobs.put(&container, &blob_name, &bytes).await.map_err(|e| {
        error!("blob write failed: {e}");
        ApiError::Upstream
    })?;

    let url = format!("{}/blobs/{}/{}", state.public_url, container, blob_name);
    info!("blob uploaded: {url}");
    Ok(url)
}

pub async fn download_blob(
    State(state): State<AppState>,
    Path((container, name)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    if !valid_component(&container) || !valid_component(&name) {
        return Err(ApiError::invalid(
            "container and blob names must be plain file names",
        ));
    }

    let bytes = state
        .blobs
        .get(&container, &name)
        .await
        .map_err(|e| {
            error!("blob read failed: {e}");
            ApiError::Upstream
        })?
        .ok_or(ApiError::NotFound("blob"))?;

    Ok(([(header::CONTENT_TYPE, content_type_for(&name))], bytes))
}

fn content_type_for(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type_for("a.png"), "image/png");
        assert_eq!(content_type_for("selfie.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("menu.pdf"), "application/pdf");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }
}
