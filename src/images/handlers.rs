use axum::{
    extract::{multipart::MultipartRejection, Multipart},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{auth::extractors::AuthUser, error::AppError, state::AppState};

use super::services::to_data_url;

const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

pub fn upload_routes() -> Router<AppState> {
    Router::new().route("/upload/", post(upload_image))
}

/// POST /upload/ (multipart, field `file`)
#[instrument(skip_all)]
pub async fn upload_image(
    AuthUser(user): AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut mp = multipart.map_err(|e| AppError::invalid(e.body_text()))?;

    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::invalid(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let content_type = field.content_type().map(str::to_owned);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::invalid(e.body_text()))?;

        let url = to_data_url(content_type.as_deref(), &data).map_err(|e| {
            warn!(user_id = %user.id, content_type = ?content_type, "upload rejected: not an image");
            e
        })?;
        info!(user_id = %user.id, bytes = data.len(), content_type = ?content_type, "image encoded");
        return Ok(Json(UploadResponse { url }));
    }

    Err(AppError::invalid("No file provided"))
}
