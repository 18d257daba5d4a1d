use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::response::ApiResponse;
use crate::services::upload::UploadService;
use crate::state::AppState;
use axum::{extract::Multipart, response::IntoResponse, Extension};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    /// Pass this as `image_ref` when submitting a report
    pub reference: String,
    pub url: String,
}

/// Upload a report photo.
/// POST /upload/image (multipart form: field "file")
#[utoipa::path(
    post,
    path = "/api/v1/upload/image",
    security(("jwt_token" = [])),
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "Field `file`: jpeg, png, gif or webp up to 5 MB"
    ),
    responses(
        (status = 200, description = "Image stored", body = UploadResponse),
        (status = 400, description = "Unsupported or mismatched file", body = AppError),
        (status = 413, description = "File too large", body = AppError),
    ),
    tag = "upload"
)]
pub async fn upload_image(
    Extension(state): Extension<AppState>,
    _auth_user: AuthUser,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read upload: {}", e)))?
        .ok_or_else(|| AppError::Validation("No file provided".to_string()))?;

    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read file data: {}", e)))?;

    let stored = UploadService::new(&state)
        .store_report_image(&data, &content_type)
        .await?;

    Ok(ApiResponse::ok(UploadResponse {
        reference: stored.reference,
        url: stored.url,
    }))
}
