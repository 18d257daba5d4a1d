use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::store::ImageStore;
use std::sync::Arc;

pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024; // 5 MB
const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Validate file magic bytes match the declared content type.
fn validate_magic_bytes(data: &[u8], content_type: &str) -> bool {
    match content_type {
        "image/jpeg" => data.starts_with(&[0xFF, 0xD8, 0xFF]),
        "image/png" => data.starts_with(&[0x89, 0x50, 0x4E, 0x47]),
        "image/gif" => data.starts_with(b"GIF8"),
        "image/webp" => data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP",
        _ => false,
    }
}

/// Size, declared type and content sniffing, in that order.
pub fn validate_image(data: &[u8], content_type: &str) -> AppResult<()> {
    if data.is_empty() {
        return Err(AppError::Validation("File is empty".to_string()));
    }
    if data.len() > MAX_FILE_SIZE {
        return Err(AppError::PayloadTooLarge);
    }
    if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
        return Err(AppError::Validation(format!(
            "Unsupported file type: {}. Allowed: jpeg, png, gif, webp",
            content_type
        )));
    }
    if !validate_magic_bytes(data, content_type) {
        return Err(AppError::Validation(
            "File content does not match declared content type".to_string(),
        ));
    }
    Ok(())
}

/// A stored image: the reference goes into a report, the URL to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub reference: String,
    pub url: String,
}

pub struct UploadService {
    images: Arc<dyn ImageStore>,
}

impl UploadService {
    pub fn new(state: &AppState) -> Self {
        Self {
            images: state.images.clone(),
        }
    }

    pub async fn store_report_image(
        &self,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<StoredImage> {
        validate_image(data, content_type)?;
        let reference = self.images.upload(data, content_type).await?;
        let url = self.images.public_url(&reference);
        Ok(StoredImage { reference, url })
    }
}
