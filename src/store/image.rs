use super::ImageStore;
use crate::config::UploadConfig;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tokio::fs;
use uuid::Uuid;

/// Subdirectory of the upload root that report photos live in.
pub const REPORT_IMAGE_DIR: &str = "report-images";

pub fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

fn new_reference(content_type: &str) -> AppResult<String> {
    let ext = extension_for(content_type)
        .ok_or_else(|| AppError::Validation("Unsupported file type".to_string()))?;
    Ok(format!("{}/{}.{}", REPORT_IMAGE_DIR, Uuid::new_v4(), ext))
}

/// `report-images/<uuid>.<ext>` with a known image extension. Anything else
/// (paths, URLs, traversal) was not issued by an image store.
pub fn is_issued_reference(reference: &str) -> bool {
    let Some((dir, file)) = reference.split_once('/') else {
        return false;
    };
    let Some((stem, ext)) = file.rsplit_once('.') else {
        return false;
    };
    dir == REPORT_IMAGE_DIR
        && Uuid::parse_str(stem).is_ok()
        && ["jpg", "png", "gif", "webp"].contains(&ext)
}

fn url_under(base: &str, reference: &str) -> String {
    format!("{}/uploads/{}", base, reference)
}

/// Writes images below `UPLOAD_DIR`; `/uploads` serves them back.
pub struct LocalImageStore {
    config: UploadConfig,
}

impl LocalImageStore {
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn upload(&self, data: &[u8], content_type: &str) -> AppResult<String> {
        let reference = new_reference(content_type)?;
        let dir = Path::new(&self.config.upload_dir).join(REPORT_IMAGE_DIR);

        fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to create upload directory: {}", e)))?;

        let file_path = Path::new(&self.config.upload_dir).join(&reference);
        fs::write(&file_path, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write file: {}", e)))?;

        tracing::debug!(reference = %reference, bytes = data.len(), "image stored");
        Ok(reference)
    }

    async fn exists(&self, reference: &str) -> AppResult<bool> {
        if !is_issued_reference(reference) {
            return Ok(false);
        }
        let file_path = Path::new(&self.config.upload_dir).join(reference);
        fs::try_exists(&file_path)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to check file: {}", e)))
    }

    fn public_url(&self, reference: &str) -> String {
        url_under(&self.config.public_base_url, reference)
    }
}

/// Keeps uploaded bytes in a map. Nothing is served back over HTTP.
#[derive(Default)]
pub struct MemoryImageStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, reference: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(reference)
            .cloned()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn upload(&self, data: &[u8], content_type: &str) -> AppResult<String> {
        let reference = new_reference(content_type)?;
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(reference.clone(), data.to_vec());
        Ok(reference)
    }

    async fn exists(&self, reference: &str) -> AppResult<bool> {
        Ok(self
            .objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(reference))
    }

    fn public_url(&self, reference: &str) -> String {
        url_under("", reference)
    }
}
