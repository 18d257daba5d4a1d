use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    /// Process-local stores; data is lost on restart.
    Memory,
}

impl StorageBackend {
    pub fn from_env() -> anyhow::Result<Self> {
        let raw = env::var("STORAGE_BACKEND").unwrap_or_else(|_| "postgres".to_string());
        match raw.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" | "in-memory" => Ok(StorageBackend::Memory),
            other => Err(anyhow::anyhow!(
                "STORAGE_BACKEND must be 'postgres' or 'memory', got '{}'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub upload_dir: String,
    /// Prefix for image URLs handed to clients, e.g. `https://cdn.example.org`.
    /// Empty means URLs are relative to this server.
    pub public_base_url: String,
}

impl UploadConfig {
    pub fn from_env() -> Self {
        Self {
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string()),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .unwrap_or_default(),
        }
    }
}
