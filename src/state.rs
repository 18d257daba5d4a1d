use crate::config::{AppConfig, AuthPolicy, CookieConfig};
use crate::services::lifecycle::ReportLifecycle;
use crate::store::{
    IdentityProvider, ImageStore, LocalImageStore, MemoryIdentityProvider, MemoryImageStore,
    MemoryProfileStore, MemoryReportStore, ProfileStore, ReportStore, SeaIdentityProvider,
    SeaProfileStore, SeaReportStore,
};
use crate::utils::TokenIssuer;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Shared handles for request handlers, installed as an `Extension`.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityProvider>,
    pub profiles: Arc<dyn ProfileStore>,
    pub reports: Arc<dyn ReportStore>,
    pub images: Arc<dyn ImageStore>,
    pub tokens: TokenIssuer,
    pub auth: AuthPolicy,
    pub cookies: CookieConfig,
}

impl AppState {
    pub fn postgres(db: DatabaseConnection, config: &AppConfig) -> Self {
        Self {
            identity: Arc::new(SeaIdentityProvider::new(
                db.clone(),
                config.auth.bcrypt_cost,
                config.jwt.refresh_token_expiry,
            )),
            profiles: Arc::new(SeaProfileStore::new(db.clone())),
            reports: Arc::new(SeaReportStore::new(db)),
            images: Arc::new(LocalImageStore::new(config.upload.clone())),
            tokens: TokenIssuer::new(&config.jwt),
            auth: config.auth.clone(),
            cookies: config.cookies.clone(),
        }
    }

    /// Process-local stores. Images still go to disk so `/uploads` can serve them.
    pub fn in_memory(config: &AppConfig) -> Self {
        Self {
            identity: Arc::new(MemoryIdentityProvider::new(
                config.auth.bcrypt_cost,
                config.jwt.refresh_token_expiry,
            )),
            profiles: Arc::new(MemoryProfileStore::new()),
            reports: Arc::new(MemoryReportStore::new()),
            images: Arc::new(LocalImageStore::new(config.upload.clone())),
            tokens: TokenIssuer::new(&config.jwt),
            auth: config.auth.clone(),
            cookies: config.cookies.clone(),
        }
    }

    /// Swap the image store, e.g. for `MemoryImageStore` in tests.
    pub fn with_images(mut self, images: Arc<dyn ImageStore>) -> Self {
        self.images = images;
        self
    }

    pub fn with_memory_images(self) -> Self {
        self.with_images(Arc::new(MemoryImageStore::new()))
    }

    pub fn lifecycle(&self) -> ReportLifecycle {
        ReportLifecycle::new(
            self.reports.clone(),
            self.profiles.clone(),
            self.images.clone(),
        )
    }
}
