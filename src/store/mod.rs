//! Collaborator interfaces the report lifecycle, auth and profile services
//! are written against, plus their backends.
//!
//! `sea` talks to PostgreSQL through SeaORM, `memory` keeps everything in
//! process (tests and local runs), `image` holds the object stores.

pub mod image;
pub mod memory;
pub mod sea;

use crate::domain::{
    Identity, NewReport, PointAward, PointReason, Profile, Report, ReportFilter, ReportStatus,
    ReportSummary, Role, Session,
};
use crate::error::AppResult;
use async_trait::async_trait;

pub use image::{LocalImageStore, MemoryImageStore};
pub use memory::{MemoryIdentityProvider, MemoryProfileStore, MemoryReportStore};
pub use sea::{SeaIdentityProvider, SeaProfileStore, SeaReportStore};

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account. `Conflict` if the email is taken.
    async fn sign_up(&self, email: &str, password: &str) -> AppResult<Identity>;

    /// `Unauthorized` on unknown email or wrong password.
    async fn sign_in(&self, email: &str, password: &str) -> AppResult<Identity>;

    async fn open_session(&self, identity_id: i32) -> AppResult<Session>;

    /// `None` when the session was signed out, expired, or its account is gone.
    async fn current_user(&self, session: &Session) -> AppResult<Option<Identity>>;

    async fn sign_out(&self, session: &Session) -> AppResult<()>;

    /// Drop an account and its sessions. Used to undo a half-finished sign-up.
    async fn remove_account(&self, identity_id: i32) -> AppResult<()>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// `NotFound` if absent.
    async fn get_by_id(&self, id: i32) -> AppResult<Profile>;

    async fn get_by_username(&self, username: &str) -> AppResult<Option<Profile>>;

    /// New profile with zero points. `Conflict` on a taken id or username.
    async fn create(&self, id: i32, username: &str, role: Role) -> AppResult<Profile>;

    /// Atomically add `award.delta` to the profile's points and record it in
    /// the ledger. Returns the profile as it is after the update.
    ///
    /// `Conflict` if the ledger already holds an award for the same
    /// `(report_id, reason)`; nothing is changed in that case.
    async fn apply_point_delta(&self, id: i32, award: &PointAward) -> AppResult<Profile>;

    /// Whether an award for `(report_id, reason)` has been recorded.
    async fn has_award(&self, report_id: i32, reason: PointReason) -> AppResult<bool>;

    async fn update_bio(&self, id: i32, bio: Option<String>) -> AppResult<Profile>;

    async fn count_by_role(&self, role: Role) -> AppResult<u64>;
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Newest first, with the total count before paging.
    async fn list_all(&self, filter: &ReportFilter) -> AppResult<(Vec<Report>, u64)>;

    /// `NotFound` if absent.
    async fn get_by_id(&self, id: i32) -> AppResult<Report>;

    /// Persist a new report in `PENDING`.
    async fn create(&self, report: NewReport) -> AppResult<Report>;

    /// Set `new` only if the stored status is still `expected`.
    ///
    /// Entering `RESOLVED` records `actor_id` and the time; any other target
    /// clears them. Returns `false` when `expected` did not match (lost race or
    /// transition already applied); `NotFound` if the report does not exist.
    async fn compare_and_set_status(
        &self,
        id: i32,
        expected: ReportStatus,
        new: ReportStatus,
        actor_id: Option<i32>,
    ) -> AppResult<bool>;

    /// Counts over all reports, or over one author's when `author_id` is set.
    async fn summary(&self, author_id: Option<i32>) -> AppResult<ReportSummary>;
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store already-validated image bytes. Returns an opaque reference.
    async fn upload(&self, data: &[u8], content_type: &str) -> AppResult<String>;

    /// Whether `reference` was issued by `upload` and still resolves to an image.
    async fn exists(&self, reference: &str) -> AppResult<bool>;

    fn public_url(&self, reference: &str) -> String;
}
