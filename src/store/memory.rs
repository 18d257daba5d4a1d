//! Process-local stores. Every call takes one mutex for its whole duration,
//! so compare-and-set and point deltas are atomic without extra machinery.

use super::{IdentityProvider, ProfileStore, ReportStore};
use crate::domain::{
    Identity, NewReport, PointAward, PointReason, Profile, Report, ReportFilter, ReportStatus,
    ReportSummary, Role, Session,
};
use crate::error::{AppError, AppResult};
use crate::utils::{hash_password, verify_password};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

fn now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// Reports

#[derive(Default)]
struct ReportRows {
    next_id: i32,
    rows: BTreeMap<i32, Report>,
}

#[derive(Default)]
pub struct MemoryReportStore {
    inner: Mutex<ReportRows>,
    writes: AtomicUsize,
    fail_status_change_to: Mutex<Option<ReportStatus>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `compare_and_set_status` into `status` fail with a
    /// storage error. Other targets are unaffected.
    pub fn fail_next_status_change_to(&self, status: ReportStatus) {
        *lock(&self.fail_status_change_to) = Some(status);
    }

    /// Number of mutating calls so far (create and status changes).
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn list_all(&self, filter: &ReportFilter) -> AppResult<(Vec<Report>, u64)> {
        let inner = lock(&self.inner);
        let mut matching: Vec<&Report> = inner
            .rows
            .values()
            .filter(|r| filter.status.map_or(true, |s| r.status == s))
            .filter(|r| filter.author_id.map_or(true, |a| r.author_id == a))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as u64;
        let skip = filter.page.saturating_sub(1).saturating_mul(filter.per_page) as usize;
        let page = matching
            .into_iter()
            .skip(skip)
            .take(filter.per_page as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Report> {
        lock(&self.inner)
            .rows
            .get(&id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    async fn create(&self, report: NewReport) -> AppResult<Report> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut inner = lock(&self.inner);
        inner.next_id += 1;
        let saved = Report {
            id: inner.next_id,
            description: report.description,
            location: report.location,
            coordinates: report.coordinates,
            image_ref: report.image_ref,
            author_id: report.author_id,
            author_name: report.author_name,
            status: ReportStatus::Pending,
            resolved_by: None,
            resolved_at: None,
            created_at: now(),
        };
        inner.rows.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn compare_and_set_status(
        &self,
        id: i32,
        expected: ReportStatus,
        new: ReportStatus,
        actor_id: Option<i32>,
    ) -> AppResult<bool> {
        {
            let mut injected = lock(&self.fail_status_change_to);
            if *injected == Some(new) {
                *injected = None;
                return Err(AppError::Storage("injected status change failure".to_string()));
            }
        }

        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut inner = lock(&self.inner);
        let report = inner.rows.get_mut(&id).ok_or(AppError::NotFound)?;
        if report.status != expected {
            return Ok(false);
        }

        report.status = new;
        if new == ReportStatus::Resolved {
            report.resolved_by = actor_id;
            report.resolved_at = Some(now());
        } else {
            report.resolved_by = None;
            report.resolved_at = None;
        }
        Ok(true)
    }

    async fn summary(&self, author_id: Option<i32>) -> AppResult<ReportSummary> {
        let inner = lock(&self.inner);
        let mut summary = ReportSummary::default();
        let mut helpers = HashSet::new();

        for report in inner
            .rows
            .values()
            .filter(|r| author_id.map_or(true, |a| r.author_id == a))
        {
            summary.total += 1;
            match report.status {
                ReportStatus::Pending => summary.pending += 1,
                ReportStatus::Resolved => summary.resolved += 1,
                ReportStatus::Rejected => summary.rejected += 1,
            }
            helpers.insert(report.author_id);
        }
        summary.unique_helpers = helpers.len() as u64;
        Ok(summary)
    }
}

// ---------------------------------------------------------------------------
// Profiles

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub profile_id: i32,
    pub award: PointAward,
}

#[derive(Default)]
struct ProfileRows {
    rows: HashMap<i32, Profile>,
    ledger: Vec<LedgerEntry>,
}

#[derive(Default)]
pub struct MemoryProfileStore {
    inner: Mutex<ProfileRows>,
    fail_next_delta: AtomicBool,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `apply_point_delta` fail with a storage error.
    pub fn fail_next_point_delta(&self) {
        self.fail_next_delta.store(true, Ordering::SeqCst);
    }

    pub fn ledger(&self) -> Vec<LedgerEntry> {
        lock(&self.inner).ledger.clone()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get_by_id(&self, id: i32) -> AppResult<Profile> {
        lock(&self.inner)
            .rows
            .get(&id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    async fn get_by_username(&self, username: &str) -> AppResult<Option<Profile>> {
        Ok(lock(&self.inner)
            .rows
            .values()
            .find(|p| p.username == username)
            .cloned())
    }

    async fn create(&self, id: i32, username: &str, role: Role) -> AppResult<Profile> {
        let mut inner = lock(&self.inner);
        if inner.rows.contains_key(&id) || inner.rows.values().any(|p| p.username == username) {
            return Err(AppError::Conflict("Resource already exists".to_string()));
        }

        let ts = now();
        let profile = Profile {
            id,
            username: username.to_string(),
            role,
            points: 0,
            bio: None,
            created_at: ts,
            updated_at: ts,
        };
        inner.rows.insert(id, profile.clone());
        Ok(profile)
    }

    async fn apply_point_delta(&self, id: i32, award: &PointAward) -> AppResult<Profile> {
        if self.fail_next_delta.swap(false, Ordering::SeqCst) {
            return Err(AppError::Storage("injected point delta failure".to_string()));
        }

        let mut inner = lock(&self.inner);
        if inner
            .ledger
            .iter()
            .any(|e| e.award.report_id == award.report_id && e.award.reason == award.reason)
        {
            return Err(AppError::Conflict("Resource already exists".to_string()));
        }
        let profile = inner.rows.get_mut(&id).ok_or(AppError::NotFound)?;
        let points = profile
            .points
            .checked_add(award.delta)
            .filter(|p| *p >= 0)
            .ok_or_else(|| AppError::Validation("points would leave the valid range".to_string()))?;
        profile.points = points;
        profile.updated_at = now();
        let updated = profile.clone();

        inner.ledger.push(LedgerEntry {
            profile_id: id,
            award: award.clone(),
        });
        Ok(updated)
    }

    async fn has_award(&self, report_id: i32, reason: PointReason) -> AppResult<bool> {
        Ok(lock(&self.inner)
            .ledger
            .iter()
            .any(|e| e.award.report_id == report_id && e.award.reason == reason))
    }

    async fn update_bio(&self, id: i32, bio: Option<String>) -> AppResult<Profile> {
        let mut inner = lock(&self.inner);
        let profile = inner.rows.get_mut(&id).ok_or(AppError::NotFound)?;
        profile.bio = bio;
        profile.updated_at = now();
        Ok(profile.clone())
    }

    async fn count_by_role(&self, role: Role) -> AppResult<u64> {
        Ok(lock(&self.inner)
            .rows
            .values()
            .filter(|p| p.role == role)
            .count() as u64)
    }
}

// ---------------------------------------------------------------------------
// Identity

struct Account {
    id: i32,
    email: String,
    password_hash: String,
}

struct SessionRow {
    user_id: i32,
    expires_at: NaiveDateTime,
}

#[derive(Default)]
struct IdentityRows {
    next_id: i32,
    accounts: HashMap<i32, Account>,
    sessions: HashMap<Uuid, SessionRow>,
}

pub struct MemoryIdentityProvider {
    inner: Mutex<IdentityRows>,
    bcrypt_cost: u32,
    session_ttl: chrono::Duration,
}

impl MemoryIdentityProvider {
    pub fn new(bcrypt_cost: u32, session_ttl_seconds: u64) -> Self {
        Self {
            inner: Mutex::new(IdentityRows::default()),
            bcrypt_cost,
            session_ttl: chrono::Duration::seconds(session_ttl_seconds as i64),
        }
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str) -> AppResult<Identity> {
        let email = email.trim().to_ascii_lowercase();
        if lock(&self.inner).accounts.values().any(|a| a.email == email) {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        // hash outside the lock, then re-check
        let password_hash = hash_password(password, self.bcrypt_cost)?;
        let mut inner = lock(&self.inner);
        if inner.accounts.values().any(|a| a.email == email) {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.accounts.insert(
            id,
            Account {
                id,
                email: email.clone(),
                password_hash,
            },
        );
        Ok(Identity { id, email })
    }

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<Identity> {
        let email = email.trim().to_ascii_lowercase();
        let (id, password_hash) = {
            let inner = lock(&self.inner);
            let account = inner
                .accounts
                .values()
                .find(|a| a.email == email)
                .ok_or(AppError::Unauthorized)?;
            (account.id, account.password_hash.clone())
        };

        if !verify_password(password, &password_hash)? {
            return Err(AppError::Unauthorized);
        }
        Ok(Identity { id, email })
    }

    async fn open_session(&self, identity_id: i32) -> AppResult<Session> {
        let mut inner = lock(&self.inner);
        if !inner.accounts.contains_key(&identity_id) {
            return Err(AppError::NotFound);
        }
        let session = Session {
            id: Uuid::new_v4(),
            user_id: identity_id,
        };
        inner.sessions.insert(
            session.id,
            SessionRow {
                user_id: identity_id,
                expires_at: now() + self.session_ttl,
            },
        );
        Ok(session)
    }

    async fn current_user(&self, session: &Session) -> AppResult<Option<Identity>> {
        let inner = lock(&self.inner);
        let live = inner
            .sessions
            .get(&session.id)
            .is_some_and(|s| s.user_id == session.user_id && s.expires_at > now());
        if !live {
            return Ok(None);
        }
        Ok(inner.accounts.get(&session.user_id).map(|a| Identity {
            id: a.id,
            email: a.email.clone(),
        }))
    }

    async fn sign_out(&self, session: &Session) -> AppResult<()> {
        lock(&self.inner).sessions.remove(&session.id);
        Ok(())
    }

    async fn remove_account(&self, identity_id: i32) -> AppResult<()> {
        let mut inner = lock(&self.inner);
        inner.accounts.remove(&identity_id);
        inner.sessions.retain(|_, s| s.user_id != identity_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ReportDraft;

    fn new_report(author_id: i32) -> NewReport {
        ReportDraft {
            description: "Tyres dumped by the lake".to_string(),
            location: "Lakeside".to_string(),
            latitude: None,
            longitude: None,
            image_ref: "report-images/x.jpg".to_string(),
        }
        .validate(author_id, "helper")
        .unwrap()
    }

    #[tokio::test]
    async fn create_starts_pending() {
        let store = MemoryReportStore::new();
        let report = store.create(new_report(1)).await.unwrap();
        assert_eq!(report.status, ReportStatus::Pending);
        assert_eq!(store.get_by_id(report.id).await.unwrap(), report);
    }

    #[tokio::test]
    async fn compare_and_set_only_matches_expected() {
        let store = MemoryReportStore::new();
        let report = store.create(new_report(1)).await.unwrap();

        assert!(store
            .compare_and_set_status(report.id, ReportStatus::Pending, ReportStatus::Resolved, Some(9))
            .await
            .unwrap());
        assert!(!store
            .compare_and_set_status(report.id, ReportStatus::Pending, ReportStatus::Resolved, Some(9))
            .await
            .unwrap());

        let stored = store.get_by_id(report.id).await.unwrap();
        assert_eq!(stored.status, ReportStatus::Resolved);
        assert_eq!(stored.resolved_by, Some(9));
        assert!(stored.resolved_at.is_some());
    }

    #[tokio::test]
    async fn compare_and_set_on_missing_report_is_not_found() {
        let store = MemoryReportStore::new();
        let result = store
            .compare_and_set_status(404, ReportStatus::Pending, ReportStatus::Resolved, None)
            .await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn list_is_newest_first_and_paged() {
        let store = MemoryReportStore::new();
        for author in 1..=5 {
            store.create(new_report(author)).await.unwrap();
        }

        let filter = ReportFilter {
            per_page: 2,
            ..Default::default()
        };
        let (page, total) = store.list_all(&filter).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.iter().map(|r| r.id).collect::<Vec<_>>(), vec![5, 4]);

        let filter = ReportFilter {
            author_id: Some(3),
            ..Default::default()
        };
        let (page, total) = store.list_all(&filter).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(page[0].author_id, 3);
    }

    #[tokio::test]
    async fn summary_counts_statuses_and_helpers() {
        let store = MemoryReportStore::new();
        let a = store.create(new_report(1)).await.unwrap();
        store.create(new_report(1)).await.unwrap();
        store.create(new_report(2)).await.unwrap();
        store
            .compare_and_set_status(a.id, ReportStatus::Pending, ReportStatus::Resolved, Some(7))
            .await
            .unwrap();

        let all = store.summary(None).await.unwrap();
        assert_eq!(all.total, 3);
        assert_eq!(all.pending, 2);
        assert_eq!(all.resolved, 1);
        assert_eq!(all.unique_helpers, 2);

        let mine = store.summary(Some(1)).await.unwrap();
        assert_eq!(mine.total, 2);
        assert_eq!(mine.resolved, 1);
    }

    #[tokio::test]
    async fn point_delta_is_recorded_in_ledger() {
        let store = MemoryProfileStore::new();
        store.create(1, "alice", Role::Helper).await.unwrap();
        let award = PointAward {
            delta: 20,
            reason: PointReason::ReportResolved,
            report_id: 3,
            actor_id: 2,
        };

        let updated = store.apply_point_delta(1, &award).await.unwrap();
        assert_eq!(updated.points, 20);
        assert_eq!(store.ledger().len(), 1);
        assert_eq!(store.ledger()[0].award, award);
    }

    #[tokio::test]
    async fn second_award_for_a_report_conflicts() {
        let store = MemoryProfileStore::new();
        store.create(1, "alice", Role::Helper).await.unwrap();
        let award = PointAward {
            delta: 20,
            reason: PointReason::ReportResolved,
            report_id: 3,
            actor_id: 2,
        };

        assert!(!store.has_award(3, PointReason::ReportResolved).await.unwrap());
        store.apply_point_delta(1, &award).await.unwrap();
        assert!(store.has_award(3, PointReason::ReportResolved).await.unwrap());
        assert!(matches!(
            store.apply_point_delta(1, &award).await,
            Err(AppError::Conflict(_))
        ));
        assert_eq!(store.get_by_id(1).await.unwrap().points, 20);
        assert_eq!(store.ledger().len(), 1);
    }

    #[tokio::test]
    async fn injected_status_failure_hits_only_its_target() {
        let store = MemoryReportStore::new();
        let report = store.create(new_report(1)).await.unwrap();
        store.fail_next_status_change_to(ReportStatus::Pending);

        assert!(store
            .compare_and_set_status(report.id, ReportStatus::Pending, ReportStatus::Resolved, Some(9))
            .await
            .unwrap());
        assert!(matches!(
            store
                .compare_and_set_status(report.id, ReportStatus::Resolved, ReportStatus::Pending, None)
                .await,
            Err(AppError::Storage(_))
        ));
        assert_eq!(
            store.get_by_id(report.id).await.unwrap().status,
            ReportStatus::Resolved
        );
    }

    #[tokio::test]
    async fn point_delta_cannot_go_negative() {
        let store = MemoryProfileStore::new();
        store.create(1, "alice", Role::Helper).await.unwrap();
        let award = PointAward {
            delta: -5,
            reason: PointReason::ReportResolved,
            report_id: 3,
            actor_id: 2,
        };
        assert!(store.apply_point_delta(1, &award).await.is_err());
        assert_eq!(store.get_by_id(1).await.unwrap().points, 0);
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let store = MemoryProfileStore::new();
        store.create(1, "alice", Role::Helper).await.unwrap();
        assert!(matches!(
            store.create(2, "alice", Role::Helper).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn signed_out_session_is_not_current() {
        let idp = MemoryIdentityProvider::new(4, 3600);
        let identity = idp.sign_up("Eco@Example.org", "password123").await.unwrap();
        assert_eq!(identity.email, "eco@example.org");

        let session = idp.open_session(identity.id).await.unwrap();
        assert_eq!(idp.current_user(&session).await.unwrap(), Some(identity));

        idp.sign_out(&session).await.unwrap();
        assert_eq!(idp.current_user(&session).await.unwrap(), None);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let idp = MemoryIdentityProvider::new(4, 3600);
        idp.sign_up("a@example.org", "password123").await.unwrap();
        assert!(matches!(
            idp.sign_in("a@example.org", "nope").await,
            Err(AppError::Unauthorized)
        ));
        assert!(idp.sign_in("a@example.org", "password123").await.is_ok());
    }

    #[tokio::test]
    async fn removed_account_loses_sessions() {
        let idp = MemoryIdentityProvider::new(4, 3600);
        let identity = idp.sign_up("b@example.org", "password123").await.unwrap();
        let session = idp.open_session(identity.id).await.unwrap();
        idp.remove_account(identity.id).await.unwrap();
        assert_eq!(idp.current_user(&session).await.unwrap(), None);
        assert!(idp.sign_in("b@example.org", "password123").await.is_err());
    }
}
