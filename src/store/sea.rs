//! PostgreSQL backends over SeaORM.

use super::{IdentityProvider, ProfileStore, ReportStore};
use crate::domain::{
    Coordinates, Identity, NewReport, PointAward, PointReason, Profile, Report, ReportFilter,
    ReportStatus, ReportSummary, Role, Session,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    account, points_ledger, profile, report, session, Account, PointsLedger,
    Profile as ProfileEntity, Report as ReportEntity, Session as SessionEntity,
};
use crate::utils::{hash_password, verify_password};
use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

fn now() -> chrono::NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

fn corrupt(what: &str, err: AppError) -> AppError {
    AppError::Internal(anyhow::anyhow!("corrupt {} column: {}", what, err))
}

fn to_report(model: report::Model) -> AppResult<Report> {
    let status = model
        .status
        .parse::<ReportStatus>()
        .map_err(|e| corrupt("reports.status", e))?;
    let coordinates = match (model.latitude, model.longitude) {
        (Some(latitude), Some(longitude)) => Some(Coordinates {
            latitude,
            longitude,
        }),
        _ => None,
    };

    Ok(Report {
        id: model.id,
        description: model.description,
        location: model.location,
        coordinates,
        image_ref: model.image_ref,
        author_id: model.author_id,
        author_name: model.author_name,
        status,
        resolved_by: model.resolved_by,
        resolved_at: model.resolved_at,
        created_at: model.created_at,
    })
}

fn to_profile(model: profile::Model) -> AppResult<Profile> {
    let role = model
        .role
        .parse::<Role>()
        .map_err(|e| corrupt("profiles.role", e))?;

    Ok(Profile {
        id: model.id,
        username: model.username,
        role,
        points: model.points,
        bio: model.bio,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

// ---------------------------------------------------------------------------
// Reports

pub struct SeaReportStore {
    db: DatabaseConnection,
}

impl SeaReportStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn scoped(author_id: Option<i32>) -> sea_orm::Select<ReportEntity> {
        let mut query = ReportEntity::find();
        if let Some(author_id) = author_id {
            query = query.filter(report::Column::AuthorId.eq(author_id));
        }
        query
    }

    async fn count_status(&self, author_id: Option<i32>, status: ReportStatus) -> AppResult<u64> {
        Ok(Self::scoped(author_id)
            .filter(report::Column::Status.eq(status.as_str()))
            .count(&self.db)
            .await?)
    }
}

#[async_trait]
impl ReportStore for SeaReportStore {
    async fn list_all(&self, filter: &ReportFilter) -> AppResult<(Vec<Report>, u64)> {
        let mut query = Self::scoped(filter.author_id);
        if let Some(status) = filter.status {
            query = query.filter(report::Column::Status.eq(status.as_str()));
        }

        let paginator = query
            .order_by_desc(report::Column::CreatedAt)
            .order_by_desc(report::Column::Id)
            .paginate(&self.db, filter.per_page);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(filter.page.saturating_sub(1)).await?;

        let reports = rows.into_iter().map(to_report).collect::<AppResult<_>>()?;
        Ok((reports, total))
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Report> {
        let model = ReportEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;
        to_report(model)
    }

    async fn create(&self, new: NewReport) -> AppResult<Report> {
        let model = report::ActiveModel {
            description: Set(new.description),
            location: Set(new.location),
            latitude: Set(new.coordinates.map(|c| c.latitude)),
            longitude: Set(new.coordinates.map(|c| c.longitude)),
            image_ref: Set(new.image_ref),
            author_id: Set(new.author_id),
            author_name: Set(new.author_name),
            status: Set(ReportStatus::Pending.as_str().to_string()),
            resolved_by: Set(None),
            resolved_at: Set(None),
            created_at: Set(now()),
            ..Default::default()
        };

        let saved = model.insert(&self.db).await?;
        to_report(saved)
    }

    async fn compare_and_set_status(
        &self,
        id: i32,
        expected: ReportStatus,
        new: ReportStatus,
        actor_id: Option<i32>,
    ) -> AppResult<bool> {
        let (resolved_by, resolved_at) = if new == ReportStatus::Resolved {
            (actor_id, Some(now()))
        } else {
            (None, None)
        };

        // single conditional UPDATE: the status filter is the compare step
        let result = ReportEntity::update_many()
            .col_expr(report::Column::Status, Expr::value(new.as_str()))
            .col_expr(report::Column::ResolvedBy, Expr::value(resolved_by))
            .col_expr(report::Column::ResolvedAt, Expr::value(resolved_at))
            .filter(report::Column::Id.eq(id))
            .filter(report::Column::Status.eq(expected.as_str()))
            .exec(&self.db)
            .await?;

        if result.rows_affected > 0 {
            return Ok(true);
        }

        let exists = ReportEntity::find_by_id(id).count(&self.db).await? > 0;
        if exists {
            Ok(false)
        } else {
            Err(AppError::NotFound)
        }
    }

    async fn summary(&self, author_id: Option<i32>) -> AppResult<ReportSummary> {
        let total = Self::scoped(author_id).count(&self.db).await?;
        let pending = self.count_status(author_id, ReportStatus::Pending).await?;
        let resolved = self.count_status(author_id, ReportStatus::Resolved).await?;
        let rejected = self.count_status(author_id, ReportStatus::Rejected).await?;
        let unique_helpers = Self::scoped(author_id)
            .select_only()
            .column(report::Column::AuthorId)
            .distinct()
            .count(&self.db)
            .await?;

        Ok(ReportSummary {
            total,
            pending,
            resolved,
            rejected,
            unique_helpers,
        })
    }
}

// ---------------------------------------------------------------------------
// Profiles

pub struct SeaProfileStore {
    db: DatabaseConnection,
}

impl SeaProfileStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProfileStore for SeaProfileStore {
    async fn get_by_id(&self, id: i32) -> AppResult<Profile> {
        let model = ProfileEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;
        to_profile(model)
    }

    async fn get_by_username(&self, username: &str) -> AppResult<Option<Profile>> {
        ProfileEntity::find()
            .filter(profile::Column::Username.eq(username))
            .one(&self.db)
            .await?
            .map(to_profile)
            .transpose()
    }

    async fn create(&self, id: i32, username: &str, role: Role) -> AppResult<Profile> {
        let ts = now();
        let model = profile::ActiveModel {
            id: Set(id),
            username: Set(username.to_string()),
            role: Set(role.as_str().to_string()),
            points: Set(0),
            bio: Set(None),
            created_at: Set(ts),
            updated_at: Set(ts),
        };

        let saved = model.insert(&self.db).await?;
        to_profile(saved)
    }

    async fn apply_point_delta(&self, id: i32, award: &PointAward) -> AppResult<Profile> {
        let txn = self.db.begin().await?;

        points_ledger::ActiveModel {
            profile_id: Set(id),
            delta: Set(award.delta),
            reason: Set(award.reason.as_str().to_string()),
            report_id: Set(award.report_id),
            actor_id: Set(award.actor_id),
            created_at: Set(now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        // points = points + delta, never below zero
        let result = ProfileEntity::update_many()
            .col_expr(
                profile::Column::Points,
                Expr::col(profile::Column::Points).add(award.delta),
            )
            .col_expr(profile::Column::UpdatedAt, Expr::value(now()))
            .filter(profile::Column::Id.eq(id))
            .filter(profile::Column::Points.gte(-award.delta))
            .exec(&txn)
            .await?;

        let updated = ProfileEntity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound)?;
        if result.rows_affected == 0 {
            return Err(AppError::Validation(
                "points would leave the valid range".to_string(),
            ));
        }

        txn.commit().await?;
        to_profile(updated)
    }

    async fn has_award(&self, report_id: i32, reason: PointReason) -> AppResult<bool> {
        let count = PointsLedger::find()
            .filter(points_ledger::Column::ReportId.eq(report_id))
            .filter(points_ledger::Column::Reason.eq(reason.as_str()))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn update_bio(&self, id: i32, bio: Option<String>) -> AppResult<Profile> {
        let existing = ProfileEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: profile::ActiveModel = existing.into();
        active.bio = Set(bio);
        active.updated_at = Set(now());

        let updated = active.update(&self.db).await?;
        to_profile(updated)
    }

    async fn count_by_role(&self, role: Role) -> AppResult<u64> {
        Ok(ProfileEntity::find()
            .filter(profile::Column::Role.eq(role.as_str()))
            .count(&self.db)
            .await?)
    }
}

// ---------------------------------------------------------------------------
// Identity

pub struct SeaIdentityProvider {
    db: DatabaseConnection,
    bcrypt_cost: u32,
    session_ttl: chrono::Duration,
}

impl SeaIdentityProvider {
    pub fn new(db: DatabaseConnection, bcrypt_cost: u32, session_ttl_seconds: u64) -> Self {
        Self {
            db,
            bcrypt_cost,
            session_ttl: chrono::Duration::seconds(session_ttl_seconds as i64),
        }
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<account::Model>> {
        Ok(Account::find()
            .filter(account::Column::Email.eq(email))
            .one(&self.db)
            .await?)
    }
}

#[async_trait]
impl IdentityProvider for SeaIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str) -> AppResult<Identity> {
        let email = email.trim().to_ascii_lowercase();
        if self.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash_password(password, self.bcrypt_cost)?;
        let saved = account::ActiveModel {
            email: Set(email),
            password_hash: Set(password_hash),
            created_at: Set(now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        Ok(Identity {
            id: saved.id,
            email: saved.email,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<Identity> {
        let email = email.trim().to_ascii_lowercase();
        let account = self
            .find_by_email(&email)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(password, &account.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        Ok(Identity {
            id: account.id,
            email: account.email,
        })
    }

    async fn open_session(&self, identity_id: i32) -> AppResult<Session> {
        Account::find_by_id(identity_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let ts = now();
        let saved = session::ActiveModel {
            id: Set(Uuid::new_v4()),
            account_id: Set(identity_id),
            expires_at: Set(ts + self.session_ttl),
            created_at: Set(ts),
        }
        .insert(&self.db)
        .await?;

        Ok(Session {
            id: saved.id,
            user_id: saved.account_id,
        })
    }

    async fn current_user(&self, session: &Session) -> AppResult<Option<Identity>> {
        let Some(row) = SessionEntity::find_by_id(session.id).one(&self.db).await? else {
            return Ok(None);
        };
        if row.account_id != session.user_id || row.expires_at <= now() {
            return Ok(None);
        }

        Ok(Account::find_by_id(row.account_id)
            .one(&self.db)
            .await?
            .map(|account| Identity {
                id: account.id,
                email: account.email,
            }))
    }

    async fn sign_out(&self, session: &Session) -> AppResult<()> {
        SessionEntity::delete_by_id(session.id)
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn remove_account(&self, identity_id: i32) -> AppResult<()> {
        // sessions and profile go with it (ON DELETE CASCADE)
        Account::delete_by_id(identity_id).exec(&self.db).await?;
        Ok(())
    }
}
