use crate::domain::{
    Actor, PointAward, PointReason, Profile, Report, ReportDraft, ReportFilter, ReportStatus,
    Role,
};
use crate::error::{AppError, AppResult};
use crate::store::{ImageStore, ProfileStore, ReportStore};
use std::sync::Arc;

/// Outcome of a resolve call.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// This call flipped the report and credited the author.
    Resolved { report: Report, author: Profile },
    /// Someone got there first. Nothing was credited.
    AlreadyResolved(Report),
}

impl Resolution {
    pub fn report(&self) -> &Report {
        match self {
            Resolution::Resolved { report, .. } => report,
            Resolution::AlreadyResolved(report) => report,
        }
    }
}

/// Report submission and resolution.
///
/// Resolution is a two-step write across stores: a compare-and-set on the
/// report status, then an atomic point delta on the author. If the delta
/// fails the status flip is undone. A report left RESOLVED without its
/// ledger row (the undo failed too) is finished by the next resolve call.
#[derive(Clone)]
pub struct ReportLifecycle {
    reports: Arc<dyn ReportStore>,
    profiles: Arc<dyn ProfileStore>,
    images: Arc<dyn ImageStore>,
}

impl ReportLifecycle {
    pub fn new(
        reports: Arc<dyn ReportStore>,
        profiles: Arc<dyn ProfileStore>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        Self {
            reports,
            profiles,
            images,
        }
    }

    pub async fn submit(&self, actor: &Actor, draft: ReportDraft) -> AppResult<Report> {
        actor.require(Role::Helper)?;
        let new_report = draft.validate(actor.id, &actor.username)?;
        if !self.images.exists(&new_report.image_ref).await? {
            return Err(AppError::Validation(
                "image_ref does not refer to an uploaded image".to_string(),
            ));
        }

        let report = self.reports.create(new_report).await?;
        tracing::info!(report_id = report.id, author_id = actor.id, "report submitted");
        Ok(report)
    }

    pub async fn list(&self, filter: &ReportFilter) -> AppResult<(Vec<Report>, u64)> {
        self.reports.list_all(filter).await
    }

    pub async fn get(&self, report_id: i32) -> AppResult<Report> {
        self.reports.get_by_id(report_id).await
    }

    pub async fn resolve(&self, actor: &Actor, report_id: i32) -> AppResult<Resolution> {
        actor.require(Role::Authority)?;
        let target = ReportStatus::Resolved;

        let report = self.reports.get_by_id(report_id).await?;
        if !report.status.can_transition_to(target) {
            return self.settled(actor, report, target).await;
        }

        let flipped = self
            .reports
            .compare_and_set_status(report_id, report.status, target, Some(actor.id))
            .await?;
        if !flipped {
            // lost the race; report what the winner left behind
            let current = self.reports.get_by_id(report_id).await?;
            return self.settled(actor, current, target).await;
        }

        let award = Self::award_for(report_id, target, actor.id);
        let author = match self.profiles.apply_point_delta(report.author_id, &award).await {
            Ok(author) => author,
            Err(AppError::Conflict(_)) => {
                // a concurrent call finished the award first
                let current = self.reports.get_by_id(report_id).await?;
                return Ok(Resolution::AlreadyResolved(current));
            }
            Err(err) => {
                self.compensate(report_id, report.status, target).await;
                return Err(err);
            }
        };

        let report = match self.reports.get_by_id(report_id).await {
            Ok(stored) => stored,
            Err(err) => {
                tracing::warn!(report_id, error = %err, "re-read after resolve failed");
                Report {
                    status: target,
                    resolved_by: Some(actor.id),
                    resolved_at: Some(chrono::Utc::now().naive_utc()),
                    ..report
                }
            }
        };

        tracing::info!(
            report_id,
            resolver_id = actor.id,
            author_id = author.id,
            points = author.points,
            "report resolved"
        );
        Ok(Resolution::Resolved { report, author })
    }

    fn award_for(report_id: i32, target: ReportStatus, actor_id: i32) -> PointAward {
        PointAward {
            delta: target.award_on_entry(),
            reason: PointReason::ReportResolved,
            report_id,
            actor_id,
        }
    }

    /// The report is not in a state we can move out of. A resolved report
    /// whose award never landed gets it now.
    async fn settled(
        &self,
        actor: &Actor,
        report: Report,
        target: ReportStatus,
    ) -> AppResult<Resolution> {
        if report.status != target {
            return Err(AppError::Conflict(format!(
                "report is {} and cannot become {}",
                report.status, target
            )));
        }
        if self
            .profiles
            .has_award(report.id, PointReason::ReportResolved)
            .await?
        {
            return Ok(Resolution::AlreadyResolved(report));
        }

        let award = Self::award_for(report.id, target, report.resolved_by.unwrap_or(actor.id));
        match self.profiles.apply_point_delta(report.author_id, &award).await {
            Ok(author) => {
                tracing::warn!(
                    report_id = report.id,
                    author_id = author.id,
                    points = author.points,
                    "resolved report was missing its award; credited now"
                );
                Ok(Resolution::Resolved { report, author })
            }
            Err(AppError::Conflict(_)) => Ok(Resolution::AlreadyResolved(report)),
            Err(err) => Err(err),
        }
    }

    async fn compensate(&self, report_id: i32, previous: ReportStatus, applied: ReportStatus) {
        match self
            .profiles
            .has_award(report_id, PointReason::ReportResolved)
            .await
        {
            Ok(true) => {
                tracing::info!(report_id, "award already recorded; status kept");
                return;
            }
            Ok(false) => {}
            Err(err) => {
                // the next resolve call checks again before crediting
                tracing::warn!(report_id, error = %err, "award lookup failed before rollback");
            }
        }

        match self
            .reports
            .compare_and_set_status(report_id, applied, previous, None)
            .await
        {
            Ok(true) => tracing::warn!(report_id, "point award failed; status rolled back"),
            Ok(false) => tracing::error!(
                report_id,
                "point award failed and status changed underneath; not rolled back"
            ),
            Err(err) => tracing::error!(
                report_id,
                error = %err,
                "point award failed and status rollback failed; next resolve finishes the award"
            ),
        }
    }
}
