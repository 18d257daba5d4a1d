use crate::{
    domain::{Profile, Progression, Role},
    error::AppResult,
    state::AppState,
    store::ReportStore,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

/// Per-role dashboard numbers.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStats {
    Helper {
        reports_submitted: u64,
        reports_resolved: u64,
        progression: Progression,
    },
    Authority {
        total_reports: u64,
        pending_reports: u64,
        resolved_reports: u64,
        unique_helpers: u64,
    },
}

pub struct StatsService {
    reports: Arc<dyn ReportStore>,
}

impl StatsService {
    pub fn new(state: &AppState) -> Self {
        Self {
            reports: state.reports.clone(),
        }
    }

    pub async fn for_profile(&self, profile: &Profile) -> AppResult<UserStats> {
        match profile.role {
            Role::Helper => {
                let mine = self.reports.summary(Some(profile.id)).await?;
                Ok(UserStats::Helper {
                    reports_submitted: mine.total,
                    reports_resolved: mine.resolved,
                    progression: profile.progression(),
                })
            }
            Role::Authority => {
                let all = self.reports.summary(None).await?;
                Ok(UserStats::Authority {
                    total_reports: all.total,
                    pending_reports: all.pending,
                    resolved_reports: all.resolved,
                    unique_helpers: all.unique_helpers,
                })
            }
        }
    }
}
