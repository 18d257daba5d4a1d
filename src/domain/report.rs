use crate::error::{AppError, AppResult};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// XP credited to the author when an authority resolves their report.
pub const REPORT_RESOLVED_AWARD: i32 = 20;

const MAX_DESCRIPTION_CHARS: usize = 2000;
const MAX_LOCATION_CHARS: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Pending,
    Resolved,
    /// Declared for moderation; no transition produces it yet.
    Rejected,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Pending => "PENDING",
            ReportStatus::Resolved => "RESOLVED",
            ReportStatus::Rejected => "REJECTED",
        }
    }

    pub fn can_transition_to(self, next: ReportStatus) -> bool {
        matches!(
            (self, next),
            (ReportStatus::Pending, ReportStatus::Resolved)
        )
    }

    /// Points credited to the author when a report enters `self`.
    pub fn award_on_entry(self) -> i32 {
        match self {
            ReportStatus::Resolved => REPORT_RESOLVED_AWARD,
            ReportStatus::Pending | ReportStatus::Rejected => 0,
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(ReportStatus::Pending),
            "RESOLVED" => Ok(ReportStatus::Resolved),
            "REJECTED" => Ok(ReportStatus::Rejected),
            other => Err(AppError::Validation(format!(
                "status must be one of: PENDING, RESOLVED, REJECTED (got '{}')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub id: i32,
    pub description: String,
    pub location: String,
    pub coordinates: Option<Coordinates>,
    pub image_ref: String,
    pub author_id: i32,
    pub author_name: String,
    pub status: ReportStatus,
    pub resolved_by: Option<i32>,
    pub resolved_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

/// What a helper sends; checked before anything touches a store.
#[derive(Debug, Clone, Default)]
pub struct ReportDraft {
    pub description: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub image_ref: String,
}

/// A validated draft stamped with its author, ready for `ReportStore::create`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    pub description: String,
    pub location: String,
    pub coordinates: Option<Coordinates>,
    pub image_ref: String,
    pub author_id: i32,
    pub author_name: String,
}

impl ReportDraft {
    pub fn validate(self, author_id: i32, author_name: &str) -> AppResult<NewReport> {
        let description = self.description.trim();
        if description.is_empty() {
            return Err(AppError::Validation("description is required".to_string()));
        }
        if description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(AppError::Validation(format!(
                "description must be at most {} characters",
                MAX_DESCRIPTION_CHARS
            )));
        }

        let location = self.location.trim();
        if location.is_empty() {
            return Err(AppError::Validation("location is required".to_string()));
        }
        if location.chars().count() > MAX_LOCATION_CHARS {
            return Err(AppError::Validation(format!(
                "location must be at most {} characters",
                MAX_LOCATION_CHARS
            )));
        }

        let image_ref = self.image_ref.trim();
        if image_ref.is_empty() {
            return Err(AppError::Validation("an image is required".to_string()));
        }

        let coordinates = match (self.latitude, self.longitude) {
            (None, None) => None,
            (Some(latitude), Some(longitude)) => {
                if !(-90.0..=90.0).contains(&latitude) {
                    return Err(AppError::Validation(
                        "latitude must be between -90 and 90".to_string(),
                    ));
                }
                if !(-180.0..=180.0).contains(&longitude) {
                    return Err(AppError::Validation(
                        "longitude must be between -180 and 180".to_string(),
                    ));
                }
                Some(Coordinates {
                    latitude,
                    longitude,
                })
            }
            _ => {
                return Err(AppError::Validation(
                    "latitude and longitude must be provided together".to_string(),
                ))
            }
        };

        Ok(NewReport {
            description: description.to_string(),
            location: location.to_string(),
            coordinates,
            image_ref: image_ref.to_string(),
            author_id,
            author_name: author_name.to_string(),
        })
    }
}

/// Listing filter; results are always newest first.
#[derive(Debug, Clone)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
    pub author_id: Option<i32>,
    pub page: u64,
    pub per_page: u64,
}

impl Default for ReportFilter {
    fn default() -> Self {
        Self {
            status: None,
            author_id: None,
            page: 1,
            per_page: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub total: u64,
    pub pending: u64,
    pub resolved: u64,
    pub rejected: u64,
    pub unique_helpers: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ReportDraft {
        ReportDraft {
            description: "Plastic bags along the river bank".to_string(),
            location: "Riverside park, north gate".to_string(),
            latitude: Some(52.52),
            longitude: Some(13.405),
            image_ref: "report-images/abc.jpg".to_string(),
        }
    }

    #[test]
    fn only_pending_to_resolved_is_legal() {
        use ReportStatus::*;
        assert!(Pending.can_transition_to(Resolved));
        assert!(!Pending.can_transition_to(Rejected));
        assert!(!Resolved.can_transition_to(Pending));
        assert!(!Resolved.can_transition_to(Resolved));
        assert!(!Rejected.can_transition_to(Resolved));
    }

    #[test]
    fn only_resolution_awards_points() {
        assert_eq!(ReportStatus::Resolved.award_on_entry(), 20);
        assert_eq!(ReportStatus::Pending.award_on_entry(), 0);
        assert_eq!(ReportStatus::Rejected.award_on_entry(), 0);
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("pending".parse::<ReportStatus>().unwrap(), ReportStatus::Pending);
        assert_eq!("RESOLVED".parse::<ReportStatus>().unwrap(), ReportStatus::Resolved);
        assert!("done".parse::<ReportStatus>().is_err());
    }

    #[test]
    fn valid_draft_is_trimmed_and_stamped() {
        let mut d = draft();
        d.description = "  Oil slick  ".to_string();
        let new = d.validate(7, "alice").unwrap();
        assert_eq!(new.description, "Oil slick");
        assert_eq!(new.author_id, 7);
        assert_eq!(new.author_name, "alice");
        assert!(new.coordinates.is_some());
    }

    #[test]
    fn blank_description_rejected() {
        let mut d = draft();
        d.description = "   ".to_string();
        assert!(matches!(d.validate(1, "a"), Err(AppError::Validation(_))));
    }

    #[test]
    fn missing_image_rejected() {
        let mut d = draft();
        d.image_ref.clear();
        assert!(matches!(d.validate(1, "a"), Err(AppError::Validation(_))));
    }

    #[test]
    fn missing_location_rejected() {
        let mut d = draft();
        d.location = String::new();
        assert!(matches!(d.validate(1, "a"), Err(AppError::Validation(_))));
    }

    #[test]
    fn half_coordinates_rejected() {
        let mut d = draft();
        d.longitude = None;
        assert!(matches!(d.validate(1, "a"), Err(AppError::Validation(_))));
    }

    #[test]
    fn out_of_range_coordinates_rejected() {
        let mut d = draft();
        d.latitude = Some(91.0);
        assert!(matches!(d.validate(1, "a"), Err(AppError::Validation(_))));

        let mut d = draft();
        d.longitude = Some(-180.5);
        assert!(matches!(d.validate(1, "a"), Err(AppError::Validation(_))));
    }

    #[test]
    fn coordinates_are_optional() {
        let mut d = draft();
        d.latitude = None;
        d.longitude = None;
        assert_eq!(d.validate(1, "a").unwrap().coordinates, None);
    }
}
