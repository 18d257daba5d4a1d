pub mod profile;
pub mod progression;
pub mod report;

pub use profile::{Actor, Identity, PointAward, PointReason, Profile, Role, Session};
pub use progression::{LevelInfo, Progression};
pub use report::{
    Coordinates, NewReport, Report, ReportDraft, ReportFilter, ReportStatus, ReportSummary,
};
