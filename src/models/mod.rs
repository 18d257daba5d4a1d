pub mod account;
pub mod points_ledger;
pub mod profile;
pub mod report;
pub mod session;

pub use account::{Entity as Account, Model as AccountModel};
pub use points_ledger::Entity as PointsLedger;
pub use profile::{Entity as Profile, Model as ProfileModel};
pub use report::{Entity as Report, Model as ReportModel};
pub use session::Entity as Session;
