use sea_orm_migration::prelude::*;

mod m20260301_000001_create_accounts_table;
mod m20260301_000002_create_sessions_table;
mod m20260301_000003_create_profiles_table;
mod m20260301_000004_create_reports_table;
mod m20260301_000005_create_points_ledger;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_accounts_table::Migration),
            Box::new(m20260301_000002_create_sessions_table::Migration),
            Box::new(m20260301_000003_create_profiles_table::Migration),
            Box::new(m20260301_000004_create_reports_table::Migration),
            Box::new(m20260301_000005_create_points_ledger::Migration),
        ]
    }
}
