use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum PointsLedger {
    Table,
    Id,
    ProfileId,
    Delta,
    Reason,
    ReportId,
    ActorId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PointsLedger::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PointsLedger::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PointsLedger::ProfileId).integer().not_null())
                    .col(ColumnDef::new(PointsLedger::Delta).integer().not_null())
                    .col(ColumnDef::new(PointsLedger::Reason).string_len(64).not_null())
                    .col(ColumnDef::new(PointsLedger::ReportId).integer().not_null())
                    .col(ColumnDef::new(PointsLedger::ActorId).integer().not_null())
                    .col(
                        ColumnDef::new(PointsLedger::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_points_ledger_profile_id")
                            .from(PointsLedger::Table, PointsLedger::ProfileId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // one award per (report, reason): a retried resolution cannot credit twice
        manager
            .create_index(
                Index::create()
                    .name("idx_points_ledger_report_reason")
                    .table(PointsLedger::Table)
                    .col(PointsLedger::ReportId)
                    .col(PointsLedger::Reason)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_points_ledger_profile_created_at")
                    .table(PointsLedger::Table)
                    .col(PointsLedger::ProfileId)
                    .col(PointsLedger::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PointsLedger::Table).to_owned())
            .await
    }
}
