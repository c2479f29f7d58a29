use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PipelineJobs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PipelineJobs::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PipelineJobs::EventId).integer().not_null())
                    .col(
                        ColumnDef::new(PipelineJobs::RunId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(PipelineJobs::Stage).string().not_null())
                    .col(
                        ColumnDef::new(PipelineJobs::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(PipelineJobs::TotalLeads)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PipelineJobs::ProcessedLeads)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PipelineJobs::FailedLeads)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(PipelineJobs::ErrorMessage).string())
                    .col(
                        ColumnDef::new(PipelineJobs::CreatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(PipelineJobs::StartedAt).date_time())
                    .col(ColumnDef::new(PipelineJobs::CompletedAt).date_time())
                    .col(
                        ColumnDef::new(PipelineJobs::UpdatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pipeline_jobs_event_id")
                            .from(PipelineJobs::Table, PipelineJobs::EventId)
                            .to(Events::Table, Events::Id),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PipelineJobs::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum PipelineJobs {
    Table,
    Id,
    EventId,
    RunId,
    Stage,
    Status,
    TotalLeads,
    ProcessedLeads,
    FailedLeads,
    ErrorMessage,
    CreatedAt,
    StartedAt,
    CompletedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Events {
    Table,
    Id,
}
