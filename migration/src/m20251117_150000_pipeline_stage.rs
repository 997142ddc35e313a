use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::prelude::Uuid;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Seeded board columns; the last two are terminal and stay off the kanban.
const DEFAULT_STAGES: [(u128, &str, i32, &str); 6] = [
    (0x5ea9_0001, "Lead", 1, "#3B82F6"),
    (0x5ea9_0002, "Qualified", 2, "#8B5CF6"),
    (0x5ea9_0003, "Proposal", 3, "#F59E0B"),
    (0x5ea9_0004, "Negotiation", 4, "#F97316"),
    (0x5ea9_0005, "Closed Won", 5, "#10B981"),
    (0x5ea9_0006, "Closed Lost", 6, "#EF4444"),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PipelineStage::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PipelineStage::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PipelineStage::Name)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PipelineStage::SortOrder)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PipelineStage::Color)
                            .string_len(16)
                            .not_null()
                            .default("#64748B"),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_pipeline_stage_name")
                    .table(PipelineStage::Table)
                    .col(PipelineStage::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_pipeline_stage_order")
                    .table(PipelineStage::Table)
                    .col(PipelineStage::SortOrder)
                    .to_owned(),
            )
            .await?;

        for (id, name, sort_order, color) in DEFAULT_STAGES {
            let insert = Query::insert()
                .into_table(PipelineStage::Table)
                .columns(vec![
                    PipelineStage::Id,
                    PipelineStage::Name,
                    PipelineStage::SortOrder,
                    PipelineStage::Color,
                ])
                .values_panic(vec![
                    Uuid::from_u128(id).into(),
                    name.into(),
                    sort_order.into(),
                    color.into(),
                ])
                .on_conflict(
                    OnConflict::column(PipelineStage::Name)
                        .do_nothing()
                        .to_owned(),
                )
                .to_owned();
            manager.exec_stmt(insert).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PipelineStage::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PipelineStage {
    Table,
    Id,
    Name,
    SortOrder,
    Color,
}
