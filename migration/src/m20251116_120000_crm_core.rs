use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Contact {
    Table,
    Id,
    Name,
    Email,
    Phone,
    Company,
    Title,
    Notes,
    Gender,
    DateOfBirth,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Account {
    Table,
    Id,
    Name,
    Email,
    Phone,
    Tags,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Lead {
    Table,
    Id,
    Name,
    Email,
    Phone,
    Company,
    Title,
    Notes,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Deal {
    Table,
    Id,
    Title,
    ContactId,
    ValueCents,
    Stage,
    Probability,
    ExpectedCloseDate,
    Notes,
    CreatedAt,
    UpdatedAt,
    ClosedAt,
}

#[derive(DeriveIden)]
enum Activity {
    Table,
    Id,
    Kind,
    ContactId,
    DealId,
    Subject,
    Description,
    Timestamp,
    CreatedBy,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Contact::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Contact::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Contact::Name).string_len(256).not_null())
                    .col(ColumnDef::new(Contact::Email).string_len(320).not_null())
                    .col(ColumnDef::new(Contact::Phone).string_len(64))
                    .col(ColumnDef::new(Contact::Company).string_len(256))
                    .col(ColumnDef::new(Contact::Title).string_len(256))
                    .col(ColumnDef::new(Contact::Notes).text())
                    .col(ColumnDef::new(Contact::Gender).string_len(32))
                    .col(ColumnDef::new(Contact::DateOfBirth).date())
                    .col(
                        ColumnDef::new(Contact::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Contact::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_contact_email")
                    .table(Contact::Table)
                    .col(Contact::Email)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Account::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Account::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Account::Name).string_len(256).not_null())
                    .col(ColumnDef::new(Account::Email).string_len(320).not_null())
                    .col(ColumnDef::new(Account::Phone).string_len(64))
                    .col(ColumnDef::new(Account::Tags).text())
                    .col(
                        ColumnDef::new(Account::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Account::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_account_name")
                    .table(Account::Table)
                    .col(Account::Name)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Lead::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Lead::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Lead::Name).string_len(256).not_null())
                    .col(ColumnDef::new(Lead::Email).string_len(320).not_null())
                    .col(ColumnDef::new(Lead::Phone).string_len(64))
                    .col(ColumnDef::new(Lead::Company).string_len(256))
                    .col(ColumnDef::new(Lead::Title).string_len(256))
                    .col(ColumnDef::new(Lead::Notes).text())
                    .col(
                        ColumnDef::new(Lead::Status)
                            .string_len(16)
                            .not_null()
                            .default("New"),
                    )
                    .col(
                        ColumnDef::new(Lead::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Lead::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Deal::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Deal::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Deal::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Deal::ContactId).uuid().not_null())
                    .col(
                        ColumnDef::new(Deal::ValueCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Deal::Stage)
                            .string_len(64)
                            .not_null()
                            .default("Lead"),
                    )
                    .col(
                        ColumnDef::new(Deal::Probability)
                            .small_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Deal::ExpectedCloseDate).date())
                    .col(ColumnDef::new(Deal::Notes).text())
                    .col(
                        ColumnDef::new(Deal::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Deal::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Deal::ClosedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_deal_stage")
                    .table(Deal::Table)
                    .col(Deal::Stage)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_deal_contact")
                    .table(Deal::Table)
                    .col(Deal::ContactId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Activity::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Activity::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Activity::Kind)
                            .string_len(16)
                            .not_null()
                            .default("call"),
                    )
                    .col(ColumnDef::new(Activity::ContactId).uuid().not_null())
                    .col(ColumnDef::new(Activity::DealId).uuid())
                    .col(ColumnDef::new(Activity::Subject).string_len(256).not_null())
                    .col(ColumnDef::new(Activity::Description).text())
                    .col(
                        ColumnDef::new(Activity::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Activity::CreatedBy)
                            .string_len(128)
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_activity_contact")
                    .table(Activity::Table)
                    .col(Activity::ContactId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Activity::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Deal::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Lead::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Account::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Contact::Table).if_exists().to_owned())
            .await
    }
}
