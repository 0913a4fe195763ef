//! Receipts schema.
//!
//! - `receipts`: one row per scanned purchase, with the archive path of its
//!   image. Totals are integer cents.
//!
//! `image_hash` is unique so two concurrent uploads of the same bytes cannot
//! both be stored.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Receipts {
    Table,
    Id,
    UserId,
    Vendor,
    TotalAmountMinor,
    Date,
    HsaQualified,
    HsaStatus,
    ImagePath,
    ImageHash,
    RawText,
    Used,
    UsedAt,
    UseReason,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Receipts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Receipts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Receipts::UserId).string().not_null())
                    .col(ColumnDef::new(Receipts::Vendor).string().not_null())
                    .col(
                        ColumnDef::new(Receipts::TotalAmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Receipts::Date).date().not_null())
                    .col(
                        ColumnDef::new(Receipts::HsaQualified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Receipts::HsaStatus)
                            .string()
                            .not_null()
                            .default("No"),
                    )
                    .col(ColumnDef::new(Receipts::ImagePath).string().not_null())
                    .col(ColumnDef::new(Receipts::ImageHash).string().not_null())
                    .col(
                        ColumnDef::new(Receipts::RawText)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Receipts::Used)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Receipts::UsedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Receipts::UseReason).string())
                    .col(
                        ColumnDef::new(Receipts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uidx-receipts-image_hash")
                    .table(Receipts::Table)
                    .col(Receipts::ImageHash)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-receipts-user_id-used-date")
                    .table(Receipts::Table)
                    .col(Receipts::UserId)
                    .col(Receipts::Used)
                    .col(Receipts::Date)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-receipts-vendor-date")
                    .table(Receipts::Table)
                    .col(Receipts::Vendor)
                    .col(Receipts::Date)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Receipts::Table).to_owned())
            .await?;

        Ok(())
    }
}
