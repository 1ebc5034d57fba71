//! Initial schema migration - creates all tables from scratch.
//!
//! It creates the complete schema for Romana:
//!
//! - `users`: authentication
//! - `groups`: shared-expense groups owned by users
//! - `group_memberships`: multi-user group access
//! - `transactions`: append-only ledger entries (expenses and settlements)
//! - `splits`: per-user paid/owed amounts per transaction

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Username,
    Password,
}

#[derive(Iden)]
enum Groups {
    Table,
    Id,
    Name,
    UserId,
}

#[derive(Iden)]
enum GroupMemberships {
    Table,
    GroupId,
    UserId,
    Role,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    GroupId,
    Kind,
    OccurredAt,
    AmountMinor,
    Description,
    CreatedBy,
    IdempotencyKey,
}

#[derive(Iden)]
enum Splits {
    Table,
    Id,
    TransactionId,
    UserId,
    PaidMinor,
    OwedMinor,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Groups
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Groups::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Groups::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Groups::Name).string().not_null())
                    .col(ColumnDef::new(Groups::UserId).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-groups-user_id")
                            .from(Groups::Table, Groups::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Group Memberships
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(GroupMemberships::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GroupMemberships::GroupId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GroupMemberships::UserId).string().not_null())
                    .col(ColumnDef::new(GroupMemberships::Role).string().not_null())
                    .primary_key(
                        Index::create()
                            .col(GroupMemberships::GroupId)
                            .col(GroupMemberships::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-group_memberships-group_id")
                            .from(GroupMemberships::Table, GroupMemberships::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-group_memberships-user_id")
                            .from(GroupMemberships::Table, GroupMemberships::UserId)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-group_memberships-user_id")
                    .table(GroupMemberships::Table)
                    .col(GroupMemberships::UserId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::GroupId).string())
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::OccurredAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Description).string())
                    .col(ColumnDef::new(Transactions::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Transactions::IdempotencyKey).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-group_id")
                            .from(Transactions::Table, Transactions::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-group_id-occurred_at")
                    .table(Transactions::Table)
                    .col(Transactions::GroupId)
                    .col(Transactions::OccurredAt)
                    .to_owned(),
            )
            .await?;

        // SQLite treats NULL group_id rows as distinct here, so the index
        // only enforces replay keys for group entries. Personal entries are
        // checked inside the insert transaction.
        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-idempotency_key")
                    .table(Transactions::Table)
                    .col(Transactions::GroupId)
                    .col(Transactions::CreatedBy)
                    .col(Transactions::IdempotencyKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-created_by")
                    .table(Transactions::Table)
                    .col(Transactions::CreatedBy)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Splits
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Splits::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Splits::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Splits::TransactionId).string().not_null())
                    .col(ColumnDef::new(Splits::UserId).string().not_null())
                    .col(ColumnDef::new(Splits::PaidMinor).big_integer().not_null())
                    .col(ColumnDef::new(Splits::OwedMinor).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-splits-transaction_id")
                            .from(Splits::Table, Splits::TransactionId)
                            .to(Transactions::Table, Transactions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-splits-transaction_id")
                    .table(Splits::Table)
                    .col(Splits::TransactionId)
                    .to_owned(),
            )
            .await?;

        // One split per user per transaction.
        manager
            .create_index(
                Index::create()
                    .name("idx-splits-transaction_id-user_id-unique")
                    .table(Splits::Table)
                    .col(Splits::TransactionId)
                    .col(Splits::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(Splits::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GroupMemberships::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Groups::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
