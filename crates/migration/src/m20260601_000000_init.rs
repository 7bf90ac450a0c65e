//! Initial schema migration - creates all tables from scratch.
//!
//! It creates the complete schema for Primanota:
//!
//! - `concepts`: the catalog of ledger line items and their dependency
//!   descriptors
//! - `accounts`: bank accounts, one company each
//! - `ledger_entries`: one amount per (date, concept, account, area)
//! - `provenance`: append-only history of every write

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Concepts {
    Table,
    Id,
    Name,
    Code,
    Area,
    Active,
    DisplayOrder,
    ReferenceConceptId,
    CombineMode,
    Formula,
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
    Name,
    CompanyId,
    Currency,
    Active,
}

#[derive(Iden)]
enum LedgerEntries {
    Table,
    Id,
    Date,
    ConceptId,
    AccountId,
    Area,
    AmountMinor,
    CompanyId,
}

#[derive(Iden)]
enum Provenance {
    Table,
    Id,
    Date,
    ConceptId,
    AccountId,
    Area,
    RecordedAt,
    Trigger,
    Actor,
    PreviousAmount,
    NewAmount,
    Formula,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Concepts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Concepts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Concepts::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Concepts::Name).string().not_null())
                    .col(ColumnDef::new(Concepts::Code).string())
                    .col(ColumnDef::new(Concepts::Area).string().not_null())
                    .col(ColumnDef::new(Concepts::Active).boolean().not_null())
                    .col(
                        ColumnDef::new(Concepts::DisplayOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Concepts::ReferenceConceptId).integer())
                    .col(ColumnDef::new(Concepts::CombineMode).string())
                    .col(ColumnDef::new(Concepts::Formula).string())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Accounts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Accounts::Name).string().not_null())
                    .col(ColumnDef::new(Accounts::CompanyId).integer().not_null())
                    .col(
                        ColumnDef::new(Accounts::Currency)
                            .string()
                            .not_null()
                            .default("EUR"),
                    )
                    .col(ColumnDef::new(Accounts::Active).boolean().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Ledger entries
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(LedgerEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LedgerEntries::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LedgerEntries::Date).date().not_null())
                    .col(ColumnDef::new(LedgerEntries::ConceptId).integer().not_null())
                    .col(ColumnDef::new(LedgerEntries::AccountId).integer().not_null())
                    .col(ColumnDef::new(LedgerEntries::Area).string().not_null())
                    .col(
                        ColumnDef::new(LedgerEntries::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LedgerEntries::CompanyId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-ledger_entries-concept_id")
                            .from(LedgerEntries::Table, LedgerEntries::ConceptId)
                            .to(Concepts::Table, Concepts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-ledger_entries-account_id")
                            .from(LedgerEntries::Table, LedgerEntries::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // The natural key: one amount per date, concept, account and area.
        manager
            .create_index(
                Index::create()
                    .name("idx-ledger_entries-natural-key-unique")
                    .table(LedgerEntries::Table)
                    .col(LedgerEntries::Date)
                    .col(LedgerEntries::ConceptId)
                    .col(LedgerEntries::AccountId)
                    .col(LedgerEntries::Area)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Range lookups by concept id.
        manager
            .create_index(
                Index::create()
                    .name("idx-ledger_entries-concept_id-date")
                    .table(LedgerEntries::Table)
                    .col(LedgerEntries::ConceptId)
                    .col(LedgerEntries::Date)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Provenance
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Provenance::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Provenance::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Provenance::Date).date().not_null())
                    .col(ColumnDef::new(Provenance::ConceptId).integer().not_null())
                    .col(ColumnDef::new(Provenance::AccountId).integer().not_null())
                    .col(ColumnDef::new(Provenance::Area).string().not_null())
                    .col(
                        ColumnDef::new(Provenance::RecordedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Provenance::Trigger).string().not_null())
                    .col(ColumnDef::new(Provenance::Actor).string())
                    .col(ColumnDef::new(Provenance::PreviousAmount).big_integer())
                    .col(
                        ColumnDef::new(Provenance::NewAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Provenance::Formula).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-provenance-natural-key")
                    .table(Provenance::Table)
                    .col(Provenance::Date)
                    .col(Provenance::ConceptId)
                    .col(Provenance::AccountId)
                    .col(Provenance::Area)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Provenance::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LedgerEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Concepts::Table).to_owned())
            .await?;
        Ok(())
    }
}
