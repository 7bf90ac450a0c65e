//! The module contains the `LedgerEntry` struct and its entity.
//!
//! An entry is the atomic fact of the ledger: one amount for one concept,
//! account, area and day. `(date, concept_id, account_id, area)` is the
//! natural key; the store upserts on it and never duplicates a row.

use chrono::NaiveDate;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Amount, Area, EngineError};

/// Natural key of a ledger entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryKey {
    pub date: NaiveDate,
    pub concept_id: i32,
    pub account_id: i32,
    pub area: Area,
}

impl EntryKey {
    pub fn new(date: NaiveDate, concept_id: i32, account_id: i32, area: Area) -> Self {
        Self {
            date,
            concept_id,
            account_id,
            area,
        }
    }
}

/// A ledger entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Stable identifier for this entry.
    ///
    /// This is a UUID generated once at first write, so the row can be
    /// referenced by provenance records while its amount changes in place.
    pub id: Uuid,
    pub date: NaiveDate,
    pub concept_id: i32,
    pub account_id: i32,
    pub area: Area,
    pub amount: Amount,
    pub company_id: i32,
}

impl LedgerEntry {
    pub fn new(key: EntryKey, amount: Amount, company_id: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            date: key.date,
            concept_id: key.concept_id,
            account_id: key.account_id,
            area: key.area,
            amount,
            company_id,
        }
    }

    pub fn key(&self) -> EntryKey {
        EntryKey::new(self.date, self.concept_id, self.account_id, self.area)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub date: Date,
    pub concept_id: i32,
    pub account_id: i32,
    pub area: String,
    pub amount_minor: i64,
    pub company_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::concepts::Entity",
        from = "Column::ConceptId",
        to = "super::concepts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Concepts,
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Accounts,
}

impl Related<super::concepts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Concepts.def()
    }
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&LedgerEntry> for ActiveModel {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id.to_string()),
            date: ActiveValue::Set(entry.date),
            concept_id: ActiveValue::Set(entry.concept_id),
            account_id: ActiveValue::Set(entry.account_id),
            area: ActiveValue::Set(entry.area.as_str().to_string()),
            amount_minor: ActiveValue::Set(entry.amount.cents()),
            company_id: ActiveValue::Set(entry.company_id),
        }
    }
}

impl TryFrom<Model> for LedgerEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("ledger entry not exists".to_string()))?,
            date: model.date,
            concept_id: model.concept_id,
            account_id: model.account_id,
            area: Area::try_from(model.area.as_str())?,
            amount: Amount::new(model.amount_minor),
            company_id: model.company_id,
        })
    }
}
