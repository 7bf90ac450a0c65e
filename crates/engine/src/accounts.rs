//! The module contains the `Account` struct and its entity.
//!
//! An account belongs to exactly one company and acts as an index key for
//! ledger entries. The engine never mutates accounts beyond reading them to
//! scope a recomputation.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::EngineError;

/// A bank account of a company.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Stable identifier, assigned by the catalog owner.
    pub id: i32,
    pub name: String,
    pub company_id: i32,
    /// ISO currency code of the account's sub-ledger.
    pub currency: String,
    pub active: bool,
}

impl Account {
    pub fn new(id: i32, name: String, company_id: i32, currency: String) -> Self {
        Self {
            id,
            name,
            company_id,
            currency,
            active: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub name: String,
    pub company_id: i32,
    pub currency: String,
    pub active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::entries::Entity")]
    Entries,
}

impl Related<super::entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(account: &Account) -> Self {
        Self {
            id: ActiveValue::Set(account.id),
            name: ActiveValue::Set(account.name.clone()),
            company_id: ActiveValue::Set(account.company_id),
            currency: ActiveValue::Set(account.currency.clone()),
            active: ActiveValue::Set(account.active),
        }
    }
}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            name: model.name,
            company_id: model.company_id,
            currency: model.currency,
            active: model.active,
        })
    }
}
