//! Append-only provenance records: who changed which ledger value and why.
//!
//! Every write the engine performs (user edit, formula evaluation, chain
//! step, projection) appends one row here, keyed by the entry's natural key.
//! Rows are never updated, so the "previous amount" history stays queryable.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Amount, Area, EngineError, EntryKey};

/// What caused a ledger write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Direct edit of a base concept.
    UserEdit,
    /// Formula evaluation or a disbursement chain step.
    Recompute,
    /// Forward projection into the next business day.
    Projection,
}

impl TriggerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserEdit => "user_edit",
            Self::Recompute => "recompute",
            Self::Projection => "projection",
        }
    }
}

impl TryFrom<&str> for TriggerKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user_edit" => Ok(Self::UserEdit),
            "recompute" => Ok(Self::Recompute),
            "projection" => Ok(Self::Projection),
            other => Err(EngineError::InvalidDescriptor(format!(
                "invalid trigger kind: {other}"
            ))),
        }
    }
}

/// One provenance record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub id: Uuid,
    pub date: NaiveDate,
    pub concept_id: i32,
    pub account_id: i32,
    pub area: Area,
    pub recorded_at: DateTime<Utc>,
    pub trigger: TriggerKind,
    pub actor: Option<String>,
    pub previous_amount: Option<Amount>,
    pub new_amount: Amount,
    /// Rendered formula or chain step name that produced the value.
    pub formula: Option<String>,
}

impl Provenance {
    pub fn new(
        key: EntryKey,
        trigger: TriggerKind,
        actor: Option<String>,
        previous_amount: Option<Amount>,
        new_amount: Amount,
        formula: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            date: key.date,
            concept_id: key.concept_id,
            account_id: key.account_id,
            area: key.area,
            recorded_at: Utc::now(),
            trigger,
            actor,
            previous_amount,
            new_amount,
            formula,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "provenance")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub date: Date,
    pub concept_id: i32,
    pub account_id: i32,
    pub area: String,
    pub recorded_at: DateTimeUtc,
    pub trigger: String,
    pub actor: Option<String>,
    pub previous_amount: Option<i64>,
    pub new_amount: i64,
    pub formula: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Provenance> for ActiveModel {
    fn from(record: &Provenance) -> Self {
        Self {
            id: ActiveValue::Set(record.id.to_string()),
            date: ActiveValue::Set(record.date),
            concept_id: ActiveValue::Set(record.concept_id),
            account_id: ActiveValue::Set(record.account_id),
            area: ActiveValue::Set(record.area.as_str().to_string()),
            recorded_at: ActiveValue::Set(record.recorded_at),
            trigger: ActiveValue::Set(record.trigger.as_str().to_string()),
            actor: ActiveValue::Set(record.actor.clone()),
            previous_amount: ActiveValue::Set(record.previous_amount.map(Amount::cents)),
            new_amount: ActiveValue::Set(record.new_amount.cents()),
            formula: ActiveValue::Set(record.formula.clone()),
        }
    }
}

impl TryFrom<Model> for Provenance {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("provenance not exists".to_string()))?,
            date: model.date,
            concept_id: model.concept_id,
            account_id: model.account_id,
            area: Area::try_from(model.area.as_str())?,
            recorded_at: model.recorded_at,
            trigger: TriggerKind::try_from(model.trigger.as_str())?,
            actor: model.actor,
            previous_amount: model.previous_amount.map(Amount::new),
            new_amount: Amount::new(model.new_amount),
            formula: model.formula,
        })
    }
}
