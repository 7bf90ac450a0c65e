//! Command and outcome types for the public engine operations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Amount, Area};

/// Direct write to a base concept.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WriteEntryCmd {
    pub date: NaiveDate,
    pub concept_id: i32,
    pub account_id: i32,
    pub area: Area,
    pub amount: Amount,
    pub actor: Option<String>,
}

/// Manual recomputation request.
///
/// `area` narrows the generic formula phase; `account_id` narrows the scope
/// to one account (otherwise every active account is recomputed).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecomputeCmd {
    pub date: NaiveDate,
    pub area: Option<Area>,
    pub concept_id: Option<i32>,
    pub account_id: Option<i32>,
    pub company_id: Option<i32>,
    pub actor: Option<String>,
}

impl RecomputeCmd {
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            date,
            ..Self::default()
        }
    }
}

/// One ledger value the cascade changed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntryChange {
    pub concept_id: i32,
    pub account_id: i32,
    pub area: Area,
    pub old_amount: Option<Amount>,
    pub new_amount: Amount,
}

/// Result of one cascade invocation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecomputeOutcome {
    pub entries_changed: Vec<EntryChange>,
}

impl RecomputeOutcome {
    /// Looks up the change recorded for a concept, if any.
    pub fn change_for(&self, concept_id: i32, account_id: i32) -> Option<&EntryChange> {
        self.entries_changed
            .iter()
            .find(|c| c.concept_id == concept_id && c.account_id == account_id)
    }
}
