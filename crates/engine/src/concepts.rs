//! The module contains the `Concept` catalog row and its entity.
//!
//! A concept is a named line item of the daily cash-flow ledger (opening
//! balance, transfers, taxes, subtotals). Concepts carrying a dependency
//! descriptor are *derived*: the recomputation engine owns their values and
//! direct writes are rejected.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    CombineMode, Dependency, EngineError, ResultEngine,
};

/// Operational ledger a concept or entry belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Area {
    Treasury,
    Disbursement,
    /// Catalog-only: the concept appears in both ledgers. Entries are never
    /// stored with this area.
    Both,
}

impl Area {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Treasury => "treasury",
            Self::Disbursement => "disbursement",
            Self::Both => "both",
        }
    }

    /// Returns `true` when a concept in `self` participates in a
    /// recomputation scoped to `filter`.
    pub fn matches(self, filter: Area) -> bool {
        self == Self::Both || filter == Self::Both || self == filter
    }

    /// Entries live in exactly one ledger; rejects [`Area::Both`].
    pub fn require_concrete(self) -> ResultEngine<Area> {
        match self {
            Self::Both => Err(EngineError::InvalidArea(
                "entries must target treasury or disbursement".to_string(),
            )),
            concrete => Ok(concrete),
        }
    }
}

impl TryFrom<&str> for Area {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "treasury" => Ok(Self::Treasury),
            "disbursement" => Ok(Self::Disbursement),
            "both" => Ok(Self::Both),
            other => Err(EngineError::InvalidArea(format!("invalid area: {other}"))),
        }
    }
}

/// Sign discipline code: how a concept contributes to a `SUMA`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignCode {
    /// Credit: contributes its absolute value.
    Credit,
    /// Debit: contributes its absolute value negated.
    Debit,
    /// Neutral: contributes its absolute value.
    Neutral,
}

impl SignCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "I",
            Self::Debit => "E",
            Self::Neutral => "N",
        }
    }
}

impl TryFrom<&str> for SignCode {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "I" => Ok(Self::Credit),
            "E" => Ok(Self::Debit),
            "N" => Ok(Self::Neutral),
            other => Err(EngineError::InvalidDescriptor(format!(
                "invalid sign code: {other}"
            ))),
        }
    }
}

/// A catalog row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    /// Stable identifier, assigned by the catalog owner and referenced by
    /// formulas. Not auto-incremented.
    pub id: i32,
    pub name: String,
    pub code: Option<SignCode>,
    pub area: Area,
    pub active: bool,
    pub display_order: i32,
    pub dependency: Option<Dependency>,
}

impl Concept {
    /// A derived concept is owned by the engine; it never accepts direct
    /// writes.
    pub fn is_derived(&self) -> bool {
        self.dependency.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "concepts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub name: String,
    pub code: Option<String>,
    pub area: String,
    pub active: bool,
    pub display_order: i32,
    pub reference_concept_id: Option<i32>,
    pub combine_mode: Option<String>,
    pub formula: Option<String>,
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

impl From<&Concept> for ActiveModel {
    fn from(concept: &Concept) -> Self {
        let (reference_concept_id, combine_mode, formula) = match &concept.dependency {
            None => (None, None, None),
            Some(Dependency::Copy { concept_id }) => {
                (Some(*concept_id), Some(CombineMode::Copy), None)
            }
            Some(dependency) => (None, None, Some(dependency.to_string())),
        };

        Self {
            id: ActiveValue::Set(concept.id),
            name: ActiveValue::Set(concept.name.clone()),
            code: ActiveValue::Set(concept.code.map(|c| c.as_str().to_string())),
            area: ActiveValue::Set(concept.area.as_str().to_string()),
            active: ActiveValue::Set(concept.active),
            display_order: ActiveValue::Set(concept.display_order),
            reference_concept_id: ActiveValue::Set(reference_concept_id),
            combine_mode: ActiveValue::Set(combine_mode.map(|m| m.as_str().to_string())),
            formula: ActiveValue::Set(formula),
        }
    }
}

impl TryFrom<Model> for Concept {
    type Error = EngineError;

    /// Maps a catalog row to the domain type, parsing the dependency
    /// descriptor once. The reference form wins over the formula column when
    /// a row carries both.
    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let dependency = parse_descriptor(&model)?;

        Ok(Self {
            id: model.id,
            name: model.name,
            code: model.code.as_deref().map(SignCode::try_from).transpose()?,
            area: Area::try_from(model.area.as_str())?,
            active: model.active,
            display_order: model.display_order,
            dependency,
        })
    }
}

fn parse_descriptor(model: &Model) -> ResultEngine<Option<Dependency>> {
    if let Some(reference_id) = model.reference_concept_id {
        let mode = match model.combine_mode.as_deref() {
            Some(raw) => CombineMode::try_from(raw)?,
            None => CombineMode::Copy,
        };
        return Ok(Some(Dependency::from_reference(mode, reference_id)));
    }

    match model.formula.as_deref() {
        Some(formula) => Ok(Some(Dependency::parse(formula)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(id: i32) -> Model {
        Model {
            id,
            name: format!("concept {id}"),
            code: None,
            area: "disbursement".to_string(),
            active: true,
            display_order: id,
            reference_concept_id: None,
            combine_mode: None,
            formula: None,
        }
    }

    #[test]
    fn base_concept_has_no_descriptor() {
        let concept = Concept::try_from(model(1)).unwrap();
        assert!(!concept.is_derived());
    }

    #[test]
    fn formula_column_parses_once() {
        let mut m = model(2);
        m.formula = Some("SUMA(5-49)".to_string());
        let concept = Concept::try_from(m).unwrap();
        assert_eq!(
            concept.dependency,
            Some(Dependency::SumRange { lo: 5, hi: 49 })
        );
        assert!(concept.is_derived());
    }

    #[test]
    fn reference_form_wins_over_formula() {
        let mut m = model(3);
        m.reference_concept_id = Some(7);
        m.combine_mode = Some("subtract".to_string());
        m.formula = Some("SUMA(1,2)".to_string());
        let concept = Concept::try_from(m).unwrap();
        assert_eq!(concept.dependency, Some(Dependency::Subtract(vec![7])));
    }

    #[test]
    fn area_matching() {
        assert!(Area::Both.matches(Area::Treasury));
        assert!(Area::Treasury.matches(Area::Both));
        assert!(Area::Treasury.matches(Area::Treasury));
        assert!(!Area::Treasury.matches(Area::Disbursement));
    }
}
