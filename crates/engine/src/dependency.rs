//! Dependency descriptors for derived concepts.
//!
//! The catalog stores a descriptor either as a reference to another concept
//! with a combine mode, or as a textual formula (`SUMA(1,2,3)`,
//! `SUMA(5-49)`, `RESTA(a,b)`, `COPIA(n)`). Formulas are parsed **once** at
//! catalog load into a [`Dependency`] variant, so evaluation never touches
//! strings.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// How a referenced concept combines into the derived one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineMode {
    Copy,
    Sum,
    Subtract,
}

impl CombineMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Sum => "sum",
            Self::Subtract => "subtract",
        }
    }
}

impl TryFrom<&str> for CombineMode {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "copy" => Ok(Self::Copy),
            "sum" => Ok(Self::Sum),
            "subtract" => Ok(Self::Subtract),
            other => Err(EngineError::InvalidDescriptor(format!(
                "invalid combine mode: {other}"
            ))),
        }
    }
}

/// A pre-parsed dependency descriptor.
///
/// `Sum` and `SumRange` apply the sign rule to each referenced concept;
/// `Subtract` takes the first id as base and subtracts the remaining raw
/// amounts; `Copy` forwards the referenced amount unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dependency {
    Copy { concept_id: i32 },
    Sum(Vec<i32>),
    SumRange { lo: i32, hi: i32 },
    Subtract(Vec<i32>),
}

impl Dependency {
    /// Builds a descriptor from the reference form of the catalog row.
    pub fn from_reference(mode: CombineMode, concept_id: i32) -> Self {
        match mode {
            CombineMode::Copy => Self::Copy { concept_id },
            CombineMode::Sum => Self::Sum(vec![concept_id]),
            CombineMode::Subtract => Self::Subtract(vec![concept_id]),
        }
    }

    /// Parses the textual formula form of the catalog row.
    pub fn parse(formula: &str) -> ResultEngine<Self> {
        let invalid =
            |msg: &str| EngineError::InvalidDescriptor(format!("{msg}: {formula}"));

        let trimmed = formula.trim();
        let (name, rest) = trimmed
            .split_once('(')
            .ok_or_else(|| invalid("missing opening parenthesis"))?;
        let args = rest
            .strip_suffix(')')
            .ok_or_else(|| invalid("missing closing parenthesis"))?
            .trim();
        if args.is_empty() {
            return Err(invalid("empty argument list"));
        }

        match name.trim().to_ascii_uppercase().as_str() {
            "COPIA" => {
                let concept_id = parse_id(args)
                    .ok_or_else(|| invalid("COPIA takes a single concept id"))?;
                Ok(Self::Copy { concept_id })
            }
            "SUMA" => {
                // A single `lo-hi` argument is an inclusive range.
                if !args.contains(',')
                    && let Some((lo_str, hi_str)) = args.split_once('-')
                    && let (Some(lo), Some(hi)) = (parse_id(lo_str), parse_id(hi_str))
                {
                    if lo > hi {
                        return Err(invalid("range low bound is above high bound"));
                    }
                    return Ok(Self::SumRange { lo, hi });
                }
                Ok(Self::Sum(parse_id_list(args).ok_or_else(|| {
                    invalid("SUMA takes concept ids or a lo-hi range")
                })?))
            }
            "RESTA" => {
                let ids = parse_id_list(args)
                    .ok_or_else(|| invalid("RESTA takes concept ids"))?;
                if ids.len() < 2 {
                    return Err(invalid("RESTA needs a base and at least one subtrahend"));
                }
                Ok(Self::Subtract(ids))
            }
            _ => Err(invalid("unknown formula")),
        }
    }

    /// Expands the descriptor into the explicit list of referenced ids.
    pub fn referenced_ids(&self) -> Vec<i32> {
        match self {
            Self::Copy { concept_id } => vec![*concept_id],
            Self::Sum(ids) | Self::Subtract(ids) => ids.clone(),
            Self::SumRange { lo, hi } => (*lo..=*hi).collect(),
        }
    }
}

impl fmt::Display for Dependency {
    /// Renders the descriptor back to its textual form, used in provenance
    /// records.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copy { concept_id } => write!(f, "COPIA({concept_id})"),
            Self::Sum(ids) => write!(f, "SUMA({})", join_ids(ids)),
            Self::SumRange { lo, hi } => write!(f, "SUMA({lo}-{hi})"),
            Self::Subtract(ids) => write!(f, "RESTA({})", join_ids(ids)),
        }
    }
}

fn join_ids(ids: &[i32]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_id(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}

fn parse_id_list(raw: &str) -> Option<Vec<i32>> {
    raw.split(',').map(parse_id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_explicit_sum() {
        assert_eq!(
            Dependency::parse("SUMA(1,2,3)").unwrap(),
            Dependency::Sum(vec![1, 2, 3])
        );
        assert_eq!(
            Dependency::parse(" suma( 7 , 9 ) ").unwrap(),
            Dependency::Sum(vec![7, 9])
        );
    }

    #[test]
    fn parses_range_sum() {
        assert_eq!(
            Dependency::parse("SUMA(5-49)").unwrap(),
            Dependency::SumRange { lo: 5, hi: 49 }
        );
        assert_eq!(
            Dependency::SumRange { lo: 5, hi: 8 }.referenced_ids(),
            vec![5, 6, 7, 8]
        );
    }

    #[test]
    fn parses_subtract_and_copy() {
        assert_eq!(
            Dependency::parse("RESTA(10,11,12)").unwrap(),
            Dependency::Subtract(vec![10, 11, 12])
        );
        assert_eq!(
            Dependency::parse("COPIA(42)").unwrap(),
            Dependency::Copy { concept_id: 42 }
        );
    }

    #[test]
    fn rejects_malformed_formulas() {
        assert!(Dependency::parse("SUMA").is_err());
        assert!(Dependency::parse("SUMA()").is_err());
        assert!(Dependency::parse("SUMA(49-5)").is_err());
        assert!(Dependency::parse("RESTA(10)").is_err());
        assert!(Dependency::parse("MEDIA(1,2)").is_err());
        assert!(Dependency::parse("SUMA(1,x)").is_err());
    }

    #[test]
    fn renders_back_to_text() {
        for formula in ["SUMA(1,2,3)", "SUMA(5-49)", "RESTA(10,11)", "COPIA(42)"] {
            assert_eq!(Dependency::parse(formula).unwrap().to_string(), formula);
        }
    }

    #[test]
    fn reference_form_maps_to_variants() {
        assert_eq!(
            Dependency::from_reference(CombineMode::Copy, 5),
            Dependency::Copy { concept_id: 5 }
        );
        assert_eq!(
            Dependency::from_reference(CombineMode::Sum, 5),
            Dependency::Sum(vec![5])
        );
        assert_eq!(
            Dependency::from_reference(CombineMode::Subtract, 5),
            Dependency::Subtract(vec![5])
        );
    }
}
