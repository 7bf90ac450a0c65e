//! Formula evaluator.
//!
//! Resolves a pre-parsed [`Dependency`] to an amount for a `(date, account,
//! area)` context, reading referenced values from the ledger store. Missing
//! rows are zero: on day one upstream values simply do not exist yet and the
//! cascade must still run. Unknown referenced ids also degrade to zero with
//! a warning instead of failing the whole cascade.

use chrono::NaiveDate;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::{
    Amount, Area, Dependency, ResultEngine, SignCode, catalog::ConceptCatalog, entries,
};

/// Reads the stored amount for a natural key, `None` when the row does not
/// exist yet.
pub(crate) async fn entry_amount<C: ConnectionTrait>(
    db: &C,
    date: NaiveDate,
    concept_id: i32,
    account_id: i32,
    area: Area,
) -> ResultEngine<Option<Amount>> {
    let model = entries::Entity::find()
        .filter(entries::Column::Date.eq(date))
        .filter(entries::Column::ConceptId.eq(concept_id))
        .filter(entries::Column::AccountId.eq(account_id))
        .filter(entries::Column::Area.eq(area.as_str()))
        .one(db)
        .await?;
    Ok(model.map(|m| Amount::new(m.amount_minor)))
}

/// Applies the sign rule: debit-coded concepts contribute their absolute
/// value negated, credit/neutral their absolute value, uncoded concepts the
/// stored value unchanged.
pub(crate) fn signed_contribution(code: Option<SignCode>, amount: Amount) -> Amount {
    match code {
        Some(SignCode::Debit) => -amount.abs(),
        Some(SignCode::Credit) | Some(SignCode::Neutral) => amount.abs(),
        None => amount,
    }
}

/// Evaluates a dependency descriptor against the store.
pub(crate) async fn evaluate<C: ConnectionTrait>(
    db: &C,
    catalog: &ConceptCatalog,
    dependency: &Dependency,
    date: NaiveDate,
    account_id: i32,
    area: Area,
) -> ResultEngine<Amount> {
    match dependency {
        Dependency::Copy { concept_id } => {
            Ok(entry_amount(db, date, *concept_id, account_id, area)
                .await?
                .unwrap_or(Amount::ZERO))
        }
        Dependency::Sum(_) | Dependency::SumRange { .. } => {
            let mut total = Amount::ZERO;
            for id in dependency.referenced_ids() {
                // Ranges legitimately contain unassigned ids; only warn for
                // explicit references to unknown concepts.
                let Some(concept) = catalog.get(id) else {
                    if !matches!(dependency, Dependency::SumRange { .. }) {
                        tracing::warn!(
                            concept_id = id,
                            "sum references unknown concept, treating as zero"
                        );
                    }
                    continue;
                };
                if let Some(amount) = entry_amount(db, date, id, account_id, area).await? {
                    total += signed_contribution(concept.code, amount);
                }
            }
            Ok(total)
        }
        Dependency::Subtract(ids) => {
            let mut iter = ids.iter();
            let Some(&base_id) = iter.next() else {
                return Ok(Amount::ZERO);
            };
            let mut total = entry_amount(db, date, base_id, account_id, area)
                .await?
                .unwrap_or(Amount::ZERO);
            for &id in iter {
                if catalog.get(id).is_none() {
                    tracing::warn!(
                        concept_id = id,
                        "subtraction references unknown concept, treating as zero"
                    );
                    continue;
                }
                total -= entry_amount(db, date, id, account_id, area)
                    .await?
                    .unwrap_or(Amount::ZERO);
            }
            Ok(total)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debit_contributes_negative_regardless_of_stored_sign() {
        let debit = Some(SignCode::Debit);
        assert_eq!(signed_contribution(debit, Amount::new(300)), Amount::new(-300));
        assert_eq!(signed_contribution(debit, Amount::new(-300)), Amount::new(-300));
    }

    #[test]
    fn credit_and_neutral_contribute_positive() {
        for code in [Some(SignCode::Credit), Some(SignCode::Neutral)] {
            assert_eq!(signed_contribution(code, Amount::new(800)), Amount::new(800));
            assert_eq!(signed_contribution(code, Amount::new(-800)), Amount::new(800));
        }
    }

    #[test]
    fn uncoded_contributes_raw_value() {
        assert_eq!(signed_contribution(None, Amount::new(-42)), Amount::new(-42));
        assert_eq!(signed_contribution(None, Amount::new(42)), Amount::new(42));
    }
}
