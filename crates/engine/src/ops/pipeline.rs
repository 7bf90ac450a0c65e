//! The disbursement-area chain, as a fixed six-stage pipeline.
//!
//! Each stage reads what the previous stages wrote and hands its output
//! struct to the next, so the evaluation order is enforced by the function
//! signatures instead of by comment discipline. A stage whose operands are
//! all absent skips its write and the chain degrades gracefully; only the
//! balance difference is recomputed unconditionally.

use chrono::NaiveDate;
use sea_orm::DatabaseTransaction;

use crate::{
    Amount, Area, BusinessCalendar, ChainConcepts, EntryChange, EntryKey, ResultEngine,
    TriggerKind, catalog::ConceptCatalog,
    evaluator::{entry_amount, signed_contribution},
};

use super::writes::upsert_entry;

/// Read-only context shared by every stage.
pub(super) struct ChainContext<'a> {
    pub date: NaiveDate,
    pub account_id: i32,
    pub company_id: i32,
    pub chain: &'a ChainConcepts,
    pub catalog: &'a ConceptCatalog,
    pub calendar: &'a BusinessCalendar,
    pub actor: Option<&'a str>,
}

impl ChainContext<'_> {
    fn disbursement_key(&self, concept_id: i32) -> EntryKey {
        EntryKey::new(self.date, concept_id, self.account_id, Area::Disbursement)
    }

    async fn read(
        &self,
        db_tx: &DatabaseTransaction,
        concept_id: i32,
        area: Area,
    ) -> ResultEngine<Option<Amount>> {
        entry_amount(db_tx, self.date, concept_id, self.account_id, area).await
    }

    async fn write(
        &self,
        db_tx: &DatabaseTransaction,
        key: EntryKey,
        amount: Amount,
        step: &str,
        changes: &mut Vec<EntryChange>,
    ) -> ResultEngine<bool> {
        let change = upsert_entry(
            db_tx,
            key,
            self.company_id,
            amount,
            TriggerKind::Recompute,
            self.actor,
            Some(step.to_string()),
        )
        .await?;
        let changed = change.is_some();
        if let Some(change) = change {
            changes.push(change);
        }
        Ok(changed)
    }
}

pub(super) struct MovementSubtotal {
    pub amount: Amount,
    pub exists: bool,
    pub changed: bool,
}

pub(super) struct PriorDayBalance {
    pub amount: Amount,
    pub exists: bool,
}

pub(super) struct BalanceDifference {
    #[allow(dead_code)]
    pub amount: Amount,
}

pub(super) struct OpeningSubtotal {
    pub amount: Amount,
    pub exists: bool,
}

pub(super) struct TreasuryMirror {
    pub amount: Amount,
    pub exists: bool,
}

pub(super) struct TotalBankBalance {
    pub amount: Amount,
    pub exists: bool,
}

/// What the chain leaves behind for the projection and mirror phases.
pub(super) struct ChainOutcome {
    pub movement: MovementSubtotal,
    pub total: TotalBankBalance,
}

/// Runs the whole chain for one account and day.
pub(super) async fn run(
    db_tx: &DatabaseTransaction,
    ctx: &ChainContext<'_>,
    changes: &mut Vec<EntryChange>,
) -> ResultEngine<ChainOutcome> {
    let movement = movement_subtotal(db_tx, ctx, changes).await?;
    let prior = prior_day_balance(db_tx, ctx, changes).await?;
    let _difference = balance_difference(db_tx, ctx, &prior, changes).await?;
    let opening = opening_subtotal(db_tx, ctx, &movement, &prior, changes).await?;
    let mirror = treasury_mirror(db_tx, ctx, changes).await?;
    let total = total_bank_balance(db_tx, ctx, &opening, &mirror, changes).await?;

    Ok(ChainOutcome { movement, total })
}

/// Signed sum over the fixed movement id range.
async fn movement_subtotal(
    db_tx: &DatabaseTransaction,
    ctx: &ChainContext<'_>,
    changes: &mut Vec<EntryChange>,
) -> ResultEngine<MovementSubtotal> {
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

    use crate::entries;

    let range = ctx.chain.movement_range();
    let rows = entries::Entity::find()
        .filter(entries::Column::Date.eq(ctx.date))
        .filter(entries::Column::AccountId.eq(ctx.account_id))
        .filter(entries::Column::Area.eq(Area::Disbursement.as_str()))
        .filter(entries::Column::ConceptId.between(*range.start(), *range.end()))
        .all(db_tx)
        .await?;

    if rows.is_empty() {
        return Ok(MovementSubtotal {
            amount: Amount::ZERO,
            exists: false,
            changed: false,
        });
    }

    let mut amount = Amount::ZERO;
    for row in &rows {
        let code = ctx.catalog.get(row.concept_id).and_then(|c| c.code);
        amount += signed_contribution(code, Amount::new(row.amount_minor));
    }

    let changed = ctx
        .write(
            db_tx,
            ctx.disbursement_key(ctx.chain.movement_subtotal),
            amount,
            "movement_subtotal",
            changes,
        )
        .await?;

    Ok(MovementSubtotal {
        amount,
        exists: true,
        changed,
    })
}

/// Carries yesterday's closing into today: the total bank balance of the
/// previous *business* day, not simply D−1.
async fn prior_day_balance(
    db_tx: &DatabaseTransaction,
    ctx: &ChainContext<'_>,
    changes: &mut Vec<EntryChange>,
) -> ResultEngine<PriorDayBalance> {
    let previous = ctx.calendar.previous_business_day(ctx.date, false);
    let source = entry_amount(
        db_tx,
        previous,
        ctx.chain.total_bank_balance,
        ctx.account_id,
        Area::Disbursement,
    )
    .await?;

    match source {
        Some(amount) => {
            ctx.write(
                db_tx,
                ctx.disbursement_key(ctx.chain.prior_day_balance),
                amount,
                "prior_day_balance",
                changes,
            )
            .await?;
            Ok(PriorDayBalance {
                amount,
                exists: true,
            })
        }
        // No prior-day total: keep whatever row is already there (seeded by
        // hand or projected earlier) so downstream stages see it.
        None => {
            let existing = ctx
                .read(db_tx, ctx.chain.prior_day_balance, Area::Disbursement)
                .await?;
            Ok(PriorDayBalance {
                amount: existing.unwrap_or(Amount::ZERO),
                exists: existing.is_some(),
            })
        }
    }
}

/// `bank_balance − prior_day_balance`, operands defaulting to zero. Always
/// recomputed, even with a single operand present.
async fn balance_difference(
    db_tx: &DatabaseTransaction,
    ctx: &ChainContext<'_>,
    prior: &PriorDayBalance,
    changes: &mut Vec<EntryChange>,
) -> ResultEngine<BalanceDifference> {
    let bank = ctx
        .read(db_tx, ctx.chain.bank_balance, Area::Disbursement)
        .await?
        .unwrap_or(Amount::ZERO);
    let amount = bank - prior.amount;

    ctx.write(
        db_tx,
        ctx.disbursement_key(ctx.chain.balance_difference),
        amount,
        "balance_difference",
        changes,
    )
    .await?;

    Ok(BalanceDifference { amount })
}

/// `movement_subtotal + prior_day_balance`.
async fn opening_subtotal(
    db_tx: &DatabaseTransaction,
    ctx: &ChainContext<'_>,
    movement: &MovementSubtotal,
    prior: &PriorDayBalance,
    changes: &mut Vec<EntryChange>,
) -> ResultEngine<OpeningSubtotal> {
    if !movement.exists && !prior.exists {
        return Ok(OpeningSubtotal {
            amount: Amount::ZERO,
            exists: false,
        });
    }

    let amount = movement.amount + prior.amount;
    ctx.write(
        db_tx,
        ctx.disbursement_key(ctx.chain.opening_subtotal),
        amount,
        "opening_subtotal",
        changes,
    )
    .await?;

    Ok(OpeningSubtotal {
        amount,
        exists: true,
    })
}

/// Cross-area copy of the treasury subtotal into the disbursement ledger.
///
/// The source is looked up in the treasury area first and, when absent, in
/// the disbursement area. The fallback reproduces legacy data that predates
/// the two-area split; product has not yet confirmed whether it can be
/// dropped, so it stays.
async fn treasury_mirror(
    db_tx: &DatabaseTransaction,
    ctx: &ChainContext<'_>,
    changes: &mut Vec<EntryChange>,
) -> ResultEngine<TreasuryMirror> {
    let mut source = ctx
        .read(db_tx, ctx.chain.treasury_subtotal, Area::Treasury)
        .await?;
    if source.is_none() {
        source = ctx
            .read(db_tx, ctx.chain.treasury_subtotal, Area::Disbursement)
            .await?;
    }

    match source {
        Some(amount) => {
            ctx.write(
                db_tx,
                ctx.disbursement_key(ctx.chain.treasury_movement_mirror),
                amount,
                "treasury_movement_mirror",
                changes,
            )
            .await?;
            Ok(TreasuryMirror {
                amount,
                exists: true,
            })
        }
        None => {
            let existing = ctx
                .read(db_tx, ctx.chain.treasury_movement_mirror, Area::Disbursement)
                .await?;
            Ok(TreasuryMirror {
                amount: existing.unwrap_or(Amount::ZERO),
                exists: existing.is_some(),
            })
        }
    }
}

/// `opening_subtotal + treasury_movement_mirror`: the closing figure the
/// next business day opens with.
async fn total_bank_balance(
    db_tx: &DatabaseTransaction,
    ctx: &ChainContext<'_>,
    opening: &OpeningSubtotal,
    mirror: &TreasuryMirror,
    changes: &mut Vec<EntryChange>,
) -> ResultEngine<TotalBankBalance> {
    if !opening.exists && !mirror.exists {
        return Ok(TotalBankBalance {
            amount: Amount::ZERO,
            exists: false,
        });
    }

    let amount = opening.amount + mirror.amount;
    ctx.write(
        db_tx,
        ctx.disbursement_key(ctx.chain.total_bank_balance),
        amount,
        "total_bank_balance",
        changes,
    )
    .await?;

    Ok(TotalBankBalance {
        amount,
        exists: true,
    })
}
