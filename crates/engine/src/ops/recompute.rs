use chrono::NaiveDate;
use sea_orm::{ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, TransactionTrait};

use crate::{
    Account, Area, EntryChange, EntryKey, RecomputeCmd, RecomputeOutcome, ResultEngine,
    TriggerKind, accounts, evaluator,
};

use super::{
    Engine,
    pipeline::{self, ChainContext},
    with_tx,
    writes::{stored_amount, upsert_entry},
};

impl Engine {
    /// Recomputes every derived value for a day.
    ///
    /// One transaction per invocation: either every phase for every account
    /// in scope commits, or nothing does. The outcome lists the entries
    /// whose amounts actually changed; running the same recompute twice
    /// therefore yields an empty second outcome.
    pub async fn recompute(&self, cmd: RecomputeCmd) -> ResultEngine<RecomputeOutcome> {
        if let Some(area) = cmd.area {
            area.require_concrete()?;
        }

        with_tx!(self, |db_tx| {
            let accounts = self.resolve_scope(&db_tx, &cmd).await?;

            let mut changes = Vec::new();
            for account in &accounts {
                changes.extend(
                    self.cascade_account(&db_tx, cmd.date, account, cmd.area, cmd.actor.as_deref())
                        .await?,
                );
            }

            tracing::info!(
                date = %cmd.date,
                accounts = accounts.len(),
                triggering_concept = cmd.concept_id,
                changed = changes.len(),
                "recompute finished"
            );

            Ok(RecomputeOutcome {
                entries_changed: changes,
            })
        })
    }

    /// The account set of an invocation: the requested account, or every
    /// active account (optionally narrowed to one company).
    async fn resolve_scope(
        &self,
        db_tx: &DatabaseTransaction,
        cmd: &RecomputeCmd,
    ) -> ResultEngine<Vec<Account>> {
        if let Some(account_id) = cmd.account_id {
            return Ok(vec![self.require_account(db_tx, account_id).await?]);
        }

        let mut query = accounts::Entity::find().filter(accounts::Column::Active.eq(true));
        if let Some(company_id) = cmd.company_id {
            query = query.filter(accounts::Column::CompanyId.eq(company_id));
        }

        let models = query.all(db_tx).await?;
        models.into_iter().map(Account::try_from).collect()
    }

    /// Runs all four phases for one account.
    ///
    /// Ordering matters: the generic formula concepts first (Phase A), then
    /// the disbursement chain (Phase B), then the forward projection and the
    /// treasury counter-mirror (Phases C/D) which read what B just wrote.
    pub(super) async fn cascade_account(
        &self,
        db_tx: &DatabaseTransaction,
        date: NaiveDate,
        account: &Account,
        area: Option<Area>,
        actor: Option<&str>,
    ) -> ResultEngine<Vec<EntryChange>> {
        let mut changes = Vec::new();

        self.phase_formulas(db_tx, date, account, area, actor, &mut changes)
            .await?;

        let ctx = ChainContext {
            date,
            account_id: account.id,
            company_id: account.company_id,
            chain: &self.chain,
            catalog: &self.catalog,
            calendar: &self.calendar,
            actor,
        };
        let chain = pipeline::run(db_tx, &ctx, &mut changes).await?;

        self.phase_projection(db_tx, date, account, &chain.total, actor, &mut changes)
            .await?;

        if chain.movement.changed {
            self.phase_treasury_mirror(db_tx, date, account, chain.movement.amount, actor, &mut changes)
                .await?;
        }

        Ok(changes)
    }

    /// Phase A: evaluate every active formula-driven concept in scope and
    /// upsert the result, annotated with the formula that produced it.
    async fn phase_formulas(
        &self,
        db_tx: &DatabaseTransaction,
        date: NaiveDate,
        account: &Account,
        area: Option<Area>,
        actor: Option<&str>,
        changes: &mut Vec<EntryChange>,
    ) -> ResultEngine<()> {
        let filter = area.unwrap_or(Area::Both);

        for concept in self.catalog.derived_for_area(filter) {
            let Some(dependency) = &concept.dependency else {
                continue;
            };

            for target_area in concrete_areas(concept.area, filter) {
                let amount = evaluator::evaluate(
                    db_tx,
                    &self.catalog,
                    dependency,
                    date,
                    account.id,
                    target_area,
                )
                .await?;

                let key = EntryKey::new(date, concept.id, account.id, target_area);
                if let Some(change) = upsert_entry(
                    db_tx,
                    key,
                    account.company_id,
                    amount,
                    TriggerKind::Recompute,
                    actor,
                    Some(dependency.to_string()),
                )
                .await?
                {
                    changes.push(change);
                }
            }
        }

        Ok(())
    }

    /// Phase C: project closing figures into the next business day's
    /// opening slots, for both areas. The disbursement side consumes the
    /// total the pipeline just produced.
    async fn phase_projection(
        &self,
        db_tx: &DatabaseTransaction,
        date: NaiveDate,
        account: &Account,
        total: &pipeline::TotalBankBalance,
        actor: Option<&str>,
        changes: &mut Vec<EntryChange>,
    ) -> ResultEngine<()> {
        let next = self.calendar.next_business_day(date, false);

        if total.exists {
            let key = EntryKey::new(next, self.chain.prior_day_balance, account.id, Area::Disbursement);
            if let Some(change) = upsert_entry(
                db_tx,
                key,
                account.company_id,
                total.amount,
                TriggerKind::Projection,
                actor,
                Some("projection:total_bank_balance".to_string()),
            )
            .await?
            {
                changes.push(change);
            }
        }

        let closing = stored_amount(
            db_tx,
            EntryKey::new(date, self.chain.closing_balance, account.id, Area::Treasury),
        )
        .await?;
        if let Some(amount) = closing {
            let key = EntryKey::new(next, self.chain.opening_balance, account.id, Area::Treasury);
            if let Some(change) = upsert_entry(
                db_tx,
                key,
                account.company_id,
                amount,
                TriggerKind::Projection,
                actor,
                Some("projection:closing_balance".to_string()),
            )
            .await?
            {
                changes.push(change);
            }
        }

        Ok(())
    }

    /// Phase D: keep the treasury window mirror equal to the movement
    /// subtotal the chain just computed, without a second top-level
    /// invocation.
    async fn phase_treasury_mirror(
        &self,
        db_tx: &DatabaseTransaction,
        date: NaiveDate,
        account: &Account,
        amount: crate::Amount,
        actor: Option<&str>,
        changes: &mut Vec<EntryChange>,
    ) -> ResultEngine<()> {
        let key = EntryKey::new(date, self.chain.treasury_window_mirror, account.id, Area::Treasury);
        if let Some(change) = upsert_entry(
            db_tx,
            key,
            account.company_id,
            amount,
            TriggerKind::Recompute,
            actor,
            Some("mirror:movement_subtotal".to_string()),
        )
        .await?
        {
            changes.push(change);
        }
        Ok(())
    }
}

/// Expands a concept's catalog area to the concrete entry areas it writes,
/// narrowed by the invocation filter.
fn concrete_areas(concept_area: Area, filter: Area) -> Vec<Area> {
    let all = match concept_area {
        Area::Both => vec![Area::Treasury, Area::Disbursement],
        concrete => vec![concrete],
    };
    match filter {
        Area::Both => all,
        concrete => all.into_iter().filter(|a| *a == concrete).collect(),
    }
}
