use sea_orm::{ActiveModelTrait, ActiveValue, DatabaseTransaction, TransactionTrait};

use crate::{
    Amount, EngineError, EntryChange, EntryKey, LedgerEntry, Provenance, RecomputeOutcome,
    ResultEngine, TriggerKind, WriteEntryCmd, entries, evaluator::entry_amount, provenance,
};

use super::{Engine, with_tx};

impl Engine {
    /// Writes a base-concept value and runs the full cascade for it, all in
    /// one transaction.
    ///
    /// Rejected before anything is persisted:
    /// - writes to a derived or chain-owned concept
    ///   ([`EngineError::DerivedConceptWrite`])
    /// - unknown concepts or accounts
    pub async fn write_entry(&self, cmd: WriteEntryCmd) -> ResultEngine<RecomputeOutcome> {
        let area = cmd.area.require_concrete()?;

        let concept = self
            .catalog
            .get(cmd.concept_id)
            .ok_or_else(|| EngineError::KeyNotFound("concept not exists".to_string()))?;
        if concept.is_derived() || self.chain.is_engine_owned(cmd.concept_id) {
            return Err(EngineError::DerivedConceptWrite(format!(
                "concept {} ({}) is computed by the engine",
                concept.id, concept.name
            )));
        }
        if !concept.area.matches(area) {
            return Err(EngineError::InvalidArea(format!(
                "concept {} belongs to area {}",
                concept.id,
                concept.area.as_str()
            )));
        }

        with_tx!(self, |db_tx| {
            let account = self.require_account(&db_tx, cmd.account_id).await?;

            let mut changes = Vec::new();
            let key = EntryKey::new(cmd.date, cmd.concept_id, cmd.account_id, area);
            if let Some(change) = upsert_entry(
                &db_tx,
                key,
                account.company_id,
                cmd.amount,
                TriggerKind::UserEdit,
                cmd.actor.as_deref(),
                None,
            )
            .await?
            {
                changes.push(change);
            }

            tracing::debug!(
                concept_id = cmd.concept_id,
                account_id = cmd.account_id,
                date = %cmd.date,
                "base write accepted, cascading"
            );

            changes.extend(
                self.cascade_account(&db_tx, cmd.date, &account, Some(area), cmd.actor.as_deref())
                    .await?,
            );

            Ok(RecomputeOutcome {
                entries_changed: changes,
            })
        })
    }
}

/// Upserts a ledger entry on its natural key and appends a provenance row.
///
/// Returns `None` when the stored amount already equals `amount`: nothing is
/// written, which is what makes a repeated cascade idempotent.
pub(super) async fn upsert_entry(
    db_tx: &DatabaseTransaction,
    key: EntryKey,
    company_id: i32,
    amount: Amount,
    trigger: TriggerKind,
    actor: Option<&str>,
    formula: Option<String>,
) -> ResultEngine<Option<EntryChange>> {
    let existing = find_entry(db_tx, key).await?;

    let previous = match &existing {
        Some(model) => {
            let old = Amount::new(model.amount_minor);
            if old == amount {
                return Ok(None);
            }
            let update = entries::ActiveModel {
                id: ActiveValue::Set(model.id.clone()),
                amount_minor: ActiveValue::Set(amount.cents()),
                ..Default::default()
            };
            update.update(db_tx).await?;
            Some(old)
        }
        None => {
            let entry = LedgerEntry::new(key, amount, company_id);
            entries::ActiveModel::from(&entry).insert(db_tx).await?;
            None
        }
    };

    let record = Provenance::new(
        key,
        trigger,
        actor.map(str::to_string),
        previous,
        amount,
        formula,
    );
    provenance::ActiveModel::from(&record).insert(db_tx).await?;

    Ok(Some(EntryChange {
        concept_id: key.concept_id,
        account_id: key.account_id,
        area: key.area,
        old_amount: previous,
        new_amount: amount,
    }))
}

async fn find_entry(
    db_tx: &DatabaseTransaction,
    key: EntryKey,
) -> ResultEngine<Option<entries::Model>> {
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

    entries::Entity::find()
        .filter(entries::Column::Date.eq(key.date))
        .filter(entries::Column::ConceptId.eq(key.concept_id))
        .filter(entries::Column::AccountId.eq(key.account_id))
        .filter(entries::Column::Area.eq(key.area.as_str()))
        .one(db_tx)
        .await
        .map_err(Into::into)
}

/// Reads a stored value back. Used by the projection phase for the
/// treasury closing balance, which only users write.
pub(super) async fn stored_amount(
    db_tx: &DatabaseTransaction,
    key: EntryKey,
) -> ResultEngine<Option<Amount>> {
    entry_amount(db_tx, key.date, key.concept_id, key.account_id, key.area).await
}
