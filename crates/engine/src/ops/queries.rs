use chrono::NaiveDate;
use sea_orm::{
    ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};

use crate::{
    Account, Area, EngineError, EntryKey, LedgerEntry, Provenance, ResultEngine, accounts,
    entries, provenance,
};

use super::{Engine, with_tx};

impl Engine {
    /// Point lookup on the natural key.
    pub async fn entry(&self, key: EntryKey) -> ResultEngine<Option<LedgerEntry>> {
        let area = key.area.require_concrete()?;
        with_tx!(self, |db_tx| {
            let model = entries::Entity::find()
                .filter(entries::Column::Date.eq(key.date))
                .filter(entries::Column::ConceptId.eq(key.concept_id))
                .filter(entries::Column::AccountId.eq(key.account_id))
                .filter(entries::Column::Area.eq(area.as_str()))
                .one(&db_tx)
                .await?;
            model.map(LedgerEntry::try_from).transpose()
        })
    }

    /// Range lookup by concept id over `[from, to]`, optionally narrowed to
    /// one account. Ordered by date, then account.
    pub async fn entries_for_concept(
        &self,
        concept_id: i32,
        from: NaiveDate,
        to: NaiveDate,
        account_id: Option<i32>,
    ) -> ResultEngine<Vec<LedgerEntry>> {
        if from > to {
            return Err(EngineError::InvalidDateRange(format!(
                "start {from} is after end {to}"
            )));
        }

        with_tx!(self, |db_tx| {
            let mut query = entries::Entity::find()
                .filter(entries::Column::ConceptId.eq(concept_id))
                .filter(entries::Column::Date.gte(from))
                .filter(entries::Column::Date.lte(to))
                .order_by_asc(entries::Column::Date)
                .order_by_asc(entries::Column::AccountId);
            if let Some(account_id) = account_id {
                query = query.filter(entries::Column::AccountId.eq(account_id));
            }

            let models = query.all(&db_tx).await?;
            models.into_iter().map(LedgerEntry::try_from).collect()
        })
    }

    /// Provenance history for a natural key, newest first: every value the
    /// entry has held and what wrote it.
    pub async fn entry_history(&self, key: EntryKey) -> ResultEngine<Vec<Provenance>> {
        let area = key.area.require_concrete()?;
        with_tx!(self, |db_tx| {
            let models = provenance::Entity::find()
                .filter(provenance::Column::Date.eq(key.date))
                .filter(provenance::Column::ConceptId.eq(key.concept_id))
                .filter(provenance::Column::AccountId.eq(key.account_id))
                .filter(provenance::Column::Area.eq(area.as_str()))
                .order_by_desc(provenance::Column::RecordedAt)
                .order_by_desc(provenance::Column::Id)
                .all(&db_tx)
                .await?;
            models.into_iter().map(Provenance::try_from).collect()
        })
    }

    pub(super) async fn require_account(
        &self,
        db_tx: &DatabaseTransaction,
        account_id: i32,
    ) -> ResultEngine<Account> {
        let model = accounts::Entity::find_by_id(account_id)
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))?;
        Account::try_from(model)
    }

    /// Daily sheet for one account and area: every entry of the day ordered
    /// by the catalog's display order.
    pub async fn day_sheet(
        &self,
        date: NaiveDate,
        account_id: i32,
        area: Area,
    ) -> ResultEngine<Vec<LedgerEntry>> {
        let area = area.require_concrete()?;
        with_tx!(self, |db_tx| {
            let models = entries::Entity::find()
                .filter(entries::Column::Date.eq(date))
                .filter(entries::Column::AccountId.eq(account_id))
                .filter(entries::Column::Area.eq(area.as_str()))
                .all(&db_tx)
                .await?;

            let mut sheet: Vec<LedgerEntry> = models
                .into_iter()
                .map(LedgerEntry::try_from)
                .collect::<ResultEngine<_>>()?;
            sheet.sort_by_key(|entry| {
                self.catalog
                    .get(entry.concept_id)
                    .map(|c| (c.display_order, c.id))
                    .unwrap_or((i32::MAX, entry.concept_id))
            });
            Ok(sheet)
        })
    }
}
