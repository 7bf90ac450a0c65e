use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, TransactionTrait};

use crate::{
    Account, Concept, EngineError, ResultEngine, accounts, catalog::ConceptCatalog, concepts,
};

use super::{Engine, with_tx};

impl Engine {
    /// Registers a new catalog concept.
    ///
    /// Ids are caller-assigned and stable; inserting an existing id fails
    /// with [`EngineError::ExistingKey`]. The in-memory catalog is updated
    /// so the next cascade sees the concept without a rebuild.
    pub async fn new_concept(&mut self, concept: Concept) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            if concepts::Entity::find_by_id(concept.id)
                .one(&db_tx)
                .await?
                .is_some()
            {
                return Err(EngineError::ExistingKey(concept.id.to_string()));
            }
            concepts::ActiveModel::from(&concept).insert(&db_tx).await?;
            Ok::<(), EngineError>(())
        })?;

        self.catalog.insert(concept);
        Ok(())
    }

    /// Registers a new account.
    pub async fn new_account(&self, account: Account) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            if accounts::Entity::find_by_id(account.id)
                .one(&db_tx)
                .await?
                .is_some()
            {
                return Err(EngineError::ExistingKey(account.id.to_string()));
            }
            accounts::ActiveModel::from(&account).insert(&db_tx).await?;
            Ok(())
        })
    }

    /// Returns a catalog concept.
    pub fn concept(&self, concept_id: i32) -> ResultEngine<&Concept> {
        self.catalog
            .get(concept_id)
            .ok_or_else(|| EngineError::KeyNotFound("concept not exists".to_string()))
    }

    /// Lists every catalog row from the store, in display order.
    pub async fn list_concepts(&self) -> ResultEngine<Vec<Concept>> {
        with_tx!(self, |db_tx| {
            let models = concepts::Entity::find()
                .order_by_asc(concepts::Column::DisplayOrder)
                .order_by_asc(concepts::Column::Id)
                .all(&db_tx)
                .await?;
            models.into_iter().map(Concept::try_from).collect()
        })
    }

    /// Lists accounts, active only unless `include_inactive`.
    pub async fn list_accounts(&self, include_inactive: bool) -> ResultEngine<Vec<Account>> {
        with_tx!(self, |db_tx| {
            let mut query = accounts::Entity::find().order_by_asc(accounts::Column::Id);
            if !include_inactive {
                query = query.filter(accounts::Column::Active.eq(true));
            }
            let models = query.all(&db_tx).await?;
            models.into_iter().map(Account::try_from).collect()
        })
    }

    /// Reloads the in-memory catalog from the store. Call after catalog rows
    /// changed behind the engine's back.
    pub async fn reload_catalog(&mut self) -> ResultEngine<()> {
        self.catalog = ConceptCatalog::load(&self.database).await?;
        Ok(())
    }
}
