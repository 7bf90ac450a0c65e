//! In-memory concept catalog.
//!
//! Loaded once when the engine is built and read-only during recomputation.
//! Dependency descriptors are parsed here, so the cascade never parses
//! formula strings on the hot path.

use std::collections::HashMap;

use sea_orm::{ConnectionTrait, EntityTrait};

use crate::{Area, Concept, ResultEngine, concepts};

#[derive(Clone, Debug, Default)]
pub struct ConceptCatalog {
    concepts: HashMap<i32, Concept>,
}

impl ConceptCatalog {
    /// Loads every catalog row from the store.
    ///
    /// A row whose descriptor does not parse is kept as a base concept and
    /// reported with a warning; a broken catalog row must not take the whole
    /// engine down.
    pub async fn load<C: ConnectionTrait>(db: &C) -> ResultEngine<Self> {
        let models = concepts::Entity::find().all(db).await?;

        let mut catalog = HashMap::with_capacity(models.len());
        for model in models {
            let id = model.id;
            match Concept::try_from(model.clone()) {
                Ok(concept) => {
                    catalog.insert(id, concept);
                }
                Err(err) => {
                    tracing::warn!(concept_id = id, %err, "degrading concept to base");
                    let degraded = Concept {
                        id,
                        name: model.name,
                        code: None,
                        area: Area::try_from(model.area.as_str()).unwrap_or(Area::Both),
                        active: model.active,
                        display_order: model.display_order,
                        dependency: None,
                    };
                    catalog.insert(id, degraded);
                }
            }
        }

        Ok(Self { concepts: catalog })
    }

    pub fn get(&self, id: i32) -> Option<&Concept> {
        self.concepts.get(&id)
    }

    pub fn is_derived(&self, id: i32) -> bool {
        self.concepts.get(&id).is_some_and(Concept::is_derived)
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// Active derived concepts participating in a recomputation scoped to
    /// `filter`, in evaluation order (`display_order`, then id for
    /// stability).
    pub fn derived_for_area(&self, filter: Area) -> Vec<&Concept> {
        let mut derived: Vec<&Concept> = self
            .concepts
            .values()
            .filter(|c| c.active && c.is_derived() && c.area.matches(filter))
            .collect();
        derived.sort_by_key(|c| (c.display_order, c.id));
        derived
    }

    /// Registers a freshly created concept without a full reload.
    pub(crate) fn insert(&mut self, concept: Concept) {
        self.concepts.insert(concept.id, concept);
    }
}
