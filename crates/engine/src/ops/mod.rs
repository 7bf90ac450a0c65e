use sea_orm::DatabaseConnection;

use crate::{
    BusinessCalendar, ChainConcepts, ResultEngine, catalog::ConceptCatalog,
};

mod catalog;
mod pipeline;
mod queries;
mod recompute;
mod writes;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// The recomputation engine.
///
/// Owns a database connection and the read-only collaborators of a cascade:
/// the concept catalog (loaded at build), the business-day calendar and the
/// well-known chain ids.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    catalog: ConceptCatalog,
    calendar: BusinessCalendar,
    chain: ChainConcepts,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// The calendar the engine projects with.
    pub fn calendar(&self) -> &BusinessCalendar {
        &self.calendar
    }

    /// The well-known chain concept ids.
    pub fn chain(&self) -> &ChainConcepts {
        &self.chain
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    calendar: Option<BusinessCalendar>,
    chain: Option<ChainConcepts>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Override the default Saturday/Sunday calendar.
    pub fn calendar(mut self, calendar: BusinessCalendar) -> EngineBuilder {
        self.calendar = Some(calendar);
        self
    }

    /// Override the default chain concept ids.
    pub fn chain(mut self, chain: ChainConcepts) -> EngineBuilder {
        self.chain = Some(chain);
        self
    }

    /// Construct `Engine`, loading the concept catalog from the database.
    pub async fn build(self) -> ResultEngine<Engine> {
        let catalog = ConceptCatalog::load(&self.database).await?;
        Ok(Engine {
            database: self.database,
            catalog,
            calendar: self.calendar.unwrap_or_default(),
            chain: self.chain.unwrap_or_default(),
        })
    }
}
