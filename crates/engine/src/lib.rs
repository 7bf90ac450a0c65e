//! Primanota recomputation engine.
//!
//! A daily cash-flow ledger for a treasury/payables department: named
//! *concepts* recorded per account, per day, in one of two *areas*
//! (treasury and disbursements). Base concepts accept direct writes; every
//! derived concept (formula subtotals, the disbursement chain, cross-area
//! mirrors, next-business-day openings) is kept consistent by the
//! [`Engine`]'s cascade.

pub use accounts::Account;
pub use calendar::BusinessCalendar;
pub use chain::ChainConcepts;
pub use commands::{EntryChange, RecomputeCmd, RecomputeOutcome, WriteEntryCmd};
pub use concepts::{Area, Concept, SignCode};
pub use dependency::{CombineMode, Dependency};
pub use entries::{EntryKey, LedgerEntry};
pub use error::EngineError;
pub use money::Amount;
pub use ops::{Engine, EngineBuilder};
pub use provenance::{Provenance, TriggerKind};

mod accounts;
mod calendar;
mod catalog;
mod chain;
mod commands;
mod concepts;
mod dependency;
mod entries;
mod error;
mod evaluator;
mod money;
mod ops;
mod provenance;

type ResultEngine<T> = Result<T, EngineError>;
