//! The module contains the errors the engine can throw.
//!
//! The interesting ones for callers are:
//!
//! - [`DerivedConceptWrite`] thrown on a direct write to a derived concept.
//! - [`InvalidDateRange`] thrown by calendar operations when `start > end`.
//!
//!  [`DerivedConceptWrite`]: EngineError::DerivedConceptWrite
//!  [`InvalidDateRange`]: EngineError::InvalidDateRange
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Derived concept: {0}")]
    DerivedConceptWrite(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),
    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("Invalid area: {0}")]
    InvalidArea(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::DerivedConceptWrite(a), Self::DerivedConceptWrite(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidDateRange(a), Self::InvalidDateRange(b)) => a == b,
            (Self::InvalidDescriptor(a), Self::InvalidDescriptor(b)) => a == b,
            (Self::InvalidArea(a), Self::InvalidArea(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
