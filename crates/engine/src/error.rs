//! The module contains the error the engine can throw.
//!
//! The errors are:
//!
//! - [`Validation`] thrown when an input breaks a domain rule (non-positive
//!   amount, `from == to`, unknown member in a command).
//! - [`KeyNotFound`] thrown when a group, member or settlement is not found.
//! - [`Forbidden`] thrown when the acting member may not perform the action
//!   (e.g. a debtor confirming their own settlement).
//! - [`Conflict`] thrown when a settlement is no longer `PENDING`, or the
//!   store detected a concurrent modification.
//! - [`InconsistentLedger`] thrown when the debt records cannot cover a
//!   settlement being confirmed. The surrounding transaction is rolled back.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`Forbidden`]: EngineError::Forbidden
//!  [`Conflict`]: EngineError::Conflict
//!  [`InconsistentLedger`]: EngineError::InconsistentLedger
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Inconsistent ledger: {0}")]
    InconsistentLedger(String),
    #[error("Storage failure: {0}")]
    Storage(String),
}
