use bcrypt::BcryptError;
use sea_orm::{DbErr, TransactionError};
use thiserror::Error;

use crate::validation::ValidationErrors;

pub mod micropost;
pub mod relationship;
pub mod user;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{}", .0.join(", "))]
    Invalid(ValidationErrors),
    #[error(transparent)]
    Db(#[from] DbErr),
    #[error(transparent)]
    Hash(#[from] BcryptError),
}

impl From<ValidationErrors> for StoreError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Invalid(errors)
    }
}

pub(crate) fn flatten_tx_error(err: TransactionError<DbErr>) -> DbErr {
    match err {
        TransactionError::Connection(e) => e,
        TransactionError::Transaction(e) => e,
    }
}

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    let msg = err.to_string();
    msg.contains("Duplicate") || msg.contains("UNIQUE")
}
