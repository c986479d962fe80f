// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure a ledger operation can surface. Operations either complete
/// with their guarantees or fail with exactly one of these.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or incomplete input, rejected before storage is touched.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An explicit create/update named a category or payment method that does
    /// not exist.
    #[error("{entity} {id} does not exist")]
    Referential { entity: &'static str, id: i64 },

    /// The addressed row is not in the ledger.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A persisted value could not be decoded back into its domain type.
    #[error("corrupt stored value: {0}")]
    Decode(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}
