// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Cash-ledger core: persisted transactions, running balances, filtered
//! aggregation and atomic backup/restore.

pub mod aggregation;
pub mod backup;
pub mod balance;
pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod ledger;
pub mod models;
pub mod report;
pub mod store;
pub mod utils;

pub use error::{Error, Result};
pub use ledger::{Ledger, LedgerChange, TransactionInput};
