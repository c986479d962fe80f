// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Persistence seam. The ledger core only ever talks to a [`LedgerStore`];
//! platform code supplies the engine behind it.

pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::filters::TransactionFilter;
use crate::models::{Category, NewTransaction, PaymentMethod, Transaction, TransactionView, UserConfig};

/// Raw CRUD and filtered reads over the four ledger tables.
///
/// Filtered reads evaluate the date, type, condition and id criteria only.
/// Name-based criteria (free text, category slug) are left to
/// [`TransactionFilter::refine`].
///
/// Writes never fail on a dangling category or payment method id: the
/// reference is stored as null.
pub trait LedgerStore {
    fn insert_transaction(&mut self, tx: &NewTransaction) -> Result<i64>;
    /// Full replace of the editable fields.
    fn update_transaction(&mut self, id: i64, tx: &NewTransaction) -> Result<()>;
    fn delete_transaction(&mut self, id: i64) -> Result<()>;
    /// All or nothing: an unknown id aborts the call and nothing is removed.
    fn delete_transactions(&mut self, ids: &[i64]) -> Result<()>;
    fn transaction(&self, id: i64) -> Result<Option<Transaction>>;
    /// Every transaction, oldest first.
    fn transactions(&self) -> Result<Vec<Transaction>>;
    fn transactions_matching(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>>;
    /// Joined with category and payment method names, most recent first.
    fn transaction_views(&self, filter: &TransactionFilter) -> Result<Vec<TransactionView>>;

    fn insert_category(&mut self, name: &str, icon_name: &str) -> Result<i64>;
    fn update_category(&mut self, category: &Category) -> Result<()>;
    fn delete_category(&mut self, id: i64) -> Result<()>;
    fn category(&self, id: i64) -> Result<Option<Category>>;
    fn category_by_name(&self, name: &str) -> Result<Option<Category>>;
    fn categories(&self) -> Result<Vec<Category>>;

    fn insert_payment_method(&mut self, name: &str) -> Result<i64>;
    fn update_payment_method(&mut self, method: &PaymentMethod) -> Result<()>;
    fn delete_payment_method(&mut self, id: i64) -> Result<()>;
    fn payment_method(&self, id: i64) -> Result<Option<PaymentMethod>>;
    fn payment_method_by_name(&self, name: &str) -> Result<Option<PaymentMethod>>;
    fn payment_methods(&self) -> Result<Vec<PaymentMethod>>;

    /// The singleton config, created with defaults if it is not there yet.
    fn user_config(&self) -> Result<UserConfig>;
    fn save_user_config(&mut self, config: &UserConfig) -> Result<()>;

    /// No rows in any table, config included.
    fn is_pristine(&self) -> Result<bool>;
    /// Empty every table and restart id assignment.
    fn clear_all(&mut self) -> Result<()>;

    /// Run `f` as one unit: its writes are kept only if it returns `Ok`.
    fn atomically<T, F>(&mut self, f: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T>;
}
