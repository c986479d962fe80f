// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Service boundary over a [`LedgerStore`]: input validation, sign
//! normalization, change notification, and the composed read views.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::mpsc::{Receiver, Sender, channel};

use crate::aggregation::{self, AggregationRequest, Dashboard};
use crate::backup::{self, BackupDocument, ImportStats};
use crate::balance::{self, BalanceSheet};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::filters::TransactionFilter;
use crate::models::{
    Category, Condition, DEFAULT_ICON, MAX_AMOUNT_UNITS, NewTransaction, PaymentMethod,
    Transaction, TransactionView, TxType, USER_CONFIG_ID, UserConfig, within_amount_limit,
};
use crate::store::{LedgerStore, SqliteStore};

/// Published after every successful mutation so readers know to re-fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerChange {
    TransactionAdded(i64),
    TransactionUpdated(i64),
    TransactionsDeleted(Vec<i64>),
    CategoriesChanged,
    PaymentMethodsChanged,
    ConfigChanged,
    Restored,
    Reset,
}

/// A transaction as a user enters it: an unsigned amount plus its type.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionInput {
    pub date: NaiveDate,
    pub description: Option<String>,
    /// Magnitude; the sign comes from `kind`.
    pub amount: Decimal,
    pub kind: TxType,
    pub condition: Condition,
    pub installments: u32,
    pub category_id: Option<i64>,
    pub payment_method_id: Option<i64>,
}

impl TransactionInput {
    /// A single-installment entry.
    pub fn paid(
        date: NaiveDate,
        kind: TxType,
        amount: Decimal,
        category_id: i64,
        payment_method_id: i64,
    ) -> Self {
        TransactionInput {
            date,
            description: None,
            amount,
            kind,
            condition: Condition::Paid,
            installments: 1,
            category_id: Some(category_id),
            payment_method_id: Some(payment_method_id),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn check(&self) -> Result<()> {
        if self.amount <= Decimal::ZERO {
            return Err(Error::validation("value must be greater than zero"));
        }
        if !within_amount_limit(self.amount) {
            return Err(Error::validation(format!(
                "value {} exceeds the supported maximum of {MAX_AMOUNT_UNITS}",
                self.amount
            )));
        }
        match self.condition {
            Condition::Paid if self.installments != 1 => Err(Error::validation(
                "a paid transaction has exactly one installment",
            )),
            Condition::Pending if self.installments < 2 => Err(Error::validation(
                "an installment plan needs at least two installments",
            )),
            _ => Ok(()),
        }
    }

    fn to_record(&self) -> NewTransaction {
        NewTransaction {
            date: self.date,
            description: self
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            value: self.kind.signed(self.amount),
            kind: self.kind,
            condition: self.condition,
            installments: self.installments,
            category_id: self.category_id,
            payment_method_id: self.payment_method_id,
        }
    }
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn clean_name(name: &str, what: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation(format!("{what} name cannot be empty")));
    }
    Ok(name.to_string())
}

pub struct Ledger<S: LedgerStore = SqliteStore> {
    store: S,
    subscribers: Vec<Sender<LedgerChange>>,
}

impl Ledger<SqliteStore> {
    /// Open (creating if needed) the database named by `config`. A brand-new
    /// database is seeded with the defaults.
    pub fn open(config: &Config) -> Result<Self> {
        let mut ledger = Ledger::new(SqliteStore::open(&config.db_path)?);
        ledger.bootstrap(today())?;
        tracing::info!(path = %config.db_path.display(), "ledger opened");
        Ok(ledger)
    }
}

impl<S: LedgerStore> Ledger<S> {
    pub fn new(store: S) -> Self {
        Ledger {
            store,
            subscribers: Vec::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Seed defaults when the store holds nothing at all. Returns whether it did.
    pub fn bootstrap(&mut self, today: NaiveDate) -> Result<bool> {
        if !self.store.is_pristine()? {
            return Ok(false);
        }
        self.store
            .atomically(|s| backup::seed_defaults(s, today))?;
        tracing::info!("seeded default ledger");
        Ok(true)
    }

    pub fn subscribe(&mut self) -> Receiver<LedgerChange> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    fn notify(&mut self, change: LedgerChange) {
        // receivers that hung up are dropped
        self.subscribers.retain(|s| s.send(change.clone()).is_ok());
    }

    fn require_category(&self, id: i64) -> Result<()> {
        match self.store.category(id)? {
            Some(_) => Ok(()),
            None => Err(Error::Referential {
                entity: "category",
                id,
            }),
        }
    }

    fn require_payment_method(&self, id: i64) -> Result<()> {
        match self.store.payment_method(id)? {
            Some(_) => Ok(()),
            None => Err(Error::Referential {
                entity: "payment method",
                id,
            }),
        }
    }

    fn check_references(&self, input: &TransactionInput) -> Result<()> {
        if let Some(id) = input.category_id {
            self.require_category(id)?;
        }
        if let Some(id) = input.payment_method_id {
            self.require_payment_method(id)?;
        }
        Ok(())
    }

    // transactions

    pub fn add_transaction(&mut self, input: &TransactionInput) -> Result<i64> {
        input.check()?;
        if input.category_id.is_none() {
            return Err(Error::validation("a category is required"));
        }
        if input.payment_method_id.is_none() {
            return Err(Error::validation("a payment method is required"));
        }
        self.check_references(input)?;
        let id = self.store.insert_transaction(&input.to_record())?;
        tracing::info!(id, kind = %input.kind, amount = %input.amount, "transaction added");
        self.notify(LedgerChange::TransactionAdded(id));
        Ok(id)
    }

    /// Replace every editable field of transaction `id`.
    pub fn update_transaction(&mut self, id: i64, input: &TransactionInput) -> Result<()> {
        input.check()?;
        self.check_references(input)?;
        self.store.update_transaction(id, &input.to_record())?;
        tracing::info!(id, "transaction updated");
        self.notify(LedgerChange::TransactionUpdated(id));
        Ok(())
    }

    pub fn delete_transaction(&mut self, id: i64) -> Result<()> {
        self.store.delete_transaction(id)?;
        tracing::info!(id, "transaction deleted");
        self.notify(LedgerChange::TransactionsDeleted(vec![id]));
        Ok(())
    }

    /// Delete all of `ids` or, if any is unknown, none of them. Repeated ids
    /// count once.
    pub fn delete_transactions(&mut self, ids: &[i64]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        self.store.delete_transactions(&ids)?;
        tracing::info!(count = ids.len(), "transactions deleted");
        self.notify(LedgerChange::TransactionsDeleted(ids));
        Ok(())
    }

    pub fn transaction(&self, id: i64) -> Result<Option<Transaction>> {
        self.store.transaction(id)
    }

    pub fn transactions(&self) -> Result<Vec<Transaction>> {
        self.store.transactions()
    }

    /// Transactions matching `filter` with names resolved, most recent first.
    /// An absent end bound means today.
    pub fn list_filtered(&self, filter: &TransactionFilter) -> Result<Vec<TransactionView>> {
        self.list_filtered_as_of(filter, today())
    }

    pub fn list_filtered_as_of(
        &self,
        filter: &TransactionFilter,
        today: NaiveDate,
    ) -> Result<Vec<TransactionView>> {
        let filter = filter.clone().with_default_end(today);
        let views = self.store.transaction_views(&filter)?;
        Ok(filter.refine(views))
    }

    // categories

    pub fn categories(&self) -> Result<Vec<Category>> {
        self.store.categories()
    }

    pub fn add_category(&mut self, name: &str, icon_name: Option<&str>) -> Result<i64> {
        let name = clean_name(name, "category")?;
        if self.store.category_by_name(&name)?.is_some() {
            return Err(Error::validation(format!("category '{name}' already exists")));
        }
        let id = self
            .store
            .insert_category(&name, icon_name.unwrap_or(DEFAULT_ICON))?;
        tracing::info!(id, name = %name, "category added");
        self.notify(LedgerChange::CategoriesChanged);
        Ok(id)
    }

    pub fn update_category(&mut self, id: i64, name: &str, icon_name: Option<&str>) -> Result<()> {
        let name = clean_name(name, "category")?;
        if let Some(other) = self.store.category_by_name(&name)? {
            if other.id != id {
                return Err(Error::validation(format!("category '{name}' already exists")));
            }
        }
        let current = self.store.category(id)?.ok_or(Error::NotFound {
            entity: "category",
            id,
        })?;
        self.store.update_category(&Category {
            id,
            name,
            icon_name: icon_name.map(str::to_string).unwrap_or(current.icon_name),
        })?;
        self.notify(LedgerChange::CategoriesChanged);
        Ok(())
    }

    /// Transactions that referenced the category keep existing, uncategorized.
    pub fn delete_category(&mut self, id: i64) -> Result<()> {
        self.store.delete_category(id)?;
        tracing::info!(id, "category deleted");
        self.notify(LedgerChange::CategoriesChanged);
        Ok(())
    }

    // payment methods

    pub fn payment_methods(&self) -> Result<Vec<PaymentMethod>> {
        self.store.payment_methods()
    }

    pub fn add_payment_method(&mut self, name: &str) -> Result<i64> {
        let name = clean_name(name, "payment method")?;
        if self.store.payment_method_by_name(&name)?.is_some() {
            return Err(Error::validation(format!(
                "payment method '{name}' already exists"
            )));
        }
        let id = self.store.insert_payment_method(&name)?;
        tracing::info!(id, name = %name, "payment method added");
        self.notify(LedgerChange::PaymentMethodsChanged);
        Ok(id)
    }

    pub fn rename_payment_method(&mut self, id: i64, name: &str) -> Result<()> {
        let name = clean_name(name, "payment method")?;
        if let Some(other) = self.store.payment_method_by_name(&name)? {
            if other.id != id {
                return Err(Error::validation(format!(
                    "payment method '{name}' already exists"
                )));
            }
        }
        self.store.update_payment_method(&PaymentMethod { id, name })?;
        self.notify(LedgerChange::PaymentMethodsChanged);
        Ok(())
    }

    pub fn delete_payment_method(&mut self, id: i64) -> Result<()> {
        self.store.delete_payment_method(id)?;
        tracing::info!(id, "payment method deleted");
        self.notify(LedgerChange::PaymentMethodsChanged);
        Ok(())
    }

    // configuration

    pub fn user_config(&self) -> Result<UserConfig> {
        self.store.user_config()
    }

    pub fn update_user_config(&mut self, config: &UserConfig) -> Result<()> {
        if !within_amount_limit(config.initial_balance) {
            return Err(Error::validation(format!(
                "initial balance {} exceeds the supported maximum of {MAX_AMOUNT_UNITS}",
                config.initial_balance
            )));
        }
        let config = UserConfig {
            id: USER_CONFIG_ID,
            ..config.clone()
        };
        self.store.save_user_config(&config)?;
        tracing::info!(initial_balance = %config.initial_balance, "user config updated");
        self.notify(LedgerChange::ConfigChanged);
        Ok(())
    }

    // derived views

    /// Opening balance from the whole ledger, running balance over the
    /// filtered window.
    pub fn balance_sheet(
        &self,
        filter: &TransactionFilter,
        today: NaiveDate,
    ) -> Result<BalanceSheet<TransactionView>> {
        let filter = filter.clone().with_default_end(today);
        let all = self.store.transactions()?;
        let initial = self.store.user_config()?.initial_balance;
        let filtered = self.list_filtered_as_of(&filter, today)?;
        Ok(balance::balance_sheet(
            initial,
            &all,
            filtered,
            filter.start,
            filter.end,
        ))
    }

    pub fn dashboard(&self, request: &AggregationRequest) -> Result<Dashboard> {
        self.dashboard_as_of(request, today())
    }

    pub fn dashboard_as_of(&self, request: &AggregationRequest, today: NaiveDate) -> Result<Dashboard> {
        let filter = request.filter(today);
        let all = self.store.transactions()?;
        let initial = self.store.user_config()?.initial_balance;
        let filtered = self.list_filtered_as_of(&filter, today)?;
        Ok(aggregation::dashboard(initial, &all, filtered, &filter))
    }

    // backup

    pub fn export_backup(&self) -> Result<BackupDocument> {
        backup::export(&self.store)
    }

    pub fn export_json(&self) -> Result<String> {
        self.export_backup()?.to_json()
    }

    pub fn import_backup(&mut self, doc: &BackupDocument) -> Result<ImportStats> {
        let stats = backup::import(&mut self.store, doc)?;
        tracing::info!(
            categories = stats.categories,
            payment_methods = stats.payment_methods,
            transactions = stats.transactions,
            "backup restored"
        );
        self.notify(LedgerChange::Restored);
        Ok(stats)
    }

    pub fn import_json(&mut self, json: &str) -> Result<ImportStats> {
        let doc = BackupDocument::from_json(json)?;
        self.import_backup(&doc)
    }

    pub fn reset_to_defaults(&mut self, today: NaiveDate) -> Result<()> {
        backup::reset_to_defaults(&mut self.store, today)?;
        tracing::warn!("ledger reset to defaults");
        self.notify(LedgerChange::Reset);
        Ok(())
    }
}
