// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

pub const USER_CONFIG_ID: i64 = 1;
pub const DEFAULT_ICON: &str = "tag";

/// Largest magnitude accepted for a transaction value or the initial balance,
/// in whole currency units. Keeps every ledger sum inside `Decimal` range.
pub const MAX_AMOUNT_UNITS: i64 = 1_000_000_000_000;

pub fn within_amount_limit(value: Decimal) -> bool {
    value.abs() <= Decimal::from(MAX_AMOUNT_UNITS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxType {
    Revenue,
    Expense,
}

impl TxType {
    pub fn as_str(self) -> &'static str {
        match self {
            TxType::Revenue => "revenue",
            TxType::Expense => "expense",
        }
    }

    /// Apply this type's sign to an amount, whatever sign it arrived with.
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            TxType::Revenue => amount.abs(),
            TxType::Expense => -amount.abs(),
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "revenue" => Ok(TxType::Revenue),
            "expense" => Ok(TxType::Expense),
            other => Err(Error::Decode(format!("unknown transaction type '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    /// Settled in a single installment.
    Paid,
    /// Spread across an installment plan.
    Pending,
}

impl Condition {
    pub fn as_str(self) -> &'static str {
        match self {
            Condition::Paid => "paid",
            Condition::Pending => "pending",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paid" => Ok(Condition::Paid),
            "pending" => Ok(Condition::Pending),
            other => Err(Error::Decode(format!("unknown condition '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub icon_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub date: NaiveDate,
    pub description: Option<String>,
    /// Signed: positive for revenue, negative for expense.
    pub value: Decimal,
    #[serde(rename = "type")]
    pub kind: TxType,
    pub condition: Condition,
    pub installments: u32,
    pub category_id: Option<i64>,
    pub payment_method_id: Option<i64>,
}

/// The editable fields of a transaction as written to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub description: Option<String>,
    pub value: Decimal,
    pub kind: TxType,
    pub condition: Condition,
    pub installments: u32,
    pub category_id: Option<i64>,
    pub payment_method_id: Option<i64>,
}

/// A transaction joined with the display names of what it references.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionView {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub category_name: Option<String>,
    pub category_icon: Option<String>,
    pub payment_method_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub id: i64,
    pub company_name: Option<String>,
    /// Balance before any recorded transaction.
    pub initial_balance: Decimal,
    pub company_logo: Option<String>,
}

impl Default for UserConfig {
    fn default() -> Self {
        UserConfig {
            id: USER_CONFIG_ID,
            company_name: None,
            initial_balance: Decimal::ZERO,
            company_logo: None,
        }
    }
}

/// Anything dated and valued the calculators can work over.
pub trait LedgerEntry {
    fn date(&self) -> NaiveDate;
    fn value(&self) -> Decimal;
    fn kind(&self) -> TxType;
}

impl LedgerEntry for Transaction {
    fn date(&self) -> NaiveDate {
        self.date
    }
    fn value(&self) -> Decimal {
        self.value
    }
    fn kind(&self) -> TxType {
        self.kind
    }
}

impl LedgerEntry for TransactionView {
    fn date(&self) -> NaiveDate {
        self.transaction.date
    }
    fn value(&self) -> Decimal {
        self.transaction.value
    }
    fn kind(&self) -> TxType {
        self.transaction.kind
    }
}

impl<T: LedgerEntry> LedgerEntry for &T {
    fn date(&self) -> NaiveDate {
        T::date(*self)
    }
    fn value(&self) -> Decimal {
        T::value(*self)
    }
    fn kind(&self) -> TxType {
        T::kind(*self)
    }
}
