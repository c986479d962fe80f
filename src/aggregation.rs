// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::balance::{BalanceSheet, balance_sheet};
use crate::filters::TransactionFilter;
use crate::models::{Condition, LedgerEntry, Transaction, TransactionView, TxType};
use crate::utils::slugify;

/// Label used for transactions without a category.
pub const UNCATEGORIZED: &str = "Sem categoria";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub revenue: Decimal,
    /// Positive magnitude.
    pub expense: Decimal,
    /// `revenue - expense`.
    pub net: Decimal,
}

pub fn summarize<E: LedgerEntry>(items: &[E]) -> Summary {
    let mut s = Summary::default();
    for e in items {
        match e.kind() {
            TxType::Revenue => s.revenue += e.value().abs(),
            TxType::Expense => s.expense += e.value().abs(),
        }
    }
    s.net = s.revenue - s.expense;
    s
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category_id: Option<i64>,
    pub name: String,
    pub icon_name: Option<String>,
    pub slug: String,
    #[serde(rename = "type")]
    pub kind: TxType,
    /// Positive magnitude for both types.
    pub total: Decimal,
    pub count: usize,
}

/// Totals per category for one transaction type, largest first.
pub fn by_category(items: &[TransactionView], kind: TxType) -> Vec<CategoryTotal> {
    let mut groups: HashMap<Option<i64>, CategoryTotal> = HashMap::new();
    for v in items.iter().filter(|v| v.kind() == kind) {
        let entry = groups.entry(v.transaction.category_id).or_insert_with(|| {
            let name = v
                .category_name
                .clone()
                .unwrap_or_else(|| UNCATEGORIZED.to_string());
            CategoryTotal {
                category_id: v.transaction.category_id,
                slug: slugify(&name),
                name,
                icon_name: v.category_icon.clone(),
                kind,
                total: Decimal::ZERO,
                count: 0,
            }
        });
        entry.total += v.value().abs();
        entry.count += 1;
    }
    let mut out: Vec<CategoryTotal> = groups.into_values().collect();
    out.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayTotals {
    pub date: NaiveDate,
    pub revenue: Decimal,
    /// Positive magnitude.
    pub expense: Decimal,
}

/// Revenue and expense per calendar day, oldest first.
pub fn by_day<E: LedgerEntry>(items: &[E]) -> Vec<DayTotals> {
    let mut days: BTreeMap<NaiveDate, DayTotals> = BTreeMap::new();
    for e in items {
        let date = e.date();
        let day = days.entry(date).or_insert(DayTotals {
            date,
            revenue: Decimal::ZERO,
            expense: Decimal::ZERO,
        });
        match e.kind() {
            TxType::Revenue => day.revenue += e.value().abs(),
            TxType::Expense => day.expense += e.value().abs(),
        }
    }
    days.into_values().collect()
}

/// What a dashboard or report screen asks for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AggregationRequest {
    pub start_date: Option<NaiveDate>,
    /// Defaults to today.
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub kind: Option<TxType>,
    pub condition: Option<Condition>,
    pub category_id: Option<i64>,
    pub payment_method_id: Option<i64>,
    pub query: Option<String>,
    pub category_slug: Option<String>,
}

impl AggregationRequest {
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        AggregationRequest {
            start_date: Some(start),
            end_date: Some(end),
            ..Default::default()
        }
    }

    pub fn filter(&self, today: NaiveDate) -> TransactionFilter {
        TransactionFilter {
            start: self.start_date,
            end: self.end_date,
            kind: self.kind,
            condition: self.condition,
            category_id: self.category_id,
            payment_method_id: self.payment_method_id,
            query: self.query.clone(),
            category_slug: self.category_slug.clone(),
        }
        .with_default_end(today)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub summary: Summary,
    pub by_category_revenue: Vec<CategoryTotal>,
    pub by_category_expense: Vec<CategoryTotal>,
    pub by_date: Vec<DayTotals>,
    pub grouped_by_day: BalanceSheet<TransactionView>,
}

/// Build every view of a filtered window. `all` is the whole ledger and only
/// feeds the opening balance.
pub fn dashboard(
    initial_balance: Decimal,
    all: &[Transaction],
    filtered: Vec<TransactionView>,
    filter: &TransactionFilter,
) -> Dashboard {
    let summary = summarize(&filtered);
    let by_category_revenue = by_category(&filtered, TxType::Revenue);
    let by_category_expense = by_category(&filtered, TxType::Expense);
    let by_date = by_day(&filtered);
    let grouped_by_day = balance_sheet(initial_balance, all, filtered, filter.start, filter.end);
    Dashboard {
        summary,
        by_category_revenue,
        by_category_expense,
        by_date,
        grouped_by_day,
    }
}
