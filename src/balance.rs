// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Opening balance before a window and day-by-day running balance inside it.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{LedgerEntry, TxType};

/// Signed amount of an entry, with the sign taken from its type.
pub fn signed_amount<E: LedgerEntry>(e: &E) -> Decimal {
    e.kind().signed(e.value())
}

/// Balance immediately before `window_start`: the initial balance plus every
/// entry dated strictly earlier. Display filters play no part here, so pass
/// the whole ledger.
pub fn opening_balance<E: LedgerEntry>(
    initial_balance: Decimal,
    all: &[E],
    window_start: Option<NaiveDate>,
) -> Decimal {
    let Some(start) = window_start else {
        return initial_balance;
    };
    let mut sorted: Vec<&E> = all.iter().collect();
    sorted.sort_by_key(|e| e.date());
    initial_balance
        + sorted
            .into_iter()
            .take_while(|e| e.date() < start)
            .map(signed_amount)
            .sum::<Decimal>()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayBalance<T> {
    pub date: NaiveDate,
    pub transactions: Vec<T>,
    pub revenue: Decimal,
    /// Positive magnitude.
    pub expense: Decimal,
    /// Balance at the end of this day.
    pub closing: Decimal,
}

/// Running balance across a window. Days are held oldest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceSheet<T> {
    pub opening: Decimal,
    pub closing: Decimal,
    pub days: Vec<DayBalance<T>>,
}

impl<T> BalanceSheet<T> {
    pub fn ascending(&self) -> impl DoubleEndedIterator<Item = &DayBalance<T>> {
        self.days.iter()
    }

    /// Most recent day first, as lists are usually presented.
    pub fn descending(&self) -> impl DoubleEndedIterator<Item = &DayBalance<T>> {
        self.days.iter().rev()
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DayBalance<T>> {
        self.days
            .binary_search_by_key(&date, |d| d.date)
            .ok()
            .map(|i| &self.days[i])
    }

    pub fn transaction_count(&self) -> usize {
        self.days.iter().map(|d| d.transactions.len()).sum()
    }
}

/// Group `filtered` by day inside `[start, end]` and accumulate from `opening`.
/// Entries outside the window are ignored.
pub fn running_balance<T: LedgerEntry>(
    opening: Decimal,
    filtered: Vec<T>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> BalanceSheet<T> {
    let mut by_day: BTreeMap<NaiveDate, Vec<T>> = BTreeMap::new();
    for e in filtered {
        let date = e.date();
        if start.is_some_and(|first| date < first) || end.is_some_and(|last| date > last) {
            continue;
        }
        by_day.entry(date).or_default().push(e);
    }

    let mut balance = opening;
    let mut days = Vec::with_capacity(by_day.len());
    for (date, transactions) in by_day {
        let mut revenue = Decimal::ZERO;
        let mut expense = Decimal::ZERO;
        for e in &transactions {
            match e.kind() {
                TxType::Revenue => revenue += e.value().abs(),
                TxType::Expense => expense += e.value().abs(),
            }
        }
        balance += revenue - expense;
        days.push(DayBalance {
            date,
            transactions,
            revenue,
            expense,
            closing: balance,
        });
    }

    BalanceSheet {
        opening,
        closing: balance,
        days,
    }
}

/// Opening balance from the whole ledger, running balance over the filtered
/// subset.
pub fn balance_sheet<A: LedgerEntry, T: LedgerEntry>(
    initial_balance: Decimal,
    all: &[A],
    filtered: Vec<T>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> BalanceSheet<T> {
    let opening = opening_balance(initial_balance, all, start);
    running_balance(opening, filtered, start, end)
}
