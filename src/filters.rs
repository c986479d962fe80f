// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Condition, TransactionView, TxType};
use crate::utils::slugify;

/// Conjunctive transaction predicate. Every `None` imposes no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFilter {
    /// Inclusive.
    pub start: Option<NaiveDate>,
    /// Inclusive.
    pub end: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub kind: Option<TxType>,
    pub condition: Option<Condition>,
    pub category_id: Option<i64>,
    pub payment_method_id: Option<i64>,
    /// Case-insensitive substring over description, category and payment method names.
    pub query: Option<String>,
    /// Legacy filter key; prefer `category_id`.
    pub category_slug: Option<String>,
}

impl TransactionFilter {
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        TransactionFilter {
            start: Some(start),
            end: Some(end),
            ..Default::default()
        }
    }

    pub fn with_default_end(mut self, today: NaiveDate) -> Self {
        if self.end.is_none() {
            self.end = Some(today);
        }
        self
    }

    /// The trimmed, lowercased search text, if any is left.
    pub fn needle(&self) -> Option<String> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }

    fn slug(&self) -> Option<String> {
        self.category_slug
            .as_deref()
            .map(slugify)
            .filter(|s| !s.is_empty())
    }

    /// True when some criteria can only be evaluated against resolved names.
    pub fn needs_refinement(&self) -> bool {
        self.needle().is_some() || self.slug().is_some()
    }

    pub fn matches(&self, v: &TransactionView) -> bool {
        let t = &v.transaction;
        if self.start.is_some_and(|s| t.date < s) || self.end.is_some_and(|e| t.date > e) {
            return false;
        }
        if self.kind.is_some_and(|k| t.kind != k) {
            return false;
        }
        if self.condition.is_some_and(|c| t.condition != c) {
            return false;
        }
        if self.category_id.is_some() && t.category_id != self.category_id {
            return false;
        }
        if self.payment_method_id.is_some() && t.payment_method_id != self.payment_method_id {
            return false;
        }
        self.matches_names(v)
    }

    fn matches_names(&self, v: &TransactionView) -> bool {
        if let Some(slug) = self.slug() {
            match v.category_name.as_deref() {
                Some(name) if slugify(name) == slug => {}
                _ => return false,
            }
        }
        match self.needle() {
            Some(needle) => text_matches(v, &needle),
            None => true,
        }
    }

    /// Apply the name-based criteria the store could not evaluate.
    pub fn refine(&self, views: Vec<TransactionView>) -> Vec<TransactionView> {
        if !self.needs_refinement() {
            return views;
        }
        views.into_iter().filter(|v| self.matches_names(v)).collect()
    }
}

fn text_matches(v: &TransactionView, needle: &str) -> bool {
    [
        v.transaction.description.as_deref(),
        v.category_name.as_deref(),
        v.payment_method_name.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|hay| hay.to_lowercase().contains(needle))
}
