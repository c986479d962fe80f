// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Whole-ledger snapshots: export, atomic restore with id remapping, and
//! reset to the shipped defaults.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use crate::error::{Error, Result};
use crate::models::{
    Condition, DEFAULT_ICON, NewTransaction, PaymentMethod, TxType, UserConfig,
    within_amount_limit,
};
use crate::store::LedgerStore;
use crate::utils::parse_iso_day;

const SECTIONS: [&str; 4] = ["categories", "paymentMethods", "transactions", "userConfig"];

/// Categories seeded on a fresh ledger, with their icon tags.
pub const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("Alimentação", "restaurant"),
    ("Água", "water"),
    ("Energia", "flash"),
    ("Aluguel", "home"),
    ("Internet", "wifi"),
    ("Transporte", "car"),
    ("Impostos", "document"),
    ("Serviços", "construct"),
    ("Salário", "cash"),
    ("Vendas", "cart"),
    ("Outros", DEFAULT_ICON),
];

pub const DEFAULT_PAYMENT_METHODS: &[&str] = &[
    "Dinheiro",
    "Pix",
    "Cartão de Crédito",
    "Cartão de Débito",
    "Boleto",
    "Transferência",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupCategory {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub icon_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupTransaction {
    pub id: i64,
    /// ISO-8601; any time component is dropped on import.
    pub date: String,
    #[serde(default)]
    pub description: Option<String>,
    pub value: Decimal,
    #[serde(rename = "type")]
    pub kind: TxType,
    pub condition: Condition,
    #[serde(default = "one")]
    pub installments: u32,
    #[serde(default)]
    pub payment_method_id: Option<i64>,
    #[serde(default)]
    pub category_id: Option<i64>,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupDocument {
    pub categories: Vec<BackupCategory>,
    #[serde(rename = "paymentMethods")]
    pub payment_methods: Vec<PaymentMethod>,
    pub transactions: Vec<BackupTransaction>,
    #[serde(rename = "userConfig")]
    pub user_config: UserConfig,
}

impl BackupDocument {
    /// Parse and check a document. Nothing here touches storage, so a
    /// rejected document never leaves a trace.
    pub fn from_json(s: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(s)
            .map_err(|e| Error::validation(format!("backup is not valid JSON: {e}")))?;
        Self::from_value(value)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::validation("backup must be a JSON object"))?;
        for key in SECTIONS {
            if !obj.contains_key(key) {
                return Err(Error::validation(format!("backup is missing '{key}'")));
            }
        }
        let doc: BackupDocument = serde_json::from_value(value)
            .map_err(|e| Error::validation(format!("malformed backup: {e}")))?;
        doc.validate()?;
        Ok(doc)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<()> {
        unique(self.categories.iter().map(|c| c.id), "category id")?;
        unique(self.categories.iter().map(|c| c.name.as_str()), "category name")?;
        unique(self.payment_methods.iter().map(|p| p.id), "payment method id")?;
        unique(self.payment_methods.iter().map(|p| p.name.as_str()), "payment method name")?;
        if !within_amount_limit(self.user_config.initial_balance) {
            return Err(Error::validation(format!(
                "initial balance {} is out of range",
                self.user_config.initial_balance
            )));
        }
        for t in &self.transactions {
            self.restored_transaction(t, &HashMap::new(), &HashMap::new())?;
        }
        Ok(())
    }

    fn restored_transaction(
        &self,
        t: &BackupTransaction,
        categories: &HashMap<i64, i64>,
        methods: &HashMap<i64, i64>,
    ) -> Result<NewTransaction> {
        let date = parse_iso_day(&t.date)
            .map_err(|_| Error::validation(format!("transaction {} has date '{}'", t.id, t.date)))?;
        if t.installments == 0 {
            return Err(Error::validation(format!(
                "transaction {} has zero installments",
                t.id
            )));
        }
        match t.condition {
            Condition::Paid if t.installments != 1 => {
                return Err(Error::validation(format!(
                    "transaction {} is paid but has {} installments",
                    t.id, t.installments
                )));
            }
            Condition::Pending if t.installments < 2 => {
                return Err(Error::validation(format!(
                    "transaction {} is an installment plan with {} installment",
                    t.id, t.installments
                )));
            }
            _ => {}
        }
        if !within_amount_limit(t.value) {
            return Err(Error::validation(format!(
                "transaction {} has value {} out of range",
                t.id, t.value
            )));
        }
        Ok(NewTransaction {
            date,
            description: t.description.clone(),
            value: t.kind.signed(t.value),
            kind: t.kind,
            condition: t.condition,
            installments: t.installments,
            category_id: t.category_id.and_then(|old| categories.get(&old).copied()),
            payment_method_id: t.payment_method_id.and_then(|old| methods.get(&old).copied()),
        })
    }
}

fn unique<K: Eq + Hash + fmt::Display>(keys: impl Iterator<Item = K>, what: &str) -> Result<()> {
    let mut seen = HashSet::new();
    for n in keys {
        if seen.contains(&n) {
            return Err(Error::validation(format!("duplicate {what} '{n}' in backup")));
        }
        seen.insert(n);
    }
    Ok(())
}

/// Snapshot the whole ledger. Transactions keep their raw foreign keys.
pub fn export<S: LedgerStore>(store: &S) -> Result<BackupDocument> {
    let categories = store
        .categories()?
        .into_iter()
        .map(|c| BackupCategory {
            id: c.id,
            name: c.name,
            icon_name: Some(c.icon_name),
        })
        .collect();
    let transactions = store
        .transactions()?
        .into_iter()
        .map(|t| BackupTransaction {
            id: t.id,
            date: t.date.to_string(),
            description: t.description,
            value: t.value,
            kind: t.kind,
            condition: t.condition,
            installments: t.installments,
            payment_method_id: t.payment_method_id,
            category_id: t.category_id,
        })
        .collect();
    Ok(BackupDocument {
        categories,
        payment_methods: store.payment_methods()?,
        transactions,
        user_config: store.user_config()?,
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub categories: usize,
    pub payment_methods: usize,
    pub transactions: usize,
}

/// Replace the ledger with `doc` in one unit. Ids are reassigned by the store
/// and references follow them; references that no longer resolve become null.
pub fn import<S: LedgerStore>(store: &mut S, doc: &BackupDocument) -> Result<ImportStats> {
    doc.validate()?;
    store.atomically(|s| {
        s.clear_all()?;

        let mut categories = HashMap::with_capacity(doc.categories.len());
        for c in &doc.categories {
            let icon = c.icon_name.as_deref().unwrap_or(DEFAULT_ICON);
            categories.insert(c.id, s.insert_category(&c.name, icon)?);
        }
        let mut methods = HashMap::with_capacity(doc.payment_methods.len());
        for p in &doc.payment_methods {
            methods.insert(p.id, s.insert_payment_method(&p.name)?);
        }
        for t in &doc.transactions {
            let restored = doc.restored_transaction(t, &categories, &methods)?;
            s.insert_transaction(&restored)?;
        }
        s.save_user_config(&doc.user_config)?;

        Ok(ImportStats {
            categories: categories.len(),
            payment_methods: methods.len(),
            transactions: doc.transactions.len(),
        })
    })
}

/// Seed defaults into an empty store: categories, payment methods, a
/// zero-balance config and two example transactions dated `today`.
pub fn seed_defaults<S: LedgerStore>(store: &mut S, today: NaiveDate) -> Result<()> {
    let mut categories = HashMap::new();
    for (name, icon) in DEFAULT_CATEGORIES {
        categories.insert(*name, store.insert_category(name, icon)?);
    }
    let mut methods = HashMap::new();
    for name in DEFAULT_PAYMENT_METHODS {
        methods.insert(*name, store.insert_payment_method(name)?);
    }
    store.save_user_config(&UserConfig::default())?;

    let examples = [
        ("Venda de exemplo", Decimal::new(15000, 2), TxType::Revenue, "Vendas", "Pix"),
        ("Conta de energia (exemplo)", Decimal::new(8000, 2), TxType::Expense, "Energia", "Boleto"),
    ];
    for (description, amount, kind, category, method) in examples {
        store.insert_transaction(&NewTransaction {
            date: today,
            description: Some(description.to_string()),
            value: kind.signed(amount),
            kind,
            condition: Condition::Paid,
            installments: 1,
            category_id: categories.get(category).copied(),
            payment_method_id: methods.get(method).copied(),
        })?;
    }
    Ok(())
}

/// Wipe everything and seed the defaults, as one unit.
pub fn reset_to_defaults<S: LedgerStore>(store: &mut S, today: NaiveDate) -> Result<()> {
    store.atomically(|s| {
        s.clear_all()?;
        seed_defaults(s, today)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::slugify;

    #[test]
    fn default_category_slugs_are_distinct() {
        let slugs: HashSet<String> = DEFAULT_CATEGORIES.iter().map(|(n, _)| slugify(n)).collect();
        assert_eq!(slugs.len(), DEFAULT_CATEGORIES.len());
        assert!(slugs.contains("agua"));
        assert!(slugs.contains("energia"));
    }

    #[test]
    fn missing_section_is_rejected() {
        let err = BackupDocument::from_json(
            r#"{"categories":[],"paymentMethods":[],"transactions":[]}"#,
        )
        .unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("userConfig"));
    }

    #[test]
    fn extra_keys_and_numeric_values_are_accepted() {
        let doc = BackupDocument::from_json(
            r#"{
                "version": 3,
                "categories": [{"id": 7, "name": "Água"}],
                "paymentMethods": [{"id": 2, "name": "Pix"}],
                "transactions": [{"id": 1, "date": "2025-04-01T12:30:00.000Z", "description": null,
                    "value": -35.5, "type": "expense", "condition": "paid", "installments": 1,
                    "payment_method_id": 2, "category_id": 7}],
                "userConfig": {"id": 1, "company_name": "Padaria", "initial_balance": "250.00", "company_logo": null}
            }"#,
        )
        .unwrap();
        assert_eq!(doc.categories[0].icon_name, None);
        assert_eq!(doc.transactions[0].value, Decimal::new(-355, 1));
        assert_eq!(doc.user_config.initial_balance, Decimal::new(25000, 2));
    }

    #[test]
    fn paid_with_installments_is_rejected() {
        let err = BackupDocument::from_json(
            r#"{"categories":[],"paymentMethods":[],"userConfig":{"id":1,"initial_balance":"0"},
                "transactions":[{"id":1,"date":"2025-01-01","value":"10","type":"revenue",
                "condition":"paid","installments":3}]}"#,
        )
        .unwrap_err();
        assert!(err.is_validation());
    }
}
