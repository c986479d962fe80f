// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::path::Path;

use super::LedgerStore;
use crate::db;
use crate::error::{Error, Result};
use crate::filters::TransactionFilter;
use crate::models::{
    Category, NewTransaction, PaymentMethod, Transaction, TransactionView, USER_CONFIG_ID,
    UserConfig, within_amount_limit,
};

const TX_COLUMNS: &str = "t.id, t.date, t.description, t.value, t.type, t.condition, \
     t.installments, t.category_id, t.payment_method_id";

const SAVEPOINT: &str = "cashbook_atomic";

/// [`LedgerStore`] over a single SQLite connection.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Wrap an existing connection, creating the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        db::init_schema(&conn)?;
        Ok(SqliteStore { conn })
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(SqliteStore {
            conn: db::open(path)?,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(SqliteStore {
            conn: db::open_in_memory()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn query_transactions(
        &self,
        filter: &TransactionFilter,
        order: &str,
    ) -> Result<Vec<TransactionView>> {
        let mut sql = format!(
            "SELECT {TX_COLUMNS}, c.name, c.icon_name, p.name FROM transactions t \
             LEFT JOIN categories c ON t.category_id=c.id \
             LEFT JOIN payment_methods p ON t.payment_method_id=p.id WHERE 1=1"
        );
        let mut values: Vec<Value> = Vec::new();

        if let Some(start) = filter.start {
            sql.push_str(" AND t.date>=?");
            values.push(Value::Text(start.to_string()));
        }
        if let Some(end) = filter.end {
            sql.push_str(" AND t.date<=?");
            values.push(Value::Text(end.to_string()));
        }
        if let Some(kind) = filter.kind {
            sql.push_str(" AND t.type=?");
            values.push(Value::Text(kind.as_str().into()));
        }
        if let Some(condition) = filter.condition {
            sql.push_str(" AND t.condition=?");
            values.push(Value::Text(condition.as_str().into()));
        }
        if let Some(id) = filter.category_id {
            sql.push_str(" AND t.category_id=?");
            values.push(Value::Integer(id));
        }
        if let Some(id) = filter.payment_method_id {
            sql.push_str(" AND t.payment_method_id=?");
            values.push(Value::Integer(id));
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(order);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(values.iter()))?;
        let mut data = Vec::new();
        while let Some(r) = rows.next()? {
            let transaction = RawTransaction::read(r)?.decode()?;
            data.push(TransactionView {
                transaction,
                category_name: r.get(9)?,
                category_icon: r.get(10)?,
                payment_method_name: r.get(11)?,
            });
        }
        Ok(data)
    }

    fn write_params(tx: &NewTransaction) -> [Value; 8] {
        [
            Value::Text(tx.date.to_string()),
            tx.description
                .clone()
                .map(Value::Text)
                .unwrap_or(Value::Null),
            Value::Text(tx.value.to_string()),
            Value::Text(tx.kind.as_str().into()),
            Value::Text(tx.condition.as_str().into()),
            Value::Integer(i64::from(tx.installments)),
            tx.category_id.map(Value::Integer).unwrap_or(Value::Null),
            tx.payment_method_id.map(Value::Integer).unwrap_or(Value::Null),
        ]
    }

    fn count(&self, table: &str) -> Result<i64> {
        let n = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
        Ok(n)
    }
}

struct RawTransaction {
    id: i64,
    date: String,
    description: Option<String>,
    value: String,
    kind: String,
    condition: String,
    installments: i64,
    category_id: Option<i64>,
    payment_method_id: Option<i64>,
}

impl RawTransaction {
    fn read(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(RawTransaction {
            id: r.get(0)?,
            date: r.get(1)?,
            description: r.get(2)?,
            value: r.get(3)?,
            kind: r.get(4)?,
            condition: r.get(5)?,
            installments: r.get(6)?,
            category_id: r.get(7)?,
            payment_method_id: r.get(8)?,
        })
    }

    fn decode(self) -> Result<Transaction> {
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").map_err(|_| {
            Error::Decode(format!("transaction {} has date '{}'", self.id, self.date))
        })?;
        let value = self
            .value
            .parse::<Decimal>()
            .ok()
            .filter(|v| within_amount_limit(*v))
            .ok_or_else(|| {
                Error::Decode(format!("transaction {} has value '{}'", self.id, self.value))
            })?;
        let installments = u32::try_from(self.installments).map_err(|_| {
            Error::Decode(format!(
                "transaction {} has {} installments",
                self.id, self.installments
            ))
        })?;
        Ok(Transaction {
            id: self.id,
            date,
            description: self.description,
            value,
            kind: self.kind.parse()?,
            condition: self.condition.parse()?,
            installments,
            category_id: self.category_id,
            payment_method_id: self.payment_method_id,
        })
    }
}

fn read_category(r: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: r.get(0)?,
        name: r.get(1)?,
        icon_name: r.get(2)?,
    })
}

fn read_payment_method(r: &Row<'_>) -> rusqlite::Result<PaymentMethod> {
    Ok(PaymentMethod {
        id: r.get(0)?,
        name: r.get(1)?,
    })
}

impl LedgerStore for SqliteStore {
    fn insert_transaction(&mut self, tx: &NewTransaction) -> Result<i64> {
        // dangling references resolve to NULL through the sub-selects
        self.conn.execute(
            "INSERT INTO transactions(date, description, value, type, condition, installments, category_id, payment_method_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6,
                     (SELECT id FROM categories WHERE id=?7),
                     (SELECT id FROM payment_methods WHERE id=?8))",
            params_from_iter(Self::write_params(tx).iter()),
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_transaction(&mut self, id: i64, tx: &NewTransaction) -> Result<()> {
        let mut values = Self::write_params(tx).to_vec();
        values.push(Value::Integer(id));
        let n = self.conn.execute(
            "UPDATE transactions SET date=?1, description=?2, value=?3, type=?4, condition=?5, installments=?6,
                 category_id=(SELECT id FROM categories WHERE id=?7),
                 payment_method_id=(SELECT id FROM payment_methods WHERE id=?8)
             WHERE id=?9",
            params_from_iter(values.iter()),
        )?;
        if n == 0 {
            return Err(Error::NotFound {
                entity: "transaction",
                id,
            });
        }
        Ok(())
    }

    fn delete_transaction(&mut self, id: i64) -> Result<()> {
        let n = self
            .conn
            .execute("DELETE FROM transactions WHERE id=?1", params![id])?;
        if n == 0 {
            return Err(Error::NotFound {
                entity: "transaction",
                id,
            });
        }
        Ok(())
    }

    fn delete_transactions(&mut self, ids: &[i64]) -> Result<()> {
        let ids: BTreeSet<i64> = ids.iter().copied().collect();
        self.atomically(|store| {
            for id in ids {
                store.delete_transaction(id)?;
            }
            Ok(())
        })
    }

    fn transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {TX_COLUMNS} FROM transactions t WHERE t.id=?1"),
                params![id],
                RawTransaction::read,
            )
            .optional()?;
        raw.map(RawTransaction::decode).transpose()
    }

    fn transactions(&self) -> Result<Vec<Transaction>> {
        self.transactions_matching(&TransactionFilter::default())
    }

    fn transactions_matching(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        Ok(self
            .query_transactions(filter, "t.date, t.id")?
            .into_iter()
            .map(|v| v.transaction)
            .collect())
    }

    fn transaction_views(&self, filter: &TransactionFilter) -> Result<Vec<TransactionView>> {
        self.query_transactions(filter, "t.date DESC, t.id DESC")
    }

    fn insert_category(&mut self, name: &str, icon_name: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO categories(name, icon_name) VALUES (?1, ?2)",
            params![name, icon_name],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_category(&mut self, category: &Category) -> Result<()> {
        let n = self.conn.execute(
            "UPDATE categories SET name=?1, icon_name=?2 WHERE id=?3",
            params![category.name, category.icon_name, category.id],
        )?;
        if n == 0 {
            return Err(Error::NotFound {
                entity: "category",
                id: category.id,
            });
        }
        Ok(())
    }

    fn delete_category(&mut self, id: i64) -> Result<()> {
        let n = self
            .conn
            .execute("DELETE FROM categories WHERE id=?1", params![id])?;
        if n == 0 {
            return Err(Error::NotFound {
                entity: "category",
                id,
            });
        }
        Ok(())
    }

    fn category(&self, id: i64) -> Result<Option<Category>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, icon_name FROM categories WHERE id=?1",
                params![id],
                read_category,
            )
            .optional()?)
    }

    fn category_by_name(&self, name: &str) -> Result<Option<Category>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, icon_name FROM categories WHERE name=?1",
                params![name],
                read_category,
            )
            .optional()?)
    }

    fn categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, icon_name FROM categories ORDER BY name")?;
        let rows = stmt.query_map([], read_category)?;
        let mut data = Vec::new();
        for row in rows {
            data.push(row?);
        }
        Ok(data)
    }

    fn insert_payment_method(&mut self, name: &str) -> Result<i64> {
        self.conn
            .execute("INSERT INTO payment_methods(name) VALUES (?1)", params![name])?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_payment_method(&mut self, method: &PaymentMethod) -> Result<()> {
        let n = self.conn.execute(
            "UPDATE payment_methods SET name=?1 WHERE id=?2",
            params![method.name, method.id],
        )?;
        if n == 0 {
            return Err(Error::NotFound {
                entity: "payment method",
                id: method.id,
            });
        }
        Ok(())
    }

    fn delete_payment_method(&mut self, id: i64) -> Result<()> {
        let n = self
            .conn
            .execute("DELETE FROM payment_methods WHERE id=?1", params![id])?;
        if n == 0 {
            return Err(Error::NotFound {
                entity: "payment method",
                id,
            });
        }
        Ok(())
    }

    fn payment_method(&self, id: i64) -> Result<Option<PaymentMethod>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name FROM payment_methods WHERE id=?1",
                params![id],
                read_payment_method,
            )
            .optional()?)
    }

    fn payment_method_by_name(&self, name: &str) -> Result<Option<PaymentMethod>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name FROM payment_methods WHERE name=?1",
                params![name],
                read_payment_method,
            )
            .optional()?)
    }

    fn payment_methods(&self) -> Result<Vec<PaymentMethod>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM payment_methods ORDER BY name")?;
        let rows = stmt.query_map([], read_payment_method)?;
        let mut data = Vec::new();
        for row in rows {
            data.push(row?);
        }
        Ok(data)
    }

    fn user_config(&self) -> Result<UserConfig> {
        self.conn.execute(
            "INSERT OR IGNORE INTO user_config(id, initial_balance) VALUES (?1, '0')",
            params![USER_CONFIG_ID],
        )?;
        let (company_name, balance, company_logo): (Option<String>, String, Option<String>) =
            self.conn.query_row(
                "SELECT company_name, initial_balance, company_logo FROM user_config WHERE id=?1",
                params![USER_CONFIG_ID],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )?;
        let initial_balance = balance
            .parse::<Decimal>()
            .ok()
            .filter(|v| within_amount_limit(*v))
            .ok_or_else(|| Error::Decode(format!("initial balance '{}'", balance)))?;
        Ok(UserConfig {
            id: USER_CONFIG_ID,
            company_name,
            initial_balance,
            company_logo,
        })
    }

    fn save_user_config(&mut self, config: &UserConfig) -> Result<()> {
        self.conn.execute(
            "INSERT INTO user_config(id, company_name, initial_balance, company_logo) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET company_name=excluded.company_name,
                 initial_balance=excluded.initial_balance, company_logo=excluded.company_logo",
            params![
                USER_CONFIG_ID,
                config.company_name,
                config.initial_balance.to_string(),
                config.company_logo
            ],
        )?;
        Ok(())
    }

    fn is_pristine(&self) -> Result<bool> {
        for table in ["transactions", "categories", "payment_methods", "user_config"] {
            if self.count(table)? > 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn clear_all(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "DELETE FROM transactions;
             DELETE FROM categories;
             DELETE FROM payment_methods;
             DELETE FROM user_config;
             DELETE FROM sqlite_sequence WHERE name IN ('transactions','categories','payment_methods');",
        )?;
        Ok(())
    }

    fn atomically<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        // savepoints nest, so atomic operations compose
        self.conn.execute_batch(&format!("SAVEPOINT {SAVEPOINT}"))?;
        match f(self) {
            Ok(v) => {
                if let Err(e) = self.conn.execute_batch(&format!("RELEASE {SAVEPOINT}")) {
                    self.rollback_savepoint();
                    return Err(e.into());
                }
                Ok(v)
            }
            Err(e) => {
                self.rollback_savepoint();
                Err(e)
            }
        }
    }
}

impl SqliteStore {
    fn rollback_savepoint(&self) {
        if let Err(e) = self
            .conn
            .execute_batch(&format!("ROLLBACK TO {SAVEPOINT}; RELEASE {SAVEPOINT};"))
        {
            tracing::error!(error = %e, "failed to roll back savepoint");
        } else {
            tracing::debug!("rolled back atomic store operation");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Condition, TxType};

    fn expense(day: u32, cat: Option<i64>) -> NewTransaction {
        NewTransaction {
            date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            description: Some(format!("day {day}")),
            value: Decimal::new(-1050, 2),
            kind: TxType::Expense,
            condition: Condition::Paid,
            installments: 1,
            category_id: cat,
            payment_method_id: None,
        }
    }

    #[test]
    fn dangling_reference_is_stored_as_null() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let id = store.insert_transaction(&expense(1, Some(999))).unwrap();
        let t = store.transaction(id).unwrap().unwrap();
        assert_eq!(t.category_id, None);
        assert_eq!(t.value, Decimal::new(-1050, 2));
    }

    #[test]
    fn deleting_category_nulls_references() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let cat = store.insert_category("Mercado", "cart").unwrap();
        let id = store.insert_transaction(&expense(2, Some(cat))).unwrap();
        store.delete_category(cat).unwrap();
        let t = store.transaction(id).unwrap().unwrap();
        assert_eq!(t.category_id, None);
    }

    #[test]
    fn failed_atomic_block_leaves_no_writes() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let res: Result<()> = store.atomically(|s| {
            s.insert_category("Temp", "tag")?;
            Err(Error::validation("abort"))
        });
        assert!(res.is_err());
        assert!(store.categories().unwrap().is_empty());
    }

    #[test]
    fn nested_atomic_blocks_commit_together() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .atomically(|s| {
                s.insert_category("Outer", "tag")?;
                s.atomically(|inner| inner.insert_payment_method("Pix"))?;
                Ok(())
            })
            .unwrap();
        assert_eq!(store.categories().unwrap().len(), 1);
        assert_eq!(store.payment_methods().unwrap().len(), 1);
    }

    #[test]
    fn config_is_created_lazily_once() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.is_pristine().unwrap());
        let cfg = store.user_config().unwrap();
        assert_eq!(cfg, UserConfig::default());
        store.user_config().unwrap();
        assert_eq!(store.count("user_config").unwrap(), 1);
    }

    #[test]
    fn clear_all_restarts_ids() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.insert_category("A", "tag").unwrap();
        store.insert_category("B", "tag").unwrap();
        store.clear_all().unwrap();
        assert_eq!(store.insert_category("C", "tag").unwrap(), 1);
    }

    #[test]
    fn repeated_ids_delete_once() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let a = store.insert_transaction(&expense(1, None)).unwrap();
        let b = store.insert_transaction(&expense(2, None)).unwrap();
        store.delete_transactions(&[a, a, b, a]).unwrap();
        assert!(store.transactions().unwrap().is_empty());
    }

    #[test]
    fn out_of_range_stored_value_is_a_decode_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .connection()
            .execute(
                "INSERT INTO transactions(date, value, type, condition) \
                 VALUES ('2025-01-01', '79228162514264337593543950335', 'revenue', 'paid')",
                [],
            )
            .unwrap();
        assert!(matches!(store.transactions().unwrap_err(), Error::Decode(_)));
    }
}
