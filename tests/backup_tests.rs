// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use cashbook::aggregation::AggregationRequest;
use cashbook::backup::{BackupDocument, DEFAULT_CATEGORIES, DEFAULT_PAYMENT_METHODS};
use cashbook::models::{Condition, TxType, UserConfig};
use cashbook::store::{LedgerStore, SqliteStore};
use cashbook::{Error, Ledger, LedgerChange, TransactionInput};
use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, day).unwrap()
}

fn populate(ledger: &mut Ledger) {
    ledger
        .update_user_config(&UserConfig {
            company_name: Some("Padaria Central".into()),
            initial_balance: Decimal::new(75000, 2),
            ..UserConfig::default()
        })
        .unwrap();
    // a category that is created and dropped first, so ids have gaps
    let scratch = ledger.add_category("Rascunho", None).unwrap();
    ledger.delete_category(scratch).unwrap();

    let farinha = ledger.add_category("Farinha", Some("basket")).unwrap();
    let agua = ledger.add_category("Água", Some("water")).unwrap();
    let vendas = ledger.add_category("Vendas", Some("cart")).unwrap();
    let pix = ledger.add_payment_method("Pix").unwrap();
    let cartao = ledger.add_payment_method("Cartão de Crédito").unwrap();

    let entries = [
        (1, TxType::Revenue, 120000, vendas, pix),
        (2, TxType::Expense, 30000, farinha, cartao),
        (2, TxType::Expense, 9000, agua, pix),
        (7, TxType::Revenue, 45000, vendas, cartao),
    ];
    for (day, kind, cents, cat, pm) in entries {
        ledger
            .add_transaction(&TransactionInput::paid(d(day), kind, Decimal::new(cents, 2), cat, pm))
            .unwrap();
    }
    let mut plan = TransactionInput::paid(d(8), TxType::Expense, Decimal::new(90000, 2), farinha, cartao)
        .describe("Forno novo");
    plan.condition = Condition::Pending;
    plan.installments = 10;
    ledger.add_transaction(&plan).unwrap();
}

fn fresh() -> Ledger {
    Ledger::new(SqliteStore::open_in_memory().unwrap())
}

#[test]
fn round_trip_preserves_aggregates() {
    let mut source = fresh();
    populate(&mut source);
    let json = source.export_json().unwrap();

    let mut target = fresh();
    target.add_category("Lixo", None).unwrap();
    let stats = target.import_json(&json).unwrap();
    assert_eq!(stats.categories, 3);
    assert_eq!(stats.payment_methods, 2);
    assert_eq!(stats.transactions, 5);

    let request = AggregationRequest::between(d(1), d(30));
    let before = source.dashboard_as_of(&request, d(30)).unwrap();
    let after = target.dashboard_as_of(&request, d(30)).unwrap();
    assert_eq!(before.summary, after.summary);
    assert_eq!(before.by_date, after.by_date);
    assert_eq!(before.grouped_by_day.closing, after.grouped_by_day.closing);
    let totals = |dash: &cashbook::aggregation::Dashboard| {
        dash.by_category_expense
            .iter()
            .map(|c| (c.name.clone(), c.total, c.count))
            .collect::<Vec<_>>()
    };
    assert_eq!(totals(&before), totals(&after));
    assert_eq!(target.user_config().unwrap(), source.user_config().unwrap());
    assert!(target.store().category_by_name("Lixo").unwrap().is_none());
}

#[test]
fn restore_relinks_after_live_category_loss() {
    let mut ledger = fresh();
    populate(&mut ledger);
    let snapshot = ledger.export_backup().unwrap();
    let original: Vec<String> = ledger.categories().unwrap().into_iter().map(|c| c.name).collect();

    let agua = ledger.store().category_by_name("Água").unwrap().unwrap();
    ledger.delete_category(agua.id).unwrap();
    assert_eq!(ledger.categories().unwrap().len(), original.len() - 1);

    ledger.import_backup(&snapshot).unwrap();
    let restored: Vec<String> = ledger.categories().unwrap().into_iter().map(|c| c.name).collect();
    assert_eq!(restored, original);

    // every transaction points at the category with the same name as before
    let names_before: Vec<Option<String>> = snapshot
        .transactions
        .iter()
        .map(|t| {
            t.category_id.and_then(|id| {
                snapshot
                    .categories
                    .iter()
                    .find(|c| c.id == id)
                    .map(|c| c.name.clone())
            })
        })
        .collect();
    let mut views = ledger
        .list_filtered_as_of(&Default::default(), d(30))
        .unwrap();
    views.reverse();
    let names_after: Vec<Option<String>> = views.into_iter().map(|v| v.category_name).collect();
    assert_eq!(names_before, names_after);
}

#[test]
fn ids_are_renumbered_on_restore() {
    let mut ledger = fresh();
    populate(&mut ledger);
    let snapshot = ledger.export_backup().unwrap();
    assert_eq!(snapshot.categories.iter().map(|c| c.id).min(), Some(2));

    ledger.import_backup(&snapshot).unwrap();
    let mut ids: Vec<i64> = ledger.categories().unwrap().iter().map(|c| c.id).collect();
    ids.sort();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn unmapped_references_become_null() {
    let mut ledger = fresh();
    let json = r#"{
        "categories": [{"id": 10, "name": "Vendas", "icon_name": "cart"}],
        "paymentMethods": [],
        "transactions": [
            {"id": 1, "date": "2025-09-03", "description": "sem forma", "value": "15.00",
             "type": "revenue", "condition": "paid", "installments": 1,
             "payment_method_id": 5, "category_id": 10},
            {"id": 2, "date": "2025-09-04", "description": "categoria apagada", "value": "9.90",
             "type": "expense", "condition": "paid", "installments": 1,
             "payment_method_id": null, "category_id": 99}
        ],
        "userConfig": {"id": 1, "company_name": null, "initial_balance": "0", "company_logo": null}
    }"#;
    ledger.import_json(json).unwrap();
    let txs = ledger.transactions().unwrap();
    assert_eq!(txs.len(), 2);
    assert!(txs[0].category_id.is_some());
    assert_eq!(txs[0].payment_method_id, None);
    assert_eq!(txs[1].category_id, None);
    // sign follows the type even when the document stored a magnitude
    assert_eq!(txs[1].value, Decimal::new(-990, 2));
}

#[test]
fn malformed_document_changes_nothing() {
    let mut ledger = fresh();
    populate(&mut ledger);
    let before = ledger.export_backup().unwrap();

    let err = ledger
        .import_json(r#"{"categories": [], "transactions": [], "userConfig": {}}"#)
        .unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("paymentMethods"));

    let err = ledger.import_json("[1, 2, 3]").unwrap_err();
    assert!(err.is_validation());

    let err = ledger
        .import_json(
            r#"{"categories": [], "paymentMethods": [], "userConfig": {},
                "transactions": [{"id": 1, "date": "ontem", "value": "1", "type": "revenue", "condition": "paid"}]}"#,
        )
        .unwrap_err();
    assert!(err.is_validation());

    assert_eq!(ledger.export_backup().unwrap(), before);
}

#[test]
fn storage_failure_mid_import_rolls_back() {
    let conn = Connection::open_in_memory().unwrap();
    let mut ledger = Ledger::new(SqliteStore::new(conn).unwrap());
    populate(&mut ledger);
    ledger
        .store()
        .connection()
        .execute_batch(
            "CREATE TEMP TRIGGER reject_boom BEFORE INSERT ON transactions
             WHEN NEW.description = 'boom'
             BEGIN SELECT RAISE(ABORT, 'boom rejected'); END;",
        )
        .unwrap();
    let before = ledger.export_backup().unwrap();

    let mut doc = before.clone();
    doc.categories.push(cashbook::backup::BackupCategory {
        id: 500,
        name: "Nova".into(),
        icon_name: None,
    });
    let mut bad = doc.transactions[0].clone();
    bad.description = Some("boom".into());
    doc.transactions.push(bad);

    let err = ledger.import_backup(&doc).unwrap_err();
    assert!(matches!(err, Error::Storage(_)));
    assert_eq!(ledger.export_backup().unwrap(), before);
}

#[test]
fn reset_restores_defaults_and_ids() {
    let mut ledger = fresh();
    populate(&mut ledger);
    let rx = ledger.subscribe();
    ledger.reset_to_defaults(d(15)).unwrap();
    assert_eq!(rx.try_recv().unwrap(), LedgerChange::Reset);

    let categories = ledger.categories().unwrap();
    assert_eq!(categories.len(), DEFAULT_CATEGORIES.len());
    assert_eq!(categories.iter().map(|c| c.id).min(), Some(1));
    assert_eq!(ledger.payment_methods().unwrap().len(), DEFAULT_PAYMENT_METHODS.len());
    assert_eq!(ledger.user_config().unwrap(), UserConfig::default());

    let txs = ledger.transactions().unwrap();
    assert_eq!(txs.len(), 2);
    assert!(txs.iter().all(|t| t.date == d(15) && t.category_id.is_some()));
    assert!(txs.iter().any(|t| t.kind == TxType::Revenue && t.value > Decimal::ZERO));
    assert!(txs.iter().any(|t| t.kind == TxType::Expense && t.value < Decimal::ZERO));
}

#[test]
fn export_is_a_readable_interchange_document() {
    let mut ledger = fresh();
    populate(&mut ledger);
    let value: serde_json::Value = serde_json::from_str(&ledger.export_json().unwrap()).unwrap();
    for key in ["categories", "paymentMethods", "transactions", "userConfig"] {
        assert!(value.get(key).is_some(), "missing {key}");
    }
    let first = &value["transactions"][0];
    assert_eq!(first["date"], "2025-09-01");
    assert_eq!(first["type"], "revenue");
    assert_eq!(first["value"], "1200.00");
    assert!(first.get("category_id").is_some());
    assert_eq!(value["userConfig"]["id"], 1);

    let parsed = BackupDocument::from_value(value).unwrap();
    assert_eq!(parsed.transactions.len(), 5);
}

fn document(categories: &str, methods: &str, transactions: &str) -> String {
    format!(
        r#"{{"categories": [{categories}], "paymentMethods": [{methods}],
            "transactions": [{transactions}], "userConfig": {{"id": 1, "initial_balance": "0"}}}}"#
    )
}

#[test]
fn repeated_section_ids_are_rejected() {
    let mut ledger = fresh();
    populate(&mut ledger);
    let before = ledger.export_backup().unwrap();

    let json = document(
        r#"{"id": 1, "name": "A"}, {"id": 1, "name": "B"}"#,
        "",
        r#"{"id": 1, "date": "2025-09-01", "value": "5", "type": "expense",
            "condition": "paid", "category_id": 1}"#,
    );
    let err = ledger.import_json(&json).unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("category id"));

    let json = document("", r#"{"id": 4, "name": "Pix"}, {"id": 4, "name": "Boleto"}"#, "");
    let err = ledger.import_json(&json).unwrap_err();
    assert!(err.to_string().contains("payment method id"));

    assert_eq!(ledger.export_backup().unwrap(), before);
}

#[test]
fn out_of_range_amounts_are_rejected_before_writing() {
    let mut ledger = fresh();
    populate(&mut ledger);
    let before = ledger.export_backup().unwrap();

    let huge = r#"{"id": 1, "date": "2025-09-01", "value": "79228162514264337593543950335",
        "type": "revenue", "condition": "paid"}"#;
    let json = document("", "", &format!("{huge}, {}", huge.replace("\"id\": 1", "\"id\": 2")));
    assert!(ledger.import_json(&json).unwrap_err().is_validation());

    let json = r#"{"categories": [], "paymentMethods": [], "transactions": [],
        "userConfig": {"id": 1, "initial_balance": "-79228162514264337593543950335"}}"#;
    assert!(ledger.import_json(json).unwrap_err().is_validation());

    assert_eq!(ledger.export_backup().unwrap(), before);
    // the ledger still aggregates normally
    ledger
        .dashboard_as_of(&AggregationRequest::between(d(1), d(30)), d(30))
        .unwrap();
}

#[test]
fn largest_accepted_amounts_still_aggregate() {
    let mut ledger = fresh();
    let cap = Decimal::from(cashbook::models::MAX_AMOUNT_UNITS);
    let rows: Vec<String> = (1..=50)
        .map(|id| {
            format!(
                r#"{{"id": {id}, "date": "2025-09-02", "value": "{cap}", "type": "revenue", "condition": "paid"}}"#
            )
        })
        .collect();
    let json = format!(
        r#"{{"categories": [], "paymentMethods": [], "transactions": [{}],
            "userConfig": {{"id": 1, "initial_balance": "{cap}"}}}}"#,
        rows.join(",")
    );
    ledger.import_json(&json).unwrap();

    let dash = ledger
        .dashboard_as_of(&AggregationRequest::between(d(2), d(2)), d(30))
        .unwrap();
    assert_eq!(dash.summary.revenue, cap * Decimal::from(50));
    assert_eq!(dash.grouped_by_day.closing, cap * Decimal::from(51));
}

#[test]
fn single_installment_plan_is_rejected() {
    let mut ledger = fresh();
    let json = document(
        "",
        "",
        r#"{"id": 1, "date": "2025-09-01", "value": "300", "type": "expense",
            "condition": "pending", "installments": 1}"#,
    );
    assert!(ledger.import_json(&json).unwrap_err().is_validation());
    assert!(ledger.transactions().unwrap().is_empty());
}
