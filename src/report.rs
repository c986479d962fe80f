// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Row sets and HTML fragments handed to external exporters (PDF, sheets).

use chrono::NaiveDate;
use maud::{Markup, html};
use serde::Serialize;
use std::io;

use crate::aggregation::Summary;
use crate::error::Result;
use crate::models::{Condition, TransactionView, TxType, UserConfig};
use crate::utils::{fmt_money, pretty_table};

pub const HEADERS: [&str; 8] = [
    "Data",
    "Descrição",
    "Categoria",
    "Pagamento",
    "Tipo",
    "Condição",
    "Parcelas",
    "Valor",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub date: String,
    pub description: String,
    pub category: String,
    pub payment_method: String,
    pub kind: String,
    pub condition: String,
    pub installments: u32,
    pub value: String,
}

impl ReportRow {
    pub fn cells(&self) -> Vec<String> {
        vec![
            self.date.clone(),
            self.description.clone(),
            self.category.clone(),
            self.payment_method.clone(),
            self.kind.clone(),
            self.condition.clone(),
            self.installments.to_string(),
            self.value.clone(),
        ]
    }
}

fn kind_label(kind: TxType) -> &'static str {
    match kind {
        TxType::Revenue => "Receita",
        TxType::Expense => "Despesa",
    }
}

fn condition_label(condition: Condition) -> &'static str {
    match condition {
        Condition::Paid => "À vista",
        Condition::Pending => "Parcelado",
    }
}

fn fmt_day(d: NaiveDate) -> String {
    d.format("%d/%m/%Y").to_string()
}

pub fn report_rows(views: &[TransactionView]) -> Vec<ReportRow> {
    views
        .iter()
        .map(|v| {
            let t = &v.transaction;
            ReportRow {
                date: fmt_day(t.date),
                description: t.description.clone().unwrap_or_default(),
                category: v.category_name.clone().unwrap_or_default(),
                payment_method: v.payment_method_name.clone().unwrap_or_default(),
                kind: kind_label(t.kind).to_string(),
                condition: condition_label(t.condition).to_string(),
                installments: t.installments,
                value: fmt_money(&t.value),
            }
        })
        .collect()
}

/// Plain-text preview of the rows.
pub fn render_table(rows: &[ReportRow]) -> String {
    pretty_table(&HEADERS, rows.iter().map(ReportRow::cells).collect()).to_string()
}

pub fn write_csv<W: io::Write>(rows: &[ReportRow], out: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(HEADERS)?;
    for r in rows {
        wtr.write_record(r.cells())?;
    }
    wtr.flush()?;
    Ok(())
}

fn period_label(start: Option<NaiveDate>, end: Option<NaiveDate>) -> String {
    match (start, end) {
        (Some(s), Some(e)) => format!("{} a {}", fmt_day(s), fmt_day(e)),
        (Some(s), None) => format!("a partir de {}", fmt_day(s)),
        (None, Some(e)) => format!("até {}", fmt_day(e)),
        (None, None) => "todo o período".to_string(),
    }
}

/// HTML fragment for a PDF renderer: header, summary block and the rows.
pub fn render_html(
    config: &UserConfig,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    summary: &Summary,
    rows: &[ReportRow],
) -> String {
    report_markup(config, start, end, summary, rows).into_string()
}

fn report_markup(
    config: &UserConfig,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    summary: &Summary,
    rows: &[ReportRow],
) -> Markup {
    let company = config
        .company_name
        .clone()
        .unwrap_or_else(|| "Relatório financeiro".to_string());
    html!(
        section class="report"
        {
            header
            {
                h1 { (company) }
                p class="period" { (period_label(start, end)) }
            }

            table class="summary"
            {
                tr { th { "Receitas" } td { (fmt_money(&summary.revenue)) } }
                tr { th { "Despesas" } td { (fmt_money(&summary.expense)) } }
                tr { th { "Saldo" } td { (fmt_money(&summary.net)) } }
            }

            table class="transactions"
            {
                thead
                {
                    tr
                    {
                        @for h in HEADERS { th { (h) } }
                    }
                }
                tbody
                {
                    @for r in rows
                    {
                        tr
                        {
                            td { (r.date) }
                            td { (r.description) }
                            td { (r.category) }
                            td { (r.payment_method) }
                            td { (r.kind) }
                            td { (r.condition) }
                            td { (r.installments.to_string()) }
                            td class="value" { (r.value) }
                        }
                    }
                }
            }
        }
    )
}
