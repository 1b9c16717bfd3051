// Monthly report aggregation and the printable document model
//
// Reports are pure derived views: recomputed from the transaction log on
// every request, never cached. Amounts are summed in their native
// currencies - no conversion is applied here, so mixed-currency totals are
// only meaningful when the month is single-currency.

use std::collections::BTreeMap;

use rusqlite::Connection;
use serde::Serialize;

use crate::db::{self, TransactionFilter, TransactionRecord, TxType};
use crate::error::LedgerResult;

/// Upper bound on transactions pulled into a single report.
const REPORT_TRANSACTION_LIMIT: i64 = 10_000;

/// Rows per transaction-table page in the printable document.
pub const ROWS_PER_PAGE: usize = 25;

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u32,
    pub income_total: f64,
    pub expense_total: f64,
    pub net: f64,
    pub transaction_count: usize,
    pub expense_by_category: BTreeMap<String, f64>,
    pub income_by_category: BTreeMap<String, f64>,
    pub transactions: Vec<TransactionRecord>,
}

/// Aggregate one calendar month across every account.
///
/// Each category map covers only its own type, so the map totals match
/// `income_total` / `expense_total` exactly. Transfers count toward
/// `transaction_count` but toward neither total.
pub fn monthly_report(conn: &Connection, year: i32, month: u32) -> LedgerResult<MonthlyReport> {
    let transactions = db::list_transactions(
        conn,
        &TransactionFilter {
            limit: Some(REPORT_TRANSACTION_LIMIT),
            year: Some(year),
            month: Some(month),
            ..Default::default()
        },
    )?;

    let mut income_total = 0.0;
    let mut expense_total = 0.0;
    let mut expense_by_category: BTreeMap<String, f64> = BTreeMap::new();
    let mut income_by_category: BTreeMap<String, f64> = BTreeMap::new();

    for tx in &transactions {
        match tx.tx_type {
            TxType::Income => {
                income_total += tx.amount;
                *income_by_category.entry(tx.category.clone()).or_insert(0.0) += tx.amount;
            }
            TxType::Expense => {
                expense_total += tx.amount;
                *expense_by_category.entry(tx.category.clone()).or_insert(0.0) += tx.amount;
            }
            TxType::Transfer => {}
        }
    }

    Ok(MonthlyReport {
        year,
        month,
        income_total,
        expense_total,
        net: income_total - expense_total,
        transaction_count: transactions.len(),
        expense_by_category,
        income_by_category,
        transactions,
    })
}

// ============================================================================
// PRINTABLE DOCUMENT
// ============================================================================

/// Flattened transaction line for table pages.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRow {
    pub date: String,
    #[serde(rename = "type")]
    pub tx_type: TxType,
    pub category: String,
    pub amount: f64,
    pub currency: String,
    pub account: String,
    pub note: String,
}

impl From<&TransactionRecord> for TransactionRow {
    fn from(tx: &TransactionRecord) -> Self {
        TransactionRow {
            date: tx.date.clone(),
            tx_type: tx.tx_type,
            category: tx.category.clone(),
            amount: tx.amount,
            currency: tx.currency.clone(),
            account: tx.account_name.clone().unwrap_or_default(),
            note: tx.note.clone(),
        }
    }
}

/// One page of the printable monthly document.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportPage {
    /// Totals overview.
    Summary {
        income_total: f64,
        expense_total: f64,
        net: f64,
        transaction_count: usize,
    },
    /// Expense amounts per category. Omitted when the month has no expenses.
    ExpenseBreakdown { by_category: BTreeMap<String, f64> },
    /// One fixed-size slice of the transaction table; `start` and `end` are
    /// 1-based row numbers within the month.
    TransactionTable {
        start: usize,
        end: usize,
        rows: Vec<TransactionRow>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportDocument {
    pub title: String,
    pub pages: Vec<ReportPage>,
}

/// Build the paginated document from an aggregated report: summary page,
/// expense breakdown, then the transaction table split at [`ROWS_PER_PAGE`].
pub fn build_document(report: &MonthlyReport) -> ReportDocument {
    let mut pages = vec![ReportPage::Summary {
        income_total: report.income_total,
        expense_total: report.expense_total,
        net: report.net,
        transaction_count: report.transaction_count,
    }];

    if !report.expense_by_category.is_empty() {
        pages.push(ReportPage::ExpenseBreakdown {
            by_category: report.expense_by_category.clone(),
        });
    }

    for (i, chunk) in report.transactions.chunks(ROWS_PER_PAGE).enumerate() {
        let start = i * ROWS_PER_PAGE + 1;
        pages.push(ReportPage::TransactionTable {
            start,
            end: start + chunk.len() - 1,
            rows: chunk.iter().map(TransactionRow::from).collect(),
        });
    }

    ReportDocument {
        title: format!("Monthly Report: {}-{:02}", report.year, report.month),
        pages,
    }
}

/// Renders a report document into downloadable bytes.
///
/// The crate ships a plain-text reference implementation; a PDF backend is
/// an external collaborator consuming the same page model.
pub trait DocumentRenderer {
    fn media_type(&self) -> &'static str;
    fn file_extension(&self) -> &'static str;
    fn render(&self, document: &ReportDocument) -> Vec<u8>;
}

/// Reference renderer: one text block per page, separated by form feeds.
pub struct TextRenderer;

impl DocumentRenderer for TextRenderer {
    fn media_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }

    fn file_extension(&self) -> &'static str {
        "txt"
    }

    fn render(&self, document: &ReportDocument) -> Vec<u8> {
        let mut out = String::new();
        out.push_str(&document.title);
        out.push('\n');
        out.push_str(&"=".repeat(document.title.len()));
        out.push('\n');

        for (i, page) in document.pages.iter().enumerate() {
            if i > 0 {
                // form feed between pages
                out.push('\x0c');
            }
            match page {
                ReportPage::Summary {
                    income_total,
                    expense_total,
                    net,
                    transaction_count,
                } => {
                    out.push_str(&format!("Income total: {income_total:.2}\n"));
                    out.push_str(&format!("Expense total: {expense_total:.2}\n"));
                    out.push_str(&format!("Net: {net:.2}\n"));
                    out.push_str(&format!("Transactions: {transaction_count}\n"));
                }
                ReportPage::ExpenseBreakdown { by_category } => {
                    out.push_str("Expense by Category\n");
                    for (category, amount) in by_category {
                        out.push_str(&format!("  {category}: {amount:.2}\n"));
                    }
                }
                ReportPage::TransactionTable { start, end, rows } => {
                    out.push_str(&format!("Transactions {start} - {end}\n"));
                    for row in rows {
                        out.push_str(&format!(
                            "{}  {:<8}  {:<16}  {:>12.2} {}  {}  {}\n",
                            row.date,
                            row.tx_type.as_str(),
                            row.category,
                            row.amount,
                            row.currency,
                            row.account,
                            row.note,
                        ));
                    }
                }
            }
        }

        out.into_bytes()
    }
}
