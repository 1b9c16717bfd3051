// Dashboard summary - current-month totals, recent activity, balances

use chrono::{Datelike, Local};
use rusqlite::Connection;
use serde::Serialize;

use crate::balance;
use crate::db::{self, Account, TransactionFilter, TransactionRecord, TxType};
use crate::error::LedgerResult;

/// Transactions shown in the recent-activity list.
const RECENT_LIMIT: i64 = 10;

/// Current-month total for one (type, currency) pair. Amounts stay in their
/// native currency here; only per-account balances convert.
#[derive(Debug, Clone, Serialize)]
pub struct MonthlySummaryEntry {
    #[serde(rename = "type")]
    pub tx_type: TxType,
    pub total: f64,
    pub currency: String,
}

/// An account together with its converted balance.
#[derive(Debug, Clone, Serialize)]
pub struct AccountBalance {
    #[serde(flatten)]
    pub account: Account,
    pub balance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardData {
    pub monthly_summary: Vec<MonthlySummaryEntry>,
    pub recent_transactions: Vec<TransactionRecord>,
    pub accounts: Vec<AccountBalance>,
}

/// Assemble the dashboard from live store contents.
pub fn dashboard(conn: &Connection) -> LedgerResult<DashboardData> {
    let today = Local::now().date_naive();
    let monthly_summary = month_summary(conn, today.year(), today.month())?;

    let recent_transactions = db::list_transactions(
        conn,
        &TransactionFilter {
            limit: Some(RECENT_LIMIT),
            ..Default::default()
        },
    )?;

    let mut accounts = Vec::new();
    for account in db::list_accounts(conn)? {
        let raw = balance::compute_balance(conn, &account)?;
        accounts.push(AccountBalance {
            account,
            balance: balance::round2(raw),
        });
    }

    Ok(DashboardData {
        monthly_summary,
        recent_transactions,
        accounts,
    })
}

/// Totals for one calendar month grouped by (type, currency).
fn month_summary(
    conn: &Connection,
    year: i32,
    month: u32,
) -> LedgerResult<Vec<MonthlySummaryEntry>> {
    let mut stmt = conn.prepare(
        "SELECT type, SUM(amount) AS total, currency
         FROM transactions
         WHERE strftime('%Y', date) = ?1 AND strftime('%m', date) = ?2
         GROUP BY type, currency",
    )?;
    let entries = stmt
        .query_map([format!("{year:04}"), format!("{month:02}")], |row| {
            let type_str: String = row.get(0)?;
            let tx_type = TxType::parse(&type_str).ok_or(rusqlite::Error::InvalidQuery)?;
            Ok(MonthlySummaryEntry {
                tx_type,
                total: row.get(1)?,
                currency: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::ValidTransaction;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::setup_database(&conn).unwrap();
        conn
    }

    fn insert(conn: &Connection, date: &str, tx_type: TxType, amount: f64, currency: &str) {
        let account = db::first_account(conn).unwrap().unwrap();
        db::insert_transaction(
            conn,
            &ValidTransaction {
                date: date.to_string(),
                tx_type,
                category: "Other".to_string(),
                amount,
                currency: currency.to_string(),
                account_id: account.id,
                note: String::new(),
            },
        )
        .unwrap();
    }

    #[test]
    fn test_dashboard_reflects_current_month_and_balances() {
        let conn = test_conn();
        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        insert(&conn, &today, TxType::Income, 100.0, "CNY");
        insert(&conn, &today, TxType::Expense, 40.0, "CNY");
        // An old transaction: counts toward the balance, not the month summary.
        insert(&conn, "2000-01-15", TxType::Income, 1.5, "CNY");

        let data = dashboard(&conn).unwrap();

        assert_eq!(data.recent_transactions.len(), 3);
        assert_eq!(data.accounts.len(), 1);
        assert_eq!(data.accounts[0].balance, 61.5);

        let income_total = data
            .monthly_summary
            .iter()
            .find(|e| e.tx_type == TxType::Income && e.currency == "CNY")
            .map(|e| e.total);
        assert_eq!(income_total, Some(100.0));
        let expense_total = data
            .monthly_summary
            .iter()
            .find(|e| e.tx_type == TxType::Expense)
            .map(|e| e.total);
        assert_eq!(expense_total, Some(40.0));
    }

    #[test]
    fn test_month_summary_groups_by_type_and_currency() {
        let conn = test_conn();
        insert(&conn, "2024-04-10", TxType::Income, 10.0, "CNY");
        insert(&conn, "2024-04-11", TxType::Income, 20.0, "USD");
        insert(&conn, "2024-04-12", TxType::Income, 30.0, "CNY");

        let mut entries = month_summary(&conn, 2024, 4).unwrap();
        entries.sort_by(|a, b| a.currency.cmp(&b.currency));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].currency, "CNY");
        assert_eq!(entries[0].total, 40.0);
        assert_eq!(entries[1].currency, "USD");
        assert_eq!(entries[1].total, 20.0);
    }

    #[test]
    fn test_empty_store_dashboard() {
        let conn = test_conn();
        let data = dashboard(&conn).unwrap();
        assert!(data.monthly_summary.is_empty());
        assert!(data.recent_transactions.is_empty());
        assert_eq!(data.accounts.len(), 1);
        assert_eq!(data.accounts[0].balance, 0.0);
    }
}
