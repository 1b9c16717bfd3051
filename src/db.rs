// Ledger store - accounts, transactions, exchange rates on SQLite
//
// The store is append-only: rows are inserted, never updated or deleted.
// Every read is ordered deterministically (accounts by name, transactions
// by date then id descending, rates by date then id descending) so derived
// views are reproducible.

use std::path::PathBuf;

use chrono::Local;
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use serde::Serialize;

use crate::currency::PRIMARY_CURRENCY;
use crate::error::LedgerResult;
use crate::validate::ValidTransaction;

/// Rows returned by a transaction listing when the caller gives no limit.
pub const DEFAULT_TRANSACTION_LIMIT: i64 = 100;

/// Rows returned by a rate listing when the caller gives no limit.
pub const DEFAULT_RATE_LIMIT: i64 = 50;

/// Bootstrap quotes seeded into an empty store, dated the day of seeding.
const DEFAULT_RATES: [(&str, &str, f64); 6] = [
    ("USD", "CNY", 7.2),
    ("EUR", "CNY", 7.8),
    ("GBP", "CNY", 9.0),
    ("CNY", "USD", 1.0 / 7.2),
    ("USD", "EUR", 0.92),
    ("EUR", "USD", 1.0 / 0.92),
];

// ============================================================================
// ENTITY TYPES
// ============================================================================

/// Transaction kind. The sign of an amount is implied by the kind and never
/// stored; amounts are strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxType {
    Income,
    Expense,
    Transfer,
}

impl TxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::Income => "income",
            TxType::Expense => "expense",
            TxType::Transfer => "transfer",
        }
    }

    /// Case-insensitive, trimmed parse.
    pub fn parse(s: &str) -> Option<TxType> {
        match s.trim().to_lowercase().as_str() {
            "income" => Some(TxType::Income),
            "expense" => Some(TxType::Expense),
            "transfer" => Some(TxType::Transfer),
            _ => None,
        }
    }
}

/// Where an exchange-rate row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateSource {
    Manual,
    Api,
    Default,
}

impl RateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateSource::Manual => "manual",
            RateSource::Api => "api",
            RateSource::Default => "default",
        }
    }

    pub fn parse(s: &str) -> Option<RateSource> {
        match s {
            "manual" => Some(RateSource::Manual),
            "api" => Some(RateSource::Api),
            "default" => Some(RateSource::Default),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub currency: String,
    pub created_at: String,
}

/// A stored transaction joined with its account name.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRecord {
    pub id: i64,
    pub date: String,
    #[serde(rename = "type")]
    pub tx_type: TxType,
    pub category: String,
    pub amount: f64,
    pub currency: String,
    pub account_id: i64,
    pub note: String,
    pub created_at: String,
    pub account_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExchangeRate {
    pub id: i64,
    pub from_currency: String,
    pub to_currency: String,
    pub rate: f64,
    pub date: String,
    pub source: RateSource,
}

/// Filter for transaction listings. `year` and `month` only apply as a pair
/// and select one calendar month.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionFilter {
    pub limit: Option<i64>,
    pub account_id: Option<i64>,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

// ============================================================================
// SCHEMA & SEEDING
// ============================================================================

/// Database location: `FINTRACK_DB` env var, or `finance.db` in the working
/// directory.
pub fn db_path() -> PathBuf {
    std::env::var_os("FINTRACK_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("finance.db"))
}

/// Create the schema (idempotent) and seed an empty store with the default
/// account and bootstrap rates. Safe to call on every process start.
pub fn setup_database(conn: &Connection) -> LedgerResult<()> {
    // WAL for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            currency TEXT NOT NULL,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY,
            date TEXT NOT NULL,
            type TEXT NOT NULL,
            category TEXT NOT NULL,
            amount REAL NOT NULL,
            currency TEXT NOT NULL,
            account_id INTEGER NOT NULL,
            note TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS exchange_rates (
            id INTEGER PRIMARY KEY,
            from_currency TEXT NOT NULL,
            to_currency TEXT NOT NULL,
            rate REAL NOT NULL,
            date TEXT NOT NULL,
            source TEXT NOT NULL DEFAULT 'manual'
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_type ON transactions(type)",
        [],
    )?;

    seed_defaults(conn)
}

/// Seed the default account and bootstrap rates. Only runs against empty
/// tables, so repeated initialization never duplicates rows.
fn seed_defaults(conn: &Connection) -> LedgerResult<()> {
    let accounts: i64 = conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?;
    if accounts == 0 {
        conn.execute(
            "INSERT INTO accounts (name, currency) VALUES (?1, ?2)",
            params!["Main Account", PRIMARY_CURRENCY],
        )?;
    }

    let rates: i64 =
        conn.query_row("SELECT COUNT(*) FROM exchange_rates", [], |row| row.get(0))?;
    if rates == 0 {
        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        for (from, to, rate) in DEFAULT_RATES {
            record_rate(conn, from, to, rate, &today, RateSource::Default)?;
        }
    }

    Ok(())
}

// ============================================================================
// ACCOUNTS
// ============================================================================

/// Insert an account. Duplicate names are allowed; identity is the row id.
pub fn create_account(conn: &Connection, name: &str, currency: &str) -> LedgerResult<Account> {
    conn.execute(
        "INSERT INTO accounts (name, currency) VALUES (?1, ?2)",
        params![name, currency],
    )?;
    let id = conn.last_insert_rowid();
    let created_at: String = conn.query_row(
        "SELECT created_at FROM accounts WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(Account {
        id,
        name: name.to_string(),
        currency: currency.to_string(),
        created_at,
    })
}

pub fn list_accounts(conn: &Connection) -> LedgerResult<Vec<Account>> {
    let mut stmt =
        conn.prepare("SELECT id, name, currency, created_at FROM accounts ORDER BY name")?;
    let accounts = stmt
        .query_map([], account_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(accounts)
}

pub fn get_account(conn: &Connection, id: i64) -> LedgerResult<Option<Account>> {
    let account = conn
        .query_row(
            "SELECT id, name, currency, created_at FROM accounts WHERE id = ?1",
            params![id],
            account_from_row,
        )
        .optional()?;
    Ok(account)
}

/// Lowest-id account; the implicit default for transactions that name none.
pub fn first_account(conn: &Connection) -> LedgerResult<Option<Account>> {
    let account = conn
        .query_row(
            "SELECT id, name, currency, created_at FROM accounts ORDER BY id LIMIT 1",
            [],
            account_from_row,
        )
        .optional()?;
    Ok(account)
}

fn account_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        currency: row.get(2)?,
        created_at: row.get(3)?,
    })
}

// ============================================================================
// TRANSACTIONS
// ============================================================================

/// Insert a validated transaction and return its id.
pub fn insert_transaction(conn: &Connection, tx: &ValidTransaction) -> LedgerResult<i64> {
    conn.execute(
        "INSERT INTO transactions (date, type, category, amount, currency, account_id, note)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            tx.date,
            tx.tx_type.as_str(),
            tx.category,
            tx.amount,
            tx.currency,
            tx.account_id,
            tx.note,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// List transactions joined with their account name, newest first.
///
/// The month filter compares `strftime('%Y', date)` / `strftime('%m', date)`
/// against zero-padded year and month strings, so it has exact
/// calendar-month semantics on the stored `YYYY-MM-DD` dates.
pub fn list_transactions(
    conn: &Connection,
    filter: &TransactionFilter,
) -> LedgerResult<Vec<TransactionRecord>> {
    let mut sql = String::from(
        "SELECT t.id, t.date, t.type, t.category, t.amount, t.currency,
                t.account_id, t.note, t.created_at, a.name AS account_name
         FROM transactions t
         LEFT JOIN accounts a ON t.account_id = a.id",
    );

    let year_param = filter.year.map(|y| format!("{y:04}"));
    let month_param = filter.month.map(|m| format!("{m:02}"));
    let limit = filter.limit.unwrap_or(DEFAULT_TRANSACTION_LIMIT);

    let mut conditions: Vec<&str> = Vec::new();
    let mut params: Vec<&dyn ToSql> = Vec::new();
    if let Some(ref account_id) = filter.account_id {
        conditions.push("t.account_id = ?");
        params.push(account_id);
    }
    if let (Some(year), Some(month)) = (year_param.as_ref(), month_param.as_ref()) {
        conditions.push("strftime('%Y', t.date) = ? AND strftime('%m', t.date) = ?");
        params.push(year);
        params.push(month);
    }
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql.push_str(" ORDER BY t.date DESC, t.id DESC LIMIT ?");
    params.push(&limit);

    let mut stmt = conn.prepare(&sql)?;
    let transactions = stmt
        .query_map(&params[..], |row| {
            let type_str: String = row.get(2)?;
            let tx_type = TxType::parse(&type_str).ok_or(rusqlite::Error::InvalidQuery)?;
            Ok(TransactionRecord {
                id: row.get(0)?,
                date: row.get(1)?,
                tx_type,
                category: row.get(3)?,
                amount: row.get(4)?,
                currency: row.get(5)?,
                account_id: row.get(6)?,
                note: row.get(7)?,
                created_at: row.get(8)?,
                account_name: row.get(9)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(transactions)
}

/// Every (type, amount, currency) row of one account, for balance folding.
pub fn account_entries(
    conn: &Connection,
    account_id: i64,
) -> LedgerResult<Vec<(TxType, f64, String)>> {
    let mut stmt = conn.prepare(
        "SELECT type, amount, currency FROM transactions WHERE account_id = ?1 ORDER BY id",
    )?;
    let entries = stmt
        .query_map(params![account_id], |row| {
            let type_str: String = row.get(0)?;
            let tx_type = TxType::parse(&type_str).ok_or(rusqlite::Error::InvalidQuery)?;
            Ok((tx_type, row.get(1)?, row.get(2)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

// ============================================================================
// EXCHANGE RATES
// ============================================================================

/// Append a rate row. Prior rows for the pair are kept; "current" is always
/// resolved by date then id at read time.
pub fn record_rate(
    conn: &Connection,
    from: &str,
    to: &str,
    rate: f64,
    date: &str,
    source: RateSource,
) -> LedgerResult<()> {
    conn.execute(
        "INSERT INTO exchange_rates (from_currency, to_currency, rate, date, source)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![from, to, rate, date, source.as_str()],
    )?;
    Ok(())
}

pub fn list_rates(conn: &Connection, limit: Option<i64>) -> LedgerResult<Vec<ExchangeRate>> {
    let mut stmt = conn.prepare(
        "SELECT id, from_currency, to_currency, rate, date, source
         FROM exchange_rates
         ORDER BY date DESC, id DESC LIMIT ?1",
    )?;
    let rates = stmt
        .query_map(params![limit.unwrap_or(DEFAULT_RATE_LIMIT)], |row| {
            let source_str: String = row.get(5)?;
            let source = RateSource::parse(&source_str).ok_or(rusqlite::Error::InvalidQuery)?;
            Ok(ExchangeRate {
                id: row.get(0)?,
                from_currency: row.get(1)?,
                to_currency: row.get(2)?,
                rate: row.get(3)?,
                date: row.get(4)?,
                source,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rates)
}
