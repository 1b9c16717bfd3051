// Ingestion validation and normalization
//
// Each field is checked independently and the FIRST violated constraint is
// returned as a Validation error with a field-specific message. Nothing is
// written until every check passes, so a rejected submission leaves no
// partial state behind.

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::Value;

use crate::currency::{self, PRIMARY_CURRENCY};
use crate::db::{self, TxType};
use crate::error::{LedgerError, LedgerResult};

/// Curated expense category suggestions. Advisory only - any free-text
/// category is accepted.
pub const EXPENSE_CATEGORIES: [&str; 10] = [
    "Food",
    "Transport",
    "Rent",
    "Utilities",
    "Entertainment",
    "Groceries",
    "Health",
    "Clothing",
    "Education",
    "Other",
];

/// Curated income category suggestions. Advisory only.
pub const INCOME_CATEGORIES: [&str; 8] = [
    "Salary",
    "Bonus",
    "Part-time",
    "Interest",
    "Gift",
    "Investment",
    "Freelance",
    "Other",
];

// ============================================================================
// INPUT SHAPES
// ============================================================================

/// Raw `POST /transactions` body. Everything is optional here; the
/// validator decides what is required and reports the first gap.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTransaction {
    pub date: Option<String>,
    #[serde(rename = "type")]
    pub tx_type: Option<String>,
    pub category: Option<String>,
    /// Number or numeric string; both are accepted.
    pub amount: Option<Value>,
    pub currency: Option<String>,
    pub account_id: Option<i64>,
    pub note: Option<String>,
}

/// Raw `POST /accounts` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewAccount {
    pub name: Option<String>,
    pub currency: Option<String>,
}

/// Raw `POST /exchange-rates` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewRate {
    pub from_currency: Option<String>,
    pub to_currency: Option<String>,
    pub rate: Option<Value>,
}

/// A transaction that passed every ingestion check, ready to insert.
#[derive(Debug, Clone)]
pub struct ValidTransaction {
    pub date: String,
    pub tx_type: TxType,
    pub category: String,
    pub amount: f64,
    pub currency: String,
    pub account_id: i64,
    pub note: String,
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Validate a transaction submission against the current store.
///
/// Returns the normalized transaction plus an optional advisory warning for
/// categories outside the curated suggestion list (never a rejection).
pub fn validate_transaction(
    conn: &Connection,
    input: &NewTransaction,
) -> LedgerResult<(ValidTransaction, Option<String>)> {
    let required: [(&'static str, bool); 5] = [
        ("date", input.date.is_some()),
        ("type", input.tx_type.is_some()),
        ("category", input.category.is_some()),
        ("amount", input.amount.is_some()),
        ("currency", input.currency.is_some()),
    ];
    for (field, present) in required {
        if !present {
            return Err(LedgerError::validation(field, format!("{field} is required")));
        }
    }

    let date = parse_date(input.date.as_deref().unwrap_or_default())?;

    let tx_type = TxType::parse(input.tx_type.as_deref().unwrap_or_default()).ok_or_else(|| {
        LedgerError::validation("type", "invalid type (allowed: expense, income, transfer)")
    })?;

    let category = input.category.clone().unwrap_or_default();

    let amount = parse_number(input.amount.as_ref().unwrap_or(&Value::Null))
        .filter(|a| a.is_finite() && *a > 0.0)
        .ok_or_else(|| {
            LedgerError::validation("amount", "Invalid amount; must be positive number")
        })?;

    let currency = normalize_currency(input.currency.as_deref().unwrap_or_default(), "currency")?;

    let account_id = match input.account_id {
        Some(id) => match db::get_account(conn, id)? {
            Some(account) => account.id,
            None => return Err(LedgerError::NotFound(format!("Account {id}"))),
        },
        None => match db::first_account(conn)? {
            Some(account) => account.id,
            None => return Err(LedgerError::validation("account_id", "No accounts found")),
        },
    };

    let note = input.note.clone().unwrap_or_default();

    let warning = category_warning(tx_type, &category);
    Ok((
        ValidTransaction {
            date,
            tx_type,
            category,
            amount,
            currency,
            account_id,
            note,
        },
        warning,
    ))
}

/// Validate an account submission; returns (name, currency).
pub fn validate_account(input: &NewAccount) -> LedgerResult<(String, String)> {
    let name = input
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| LedgerError::validation("name", "Account name is required"))?
        .to_string();
    let currency = normalize_currency(input.currency.as_deref().unwrap_or_default(), "currency")?;
    Ok((name, currency))
}

/// Validate a manual rate submission; returns (from, to, rate).
pub fn validate_rate(input: &NewRate) -> LedgerResult<(String, String, f64)> {
    let from = input.from_currency.as_deref().map(str::trim).unwrap_or_default();
    let to = input.to_currency.as_deref().map(str::trim).unwrap_or_default();
    if from.is_empty() || to.is_empty() || input.rate.is_none() {
        return Err(LedgerError::validation(
            "rate",
            "All fields are required (from_currency, to_currency, rate)",
        ));
    }

    let rate = parse_number(input.rate.as_ref().unwrap_or(&Value::Null))
        .filter(|r| r.is_finite() && *r > 0.0)
        .ok_or_else(|| LedgerError::validation("rate", "Invalid rate; must be positive number"))?;

    let from = currency::normalize(from).ok_or_else(|| {
        LedgerError::validation("from_currency", "Unsupported currency in from/to")
    })?;
    let to = currency::normalize(to).ok_or_else(|| {
        LedgerError::validation("to_currency", "Unsupported currency in from/to")
    })?;

    Ok((from, to, rate))
}

/// Advisory check: flags a category outside the curated list for its type.
/// Never rejects - free-text categories are accepted by design.
pub fn category_warning(tx_type: TxType, category: &str) -> Option<String> {
    let suggestions: &[&str] = match tx_type {
        TxType::Expense => &EXPENSE_CATEGORIES,
        TxType::Income => &INCOME_CATEGORIES,
        TxType::Transfer => return None,
    };
    if suggestions.contains(&category) {
        None
    } else {
        Some(format!(
            "category '{category}' is not a suggested {} category",
            tx_type.as_str()
        ))
    }
}

/// Strict `YYYY-MM-DD` calendar date; returns the normalized string.
fn parse_date(raw: &str) -> LedgerResult<String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| LedgerError::validation("date", "Date must be in YYYY-MM-DD format"))
}

/// JSON number, or a string holding one.
fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Empty currency falls back to the primary currency; anything else must be
/// in the supported set.
fn normalize_currency(raw: &str, field: &'static str) -> LedgerResult<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(PRIMARY_CURRENCY.to_string());
    }
    currency::normalize(raw).ok_or_else(|| {
        LedgerError::validation(
            field,
            format!("Unsupported currency: {}", raw.to_uppercase()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::setup_database(&conn).unwrap();
        conn
    }

    fn well_formed() -> NewTransaction {
        NewTransaction {
            date: Some("2024-03-01".to_string()),
            tx_type: Some("expense".to_string()),
            category: Some("Food".to_string()),
            amount: Some(json!(50)),
            currency: Some("CNY".to_string()),
            account_id: None,
            note: None,
        }
    }

    #[test]
    fn test_accepts_well_formed_transaction() {
        let conn = test_conn();
        let (valid, warning) = validate_transaction(&conn, &well_formed()).unwrap();
        assert_eq!(valid.date, "2024-03-01");
        assert_eq!(valid.tx_type, TxType::Expense);
        assert_eq!(valid.amount, 50.0);
        assert_eq!(valid.currency, "CNY");
        assert_eq!(valid.note, "");
        assert!(warning.is_none());
        // defaulted to the seeded account
        assert_eq!(valid.account_id, db::first_account(&conn).unwrap().unwrap().id);
    }

    #[test]
    fn test_missing_fields_report_first_gap() {
        let conn = test_conn();
        let err = validate_transaction(&conn, &NewTransaction::default()).unwrap_err();
        assert_eq!(err.field(), Some("date"));
        assert_eq!(err.to_string(), "date is required");

        // Presence is checked for every field before anything is parsed:
        // a malformed date does not mask a missing amount.
        let mut input = well_formed();
        input.date = Some("not-a-date".to_string());
        input.amount = None;
        let err = validate_transaction(&conn, &input).unwrap_err();
        assert_eq!(err.field(), Some("amount"));
    }

    #[test]
    fn test_rejects_malformed_dates() {
        let conn = test_conn();
        for bad in ["2024-13-01", "2024-02-30", "03/01/2024", "2024-3-1x"] {
            let mut input = well_formed();
            input.date = Some(bad.to_string());
            let err = validate_transaction(&conn, &input).unwrap_err();
            assert_eq!(err.to_string(), "Date must be in YYYY-MM-DD format", "{bad}");
        }
    }

    #[test]
    fn test_type_is_case_insensitive_and_trimmed() {
        let conn = test_conn();
        let mut input = well_formed();
        input.tx_type = Some("  INCOME ".to_string());
        let (valid, _) = validate_transaction(&conn, &input).unwrap();
        assert_eq!(valid.tx_type, TxType::Income);

        input.tx_type = Some("refund".to_string());
        let err = validate_transaction(&conn, &input).unwrap_err();
        assert_eq!(err.field(), Some("type"));
    }

    #[test]
    fn test_rejects_non_positive_amounts() {
        let conn = test_conn();
        for bad in [json!(0), json!(-5), json!("abc"), json!(null), json!([1])] {
            let mut input = well_formed();
            input.amount = Some(bad.clone());
            let err = validate_transaction(&conn, &input).unwrap_err();
            assert_eq!(
                err.to_string(),
                "Invalid amount; must be positive number",
                "{bad}"
            );
        }
    }

    #[test]
    fn test_amount_accepts_numeric_strings() {
        let conn = test_conn();
        let mut input = well_formed();
        input.amount = Some(json!("49.99"));
        let (valid, _) = validate_transaction(&conn, &input).unwrap();
        assert_eq!(valid.amount, 49.99);
    }

    #[test]
    fn test_currency_is_uppercased_and_checked() {
        let conn = test_conn();
        let mut input = well_formed();
        input.currency = Some("usd".to_string());
        let (valid, _) = validate_transaction(&conn, &input).unwrap();
        assert_eq!(valid.currency, "USD");

        input.currency = Some("XYZ".to_string());
        let err = validate_transaction(&conn, &input).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported currency: XYZ");

        // Empty currency falls back to the primary currency.
        input.currency = Some("".to_string());
        let (valid, _) = validate_transaction(&conn, &input).unwrap();
        assert_eq!(valid.currency, "CNY");
    }

    #[test]
    fn test_unknown_account_id_is_rejected() {
        let conn = test_conn();
        let mut input = well_formed();
        input.account_id = Some(999);
        let err = validate_transaction(&conn, &input).unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[test]
    fn test_no_accounts_at_all_fails() {
        let conn = Connection::open_in_memory().unwrap();
        db::setup_database(&conn).unwrap();
        conn.execute("DELETE FROM accounts", []).unwrap();

        let err = validate_transaction(&conn, &well_formed()).unwrap_err();
        assert_eq!(err.to_string(), "No accounts found");
    }

    #[test]
    fn test_category_outside_suggestions_warns_but_passes() {
        let conn = test_conn();
        let mut input = well_formed();
        input.category = Some("Llama grooming".to_string());
        let (valid, warning) = validate_transaction(&conn, &input).unwrap();
        assert_eq!(valid.category, "Llama grooming");
        assert!(warning.unwrap().contains("Llama grooming"));

        assert!(category_warning(TxType::Expense, "Food").is_none());
        assert!(category_warning(TxType::Income, "Salary").is_none());
        assert!(category_warning(TxType::Transfer, "whatever").is_none());
    }

    #[test]
    fn test_account_validation() {
        let (name, currency) = validate_account(&NewAccount {
            name: Some("  Savings  ".to_string()),
            currency: Some("eur".to_string()),
        })
        .unwrap();
        assert_eq!(name, "Savings");
        assert_eq!(currency, "EUR");

        let err = validate_account(&NewAccount {
            name: Some("   ".to_string()),
            currency: None,
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "Account name is required");

        // Missing currency defaults to the primary currency.
        let (_, currency) = validate_account(&NewAccount {
            name: Some("Cash".to_string()),
            currency: None,
        })
        .unwrap();
        assert_eq!(currency, "CNY");
    }

    #[test]
    fn test_rate_validation() {
        let (from, to, rate) = validate_rate(&NewRate {
            from_currency: Some("usd".to_string()),
            to_currency: Some("cny".to_string()),
            rate: Some(json!("7.25")),
        })
        .unwrap();
        assert_eq!((from.as_str(), to.as_str(), rate), ("USD", "CNY", 7.25));

        let err = validate_rate(&NewRate::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "All fields are required (from_currency, to_currency, rate)"
        );

        let err = validate_rate(&NewRate {
            from_currency: Some("USD".to_string()),
            to_currency: Some("CNY".to_string()),
            rate: Some(json!(0)),
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid rate; must be positive number");

        let err = validate_rate(&NewRate {
            from_currency: Some("USD".to_string()),
            to_currency: Some("XXX".to_string()),
            rate: Some(json!(1.5)),
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "Unsupported currency in from/to");
    }
}
