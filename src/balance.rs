// Account balance aggregation

use rusqlite::Connection;

use crate::db::{self, Account, TxType};
use crate::error::LedgerResult;
use crate::rates;

/// Sum every transaction of `account`, converted into the account currency
/// through the rate resolver.
///
/// Expense subtracts; income and transfer add. A transfer is a single
/// additive leg - the offsetting side is deliberately not modeled.
/// Accumulation runs at full precision; round with [`round2`] only for
/// presentation.
pub fn compute_balance(conn: &Connection, account: &Account) -> LedgerResult<f64> {
    let mut balance = 0.0;
    for (tx_type, amount, currency) in db::account_entries(conn, account.id)? {
        let rate = rates::resolve(conn, &currency, &account.currency)?;
        let converted = amount * rate;
        match tx_type {
            TxType::Expense => balance -= converted,
            TxType::Income | TxType::Transfer => balance += converted,
        }
    }
    Ok(balance)
}

/// Round to 2 decimal places for presentation.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
