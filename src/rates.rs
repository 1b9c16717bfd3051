// Conversion rate resolution
//
// Pure reads over the append-only rate log. "Latest" is a max-by-date scan
// with insertion (id) order breaking ties; there is no mutable "current
// rate" cell anywhere.

use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::currency::BRIDGE_CURRENCY;
use crate::error::LedgerResult;

/// Most recent quote for one direction of a pair, if any.
fn latest_rate(conn: &Connection, from: &str, to: &str) -> LedgerResult<Option<f64>> {
    let rate = conn
        .query_row(
            "SELECT rate FROM exchange_rates
             WHERE from_currency = ?1 AND to_currency = ?2
             ORDER BY date DESC, id DESC LIMIT 1",
            [from, to],
            |row| row.get(0),
        )
        .optional()?;
    Ok(rate)
}

/// Resolve the multiplier converting one unit of `from` into `to`.
///
/// Lookup order: identity, latest direct quote, reciprocal of the latest
/// reverse quote, USD-bridged product of `from`→USD and USD→`to`. When
/// nothing matches, 1.0 is returned as a last-resort approximation - a
/// documented fallback, not an error.
///
/// Pure function of current store contents; resolves fresh on every call.
pub fn resolve(conn: &Connection, from: &str, to: &str) -> LedgerResult<f64> {
    if from == to {
        return Ok(1.0);
    }

    if let Some(rate) = latest_rate(conn, from, to)? {
        return Ok(rate);
    }

    if let Some(reverse) = latest_rate(conn, to, from)? {
        if reverse != 0.0 {
            return Ok(1.0 / reverse);
        }
    }

    if from != BRIDGE_CURRENCY && to != BRIDGE_CURRENCY {
        let to_bridge = latest_rate(conn, from, BRIDGE_CURRENCY)?;
        let from_bridge = latest_rate(conn, BRIDGE_CURRENCY, to)?;
        if let (Some(x), Some(y)) = (to_bridge, from_bridge) {
            if x != 0.0 && y != 0.0 {
                return Ok(x * y);
            }
        }
    }

    debug!(from, to, "no usable quote, falling back to 1.0");
    Ok(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, RateSource};

    /// Store with the schema but none of the bootstrap quotes, so each test
    /// controls exactly which rates exist.
    fn bare_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::setup_database(&conn).unwrap();
        conn.execute("DELETE FROM exchange_rates", []).unwrap();
        conn
    }

    fn rate(conn: &Connection, from: &str, to: &str, value: f64, date: &str) {
        db::record_rate(conn, from, to, value, date, RateSource::Manual).unwrap();
    }

    #[test]
    fn test_same_currency_is_identity() {
        let conn = bare_conn();
        for code in crate::currency::SUPPORTED_CURRENCIES {
            assert_eq!(resolve(&conn, code, code).unwrap(), 1.0);
        }
    }

    #[test]
    fn test_direct_quote_wins_and_newest_is_used() {
        let conn = bare_conn();
        rate(&conn, "USD", "CNY", 7.0, "2024-01-01");
        rate(&conn, "USD", "CNY", 7.3, "2024-02-01");
        rate(&conn, "CNY", "USD", 0.5, "2024-03-01"); // reverse must not shadow direct

        assert_eq!(resolve(&conn, "USD", "CNY").unwrap(), 7.3);
    }

    #[test]
    fn test_same_date_ties_break_by_insertion_order() {
        let conn = bare_conn();
        rate(&conn, "USD", "CNY", 7.1, "2024-02-01");
        rate(&conn, "USD", "CNY", 7.2, "2024-02-01");

        assert_eq!(resolve(&conn, "USD", "CNY").unwrap(), 7.2);
    }

    #[test]
    fn test_reverse_quote_is_inverted() {
        let conn = bare_conn();
        rate(&conn, "CNY", "USD", 4.0, "2024-01-01");

        assert_eq!(resolve(&conn, "USD", "CNY").unwrap(), 0.25);
    }

    #[test]
    fn test_bridges_through_usd() {
        let conn = bare_conn();
        rate(&conn, "CNY", "USD", 0.14, "2024-01-01");
        rate(&conn, "USD", "JPY", 150.0, "2024-01-01");

        let resolved = resolve(&conn, "CNY", "JPY").unwrap();
        assert!((resolved - 0.14 * 150.0).abs() < 1e-12);
    }

    #[test]
    fn test_falls_back_to_one() {
        let conn = bare_conn();
        assert_eq!(resolve(&conn, "GBP", "JPY").unwrap(), 1.0);
        // A USD endpoint never bridges through itself.
        assert_eq!(resolve(&conn, "USD", "JPY").unwrap(), 1.0);
    }

    #[test]
    fn test_resolution_does_not_mutate_the_store() {
        let conn = bare_conn();
        rate(&conn, "USD", "CNY", 7.2, "2024-01-01");

        let before: i64 = conn
            .query_row("SELECT COUNT(*) FROM exchange_rates", [], |r| r.get(0))
            .unwrap();
        let a = resolve(&conn, "USD", "CNY").unwrap();
        let b = resolve(&conn, "USD", "CNY").unwrap();
        let after: i64 = conn
            .query_row("SELECT COUNT(*) FROM exchange_rates", [], |r| r.get(0))
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(before, after);
    }
}
