// Background refresh of exchange rates from an external source
//
// Fire-and-forget: the HTTP trigger returns 202 immediately and the fetch
// runs as a detached task. Failures are logged and absorbed - they never
// reach a caller, and rows are only appended after a successful fetch, so a
// failed refresh leaves every existing quote untouched.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Local;
use rusqlite::Connection;
use serde::Deserialize;
use tracing::{error, info};

use crate::currency::{BRIDGE_CURRENCY, SUPPORTED_CURRENCIES};
use crate::db::{self, RateSource};
use crate::error::{LedgerError, LedgerResult};

/// Default external quote source; `{base}/v4/latest/USD` returns USD-based
/// rates for every major currency.
pub const DEFAULT_RATE_SOURCE_URL: &str = "https://api.exchangerate-api.com";

/// Bound on the external call; the refresh must never hang a worker.
const FETCH_TIMEOUT: Duration = Duration::from_secs(12);

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

/// Fetch USD-based quotes from `base_url` and append one `USD -> code` row
/// per supported currency found in the response, dated today and tagged
/// `api`. Returns how many rows were appended.
pub async fn refresh_rates(base_url: &str, db: Arc<Mutex<Connection>>) -> LedgerResult<usize> {
    let client = reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| LedgerError::External(e.to_string()))?;

    let url = format!("{base_url}/v4/latest/{BRIDGE_CURRENCY}");
    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| LedgerError::External(format!("request to {url} failed: {e}")))?;

    if !response.status().is_success() {
        return Err(LedgerError::External(format!(
            "HTTP {} from {url}",
            response.status()
        )));
    }

    let data: RatesResponse = response
        .json()
        .await
        .map_err(|e| LedgerError::External(format!("bad payload from {url}: {e}")))?;

    let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
    let conn = db.lock().unwrap();
    let mut inserted = 0;
    for code in SUPPORTED_CURRENCIES {
        if code == BRIDGE_CURRENCY {
            continue;
        }
        if let Some(&rate) = data.rates.get(code) {
            if rate > 0.0 {
                db::record_rate(&conn, BRIDGE_CURRENCY, code, rate, &today, RateSource::Api)?;
                inserted += 1;
            }
        }
    }
    Ok(inserted)
}

/// Run one refresh and log the outcome instead of returning it. This is the
/// body of the detached task spawned by the update trigger; nothing here
/// can propagate to the request that started it.
pub async fn refresh_and_log(base_url: String, db: Arc<Mutex<Connection>>) {
    match refresh_rates(&base_url, db).await {
        Ok(inserted) => info!(inserted, "exchange rate refresh complete"),
        Err(e) => error!(error = %e, "exchange rate refresh failed"),
    }
}
