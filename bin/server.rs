// fintrack - HTTP JSON API server

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use fintrack::{dashboard, db, refresh, report, validate, LedgerError};
use fintrack::db::{RateSource, TransactionFilter};
use fintrack::report::DocumentRenderer;

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
    rate_source_url: String,
}

// ============================================================================
// Error mapping
// ============================================================================

/// Maps the error taxonomy onto HTTP statuses with an `{error}` body.
struct ApiError(LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            LedgerError::Validation { .. } => StatusCode::BAD_REQUEST,
            LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::External(_) | LedgerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            warn!(error = %self.0, "request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// API Handlers
// ============================================================================

/// GET /health - Health check
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": fintrack::VERSION }))
}

/// GET /accounts - All accounts, ordered by name
async fn get_accounts(State(state): State<AppState>) -> ApiResult<Json<Vec<db::Account>>> {
    let conn = state.db.lock().unwrap();
    Ok(Json(db::list_accounts(&conn)?))
}

/// POST /accounts - Create an account
async fn add_account(
    State(state): State<AppState>,
    Json(input): Json<validate::NewAccount>,
) -> ApiResult<Json<serde_json::Value>> {
    let (name, currency) = validate::validate_account(&input)?;
    let conn = state.db.lock().unwrap();
    let account = db::create_account(&conn, &name, &currency)?;
    Ok(Json(json!({
        "id": account.id,
        "name": account.name,
        "currency": account.currency,
    })))
}

#[derive(Debug, Default, Deserialize)]
struct TransactionsQuery {
    limit: Option<i64>,
    account_id: Option<i64>,
    year: Option<i32>,
    month: Option<u32>,
}

/// GET /transactions - Filterable listing, joined with account names
async fn get_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionsQuery>,
) -> ApiResult<Json<Vec<db::TransactionRecord>>> {
    let filter = TransactionFilter {
        limit: query.limit,
        account_id: query.account_id,
        year: query.year,
        month: query.month,
    };
    let conn = state.db.lock().unwrap();
    Ok(Json(db::list_transactions(&conn, &filter)?))
}

/// POST /transactions - Validate and record a transaction
async fn add_transaction(
    State(state): State<AppState>,
    Json(input): Json<validate::NewTransaction>,
) -> ApiResult<Json<serde_json::Value>> {
    let conn = state.db.lock().unwrap();
    let (valid, warning) = validate::validate_transaction(&conn, &input)?;
    if let Some(warning) = &warning {
        // Advisory only: free-text categories are accepted.
        warn!(%warning, "transaction accepted outside the suggested categories");
    }
    let id = db::insert_transaction(&conn, &valid)?;
    Ok(Json(json!({
        "id": id,
        "message": "Transaction added successfully",
    })))
}

#[derive(Debug, Default, Deserialize)]
struct RatesQuery {
    limit: Option<i64>,
}

/// GET /exchange-rates - Rate history, newest first
async fn get_rates(
    State(state): State<AppState>,
    Query(query): Query<RatesQuery>,
) -> ApiResult<Json<Vec<db::ExchangeRate>>> {
    let conn = state.db.lock().unwrap();
    Ok(Json(db::list_rates(&conn, query.limit)?))
}

/// POST /exchange-rates - Record a manual rate, dated today
async fn add_rate(
    State(state): State<AppState>,
    Json(input): Json<validate::NewRate>,
) -> ApiResult<Json<serde_json::Value>> {
    let (from, to, rate) = validate::validate_rate(&input)?;
    let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
    let conn = state.db.lock().unwrap();
    db::record_rate(&conn, &from, &to, rate, &today, RateSource::Manual)?;
    Ok(Json(json!({ "message": "Exchange rate added successfully" })))
}

/// POST /exchange-rates/update - Trigger the background refresh
///
/// Returns 202 immediately; the fetch runs as a detached task and its
/// outcome only shows up in the logs and (on success) as appended rows.
async fn update_rates(State(state): State<AppState>) -> impl IntoResponse {
    tokio::spawn(refresh::refresh_and_log(
        state.rate_source_url.clone(),
        state.db.clone(),
    ));
    (
        StatusCode::ACCEPTED,
        Json(json!({ "message": "Exchange rates update started (background)" })),
    )
}

/// GET /dashboard - Month summary, recent activity, converted balances
async fn get_dashboard(State(state): State<AppState>) -> ApiResult<Json<dashboard::DashboardData>> {
    let conn = state.db.lock().unwrap();
    Ok(Json(dashboard::dashboard(&conn)?))
}

/// GET /reports/monthly/:year/:month - Monthly report JSON
async fn get_monthly_report(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
) -> ApiResult<Json<report::MonthlyReport>> {
    let conn = state.db.lock().unwrap();
    Ok(Json(report::monthly_report(&conn, year, month)?))
}

/// GET /reports/monthly/:year/:month/pdf - Downloadable paginated document
async fn get_monthly_report_download(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
) -> ApiResult<Response> {
    let conn = state.db.lock().unwrap();
    let monthly = report::monthly_report(&conn, year, month)?;
    drop(conn);

    let document = report::build_document(&monthly);
    let renderer = report::TextRenderer;
    let body = renderer.render(&document);
    let filename = format!(
        "monthly_report_{year}_{month:02}.{}",
        renderer.file_extension()
    );
    Ok((
        [
            (header::CONTENT_TYPE, renderer.media_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response())
}

// ============================================================================
// Main Server
// ============================================================================

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/accounts", get(get_accounts).post(add_account))
        .route("/transactions", get(get_transactions).post(add_transaction))
        .route("/exchange-rates", get(get_rates).post(add_rate))
        .route("/exchange-rates/update", post(update_rates))
        .route("/dashboard", get(get_dashboard))
        .route("/reports/monthly/:year/:month", get(get_monthly_report))
        .route(
            "/reports/monthly/:year/:month/pdf",
            get(get_monthly_report_download),
        )
        .nest_service("/static", ServeDir::new("web"))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Open database and make sure the schema and seed data exist
    let db_path = db::db_path();
    let conn = Connection::open(&db_path).expect("Failed to open database");
    db::setup_database(&conn).expect("Failed to initialize database");
    println!("✓ Database ready: {}", db_path.display());

    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
        rate_source_url: std::env::var("FINTRACK_RATE_URL")
            .unwrap_or_else(|_| refresh::DEFAULT_RATE_SOURCE_URL.to_string()),
    };

    let addr = std::env::var("FINTRACK_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    println!("🚀 fintrack server running on http://{addr}");
    println!("   Try: http://{addr}/dashboard");

    axum::serve(listener, router(state))
        .await
        .expect("Failed to start server");
}
