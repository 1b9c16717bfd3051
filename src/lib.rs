// fintrack - personal finance tracker core
// Exposes all modules for use in the CLI, the API server, and tests

pub mod balance;
pub mod currency;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod rates;
pub mod refresh;
pub mod report;
pub mod validate;

// Re-export commonly used types
pub use balance::{compute_balance, round2};
pub use currency::{BRIDGE_CURRENCY, PRIMARY_CURRENCY, SUPPORTED_CURRENCIES};
pub use dashboard::{dashboard, DashboardData};
pub use db::{
    create_account, db_path, first_account, get_account, insert_transaction, list_accounts,
    list_rates, list_transactions, record_rate, setup_database, Account, ExchangeRate,
    RateSource, TransactionFilter, TransactionRecord, TxType,
};
pub use error::{LedgerError, LedgerResult};
pub use rates::resolve;
pub use refresh::{refresh_and_log, refresh_rates, DEFAULT_RATE_SOURCE_URL};
pub use report::{
    build_document, monthly_report, DocumentRenderer, MonthlyReport, ReportDocument, ReportPage,
    TextRenderer,
};
pub use validate::{
    validate_account, validate_rate, validate_transaction, NewAccount, NewRate, NewTransaction,
    ValidTransaction,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
