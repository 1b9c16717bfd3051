// fintrack CLI - initialize the store and inspect it from the terminal

use anyhow::{bail, Result};
use rusqlite::Connection;
use std::env;

use fintrack::{dashboard, db, monthly_report, setup_database};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("init") => run_init(),
        Some("report") => {
            let (Some(year), Some(month)) = (args.get(2), args.get(3)) else {
                bail!("usage: fintrack report <year> <month>");
            };
            run_report(year.parse()?, month.parse()?)
        }
        Some("dashboard") => run_dashboard(),
        _ => {
            println!("fintrack {}", fintrack::VERSION);
            println!();
            println!("Usage:");
            println!("  fintrack init                  create and seed the database");
            println!("  fintrack report <year> <month> print a monthly report");
            println!("  fintrack dashboard             print account balances and recent activity");
            println!();
            println!("Database path comes from FINTRACK_DB (default: finance.db).");
            Ok(())
        }
    }
}

fn open() -> Result<Connection> {
    let path = db::db_path();
    let conn = Connection::open(&path)?;
    setup_database(&conn)?;
    Ok(conn)
}

fn run_init() -> Result<()> {
    let path = db::db_path();
    let conn = Connection::open(&path)?;
    setup_database(&conn)?;

    let accounts = db::list_accounts(&conn)?;
    let rates = db::list_rates(&conn, None)?;
    println!("✓ Database ready: {}", path.display());
    println!("✓ Accounts: {}", accounts.len());
    println!("✓ Exchange rates on file: {}", rates.len());
    Ok(())
}

fn run_report(year: i32, month: u32) -> Result<()> {
    let conn = open()?;
    let report = monthly_report(&conn, year, month)?;

    println!("Monthly Report: {}-{:02}", report.year, report.month);
    println!("  Income total:  {:.2}", report.income_total);
    println!("  Expense total: {:.2}", report.expense_total);
    println!("  Net:           {:.2}", report.net);
    println!("  Transactions:  {}", report.transaction_count);
    if !report.expense_by_category.is_empty() {
        println!("  Expenses by category:");
        for (category, amount) in &report.expense_by_category {
            println!("    {category}: {amount:.2}");
        }
    }
    Ok(())
}

fn run_dashboard() -> Result<()> {
    let conn = open()?;
    let data = dashboard(&conn)?;

    println!("Accounts:");
    for entry in &data.accounts {
        println!(
            "  #{} {} ({}): {:.2}",
            entry.account.id, entry.account.name, entry.account.currency, entry.balance
        );
    }
    println!("Recent transactions:");
    for tx in &data.recent_transactions {
        println!(
            "  {} {:<8} {:<14} {:>10.2} {}",
            tx.date,
            tx.tx_type.as_str(),
            tx.category,
            tx.amount,
            tx.currency
        );
    }
    Ok(())
}
