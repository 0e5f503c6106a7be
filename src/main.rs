//! Ledger batch runner
//!
//! ```text
//! ┌──────────────┐    ┌──────────┐    ┌────────────┐    ┌──────────┐
//! │ accounts.csv │───▶│  Ledger  │◀───│ worker × N │◀───│ transfers│
//! └──────────────┘    └──────────┘    └────────────┘    └──────────┘
//!                          │
//!                          ▼
//!                  snapshot + conservation check
//! ```
//!
//! Usage: `ledger [-e ENV] [--accounts PATH] [--transfers PATH] [--workers N] [--json]`

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{error, info};

use pairwise_ledger::config::AppConfig;
use pairwise_ledger::csv_io::{ACCOUNTS_CSV, TRANSFERS_CSV, load_accounts, load_transfers};
use pairwise_ledger::error::LedgerError;
use pairwise_ledger::ledger::{Ledger, LedgerSnapshot};
use pairwise_ledger::logging::init_logging;
use pairwise_ledger::runner::{BatchReport, run_batch};
use pairwise_ledger::transfer::TransferStatsSnapshot;

const EXIT_CONSERVATION_VIOLATED: u8 = 1;
const EXIT_CONFIG: u8 = 78;

// ============================================================
// ARGUMENTS
// ============================================================

fn get_arg(names: &[&str]) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if names.contains(&args[i].as_str()) && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

fn has_flag(name: &str) -> bool {
    std::env::args().any(|a| a == name)
}

fn get_env() -> String {
    get_arg(&["--env", "-e"]).unwrap_or_else(|| "dev".to_string())
}

// ============================================================
// OUTPUT
// ============================================================

#[derive(Serialize)]
struct RunSummary<'a> {
    batch: &'a BatchReport,
    stats: TransferStatsSnapshot,
    snapshot: &'a LedgerSnapshot,
    conserved: bool,
}

fn print_text(summary: &RunSummary<'_>) {
    println!("=== Final balances ===");
    for (id, balance) in &summary.snapshot.balances {
        println!("{:<16} {:>20}", id, balance);
    }
    println!("{:<16} {:>20}", "TOTAL", summary.snapshot.total);
    println!();
    println!("{}", summary.batch);
    println!("{}", summary.stats);
    println!(
        "Conservation: {}",
        if summary.conserved { "OK" } else { "VIOLATED" }
    );
}

// ============================================================
// MAIN
// ============================================================

fn run(config: &AppConfig) -> Result<ExitCode> {
    let accounts_path = get_arg(&["--accounts"]).unwrap_or_else(|| ACCOUNTS_CSV.to_string());
    let transfers_path = get_arg(&["--transfers"]).unwrap_or_else(|| TRANSFERS_CSV.to_string());
    let workers = match get_arg(&["--workers"]) {
        Some(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("Invalid --workers value '{}'", raw))?,
        None => config.ledger.workers,
    };

    let seeds = load_accounts(&accounts_path)?;
    let transfers = load_transfers(&transfers_path)?;
    info!(
        accounts = seeds.len(),
        transfers = transfers.len(),
        accounts_path = %accounts_path,
        transfers_path = %transfers_path,
        "Inputs loaded"
    );

    let ledger = Arc::new(Ledger::from_config(&config.ledger)?);
    for seed in seeds {
        let id = seed.id.clone();
        ledger
            .create_account(seed.id, Some(seed.balance))
            .with_context(|| format!("Failed to create account {}", id))?;
    }

    let initial_total = ledger.snapshot()?.total;
    let report = run_batch(&ledger, transfers, workers)?;
    ledger.shutdown();

    let snapshot = ledger.snapshot()?;
    let conserved = snapshot.total == initial_total;
    let summary = RunSummary {
        batch: &report,
        stats: ledger.stats(),
        snapshot: &snapshot,
        conserved,
    };

    if has_flag("--json") {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
        );
    } else {
        print_text(&summary);
    }

    if !conserved {
        error!(
            initial_total = %initial_total,
            final_total = %snapshot.total,
            "Total balance changed during batch"
        );
        return Ok(ExitCode::from(EXIT_CONSERVATION_VIOLATED));
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let env = get_env();
    let config = match AppConfig::load(&env) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    let _guard = init_logging(&config);
    info!(env = %env, "Ledger runner starting");

    match run(&config) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            let code = e
                .downcast_ref::<LedgerError>()
                .map(LedgerError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}
