//! CSV I/O - Load accounts and transfers from fixture files
//!
//! Formats (header line required, skipped):
//!
//! ```text
//! accounts.csv:   account_id,balance
//! transfers.csv:  from,to,amount
//! ```
//!
//! Blank lines and lines starting with `#` are ignored. Amounts are parsed
//! as exact decimals.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use rust_decimal::Decimal;

use crate::core_types::AccountId;
use crate::transfer::TransferRequest;

// ============================================================
// Constants for file paths
// ============================================================

pub const ACCOUNTS_CSV: &str = "fixtures/accounts.csv";
pub const TRANSFERS_CSV: &str = "fixtures/transfers.csv";

/// One row of `accounts.csv`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSeed {
    pub id: AccountId,
    pub balance: Decimal,
}

// ============================================================
// Loading
// ============================================================

pub fn load_accounts(path: impl AsRef<Path>) -> Result<Vec<AccountSeed>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    parse_accounts(BufReader::new(file))
        .with_context(|| format!("Failed to load accounts from {}", path.display()))
}

pub fn load_transfers(path: impl AsRef<Path>) -> Result<Vec<TransferRequest>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    parse_transfers(BufReader::new(file))
        .with_context(|| format!("Failed to load transfers from {}", path.display()))
}

pub fn parse_accounts(reader: impl BufRead) -> Result<Vec<AccountSeed>> {
    let mut seeds = Vec::new();
    for row in rows(reader) {
        let (line_no, line) = row?;
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() != 2 {
            bail!("Expected 2 columns at line {}, found {}", line_no, parts.len());
        }
        let balance = Decimal::from_str(parts[1])
            .with_context(|| format!("Invalid balance '{}' at line {}", parts[1], line_no))?;
        seeds.push(AccountSeed {
            id: AccountId::from(parts[0]),
            balance,
        });
    }
    Ok(seeds)
}

pub fn parse_transfers(reader: impl BufRead) -> Result<Vec<TransferRequest>> {
    let mut transfers = Vec::new();
    for row in rows(reader) {
        let (line_no, line) = row?;
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            bail!("Expected 3 columns at line {}, found {}", line_no, parts.len());
        }
        let amount = Decimal::from_str(parts[2])
            .with_context(|| format!("Invalid amount '{}' at line {}", parts[2], line_no))?;
        transfers.push(TransferRequest::new(parts[0], parts[1], amount));
    }
    Ok(transfers)
}

/// Data lines with their 1-based line numbers (header skipped)
fn rows(reader: impl BufRead) -> impl Iterator<Item = Result<(usize, String)>> {
    reader
        .lines()
        .enumerate()
        .skip(1)
        .filter_map(|(idx, line)| match line {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    None
                } else {
                    Some(Ok((idx + 1, trimmed.to_string())))
                }
            }
            Err(e) => Some(Err(
                anyhow::Error::new(e).context(format!("Read error at line {}", idx + 1))
            )),
        })
}
