//! Money Conversion Module
//!
//! Conversion between whole-token `Decimal` amounts (what the user types and
//! sees) and integer lamports (what the ledger stores and transfers).
//!
//! ## Internal Representation
//! - Ledger amounts are `u64` lamports
//! - 1 SOL = 10^9 lamports
//! - Whole-token → lamports conversion TRUNCATES toward zero, so a transfer
//!   never moves a fractional lamport more than the user asked for
//!
//! ## Usage
//! ```rust
//! use sol_sender::money::{parse_sol, sol_to_lamports};
//!
//! let amount = parse_sol("1.5").unwrap();
//! assert_eq!(sol_to_lamports(amount).unwrap(), 1_500_000_000);
//! ```

use std::str::FromStr;

use rust_decimal::prelude::*;
use thiserror::Error;

/// Lamports per whole token
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Decimal places of the base unit
pub const SOL_DECIMALS: u32 = 9;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Amount must not be negative")]
    Negative,

    #[error("Amount too large, would overflow")]
    Overflow,
}

// ============================================================================
// Parse: Client → Decimal
// ============================================================================

/// Parse user-entered whole-token text
///
/// Sign and zero are NOT rejected here; amount bounds belong to the
/// amount policy so that every bound violation reports the same error kind.
pub fn parse_sol(amount_str: &str) -> Result<Decimal, MoneyError> {
    let amount_str = amount_str.trim();
    if amount_str.is_empty() {
        return Err(MoneyError::InvalidFormat("empty string".into()));
    }

    if amount_str
        .chars()
        .any(|c| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
    {
        return Err(MoneyError::InvalidFormat(format!(
            "invalid character in amount: {}",
            amount_str
        )));
    }

    // Decimal keeps at most 28 fractional digits and rounds the rest, which
    // could round up past the balance. Cut to lamport precision as text first.
    let amount_str = match amount_str.split_once('.') {
        Some((whole, fraction)) => {
            if !fraction.chars().all(|c| c.is_ascii_digit()) {
                return Err(MoneyError::InvalidFormat(format!(
                    "invalid fractional part in amount: {}",
                    amount_str
                )));
            }
            let has_whole_digits = whole.chars().any(|c| c.is_ascii_digit());
            if !has_whole_digits && fraction.is_empty() {
                return Err(MoneyError::InvalidFormat(format!(
                    "no digits in amount: {}",
                    amount_str
                )));
            }
            let whole = if has_whole_digits {
                whole.to_string()
            } else {
                format!("{}0", whole)
            };
            let keep = fraction.len().min(SOL_DECIMALS as usize);
            if keep == 0 {
                whole
            } else {
                format!("{}.{}", whole, &fraction[..keep])
            }
        }
        None => amount_str.to_string(),
    };

    Decimal::from_str(&amount_str).map_err(|e| MoneyError::InvalidFormat(e.to_string()))
}

// ============================================================================
// Convert: Decimal ⇄ lamports
// ============================================================================

/// Whole tokens → lamports, truncated toward zero
pub fn sol_to_lamports(amount: Decimal) -> Result<u64, MoneyError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(MoneyError::Negative);
    }

    let scaled = amount
        .checked_mul(Decimal::from(LAMPORTS_PER_SOL))
        .ok_or(MoneyError::Overflow)?;

    scaled.trunc().to_u64().ok_or(MoneyError::Overflow)
}

/// Lamports → whole tokens (exact)
pub fn lamports_to_sol(lamports: u64) -> Decimal {
    Decimal::from(lamports) / Decimal::from(LAMPORTS_PER_SOL)
}

// ============================================================================
// Format: Decimal → display string
// ============================================================================

/// Display form without trailing zeros, e.g. `1.5`, `2`, `0.000000001`
pub fn format_sol(amount: Decimal) -> String {
    amount.normalize().to_string()
}

/// Display form for a lamport balance with a fixed number of decimals
pub fn format_lamports(lamports: u64, display_decimals: u32) -> String {
    format!(
        "{:.prec$}",
        lamports_to_sol(lamports),
        prec = display_decimals as usize
    )
}
