//! Recipient and Amount Validation
//!
//! Both validators are pure: no I/O, no state, same answer for the same
//! inputs. The state machine runs them on "verify" and again right before
//! submitting.

use std::str::FromStr;

use rust_decimal::Decimal;

use super::error::ValidationError;
use super::types::ValidationResult;
use crate::identity::Identity;

/// Recipient address rules
///
/// Order: parse → not the sender → on curve.
pub struct AddressValidator;

impl AddressValidator {
    pub fn validate(candidate: &str, sender: Option<&Identity>) -> ValidationResult {
        Self::parse(candidate, sender).map(|_| ()).into()
    }

    /// Same rules, returning the parsed recipient on success
    pub fn parse(candidate: &str, sender: Option<&Identity>) -> Result<Identity, ValidationError> {
        let recipient =
            Identity::from_str(candidate).map_err(|_| ValidationError::MalformedAddress)?;

        if sender == Some(&recipient) {
            return Err(ValidationError::SelfTransfer);
        }

        if !recipient.is_on_curve() {
            return Err(ValidationError::OffCurve);
        }

        Ok(recipient)
    }
}

/// Amount bounds
///
/// Does not reserve anything: the balance can move before submission.
pub struct AmountPolicy;

impl AmountPolicy {
    pub fn validate(amount: Decimal, balance: Decimal, min_transfer: Decimal) -> ValidationResult {
        Self::check(amount, balance, min_transfer).into()
    }

    pub fn check(
        amount: Decimal,
        balance: Decimal,
        min_transfer: Decimal,
    ) -> Result<(), ValidationError> {
        if amount <= Decimal::ZERO {
            return Err(ValidationError::InsufficientFunds);
        }

        if amount < min_transfer {
            return Err(ValidationError::BelowMinimum);
        }

        if amount > balance {
            return Err(ValidationError::InsufficientFunds);
        }

        Ok(())
    }
}
