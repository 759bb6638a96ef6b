//! Transfer Types

use rust_decimal::Decimal;
use serde::Serialize;

use super::error::ValidationError;
use crate::identity::Identity;

/// Outcome of one validation pass
///
/// Always derived fresh from the current inputs; never stored and reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub reason: Option<ValidationError>,
}

impl ValidationResult {
    pub const fn ok() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub const fn fail(reason: ValidationError) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
        }
    }

    pub fn into_result(self) -> Result<(), ValidationError> {
        match self.reason {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }
}

impl From<Result<(), ValidationError>> for ValidationResult {
    fn from(r: Result<(), ValidationError>) -> Self {
        match r {
            Ok(()) => Self::ok(),
            Err(reason) => Self::fail(reason),
        }
    }
}

/// One submission attempt
///
/// Built from validated inputs right before SUBMITTING; a retry after an edit
/// builds a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferRequest {
    pub sender: Identity,
    pub recipient: Identity,
    /// Whole tokens as entered
    pub amount: Decimal,
    /// Balance the amount was checked against
    pub sender_balance: Decimal,
    /// Balance snapshot sequence the amount was checked against
    pub balance_as_of: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_result_conversions() {
        assert_eq!(ValidationResult::from(Ok(())), ValidationResult::ok());
        assert!(ValidationResult::ok().valid);

        let failed = ValidationResult::fail(ValidationError::OffCurve);
        assert!(!failed.valid);
        assert_eq!(failed.into_result(), Err(ValidationError::OffCurve));
    }
}
