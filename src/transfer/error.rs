//! Transfer Error Types
//!
//! Validation errors are local and recoverable: the form shows them and the
//! user fixes the input. Only [`TransferError::SubmissionFailure`] comes back
//! from the network.

use thiserror::Error;

use super::state::TransferState;
use crate::money::MoneyError;
use crate::network::NetworkError;

/// Reason a recipient or amount was refused
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationError {
    // === Address ===
    #[error("Recipient is not a valid base58 account address")]
    MalformedAddress,

    #[error("Recipient is the connected wallet itself")]
    SelfTransfer,

    #[error("Recipient is not an ed25519 curve point")]
    OffCurve,

    // === Amount ===
    #[error("Amount is below the minimum transfer")]
    BelowMinimum,

    #[error("Insufficient funds")]
    InsufficientFunds,
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MalformedAddress => "MALFORMED_ADDRESS",
            ValidationError::SelfTransfer => "SELF_TRANSFER",
            ValidationError::OffCurve => "OFF_CURVE",
            ValidationError::BelowMinimum => "BELOW_MINIMUM",
            ValidationError::InsufficientFunds => "INSUFFICIENT_FUNDS",
        }
    }

    pub fn is_address_error(&self) -> bool {
        matches!(
            self,
            ValidationError::MalformedAddress
                | ValidationError::SelfTransfer
                | ValidationError::OffCurve
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid amount format: {0}")]
    InvalidAmountFormat(String),

    #[error("Amount cannot be represented in lamports")]
    AmountOverflow,

    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error("Transfer is not ready (state {0})")]
    NotReady(TransferState),

    #[error("A transfer is already being submitted")]
    SubmissionInFlight,

    #[error("Transaction failed: {0}")]
    SubmissionFailure(String),
}

impl TransferError {
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::Validation(v) => v.code(),
            TransferError::InvalidAmountFormat(_) => "INVALID_AMOUNT_FORMAT",
            TransferError::AmountOverflow => "AMOUNT_OVERFLOW",
            TransferError::WalletNotConnected => "WALLET_NOT_CONNECTED",
            TransferError::NotReady(_) => "NOT_READY",
            TransferError::SubmissionInFlight => "SUBMISSION_IN_FLIGHT",
            TransferError::SubmissionFailure(_) => "SUBMISSION_FAILURE",
        }
    }

    pub fn validation(&self) -> Option<ValidationError> {
        match self {
            TransferError::Validation(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<NetworkError> for TransferError {
    fn from(e: NetworkError) -> Self {
        TransferError::SubmissionFailure(e.to_string())
    }
}

impl From<MoneyError> for TransferError {
    fn from(e: MoneyError) -> Self {
        match e {
            MoneyError::InvalidFormat(s) => TransferError::InvalidAmountFormat(s),
            MoneyError::Negative => TransferError::Validation(ValidationError::InsufficientFunds),
            MoneyError::Overflow => TransferError::AmountOverflow,
        }
    }
}
