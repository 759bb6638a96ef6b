//! sol_sender - Native Token Transfer Core
//!
//! Validates a recipient and an amount against the live wallet balance and
//! submits at most one transfer at a time.
//!
//! # Modules
//!
//! - [`identity`] - 32-byte account keys, base58 text, curve check
//! - [`money`] - whole-token `Decimal` ⇄ lamports
//! - [`network`] - wallet/network service trait + in-memory cluster
//! - [`balance`] - balance observer (fetch + push subscription)
//! - [`transfer`] - validators, payload, lifecycle state machine
//! - [`form`] - form binding and render model
//! - [`config`] / [`logging`] - YAML config and tracing setup

pub mod identity;
pub mod money;

pub mod balance;
pub mod network;
pub mod transfer;

pub mod form;

pub mod config;
pub mod logging;

// Convenient re-exports at crate root
pub use balance::{BalanceObserver, BalanceReader, BalanceSnapshot};
pub use config::AppConfig;
pub use form::{FormView, TransferForm};
pub use identity::Identity;
pub use network::{
    AccountInfo, Commitment, InMemoryNetwork, NetworkError, TransactionSignature, WalletNetwork,
};
pub use transfer::{
    AddressValidator, AmountPolicy, MachineConfig, TransferError, TransferPayload, TransferState,
    TransferStateMachine, ValidationError, ValidationResult,
};
