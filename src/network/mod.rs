//! Wallet / Network Service
//!
//! The opaque collaborator that reads accounts, pushes account changes and
//! signs + broadcasts transactions. The transfer core only depends on the
//! [`WalletNetwork`] trait; [`InMemoryNetwork`] is a self-contained cluster
//! used by the demo binary and the tests.

pub mod memory;

pub use memory::InMemoryNetwork;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::identity::Identity;
use crate::transfer::payload::TransferPayload;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Signing rejected: {0}")]
    Signing(String),

    #[error("Transaction rejected: {0}")]
    Rejected(String),

    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("Unknown subscription: {0}")]
    UnknownSubscription(SubscriptionId),
}

/// Ledger finality tier a read or subscription is served at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    /// Seen by the node, may still be rolled back
    Processed,
    /// Voted on by a supermajority
    #[default]
    Confirmed,
    /// Rooted, cannot be rolled back
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account state as reported by the network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountInfo {
    pub lamports: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// Live account-change feed
///
/// The receiver yields one [`AccountInfo`] per change until the listener is
/// removed.
#[derive(Debug)]
pub struct AccountChangeStream {
    pub id: SubscriptionId,
    pub receiver: mpsc::UnboundedReceiver<AccountInfo>,
}

/// Base-58 transaction signature returned by a successful broadcast
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionSignature(String);

impl TransactionSignature {
    pub fn from_bytes(bytes: &[u8; 64]) -> Self {
        Self(bs58::encode(bytes).into_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait WalletNetwork: Send + Sync {
    /// Current account state, `None` if the account does not exist
    async fn get_account_info(
        &self,
        identity: &Identity,
        commitment: Commitment,
    ) -> Result<Option<AccountInfo>, NetworkError>;

    /// Open a push subscription for changes to `identity`
    fn on_account_change(
        &self,
        identity: &Identity,
        commitment: Commitment,
    ) -> Result<AccountChangeStream, NetworkError>;

    /// Release a subscription opened by [`WalletNetwork::on_account_change`]
    fn remove_account_change_listener(&self, id: SubscriptionId) -> Result<(), NetworkError>;

    /// Sign with the connected wallet and broadcast
    ///
    /// Atomic from the caller's view: a signature or an error.
    async fn send_transaction(
        &self,
        payload: &TransferPayload,
    ) -> Result<TransactionSignature, NetworkError>;
}
