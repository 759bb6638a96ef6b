//! In-Memory Cluster
//!
//! Single-process stand-in for an RPC node plus a connected wallet. Balances
//! live in a map, subscriptions are unbounded channels and the wallet signs
//! with a local ed25519 key.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{
    AccountChangeStream, AccountInfo, Commitment, NetworkError, SubscriptionId,
    TransactionSignature, WalletNetwork,
};
use crate::identity::Identity;
use crate::transfer::payload::TransferPayload;

struct Listener {
    identity: Identity,
    tx: mpsc::UnboundedSender<AccountInfo>,
}

pub struct InMemoryNetwork {
    wallet: SigningKey,
    accounts: Mutex<HashMap<Identity, u64>>,
    listeners: Mutex<HashMap<SubscriptionId, Listener>>,
    next_subscription: AtomicU64,
    send_count: AtomicUsize,
    /// Failure injection
    fail_next_send: Mutex<Option<NetworkError>>,
    fail_fetch: Mutex<bool>,
    fail_subscribe: Mutex<bool>,
    send_delay: Mutex<Duration>,
    fetch_delay: Mutex<Duration>,
}

impl InMemoryNetwork {
    /// Cluster whose connected wallet signs with `wallet`
    pub fn new(wallet: SigningKey) -> Self {
        Self {
            wallet,
            accounts: Mutex::new(HashMap::new()),
            listeners: Mutex::new(HashMap::new()),
            next_subscription: AtomicU64::new(1),
            send_count: AtomicUsize::new(0),
            fail_next_send: Mutex::new(None),
            fail_fetch: Mutex::new(false),
            fail_subscribe: Mutex::new(false),
            send_delay: Mutex::new(Duration::ZERO),
            fetch_delay: Mutex::new(Duration::ZERO),
        }
    }

    /// Cluster with a freshly generated wallet key
    pub fn with_random_wallet() -> Self {
        Self::new(SigningKey::generate(&mut rand::rngs::OsRng))
    }

    /// Identity of the connected wallet
    pub fn wallet_identity(&self) -> Identity {
        Identity::from(self.wallet.verifying_key())
    }

    /// Set an account balance (airdrop / faucet) and notify listeners
    pub fn set_balance(&self, identity: Identity, lamports: u64) {
        lock(&self.accounts).insert(identity, lamports);
        self.notify(&identity, lamports);
    }

    pub fn balance(&self, identity: &Identity) -> Option<u64> {
        lock(&self.accounts).get(identity).copied()
    }

    pub fn fail_next_send(&self, error: NetworkError) {
        *lock(&self.fail_next_send) = Some(error);
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        *lock(&self.fail_fetch) = fail;
    }

    pub fn set_fail_subscribe(&self, fail: bool) {
        *lock(&self.fail_subscribe) = fail;
    }

    pub fn set_send_delay(&self, delay: Duration) {
        *lock(&self.send_delay) = delay;
    }

    /// Delay between reading an account and answering the fetch
    pub fn set_fetch_delay(&self, delay: Duration) {
        *lock(&self.fetch_delay) = delay;
    }

    /// Number of `send_transaction` calls received
    pub fn send_count(&self) -> usize {
        self.send_count.load(Ordering::SeqCst)
    }

    pub fn active_subscriptions(&self) -> usize {
        lock(&self.listeners).len()
    }

    fn notify(&self, identity: &Identity, lamports: u64) {
        let listeners = lock(&self.listeners);
        for (id, listener) in listeners.iter() {
            if listener.identity == *identity
                && listener.tx.send(AccountInfo { lamports }).is_err()
            {
                debug!(subscription = %id, "Listener receiver dropped");
            }
        }
    }

    fn apply_transfer(&self, payload: &TransferPayload) -> Result<(u64, u64), NetworkError> {
        let mut accounts = lock(&self.accounts);

        let from_balance = accounts.get(&payload.from).copied().unwrap_or(0);
        if from_balance < payload.lamports {
            return Err(NetworkError::Rejected(format!(
                "insufficient lamports {}, need {}",
                from_balance, payload.lamports
            )));
        }

        let from_after = from_balance - payload.lamports;
        if payload.to == payload.from {
            accounts.insert(payload.from, from_after);
            return Ok((from_after, from_after));
        }

        // Both sides are checked before either balance is written
        let to_after = accounts
            .get(&payload.to)
            .copied()
            .unwrap_or(0)
            .checked_add(payload.lamports)
            .ok_or_else(|| NetworkError::Rejected("recipient balance overflow".into()))?;

        accounts.insert(payload.from, from_after);
        accounts.insert(payload.to, to_after);

        Ok((from_after, to_after))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl WalletNetwork for InMemoryNetwork {
    async fn get_account_info(
        &self,
        identity: &Identity,
        commitment: Commitment,
    ) -> Result<Option<AccountInfo>, NetworkError> {
        if *lock(&self.fail_fetch) {
            return Err(NetworkError::Rpc("getAccountInfo unavailable".into()));
        }

        debug!(%identity, %commitment, "getAccountInfo");
        let info = self
            .balance(identity)
            .map(|lamports| AccountInfo { lamports });

        let delay = *lock(&self.fetch_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(info)
    }

    fn on_account_change(
        &self,
        identity: &Identity,
        commitment: Commitment,
    ) -> Result<AccountChangeStream, NetworkError> {
        if *lock(&self.fail_subscribe) {
            return Err(NetworkError::Rpc("accountSubscribe unavailable".into()));
        }

        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::SeqCst));
        let (tx, receiver) = mpsc::unbounded_channel();
        lock(&self.listeners).insert(
            id,
            Listener {
                identity: *identity,
                tx,
            },
        );

        debug!(%identity, %commitment, subscription = %id, "accountSubscribe");
        Ok(AccountChangeStream { id, receiver })
    }

    fn remove_account_change_listener(&self, id: SubscriptionId) -> Result<(), NetworkError> {
        match lock(&self.listeners).remove(&id) {
            Some(_) => {
                debug!(subscription = %id, "accountUnsubscribe");
                Ok(())
            }
            None => Err(NetworkError::UnknownSubscription(id)),
        }
    }

    async fn send_transaction(
        &self,
        payload: &TransferPayload,
    ) -> Result<TransactionSignature, NetworkError> {
        self.send_count.fetch_add(1, Ordering::SeqCst);

        let delay = *lock(&self.send_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = lock(&self.fail_next_send).take() {
            warn!(error = %error, "Injected send failure");
            return Err(error);
        }

        if payload.from != self.wallet_identity() {
            return Err(NetworkError::Signing(format!(
                "wallet {} cannot sign for {}",
                self.wallet_identity(),
                payload.from
            )));
        }

        let message = payload
            .message_bytes()
            .map_err(|e| NetworkError::Signing(format!("message encoding failed: {}", e)))?;
        let signature = self.wallet.sign(&message);
        let (from_after, to_after) = self.apply_transfer(payload)?;

        self.notify(&payload.from, from_after);
        if payload.to != payload.from {
            self.notify(&payload.to, to_after);
        }

        let signature = TransactionSignature::from_bytes(&signature.to_bytes());
        info!(
            from = %payload.from,
            to = %payload.to,
            lamports = payload.lamports,
            signature = %signature,
            "Transaction confirmed"
        );
        Ok(signature)
    }
}
