//! Balance Observer
//!
//! Keeps the latest known balance of the connected wallet.
//!
//! # Ownership
//! The observer is the ONLY writer of [`BalanceSnapshot`]. Everyone else gets a
//! [`BalanceReader`], which can read the latest snapshot but never write it.
//! Snapshots are replaced whole through a `watch` channel, so a reader sees
//! either the old value or the new one, never a mix.
//!
//! # Subscription lifetime
//! ```text
//! connect(id) ──▶ on_account_change ──▶ pump task ──▶ fetch snapshot
//!                                          │
//! disconnect() / drop ◀── SubscriptionGuard::drop
//!                          (abort pump + remove listener)
//! ```
//!
//! # Failure policy
//! Fetch / subscribe errors are logged and the previous snapshot stays
//! (stale-but-available).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::identity::Identity;
use crate::money::lamports_to_sol;
use crate::network::{Commitment, SubscriptionId, WalletNetwork};

/// Balance at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceSnapshot {
    /// Whole tokens
    pub amount: Decimal,
    pub lamports: u64,
    /// Monotonic per observer; later snapshots have larger values
    pub as_of: u64,
    pub observed_at: DateTime<Utc>,
}

/// Read-only view of the observer's latest snapshot
#[derive(Debug, Clone)]
pub struct BalanceReader {
    rx: watch::Receiver<Option<BalanceSnapshot>>,
}

impl BalanceReader {
    pub fn latest(&self) -> Option<BalanceSnapshot> {
        self.rx.borrow().clone()
    }

    /// Wait until a snapshot newer than the last one seen is published
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.rx.changed().await
    }
}

struct SnapshotStore {
    tx: watch::Sender<Option<BalanceSnapshot>>,
    seq: AtomicU64,
    /// Bumped per connected identity so a late pump cannot publish
    generation: AtomicU64,
}

impl SnapshotStore {
    fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            tx,
            seq: AtomicU64::new(0),
            generation: AtomicU64::new(0),
        }
    }

    /// Push notification: always newer than anything already stored
    fn publish(&self, generation: u64, lamports: u64) {
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Dropping balance notification from a released identity");
            return;
        }
        let as_of = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.store(lamports, as_of, "notification");
    }

    /// Fetch result, read while the store was at `seen`
    ///
    /// Dropped when a notification landed in the meantime.
    fn publish_fetched(&self, generation: u64, seen: u64, lamports: u64) {
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Dropping balance fetch from a released identity");
            return;
        }
        match self
            .seq
            .compare_exchange(seen, seen + 1, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => self.store(lamports, seen + 1, "fetch"),
            Err(current) => {
                debug!(lamports, seen, current, "Dropping fetch older than latest notification")
            }
        }
    }

    fn store(&self, lamports: u64, as_of: u64, source: &'static str) {
        let snapshot = BalanceSnapshot {
            amount: lamports_to_sol(lamports),
            lamports,
            as_of,
            observed_at: Utc::now(),
        };
        debug!(source, lamports, as_of, "Balance updated");
        self.tx.send_replace(Some(snapshot));
    }

    fn current_seq(&self) -> u64 {
        self.seq.load(Ordering::SeqCst)
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn clear(&self) {
        self.tx.send_replace(None);
    }
}

/// Scoped account-change subscription
///
/// Dropping the guard stops the pump and releases the listener.
struct SubscriptionGuard {
    id: SubscriptionId,
    identity: Identity,
    network: Arc<dyn WalletNetwork>,
    pump: JoinHandle<()>,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.pump.abort();
        match self.network.remove_account_change_listener(self.id) {
            Ok(()) => debug!(identity = %self.identity, subscription = %self.id, "Subscription released"),
            Err(e) => warn!(identity = %self.identity, subscription = %self.id, error = %e, "Failed to release subscription"),
        }
    }
}

pub struct BalanceObserver {
    network: Arc<dyn WalletNetwork>,
    commitment: Commitment,
    store: Arc<SnapshotStore>,
    identity: Option<Identity>,
    generation: u64,
    subscription: Option<SubscriptionGuard>,
}

impl BalanceObserver {
    pub fn new(network: Arc<dyn WalletNetwork>, commitment: Commitment) -> Self {
        Self {
            network,
            commitment,
            store: Arc::new(SnapshotStore::new()),
            identity: None,
            generation: 0,
            subscription: None,
        }
    }

    pub fn reader(&self) -> BalanceReader {
        BalanceReader {
            rx: self.store.tx.subscribe(),
        }
    }

    pub fn latest(&self) -> Option<BalanceSnapshot> {
        self.store.tx.borrow().clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.identity
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Start observing `identity`: push subscription first, then one fetch
    ///
    /// Subscribing first leaves no window where a change goes unseen; a fetch
    /// that races a notification loses. Any previous subscription is released
    /// first. Connecting a different identity discards the old snapshot.
    pub async fn connect(&mut self, identity: Identity) {
        self.subscription = None;
        if self.identity != Some(identity) {
            self.store.clear();
        }
        self.identity = Some(identity);
        self.generation = self.store.next_generation();

        self.subscribe(identity);
        self.refresh().await;
    }

    fn subscribe(&mut self, identity: Identity) {
        match self.network.on_account_change(&identity, self.commitment) {
            Ok(stream) => {
                let store = self.store.clone();
                let generation = self.generation;
                let mut receiver = stream.receiver;
                let pump = tokio::spawn(async move {
                    while let Some(info) = receiver.recv().await {
                        store.publish(generation, info.lamports);
                    }
                });

                info!(%identity, subscription = %stream.id, commitment = %self.commitment, "Balance subscription opened");
                self.subscription = Some(SubscriptionGuard {
                    id: stream.id,
                    identity,
                    network: self.network.clone(),
                    pump,
                });
            }
            Err(e) => {
                warn!(%identity, error = %e, "Balance subscription failed, fetch only");
            }
        }
    }

    /// Re-fetch the snapshot for the connected identity
    pub async fn refresh(&self) {
        let Some(identity) = self.identity else {
            return;
        };

        let seen = self.store.current_seq();
        match self
            .network
            .get_account_info(&identity, self.commitment)
            .await
        {
            Ok(Some(info)) => self
                .store
                .publish_fetched(self.generation, seen, info.lamports),
            Ok(None) => debug!(%identity, "Account not found, no balance yet"),
            Err(e) => warn!(%identity, error = %e, "Balance fetch failed, keeping last snapshot"),
        }
    }

    /// Stop observing; releases the subscription and forgets the snapshot
    pub fn disconnect(&mut self) {
        self.subscription = None;
        if let Some(identity) = self.identity.take() {
            self.store.next_generation();
            self.store.clear();
            info!(%identity, "Balance observer disconnected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::InMemoryNetwork;
    use std::time::Duration;

    async fn next_update(reader: &mut BalanceReader) -> Option<BalanceSnapshot> {
        tokio::time::timeout(Duration::from_secs(1), reader.changed())
            .await
            .expect("balance update")
            .expect("store alive");
        reader.latest()
    }

    #[tokio::test]
    async fn test_connect_subscribes_and_fetches() {
        let net = Arc::new(InMemoryNetwork::with_random_wallet());
        let me = net.wallet_identity();
        net.set_balance(me, 2_000_000_000);

        let mut observer = BalanceObserver::new(net.clone(), Commitment::Confirmed);
        assert!(observer.latest().is_none());

        observer.connect(me).await;

        let snapshot = observer.latest().unwrap();
        assert_eq!(snapshot.lamports, 2_000_000_000);
        assert_eq!(snapshot.amount, Decimal::from(2));
        assert!(observer.is_subscribed());
        assert_eq!(net.active_subscriptions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_during_initial_fetch_is_kept() {
        let net = Arc::new(InMemoryNetwork::with_random_wallet());
        let me = net.wallet_identity();
        net.set_balance(me, 1_000);
        // Fetch reads 1_000, then answers late
        net.set_fetch_delay(Duration::from_millis(100));

        let mut observer = BalanceObserver::new(net.clone(), Commitment::Confirmed);
        tokio::join!(observer.connect(me), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            net.set_balance(me, 5_000);
        });

        let snapshot = observer.latest().unwrap();
        assert_eq!(snapshot.lamports, 5_000);
        assert_eq!(snapshot.as_of, 1);
    }

    #[tokio::test]
    async fn test_push_notification_replaces_snapshot() {
        let net = Arc::new(InMemoryNetwork::with_random_wallet());
        let me = net.wallet_identity();
        net.set_balance(me, 1_000);

        let mut observer = BalanceObserver::new(net.clone(), Commitment::Confirmed);
        observer.connect(me).await;
        let first = observer.latest().unwrap();

        let mut reader = observer.reader();
        net.set_balance(me, 5_000);

        let second = next_update(&mut reader).await.unwrap();
        assert_eq!(second.lamports, 5_000);
        assert!(second.as_of > first.as_of);
    }

    #[tokio::test]
    async fn test_disconnect_releases_subscription() {
        let net = Arc::new(InMemoryNetwork::with_random_wallet());
        let me = net.wallet_identity();
        net.set_balance(me, 1_000);

        let mut observer = BalanceObserver::new(net.clone(), Commitment::Confirmed);
        observer.connect(me).await;
        assert_eq!(net.active_subscriptions(), 1);

        observer.disconnect();
        assert_eq!(net.active_subscriptions(), 0);
        assert!(observer.latest().is_none());
        assert!(observer.identity().is_none());

        // Updates after release never reach the store
        net.set_balance(me, 9_999);
        tokio::task::yield_now().await;
        assert!(observer.latest().is_none());
    }

    #[tokio::test]
    async fn test_drop_releases_subscription() {
        let net = Arc::new(InMemoryNetwork::with_random_wallet());
        let me = net.wallet_identity();

        {
            let mut observer = BalanceObserver::new(net.clone(), Commitment::Confirmed);
            observer.connect(me).await;
            assert_eq!(net.active_subscriptions(), 1);
        }
        assert_eq!(net.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_reconnect_does_not_leak() {
        let net = Arc::new(InMemoryNetwork::with_random_wallet());
        let me = net.wallet_identity();

        let mut observer = BalanceObserver::new(net.clone(), Commitment::Confirmed);
        observer.connect(me).await;
        observer.connect(me).await;
        observer.connect(me).await;
        assert_eq!(net.active_subscriptions(), 1);
    }

    #[tokio::test]
    async fn test_switch_identity_discards_old_snapshot() {
        let net = Arc::new(InMemoryNetwork::with_random_wallet());
        let me = net.wallet_identity();
        let (_, other) = crate::identity::test_keys::keypair();
        net.set_balance(me, 1_000);

        let mut observer = BalanceObserver::new(net.clone(), Commitment::Confirmed);
        observer.connect(me).await;
        assert!(observer.latest().is_some());

        // `other` has no account yet
        observer.connect(other).await;
        assert!(observer.latest().is_none());
        assert_eq!(observer.identity(), Some(other));
    }

    #[tokio::test]
    async fn test_fetch_error_keeps_previous_snapshot() {
        let net = Arc::new(InMemoryNetwork::with_random_wallet());
        let me = net.wallet_identity();
        net.set_balance(me, 1_000);

        let mut observer = BalanceObserver::new(net.clone(), Commitment::Confirmed);
        observer.connect(me).await;

        net.set_fail_fetch(true);
        observer.refresh().await;
        assert_eq!(observer.latest().unwrap().lamports, 1_000);
    }

    #[tokio::test]
    async fn test_subscribe_error_keeps_fetched_snapshot() {
        let net = Arc::new(InMemoryNetwork::with_random_wallet());
        let me = net.wallet_identity();
        net.set_balance(me, 1_000);
        net.set_fail_subscribe(true);

        let mut observer = BalanceObserver::new(net.clone(), Commitment::Confirmed);
        observer.connect(me).await;

        assert!(!observer.is_subscribed());
        assert_eq!(observer.latest().unwrap().lamports, 1_000);
        assert_eq!(net.active_subscriptions(), 0);
    }
}
