//! Transfer State Machine
//!
//! Drives one transfer request from address check to a settled or failed
//! submission. This is the central component that owns state transitions.
//!
//! # Safety Invariants
//!
//! 1. **Validate-Before-Send**: SUBMITTING is entered only after the recipient
//!    and the amount pass validation against the balance snapshot read at
//!    that moment.
//! 2. **Single-Flight**: the READY → SUBMITTING check and the transition happen
//!    under one lock, so a second submit observes SUBMITTING and is rejected
//!    before any network call.
//! 3. **No Stale Validation**: a recipient edit in READY/SETTLED/FAILED drops
//!    the verified recipient and returns to IDLE; any edit leaves a terminal
//!    state.
//! 4. **No Retry**: a failed submission stays FAILED until the user edits.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::error::{TransferError, ValidationError};
use super::payload::TransferPayload;
use super::state::TransferState;
use super::types::{TransferRequest, ValidationResult};
use super::validation::{AddressValidator, AmountPolicy};
use crate::balance::BalanceReader;
use crate::identity::Identity;
use crate::money::sol_to_lamports;
use crate::network::{NetworkError, TransactionSignature, WalletNetwork};

/// Configuration for the state machine
#[derive(Debug, Clone)]
pub struct MachineConfig {
    /// Smallest amount (whole tokens) that may be sent
    pub min_transfer: Decimal,
    /// Upper bound on one `send_transaction` call
    pub submit_timeout: Duration,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            min_transfer: Decimal::new(1, 3), // 0.001
            submit_timeout: Duration::from_secs(30),
        }
    }
}

/// Point-in-time copy of the machine for rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferStatus {
    pub state: TransferState,
    pub sender: Option<Identity>,
    pub recipient: Option<Identity>,
    #[serde(skip)]
    pub last_error: Option<TransferError>,
    pub last_signature: Option<TransactionSignature>,
    pub in_flight: Option<TransferRequest>,
    pub attempts: u64,
}

#[derive(Debug, Default)]
struct Inner {
    state: TransferState,
    sender: Option<Identity>,
    /// Recipient text as verified (READY only)
    candidate: Option<String>,
    recipient: Option<Identity>,
    last_error: Option<TransferError>,
    last_signature: Option<TransactionSignature>,
    in_flight: Option<TransferRequest>,
    /// Submission attempt counter; tags the in-flight attempt
    attempts: u64,
}

impl Inner {
    fn transition(&mut self, to: TransferState) {
        if self.state != to {
            debug!(from = %self.state, to = %to, "Transfer state");
            self.state = to;
        }
    }

    /// Back to IDLE, forgetting everything derived from previous input
    fn reset(&mut self) {
        self.candidate = None;
        self.recipient = None;
        self.last_error = None;
        self.last_signature = None;
        self.in_flight = None;
        self.transition(TransferState::Idle);
    }
}

pub struct TransferStateMachine {
    network: Arc<dyn WalletNetwork>,
    balance: BalanceReader,
    config: MachineConfig,
    inner: Mutex<Inner>,
}

impl TransferStateMachine {
    pub fn new(
        network: Arc<dyn WalletNetwork>,
        balance: BalanceReader,
        config: MachineConfig,
    ) -> Self {
        Self {
            network,
            balance,
            config,
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn state(&self) -> TransferState {
        self.lock().state
    }

    pub fn last_error(&self) -> Option<TransferError> {
        self.lock().last_error.clone()
    }

    pub fn status(&self) -> TransferStatus {
        let inner = self.lock();
        TransferStatus {
            state: inner.state,
            sender: inner.sender,
            recipient: inner.recipient,
            last_error: inner.last_error.clone(),
            last_signature: inner.last_signature.clone(),
            in_flight: inner.in_flight.clone(),
            attempts: inner.attempts,
        }
    }

    /// Wallet connected, switched or disconnected
    ///
    /// Outside SUBMITTING this also resets to IDLE: a verification made for
    /// another sender is stale.
    pub fn set_sender(&self, sender: Option<Identity>) {
        let mut inner = self.lock();
        if inner.sender == sender {
            return;
        }
        inner.sender = sender;
        if inner.state != TransferState::Submitting {
            inner.reset();
        }
    }

    /// Recipient input changed: READY/SETTLED/FAILED → IDLE
    pub fn edit_recipient(&self) {
        let mut inner = self.lock();
        let state = inner.state;
        match state {
            s if s.is_reset_on_edit() => inner.reset(),
            TransferState::Idle => inner.last_error = None,
            s => debug!(state = %s, "Edit ignored while busy"),
        }
    }

    /// Amount input changed: SETTLED/FAILED → IDLE
    ///
    /// In READY only the amount error is cleared. The amount is validated on
    /// every submit and never cached, so the verified recipient stays valid.
    pub fn edit_amount(&self) {
        let mut inner = self.lock();
        let state = inner.state;
        match state {
            TransferState::Ready | TransferState::Idle => inner.last_error = None,
            s if s.is_reset_on_edit() => inner.reset(),
            s => debug!(state = %s, "Edit ignored while busy"),
        }
    }

    /// User asked to verify the recipient (IDLE → VALIDATING → READY | IDLE)
    ///
    /// From READY/SETTLED/FAILED the machine resets to IDLE first.
    pub fn verify_address(&self, candidate: &str) -> Result<ValidationResult, TransferError> {
        let mut inner = self.lock();
        if inner.state.is_busy() {
            debug!(state = %inner.state, "Address check rejected while busy");
            return Err(TransferError::SubmissionInFlight);
        }
        if inner.state != TransferState::Idle {
            inner.reset();
        }

        inner.transition(TransferState::Validating);
        match AddressValidator::parse(candidate, inner.sender.as_ref()) {
            Ok(recipient) => {
                inner.candidate = Some(candidate.to_string());
                inner.recipient = Some(recipient);
                inner.last_error = None;
                inner.transition(TransferState::Ready);
                Ok(ValidationResult::ok())
            }
            Err(reason) => {
                warn!(reason = reason.code(), "Recipient rejected");
                inner.last_error = Some(reason.into());
                inner.transition(TransferState::Idle);
                Ok(ValidationResult::fail(reason))
            }
        }
    }

    /// Validate `amount` against the current balance and submit
    ///
    /// Only one call can be past the READY check at a time; concurrent callers
    /// get [`TransferError::SubmissionInFlight`] and cause no network call.
    pub async fn submit(&self, amount: Decimal) -> Result<TransactionSignature, TransferError> {
        let (request, payload, attempt) = {
            let mut inner = self.lock();
            match inner.state {
                TransferState::Ready => {}
                TransferState::Submitting => {
                    debug!("Duplicate submit rejected");
                    return Err(TransferError::SubmissionInFlight);
                }
                other => return Err(TransferError::NotReady(other)),
            }

            let (request, payload) = match self.prepare(&mut inner, amount) {
                Ok(prepared) => prepared,
                Err(e) => {
                    warn!(code = e.code(), error = %e, "Submit rejected by validation");
                    inner.last_error = Some(e.clone());
                    return Err(e);
                }
            };

            inner.attempts += 1;
            inner.last_error = None;
            inner.in_flight = Some(request.clone());
            inner.transition(TransferState::Submitting);
            (request, payload, inner.attempts)
        };

        info!(
            attempt,
            from = %request.sender,
            to = %request.recipient,
            amount = %request.amount,
            lamports = payload.lamports,
            "Submitting transfer"
        );

        let mut guard = InFlightGuard {
            machine: self,
            attempt,
            armed: true,
        };

        let timeout = self.config.submit_timeout;
        let result = match tokio::time::timeout(timeout, self.network.send_transaction(&payload))
            .await
        {
            Ok(Ok(signature)) => Ok(signature),
            Ok(Err(e)) => Err(TransferError::from(e)),
            Err(_) => Err(TransferError::from(NetworkError::Timeout(
                timeout.as_millis() as u64,
            ))),
        };

        guard.armed = false;
        self.finish(attempt, result.clone());
        result
    }

    /// Re-run both validators for READY → SUBMITTING and build the payload
    fn prepare(
        &self,
        inner: &mut Inner,
        amount: Decimal,
    ) -> Result<(TransferRequest, TransferPayload), TransferError> {
        let sender = inner.sender.ok_or(TransferError::WalletNotConnected)?;

        let candidate = inner.candidate.clone().unwrap_or_default();
        let recipient = match AddressValidator::parse(&candidate, Some(&sender)) {
            Ok(recipient) => recipient,
            Err(reason) => {
                // Address no longer valid (e.g. wallet switched): back to IDLE
                inner.reset();
                return Err(reason.into());
            }
        };

        // Snapshot read now, not at connect time
        let snapshot = self.balance.latest();
        let balance = snapshot.as_ref().map_or(Decimal::ZERO, |s| s.amount);
        AmountPolicy::check(amount, balance, self.config.min_transfer)?;

        let lamports = sol_to_lamports(amount)?;
        if lamports == 0 {
            return Err(ValidationError::BelowMinimum.into());
        }

        let request = TransferRequest {
            sender,
            recipient,
            amount,
            sender_balance: balance,
            balance_as_of: snapshot.map(|s| s.as_of),
        };
        let payload = TransferPayload::transfer(sender, recipient, lamports);
        Ok((request, payload))
    }

    fn finish(&self, attempt: u64, result: Result<TransactionSignature, TransferError>) {
        let mut inner = self.lock();
        if inner.state != TransferState::Submitting || inner.attempts != attempt {
            warn!(attempt, state = %inner.state, "Stale submission result ignored");
            return;
        }

        inner.in_flight = None;
        match result {
            Ok(signature) => {
                info!(attempt, signature = %signature, "Transfer settled");
                inner.last_signature = Some(signature);
                inner.transition(TransferState::Settled);
            }
            Err(e) => {
                error!(attempt, error = %e, "Transfer failed");
                inner.last_error = Some(e);
                inner.transition(TransferState::Failed);
            }
        }
    }
}

/// Moves an abandoned submission (future dropped mid-flight) to FAILED
struct InFlightGuard<'a> {
    machine: &'a TransferStateMachine,
    attempt: u64,
    armed: bool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.machine.finish(
                self.attempt,
                Err(TransferError::SubmissionFailure(
                    "submission abandoned before completion".into(),
                )),
            );
        }
    }
}
