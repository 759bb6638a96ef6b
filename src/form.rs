//! Transfer Form Binding
//!
//! Presentation-side adapter: holds the raw text inputs, forwards user
//! actions to the [`TransferStateMachine`] and renders a [`FormView`] the UI
//! draws from. Validation errors are shown for a fixed window and then
//! cleared; a submission failure stays until the next edit.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use crate::balance::BalanceObserver;
use crate::config::TransferConfig;
use crate::identity::Identity;
use crate::money::{format_sol, parse_sol};
use crate::network::{Commitment, TransactionSignature, WalletNetwork};
use crate::transfer::{
    TransferError, TransferState, TransferStateMachine, ValidationError, ValidationResult,
};

pub const MSG_CONNECT_WALLET: &str = "Please connect your wallet";
pub const MSG_ADDRESS_REQUIRED: &str = "Address is required";
pub const MSG_INVALID_ADDRESS: &str = "Please enter a valid Solana address.";
pub const MSG_INVALID_AMOUNT: &str = "Enter a valid amount";
pub const MSG_INSUFFICIENT_FUNDS: &str = "Insufficient funds";
pub const SUBMIT_LABEL: &str = "Send SOL";
pub const PROCESSING_LABEL: &str = "Processing...";

/// Everything the UI needs for one render
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormView {
    pub connected: bool,
    /// Shown instead of the form when no wallet is connected
    pub notice: Option<String>,
    pub state: TransferState,
    pub balance_label: Option<String>,
    pub validation_error: Option<String>,
    pub submission_error: Option<String>,
    pub amount_enabled: bool,
    /// Submit control disabled
    pub disabled: bool,
    pub submit_label: String,
    pub processing_label: Option<String>,
    pub signature: Option<String>,
}

struct FlashError {
    message: String,
    shown_at: Instant,
}

pub struct TransferForm {
    machine: TransferStateMachine,
    observer: BalanceObserver,
    address_input: String,
    amount_input: String,
    error_display: Duration,
    flash: Option<FlashError>,
}

impl TransferForm {
    pub fn new(
        network: Arc<dyn WalletNetwork>,
        commitment: Commitment,
        config: &TransferConfig,
    ) -> Self {
        let observer = BalanceObserver::new(network.clone(), commitment);
        let machine =
            TransferStateMachine::new(network, observer.reader(), config.machine_config());
        Self {
            machine,
            observer,
            address_input: String::new(),
            amount_input: String::new(),
            error_display: config.error_display(),
            flash: None,
        }
    }

    pub fn machine(&self) -> &TransferStateMachine {
        &self.machine
    }

    pub fn observer(&self) -> &BalanceObserver {
        &self.observer
    }

    pub async fn connect(&mut self, identity: Identity) {
        self.observer.connect(identity).await;
        self.machine.set_sender(Some(identity));
        self.flash = None;
    }

    pub fn disconnect(&mut self) {
        self.observer.disconnect();
        self.machine.set_sender(None);
        self.flash = None;
    }

    pub fn set_address(&mut self, address: impl Into<String>) {
        self.address_input = address.into();
        self.machine.edit_recipient();
        self.flash = None;
    }

    pub fn set_amount(&mut self, amount: impl Into<String>) {
        self.amount_input = amount.into();
        self.machine.edit_amount();
        self.flash = None;
    }

    /// "Verify Address" button
    pub fn verify_address(&mut self) -> Result<ValidationResult, TransferError> {
        let result = self.machine.verify_address(&self.address_input)?;
        if let Some(reason) = result.reason {
            debug!(code = reason.code(), "Address verification failed");
            let message = if self.address_input.is_empty() {
                MSG_ADDRESS_REQUIRED
            } else {
                MSG_INVALID_ADDRESS
            };
            self.show_error(message);
        }
        Ok(result)
    }

    /// "Send SOL" button
    pub async fn submit(&mut self) -> Result<TransactionSignature, TransferError> {
        let amount = match parse_sol(&self.amount_input) {
            Ok(amount) => amount,
            Err(e) => {
                self.show_error(MSG_INVALID_AMOUNT);
                return Err(e.into());
            }
        };

        let result = self.machine.submit(amount).await;
        if let Err(e) = &result
            && let Some(message) = flash_message(e)
        {
            self.show_error(message);
        }
        result
    }

    fn show_error(&mut self, message: &str) {
        self.flash = Some(FlashError {
            message: message.to_string(),
            shown_at: Instant::now(),
        });
    }

    pub fn render(&self) -> FormView {
        self.render_at(Instant::now())
    }

    pub fn render_at(&self, now: Instant) -> FormView {
        let status = self.machine.status();
        let connected = status.sender.is_some();

        let validation_error = self
            .flash
            .as_ref()
            .filter(|f| now.duration_since(f.shown_at) < self.error_display)
            .map(|f| f.message.clone());

        let submission_error = match (&status.state, &status.last_error) {
            (TransferState::Failed, Some(e)) => Some(e.to_string()),
            _ => None,
        };

        let submitting = status.state == TransferState::Submitting;

        FormView {
            connected,
            notice: (!connected).then(|| MSG_CONNECT_WALLET.to_string()),
            state: status.state,
            balance_label: self
                .observer
                .latest()
                .map(|s| format!("{} SOL", format_sol(s.amount))),
            validation_error,
            submission_error,
            amount_enabled: connected
                && matches!(
                    status.state,
                    TransferState::Ready | TransferState::Settled | TransferState::Failed
                ),
            disabled: !connected || status.state != TransferState::Ready,
            submit_label: SUBMIT_LABEL.to_string(),
            processing_label: submitting.then(|| PROCESSING_LABEL.to_string()),
            signature: status.last_signature.map(|s| s.to_string()),
        }
    }
}

fn flash_message(error: &TransferError) -> Option<&'static str> {
    match error {
        TransferError::Validation(v) if v.is_address_error() => Some(MSG_INVALID_ADDRESS),
        TransferError::Validation(ValidationError::BelowMinimum)
        | TransferError::InvalidAmountFormat(_)
        | TransferError::AmountOverflow => Some(MSG_INVALID_AMOUNT),
        TransferError::Validation(ValidationError::InsufficientFunds) => {
            Some(MSG_INSUFFICIENT_FUNDS)
        }
        TransferError::WalletNotConnected => Some(MSG_CONNECT_WALLET),
        // Shown through `submission_error` / state instead
        TransferError::Validation(_)
        | TransferError::NotReady(_)
        | TransferError::SubmissionInFlight
        | TransferError::SubmissionFailure(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::test_keys;
    use crate::network::{InMemoryNetwork, NetworkError};

    async fn connected_form(lamports: u64) -> (Arc<InMemoryNetwork>, TransferForm, Identity) {
        let net = Arc::new(InMemoryNetwork::with_random_wallet());
        let me = net.wallet_identity();
        net.set_balance(me, lamports);

        let mut form =
            TransferForm::new(net.clone(), Commitment::Confirmed, &TransferConfig::default());
        form.connect(me).await;
        (net, form, me)
    }

    #[tokio::test]
    async fn test_disconnected_view() {
        let net = Arc::new(InMemoryNetwork::with_random_wallet());
        let form = TransferForm::new(net, Commitment::Confirmed, &TransferConfig::default());

        let view = form.render();
        assert!(!view.connected);
        assert_eq!(view.notice.as_deref(), Some(MSG_CONNECT_WALLET));
        assert!(view.disabled);
        assert!(!view.amount_enabled);
        assert!(view.balance_label.is_none());
    }

    #[tokio::test]
    async fn test_connected_view_shows_balance() {
        let (_, form, _) = connected_form(2_000_000_000).await;

        let view = form.render();
        assert!(view.connected);
        assert!(view.notice.is_none());
        assert_eq!(view.balance_label.as_deref(), Some("2 SOL"));
        assert_eq!(view.submit_label, SUBMIT_LABEL);
        // Nothing verified yet
        assert!(view.disabled);
        assert!(!view.amount_enabled);
    }

    #[tokio::test]
    async fn test_verify_enables_amount_and_submit() {
        let (_, mut form, _) = connected_form(2_000_000_000).await;
        let (_, recipient) = test_keys::keypair();

        form.set_address(recipient.to_string());
        assert!(form.verify_address().unwrap().valid);

        let view = form.render();
        assert_eq!(view.state, TransferState::Ready);
        assert!(view.amount_enabled);
        assert!(!view.disabled);
        assert!(view.validation_error.is_none());
    }

    #[tokio::test]
    async fn test_empty_address_is_required() {
        let (_, mut form, _) = connected_form(2_000_000_000).await;

        let result = form.verify_address().unwrap();
        assert!(!result.valid);
        assert_eq!(
            form.render().validation_error.as_deref(),
            Some(MSG_ADDRESS_REQUIRED)
        );
    }

    #[tokio::test]
    async fn test_self_transfer_keeps_submit_disabled() {
        let (_, mut form, me) = connected_form(2_000_000_000).await;

        form.set_address(me.to_base58());
        let result = form.verify_address().unwrap();
        assert_eq!(result.reason, Some(ValidationError::SelfTransfer));

        let view = form.render();
        assert!(view.disabled);
        assert_eq!(view.validation_error.as_deref(), Some(MSG_INVALID_ADDRESS));
    }

    #[tokio::test(start_paused = true)]
    async fn test_validation_error_clears_after_display_window() {
        let (_, mut form, _) = connected_form(2_000_000_000).await;

        form.set_address("definitely not base58!");
        form.verify_address().unwrap();
        assert!(form.render().validation_error.is_some());

        tokio::time::advance(Duration::from_millis(2_999)).await;
        assert!(form.render().validation_error.is_some());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(form.render().validation_error.is_none());
    }

    #[tokio::test]
    async fn test_invalid_amount_text() {
        let (net, mut form, _) = connected_form(2_000_000_000).await;
        let (_, recipient) = test_keys::keypair();
        form.set_address(recipient.to_string());
        form.verify_address().unwrap();
        form.set_amount("one");
        assert_eq!(form.render().state, TransferState::Ready);

        let err = form.submit().await.unwrap_err();
        assert!(matches!(err, TransferError::InvalidAmountFormat(_)));
        assert_eq!(
            form.render().validation_error.as_deref(),
            Some(MSG_INVALID_AMOUNT)
        );
        assert_eq!(net.send_count(), 0);
    }

    #[tokio::test]
    async fn test_insufficient_funds_message() {
        let (net, mut form, _) = connected_form(1_000_000_000).await;
        let (_, recipient) = test_keys::keypair();
        form.set_address(recipient.to_string());
        form.verify_address().unwrap();
        form.set_amount("1.5");

        let err = form.submit().await.unwrap_err();
        assert_eq!(err.validation(), Some(ValidationError::InsufficientFunds));

        let view = form.render();
        assert_eq!(view.validation_error.as_deref(), Some(MSG_INSUFFICIENT_FUNDS));
        assert_eq!(view.state, TransferState::Ready);
        assert_eq!(net.send_count(), 0);
    }

    #[tokio::test]
    async fn test_submit_flow_settles() {
        let (net, mut form, _) = connected_form(2_000_000_000).await;
        let (_, recipient) = test_keys::keypair();

        form.set_address(recipient.to_string());
        form.verify_address().unwrap();
        form.set_amount("1.5");

        let signature = form.submit().await.unwrap();

        let view = form.render();
        assert_eq!(view.state, TransferState::Settled);
        assert_eq!(view.signature, Some(signature.to_string()));
        assert!(view.processing_label.is_none());
        assert!(view.disabled);
        assert_eq!(net.balance(&recipient), Some(1_500_000_000));
    }

    #[tokio::test]
    async fn test_submission_failure_retained_until_edit() {
        let (net, mut form, _) = connected_form(2_000_000_000).await;
        let (_, recipient) = test_keys::keypair();
        net.fail_next_send(NetworkError::Rpc("blockhash not found".into()));

        form.set_address(recipient.to_string());
        form.verify_address().unwrap();
        form.set_amount("0.5");
        assert!(form.submit().await.is_err());

        let view = form.render();
        assert_eq!(view.state, TransferState::Failed);
        assert_eq!(
            view.submission_error.as_deref(),
            Some("Transaction failed: RPC error: blockhash not found")
        );

        form.set_amount("0.25");
        let view = form.render();
        assert_eq!(view.state, TransferState::Idle);
        assert!(view.submission_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_processing_label_while_submitting() {
        let (net, form, _) = connected_form(2_000_000_000).await;
        let (_, recipient) = test_keys::keypair();
        net.set_send_delay(Duration::from_millis(500));

        form.machine().verify_address(&recipient.to_string()).unwrap();

        let amount = parse_sol("0.5").unwrap();
        let (result, view) = tokio::join!(form.machine().submit(amount), async {
            tokio::task::yield_now().await;
            form.render()
        });

        assert!(result.is_ok());
        assert_eq!(view.state, TransferState::Submitting);
        assert_eq!(view.processing_label.as_deref(), Some(PROCESSING_LABEL));
        assert!(view.disabled);
    }

    #[tokio::test]
    async fn test_disconnect_resets_form() {
        let (net, mut form, _) = connected_form(2_000_000_000).await;
        let (_, recipient) = test_keys::keypair();
        form.set_address(recipient.to_string());
        form.verify_address().unwrap();

        form.disconnect();

        let view = form.render();
        assert!(!view.connected);
        assert_eq!(view.state, TransferState::Idle);
        assert!(view.balance_label.is_none());
        assert_eq!(net.active_subscriptions(), 0);
    }
}
