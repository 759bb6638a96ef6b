//! Native Token Transfer
//!
//! Turns raw form input into at most one signed transfer at a time.
//!
//! # State Machine
//!
//! ```text
//! IDLE → VALIDATING → READY → SUBMITTING → SETTLED
//!            ↓          │          ↓
//!          IDLE         │        FAILED
//!                       └─ amount rejected: stays READY
//! ```
//!
//! # Components
//!
//! - [`AddressValidator`] - recipient parse / self / curve checks (pure)
//! - [`AmountPolicy`] - minimum and balance bounds (pure)
//! - [`TransferStateMachine`] - lifecycle, single-flight submission
//! - [`TransferPayload`] - the system-transfer instruction handed to the wallet

pub mod error;
pub mod machine;
pub mod payload;
pub mod state;
pub mod types;
pub mod validation;

// Re-exports for convenience
pub use error::{TransferError, ValidationError};
pub use machine::{MachineConfig, TransferStateMachine, TransferStatus};
pub use payload::TransferPayload;
pub use state::TransferState;
pub use types::{TransferRequest, ValidationResult};
pub use validation::{AddressValidator, AmountPolicy};
