//! Transfer Payload
//!
//! A single system-program transfer instruction. The wallet signs
//! [`TransferPayload::message_bytes`]; the network only ever sees this struct.

use serde::Serialize;

use crate::identity::Identity;

/// Owner of every plain wallet account
pub const SYSTEM_PROGRAM_ID: Identity = Identity::new([0u8; 32]);

/// System instruction index for `Transfer`
const SYSTEM_TRANSFER_INDEX: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferPayload {
    pub from: Identity,
    pub to: Identity,
    pub lamports: u64,
}

#[derive(Serialize)]
struct InstructionMessage<'a> {
    program_id: &'a [u8; 32],
    /// (account, is_signer, is_writable)
    accounts: [(&'a [u8; 32], bool, bool); 2],
    data: [u8; 12],
}

impl TransferPayload {
    pub fn transfer(from: Identity, to: Identity, lamports: u64) -> Self {
        Self { from, to, lamports }
    }

    pub fn program_id(&self) -> Identity {
        SYSTEM_PROGRAM_ID
    }

    /// Instruction data: `u32` LE instruction index, then `u64` LE lamports
    pub fn instruction_data(&self) -> [u8; 12] {
        let mut data = [0u8; 12];
        data[..4].copy_from_slice(&SYSTEM_TRANSFER_INDEX.to_le_bytes());
        data[4..].copy_from_slice(&self.lamports.to_le_bytes());
        data
    }

    /// Canonical bytes the sender signs
    pub fn message_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        let program_id = self.program_id();
        let message = InstructionMessage {
            program_id: program_id.as_bytes(),
            accounts: [
                (self.from.as_bytes(), true, true),
                (self.to.as_bytes(), false, true),
            ],
            data: self.instruction_data(),
        };
        bincode::serialize(&message)
    }
}
