//! Boundary to the RPC layer that reads accounts and submits transactions.

use std::fmt;

use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::Instruction;

/// Account as returned by the ledger: owning program and raw data
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawAccount {
    pub owner: Pubkey,
    pub data: Vec<u8>,
}

/// Identifier of a submitted transaction (base58 signature on mainnet)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TransactionId(pub String);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// The transaction executed and the program rejected it
    Rejected { code: Option<u32>, message: String },
    /// Outcome unknown: dropped connection, timeout, or abandoned by the caller
    Unconfirmed(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Rejected {
                code: Some(code),
                message,
            } => write!(f, "rejected with code {}: {}", code, message),
            TransportError::Rejected { code: None, message } => write!(f, "rejected: {}", message),
            TransportError::Unconfirmed(message) => write!(f, "unconfirmed: {}", message),
        }
    }
}

impl std::error::Error for TransportError {}

/// External submission service.
///
/// Keypairs stay with the implementation; the client only names which keys
/// must sign. Retries, if any, are the implementation's concern.
pub trait Transport {
    fn get_account(&self, address: &Pubkey) -> std::result::Result<Option<RawAccount>, TransportError>;

    fn submit(
        &self,
        instruction: Instruction,
        signers: &[Pubkey],
    ) -> std::result::Result<TransactionId, TransportError>;

    /// Whether the wallet behind this transport holds the key for `signer`
    fn can_sign(&self, signer: &Pubkey) -> bool;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get_account(&self, address: &Pubkey) -> std::result::Result<Option<RawAccount>, TransportError> {
        (**self).get_account(address)
    }

    fn submit(
        &self,
        instruction: Instruction,
        signers: &[Pubkey],
    ) -> std::result::Result<TransactionId, TransportError> {
        (**self).submit(instruction, signers)
    }

    fn can_sign(&self, signer: &Pubkey) -> bool {
        (**self).can_sign(signer)
    }
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn get_account(&self, address: &Pubkey) -> std::result::Result<Option<RawAccount>, TransportError> {
        (**self).get_account(address)
    }

    fn submit(
        &self,
        instruction: Instruction,
        signers: &[Pubkey],
    ) -> std::result::Result<TransactionId, TransportError> {
        (**self).submit(instruction, signers)
    }

    fn can_sign(&self, signer: &Pubkey) -> bool {
        (**self).can_sign(signer)
    }
}
