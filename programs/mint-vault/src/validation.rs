//! Account validation shared by the client pre-check and the program.
//!
//! The client-side run only saves a wasted submission. The run inside the
//! program is the binding one.

use std::fmt;

use anchor_lang::prelude::*;

use crate::errors::VaultError;

/// Persisted state of a supplied account as far as validation cares
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccountState {
    Uninitialized,
    Initialized,
}

/// View of an account handed to an operation.
///
/// `owner` is the owning program for program accounts and the token-level
/// owner field for token accounts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub address: Pubkey,
    pub owner: Pubkey,
    pub state: AccountState,
}

impl AccountSnapshot {
    pub fn new(address: Pubkey, owner: Pubkey, state: AccountState) -> Self {
        Self { address, owner, state }
    }
}

/// First field that failed validation, with both values
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccountMismatch {
    Address { expected: Pubkey, actual: Pubkey },
    Owner { expected: Pubkey, actual: Pubkey },
    State { expected: AccountState, actual: AccountState },
    /// Recorded or token-level mint differs from the requested one
    Mint { expected: Pubkey, actual: Pubkey },
}

impl AccountMismatch {
    pub fn field(&self) -> &'static str {
        match self {
            AccountMismatch::Address { .. } => "address",
            AccountMismatch::Owner { .. } => "owner",
            AccountMismatch::State { .. } => "state",
            AccountMismatch::Mint { .. } => "mint",
        }
    }
}

impl fmt::Display for AccountMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountMismatch::Address { expected, actual }
            | AccountMismatch::Owner { expected, actual }
            | AccountMismatch::Mint { expected, actual } => write!(
                f,
                "account mismatch on {}: expected {}, actual {}",
                self.field(),
                expected,
                actual
            ),
            AccountMismatch::State { expected, actual } => write!(
                f,
                "account mismatch on state: expected {:?}, actual {:?}",
                expected, actual
            ),
        }
    }
}

impl std::error::Error for AccountMismatch {}

impl From<AccountMismatch> for anchor_lang::error::Error {
    fn from(mismatch: AccountMismatch) -> Self {
        msg!("{}", mismatch);
        match mismatch {
            AccountMismatch::Address { .. } => error!(VaultError::AddressMismatch),
            AccountMismatch::Owner { .. } => error!(VaultError::OwnerMismatch),
            AccountMismatch::State { .. } => error!(VaultError::StateMismatch),
            AccountMismatch::Mint { .. } => error!(VaultError::InvalidMint),
        }
    }
}

/// Check a supplied account against what the operation expects.
///
/// Checks run in order: address, then owner, then state. The first mismatch
/// is returned and nothing is coerced.
pub fn validate(
    expected_address: &Pubkey,
    supplied: &AccountSnapshot,
    expected_owner: Option<&Pubkey>,
    expected_state: Option<AccountState>,
) -> std::result::Result<(), AccountMismatch> {
    if supplied.address != *expected_address {
        return Err(AccountMismatch::Address {
            expected: *expected_address,
            actual: supplied.address,
        });
    }

    if let Some(owner) = expected_owner {
        if supplied.owner != *owner {
            return Err(AccountMismatch::Owner {
                expected: *owner,
                actual: supplied.owner,
            });
        }
    }

    if let Some(state) = expected_state {
        if supplied.state != state {
            return Err(AccountMismatch::State {
                expected: state,
                actual: supplied.state,
            });
        }
    }

    Ok(())
}
