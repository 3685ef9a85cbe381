//! Off-chain side of vault initialization.
//!
//! Derives the accounts for a mint, pre-checks them with the same validator
//! the program runs, assembles the instruction and hands it to a
//! [`Transport`]. A failed submission is never retried blindly: the vault is
//! read back first, and an initialized vault counts as success.

use std::fmt;

use anchor_lang::prelude::*;
use anchor_spl::{associated_token::AssociatedToken, token::Token, token::TokenAccount};

use crate::{
    derivation::{derive_vault_address, vault_address_with_bump, vault_token_address},
    state::{VaultAccount, VaultStage},
    validation::{validate, AccountMismatch, AccountSnapshot, AccountState},
};

pub mod assembler;
pub mod transport;

pub use assembler::*;
pub use transport::*;

/// Everything one `initialize_vault` call needs, derived up front
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InitializationRequest {
    pub payer: Pubkey,
    pub mint: Pubkey,
    pub vault: Pubkey,
    pub vault_bump: u8,
    pub vault_token: Pubkey,
    pub system_program: Pubkey,
    pub token_program: Pubkey,
    pub associated_token_program: Pubkey,
    pub rent: Pubkey,
}

impl InitializationRequest {
    pub fn new(
        program_id: &Pubkey,
        payer: Pubkey,
        mint: Pubkey,
    ) -> std::result::Result<Self, ClientError> {
        let (vault, vault_bump) =
            derive_vault_address(&mint, program_id).map_err(|_| ClientError::DerivationExhausted)?;

        Ok(Self {
            payer,
            mint,
            vault,
            vault_bump,
            vault_token: vault_token_address(&vault, &mint),
            system_program: System::id(),
            token_program: Token::id(),
            associated_token_program: AssociatedToken::id(),
            rent: anchor_lang::solana_program::sysvar::rent::ID,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientError {
    DerivationExhausted,
    AccountMismatch(AccountMismatch),
    MissingRole(Role),
    /// The payer's signature is unavailable or was refused
    Unauthorized,
    /// Submission failed and the vault is still not initialized
    SubmissionFailed(TransportError),
    /// Account read failed
    Query(TransportError),
    /// An initialized vault records a bump that yields no program address
    InvalidBump { address: Pubkey, bump: u8 },
    Decode { address: Pubkey, reason: String },
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::DerivationExhausted => f.write_str("no valid bump for vault address"),
            ClientError::AccountMismatch(mismatch) => write!(f, "{}", mismatch),
            ClientError::MissingRole(role) => write!(f, "missing address for role {}", role),
            ClientError::Unauthorized => f.write_str("payer signature missing"),
            ClientError::SubmissionFailed(err) => write!(f, "submission failed: {}", err),
            ClientError::Query(err) => write!(f, "account query failed: {}", err),
            ClientError::InvalidBump { address, bump } => {
                write!(f, "vault {} records invalid bump {}", address, bump)
            }
            ClientError::Decode { address, reason } => {
                write!(f, "cannot decode account {}: {}", address, reason)
            }
        }
    }
}

impl std::error::Error for ClientError {}

impl From<AccountMismatch> for ClientError {
    fn from(mismatch: AccountMismatch) -> Self {
        ClientError::AccountMismatch(mismatch)
    }
}

/// Vault as currently seen on the ledger
#[derive(Clone, Debug, PartialEq)]
pub enum VaultStatus {
    Absent,
    /// Allocated but not yet at `Initialized`; submitting resumes it
    InProgress(VaultStage),
    Initialized(VaultAccount),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InitializeOutcome {
    /// The instruction was submitted and confirmed.
    ///
    /// This does not mean this call created the vault: when attempts race,
    /// the losers' transactions run the on-chain no-op and are confirmed too.
    /// The `VaultInitialized` event marks the creating transaction.
    Submitted {
        request: InitializationRequest,
        transaction_id: TransactionId,
    },
    /// The vault was found initialized; nothing new was created by this call
    AlreadyInitialized { request: InitializationRequest },
}

impl InitializeOutcome {
    pub fn request(&self) -> &InitializationRequest {
        match self {
            InitializeOutcome::Submitted { request, .. }
            | InitializeOutcome::AlreadyInitialized { request } => request,
        }
    }

    pub fn transaction_id(&self) -> Option<&TransactionId> {
        match self {
            InitializeOutcome::Submitted { transaction_id, .. } => Some(transaction_id),
            InitializeOutcome::AlreadyInitialized { .. } => None,
        }
    }
}

fn is_missing_signature(code: u32) -> bool {
    code == anchor_lang::error::ErrorCode::AccountNotSigner as u32
}

pub struct VaultClient<T> {
    program_id: Pubkey,
    transport: T,
}

impl<T: Transport> VaultClient<T> {
    pub fn new(program_id: Pubkey, transport: T) -> Self {
        Self {
            program_id,
            transport,
        }
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn request(
        &self,
        payer: &Pubkey,
        mint: &Pubkey,
    ) -> std::result::Result<InitializationRequest, ClientError> {
        InitializationRequest::new(&self.program_id, *payer, *mint)
    }

    /// Read the vault and its token account and validate both.
    ///
    /// A vault owned by another program, or a vault token owned by anyone
    /// other than the vault, is reported as a mismatch, never as absent.
    pub fn vault_status(
        &self,
        request: &InitializationRequest,
    ) -> std::result::Result<VaultStatus, ClientError> {
        let vault = match self.fetch(&request.vault)? {
            Some(raw) => raw,
            None => {
                self.check_vault_token(request, false)?;
                return Ok(VaultStatus::Absent);
            }
        };

        // Owner first: data of a foreign account is not decoded at all
        let mut snapshot = AccountSnapshot::new(request.vault, vault.owner, AccountState::Uninitialized);
        validate(&request.vault, &snapshot, Some(&self.program_id), None)?;

        let record = VaultAccount::try_deserialize(&mut vault.data.as_slice()).map_err(|err| {
            ClientError::Decode {
                address: request.vault,
                reason: err.to_string(),
            }
        })?;
        if record.is_initialized() {
            snapshot.state = AccountState::Initialized;
        }
        if validate(&request.vault, &snapshot, None, Some(AccountState::Initialized)).is_err() {
            return Ok(VaultStatus::InProgress(record.stage));
        }

        if record.mint != request.mint {
            return Err(AccountMismatch::Mint {
                expected: request.mint,
                actual: record.mint,
            }
            .into());
        }
        let recorded = vault_address_with_bump(&record.mint, record.bump, &self.program_id)
            .map_err(|_| ClientError::InvalidBump {
                address: request.vault,
                bump: record.bump,
            })?;
        if recorded != request.vault {
            return Err(AccountMismatch::Address {
                expected: request.vault,
                actual: recorded,
            }
            .into());
        }
        if record.vault_token != request.vault_token {
            return Err(AccountMismatch::Address {
                expected: request.vault_token,
                actual: record.vault_token,
            }
            .into());
        }
        self.check_vault_token(request, true)?;

        Ok(VaultStatus::Initialized(record))
    }

    /// Initialize the vault for `mint`, funded by `payer`.
    ///
    /// Succeeds both when this call creates the vault and when the vault is
    /// already initialized, including when that is only discovered after a
    /// failed or unconfirmed submission. A confirmed submission is reported
    /// as [`InitializeOutcome::Submitted`] whether or not it was the one that
    /// created the vault.
    pub fn initialize_vault(
        &self,
        payer: &Pubkey,
        mint: &Pubkey,
    ) -> std::result::Result<InitializeOutcome, ClientError> {
        let request = self.request(payer, mint)?;

        match self.vault_status(&request)? {
            VaultStatus::Initialized(_) => {
                msg!("Vault {} already initialized", request.vault);
                return Ok(InitializeOutcome::AlreadyInitialized { request });
            }
            VaultStatus::InProgress(stage) => {
                msg!("Vault {} found at {:?}, resuming", request.vault, stage);
            }
            VaultStatus::Absent => {}
        }

        if !self.transport.can_sign(&request.payer) {
            return Err(ClientError::Unauthorized);
        }

        let instruction = InitializeVaultRoles::from_request(&request).instruction(&self.program_id)?;

        match self.transport.submit(instruction, &[request.payer]) {
            Ok(transaction_id) => {
                msg!("initialize_vault tx: {}", transaction_id);
                Ok(InitializeOutcome::Submitted {
                    request,
                    transaction_id,
                })
            }
            Err(err) => self.recover(request, err),
        }
    }

    /// Settle a failed submission against the ledger instead of trusting it
    fn recover(
        &self,
        request: InitializationRequest,
        err: TransportError,
    ) -> std::result::Result<InitializeOutcome, ClientError> {
        msg!("Submission for vault {} failed: {}", request.vault, err);

        match self.vault_status(&request) {
            Ok(VaultStatus::Initialized(_)) => {
                return Ok(InitializeOutcome::AlreadyInitialized { request });
            }
            Ok(_) | Err(ClientError::Query(_)) => {}
            Err(other) => return Err(other),
        }

        match err {
            TransportError::Rejected {
                code: Some(code), ..
            } if is_missing_signature(code) => Err(ClientError::Unauthorized),
            err => Err(ClientError::SubmissionFailed(err)),
        }
    }

    fn fetch(&self, address: &Pubkey) -> std::result::Result<Option<RawAccount>, ClientError> {
        self.transport.get_account(address).map_err(ClientError::Query)
    }

    fn check_vault_token(
        &self,
        request: &InitializationRequest,
        required: bool,
    ) -> std::result::Result<(), ClientError> {
        let raw = match self.fetch(&request.vault_token)? {
            Some(raw) => raw,
            None if required => {
                return Err(AccountMismatch::State {
                    expected: AccountState::Initialized,
                    actual: AccountState::Uninitialized,
                }
                .into())
            }
            None => return Ok(()),
        };

        let token = TokenAccount::try_deserialize(&mut raw.data.as_slice()).map_err(|err| {
            ClientError::Decode {
                address: request.vault_token,
                reason: err.to_string(),
            }
        })?;
        validate(
            &request.vault_token,
            &AccountSnapshot::new(request.vault_token, token.owner, AccountState::Initialized),
            Some(&request.vault),
            Some(AccountState::Initialized),
        )?;

        Ok(())
    }
}

/// Upper bound on threads `initialize_vaults` runs at once
pub const MAX_PARALLEL_INITIALIZATIONS: usize = 8;

impl<T: Transport + Sync> VaultClient<T> {
    /// Initialize vaults for several mints in parallel.
    ///
    /// Mints are processed in batches of [`MAX_PARALLEL_INITIALIZATIONS`],
    /// one thread per mint within a batch. Results come back in `mints`
    /// order.
    pub fn initialize_vaults(
        &self,
        payer: &Pubkey,
        mints: &[Pubkey],
    ) -> Vec<std::result::Result<InitializeOutcome, ClientError>> {
        let mut results = Vec::with_capacity(mints.len());

        for batch in mints.chunks(MAX_PARALLEL_INITIALIZATIONS) {
            std::thread::scope(|scope| {
                let handles: Vec<_> = batch
                    .iter()
                    .map(|mint| scope.spawn(move || self.initialize_vault(payer, mint)))
                    .collect();

                results.extend(handles.into_iter().map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        Err(ClientError::SubmissionFailed(TransportError::Unconfirmed(
                            "initialization thread panicked".to_string(),
                        )))
                    })
                }));
            });
        }

        results
    }
}
