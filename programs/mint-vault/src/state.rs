use anchor_lang::prelude::*;

use crate::{constants::VAULT_RESERVED_LEN, errors::VaultError};

/// Initialization progress persisted on the vault.
///
/// A zeroed account decodes as `Unstarted`, so a freshly allocated vault
/// starts at the beginning of the sequence.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum VaultStage {
    Unstarted,
    VaultCreated,
    TokenAccountLinked,
    Initialized,
}

/// Program-owned custody record, one per mint
///
/// Security considerations:
/// - Address is derived from the mint, never chosen by the caller
/// - No payer or authority key is stored: control is structural, only this
///   program can sign for the vault
/// - Bump stored so the address is rebuilt without a search
/// - 64 bytes padding for future fields
#[account]
#[derive(Debug, PartialEq)]
pub struct VaultAccount {
    /// Mint this vault holds
    pub mint: Pubkey, // 32 bytes

    /// Associated token account owned by this vault
    pub vault_token: Pubkey, // 32 bytes

    /// Bump seed for the vault PDA
    pub bump: u8, // 1 byte

    /// Initialization progress
    pub stage: VaultStage, // 1 byte

    /// Unix timestamp at which the vault reached `Initialized`
    pub initialized_at: i64, // 8 bytes

    // Padding for future upgrades
    pub _reserved: [u8; VAULT_RESERVED_LEN], // 64 bytes
}

/// Values the initializer writes into the vault, all re-derived by the caller
#[derive(Clone, Copy, Debug)]
pub struct VaultLink {
    pub mint: Pubkey,
    pub bump: u8,
    pub vault_token: Pubkey,
    pub timestamp: i64,
}

/// Result of running the initializer against a vault record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitializationOutcome {
    /// This call walked the vault to `Initialized`
    Created,
    /// The vault was already initialized for this mint; nothing was written
    AlreadyInitialized,
}

impl VaultAccount {
    /// Record as it looks right after allocation
    pub fn unstarted() -> Self {
        Self {
            mint: Pubkey::default(),
            vault_token: Pubkey::default(),
            bump: 0,
            stage: VaultStage::Unstarted,
            initialized_at: 0,
            _reserved: [0; VAULT_RESERVED_LEN],
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.stage == VaultStage::Initialized
    }

    /// Drive the vault to `Initialized`.
    ///
    /// An initialized vault for the same mint is left untouched. A vault
    /// stopped at an intermediate stage resumes from that stage once the
    /// fields it already recorded are confirmed to match `link`.
    pub fn initialize(&mut self, link: &VaultLink) -> Result<InitializationOutcome> {
        if self.is_initialized() {
            require_keys_eq!(self.mint, link.mint, VaultError::InvalidMint);
            require_keys_eq!(self.vault_token, link.vault_token, VaultError::StateMismatch);
            return Ok(InitializationOutcome::AlreadyInitialized);
        }

        if self.stage != VaultStage::Unstarted {
            msg!("Resuming vault initialization from {:?}", self.stage);
        }

        while !self.is_initialized() {
            self.stage = self.advance(link)?;
        }

        Ok(InitializationOutcome::Created)
    }

    fn advance(&mut self, link: &VaultLink) -> Result<VaultStage> {
        match self.stage {
            VaultStage::Unstarted => {
                self.mint = link.mint;
                self.bump = link.bump;
                Ok(VaultStage::VaultCreated)
            }
            VaultStage::VaultCreated => {
                require_keys_eq!(self.mint, link.mint, VaultError::InvalidMint);
                require!(self.bump == link.bump, VaultError::InvalidBump);
                self.vault_token = link.vault_token;
                Ok(VaultStage::TokenAccountLinked)
            }
            VaultStage::TokenAccountLinked => {
                require_keys_eq!(self.mint, link.mint, VaultError::InvalidMint);
                require_keys_eq!(self.vault_token, link.vault_token, VaultError::StateMismatch);
                self.initialized_at = link.timestamp;
                Ok(VaultStage::Initialized)
            }
            VaultStage::Initialized => Ok(VaultStage::Initialized),
        }
    }
}
