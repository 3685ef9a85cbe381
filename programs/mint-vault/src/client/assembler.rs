//! Account role list for the `initialize_vault` instruction.

use std::fmt;

use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::{AccountMeta, Instruction};
use anchor_lang::{InstructionData, ToAccountMetas};

use super::{ClientError, InitializationRequest};

/// Every account the instruction touches, in instruction order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Payer,
    Mint,
    Vault,
    VaultToken,
    SystemProgram,
    TokenProgram,
    AssociatedTokenProgram,
    Rent,
}

impl Role {
    pub const ALL: [Role; 8] = [
        Role::Payer,
        Role::Mint,
        Role::Vault,
        Role::VaultToken,
        Role::SystemProgram,
        Role::TokenProgram,
        Role::AssociatedTokenProgram,
        Role::Rent,
    ];
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Payer => "payer",
            Role::Mint => "mint",
            Role::Vault => "vault",
            Role::VaultToken => "vault_token",
            Role::SystemProgram => "system_program",
            Role::TokenProgram => "token_program",
            Role::AssociatedTokenProgram => "associated_token_program",
            Role::Rent => "rent",
        };
        f.write_str(name)
    }
}

/// Addresses filled in per role. Assembly fails while any role is empty.
#[derive(Clone, Copy, Debug, Default)]
pub struct InitializeVaultRoles {
    pub payer: Option<Pubkey>,
    pub mint: Option<Pubkey>,
    pub vault: Option<Pubkey>,
    pub vault_token: Option<Pubkey>,
    pub system_program: Option<Pubkey>,
    pub token_program: Option<Pubkey>,
    pub associated_token_program: Option<Pubkey>,
    pub rent: Option<Pubkey>,
}

impl InitializeVaultRoles {
    pub fn from_request(request: &InitializationRequest) -> Self {
        Self {
            payer: Some(request.payer),
            mint: Some(request.mint),
            vault: Some(request.vault),
            vault_token: Some(request.vault_token),
            system_program: Some(request.system_program),
            token_program: Some(request.token_program),
            associated_token_program: Some(request.associated_token_program),
            rent: Some(request.rent),
        }
    }

    pub fn get(&self, role: Role) -> Option<Pubkey> {
        match role {
            Role::Payer => self.payer,
            Role::Mint => self.mint,
            Role::Vault => self.vault,
            Role::VaultToken => self.vault_token,
            Role::SystemProgram => self.system_program,
            Role::TokenProgram => self.token_program,
            Role::AssociatedTokenProgram => self.associated_token_program,
            Role::Rent => self.rent,
        }
    }

    fn require(&self, role: Role) -> std::result::Result<Pubkey, ClientError> {
        self.get(role).ok_or(ClientError::MissingRole(role))
    }

    /// Client accounts struct generated for the instruction, so ordering and
    /// flags always follow the on-chain `InitializeVault` definition
    pub fn accounts(&self) -> std::result::Result<crate::accounts::InitializeVault, ClientError> {
        Ok(crate::accounts::InitializeVault {
            payer: self.require(Role::Payer)?,
            mint: self.require(Role::Mint)?,
            vault: self.require(Role::Vault)?,
            vault_token: self.require(Role::VaultToken)?,
            system_program: self.require(Role::SystemProgram)?,
            token_program: self.require(Role::TokenProgram)?,
            associated_token_program: self.require(Role::AssociatedTokenProgram)?,
            rent: self.require(Role::Rent)?,
        })
    }

    pub fn account_metas(&self) -> std::result::Result<Vec<AccountMeta>, ClientError> {
        Ok(self.accounts()?.to_account_metas(None))
    }

    pub fn instruction(&self, program_id: &Pubkey) -> std::result::Result<Instruction, ClientError> {
        Ok(Instruction {
            program_id: *program_id,
            accounts: self.account_metas()?,
            data: crate::instruction::InitializeVault {}.data(),
        })
    }
}
