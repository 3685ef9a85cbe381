//! Deterministic addressing for vault accounts.
//!
//! The same functions run on the client before assembling a transaction and
//! inside the program when it re-derives the accounts it was handed, so both
//! sides always agree on the addresses for a given mint.

use anchor_lang::prelude::*;
use anchor_spl::associated_token::get_associated_token_address;

use crate::{constants::VAULT_SEED, errors::VaultError};

/// Derive a program address from a namespace tag and ordered input keys.
///
/// Returns the canonical bump: the highest bump (searching down from 255)
/// whose address falls off the ed25519 curve. Callers persist the bump so the
/// address can later be rebuilt with [`vault_address_with_bump`] instead of
/// searching again.
pub fn derive(namespace: &[u8], keys: &[&Pubkey], program_id: &Pubkey) -> Result<(Pubkey, u8)> {
    let mut seeds: Vec<&[u8]> = Vec::with_capacity(keys.len() + 1);
    seeds.push(namespace);
    seeds.extend(keys.iter().map(|key| key.as_ref()));

    Pubkey::try_find_program_address(&seeds, program_id).ok_or_else(|| {
        msg!("No valid bump for namespace {:?}", namespace);
        error!(VaultError::DerivationExhausted)
    })
}

/// Vault PDA for a mint: seeds `["vault", mint]`
pub fn derive_vault_address(mint: &Pubkey, program_id: &Pubkey) -> Result<(Pubkey, u8)> {
    derive(VAULT_SEED, &[mint], program_id)
}

/// Rebuild the vault PDA from a stored bump without a search
pub fn vault_address_with_bump(mint: &Pubkey, bump: u8, program_id: &Pubkey) -> Result<Pubkey> {
    Pubkey::create_program_address(&[VAULT_SEED, mint.as_ref(), &[bump]], program_id)
        .map_err(|_| error!(VaultError::InvalidBump))
}

/// Token account held by the vault for its mint.
///
/// Delegated to the associated token account derivation so wallets and
/// explorers locate the same account.
pub fn vault_token_address(vault: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address(vault, mint)
}
