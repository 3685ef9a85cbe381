use anchor_lang::prelude::*;
use anchor_spl::{
    associated_token::AssociatedToken,
    token::{Mint, Token, TokenAccount},
};

use crate::{
    constants::*,
    derivation::{derive_vault_address, vault_token_address},
    errors::VaultError,
    events::VaultInitialized,
    state::*,
    validation::{validate, AccountSnapshot, AccountState},
};

/// Create the vault PDA for a mint and its associated token account
///
/// Security checklist:
/// ✅ 1. SIGNER VALIDATION: Payer must sign and funds both creations
/// ✅ 2. ACCOUNT OWNERSHIP: Vault owned by this program, vault token owned by vault
/// ✅ 3. PDA VALIDATION: Vault re-derived from the mint with the canonical bump
/// ✅ 4. IDEMPOTENCY: Existing accounts are accepted, an initialized vault is a no-op
/// ✅ 5. EVENTS: Emits VaultInitialized on creation only
#[derive(Accounts)]
pub struct InitializeVault<'info> {
    /// Payer for account creation
    /// Security: Must be signer, not recorded in vault state
    #[account(mut)]
    pub payer: Signer<'info>,

    /// Mint the vault is created for
    /// Security: No constraints needed - any valid mint can have a vault
    pub mint: Account<'info, Mint>,

    /// Vault PDA
    /// Security: Seeds bind the address to the mint, accepted if it already exists
    #[account(
        init_if_needed,
        payer = payer,
        space = VAULT_ACCOUNT_SIZE,
        seeds = [VAULT_SEED, mint.key().as_ref()],
        bump
    )]
    pub vault: Account<'info, VaultAccount>,

    /// Vault's token account for holding the mint
    /// Security: Associated token account of (vault, mint)
    #[account(
        init_if_needed,
        payer = payer,
        associated_token::mint = mint,
        associated_token::authority = vault,
    )]
    pub vault_token: Account<'info, TokenAccount>,

    pub system_program: Program<'info, System>,
    pub token_program: Program<'info, Token>,
    pub associated_token_program: Program<'info, AssociatedToken>,
    pub rent: Sysvar<'info, Rent>,
}

/// Accounts handed to the instruction, reduced to what verification reads
#[derive(Clone, Copy, Debug)]
pub struct SuppliedAccounts {
    pub vault: AccountSnapshot,
    pub vault_token: AccountSnapshot,
    pub vault_token_mint: Pubkey,
}

impl SuppliedAccounts {
    /// Snapshot the loaded vault record and its token account
    pub fn new(
        vault_address: Pubkey,
        vault_owner: Pubkey,
        vault: &VaultAccount,
        vault_token_address: Pubkey,
        vault_token: &TokenAccount,
    ) -> Self {
        let vault_state = if vault.is_initialized() {
            AccountState::Initialized
        } else {
            AccountState::Uninitialized
        };

        Self {
            vault: AccountSnapshot::new(vault_address, vault_owner, vault_state),
            vault_token: AccountSnapshot::new(
                vault_token_address,
                vault_token.owner,
                AccountState::Initialized,
            ),
            vault_token_mint: vault_token.mint,
        }
    }
}

/// Re-derive every address from the mint and check the supplied accounts
/// against it. Returns the values the initializer records.
pub fn verify_accounts(
    program_id: &Pubkey,
    mint: &Pubkey,
    supplied: &SuppliedAccounts,
    timestamp: i64,
) -> Result<VaultLink> {
    let (vault, bump) = derive_vault_address(mint, program_id)?;
    validate(&vault, &supplied.vault, Some(program_id), None)?;

    let vault_token = vault_token_address(&vault, mint);
    validate(
        &vault_token,
        &supplied.vault_token,
        Some(&vault),
        Some(AccountState::Initialized),
    )?;
    require_keys_eq!(supplied.vault_token_mint, *mint, VaultError::InvalidMint);

    Ok(VaultLink {
        mint: *mint,
        bump,
        vault_token,
        timestamp,
    })
}

/// Instruction body once the account constraints have passed.
///
/// Anchor's seeds and associated token constraints reject substituted
/// accounts before this runs; the checks here repeat them against the
/// re-derived addresses and guard the persisted record.
pub fn process_initialize(
    program_id: &Pubkey,
    mint: &Pubkey,
    supplied: &SuppliedAccounts,
    vault: &mut VaultAccount,
    canonical_bump: u8,
    timestamp: i64,
) -> Result<InitializationOutcome> {
    // CHECKS: Re-derive and validate everything the client supplied
    let link = verify_accounts(program_id, mint, supplied, timestamp)?;
    require!(link.bump == canonical_bump, VaultError::InvalidBump);

    // EFFECTS: Walk the vault to Initialized
    let outcome = vault.initialize(&link)?;
    match outcome {
        InitializationOutcome::Created => {
            emit!(VaultInitialized {
                vault: supplied.vault.address,
                mint: *mint,
                vault_token: link.vault_token,
                bump: link.bump,
                timestamp: link.timestamp,
            });
        }
        InitializationOutcome::AlreadyInitialized => {
            msg!(
                "Vault {} already initialized for mint {}",
                supplied.vault.address,
                mint
            );
        }
    }

    Ok(outcome)
}

pub fn handler(ctx: Context<InitializeVault>) -> Result<()> {
    let mint = ctx.accounts.mint.key();
    let supplied = SuppliedAccounts::new(
        ctx.accounts.vault.key(),
        *ctx.accounts.vault.to_account_info().owner,
        &ctx.accounts.vault,
        ctx.accounts.vault_token.key(),
        &ctx.accounts.vault_token,
    );
    let timestamp = Clock::get()?.unix_timestamp;

    process_initialize(
        ctx.program_id,
        &mint,
        &supplied,
        &mut ctx.accounts.vault,
        ctx.bumps.vault,
        timestamp,
    )?;

    Ok(())
}
