// Mint Vault - deterministic per-mint custody vault on Solana
// Security: Every address is re-derived on-chain before any state is written
// Architecture: One vault PDA per mint, holding the mint through its associated token account

use anchor_lang::prelude::*;

pub mod constants;
pub mod derivation;
pub mod errors;
pub mod events;
pub mod instructions;
pub mod state;
pub mod validation;

#[cfg(not(target_os = "solana"))]
pub mod client;

use instructions::*;

declare_id!("CVgxvZ7TwkyAuE8XY8ac35HkUNyAgBjgC5gyN2NA3TTA");

#[program]
pub mod mint_vault {
    use super::*;

    /// Initialize the vault for a mint
    ///
    /// Security considerations:
    /// - Payer must sign; it funds creation and gains no control over the vault
    /// - Vault and vault token addresses re-derived and validated on-chain
    /// - Vault token owner must be the vault PDA, never the payer
    /// - Repeated calls for an initialized vault succeed without writing state
    pub fn initialize_vault(ctx: Context<InitializeVault>) -> Result<()> {
        instructions::initialize_vault::handler(ctx)
    }
}
