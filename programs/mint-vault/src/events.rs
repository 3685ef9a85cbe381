use anchor_lang::prelude::*;

/// Event emitted when a vault and its token account are created for a mint
#[event]
pub struct VaultInitialized {
    pub vault: Pubkey,
    pub mint: Pubkey,
    pub vault_token: Pubkey,
    pub bump: u8,
    pub timestamp: i64,
}
