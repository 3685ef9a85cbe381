// Constants for the Mint Vault program

/// Namespace seed for the per-mint vault PDA
pub const VAULT_SEED: &[u8] = b"vault";

/// Reserved bytes kept at the end of the vault account for later fields
pub const VAULT_RESERVED_LEN: usize = 64;

/// Space for VaultAccount (8 discriminator + 32 mint + 32 vault_token +
/// 1 bump + 1 stage + 8 initialized_at + 64 padding)
pub const VAULT_ACCOUNT_SIZE: usize = 8 + 32 + 32 + 1 + 1 + 8 + VAULT_RESERVED_LEN;
