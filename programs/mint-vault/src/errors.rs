use anchor_lang::prelude::*;

/// Custom error codes for the Mint Vault program
///
/// Only failures are listed here. An already initialized vault is not an
/// error: the instruction returns success without touching state.
#[error_code]
pub enum VaultError {
    #[msg("No bump seed yields a valid program address for these seeds")]
    DerivationExhausted,

    #[msg("Bump seed does not reproduce the expected program address")]
    InvalidBump,

    #[msg("Supplied account address does not match the derived address")]
    AddressMismatch,

    #[msg("Supplied account owner does not match the expected owner")]
    OwnerMismatch,

    #[msg("Supplied account state does not match the expected state")]
    StateMismatch,

    #[msg("Invalid token mint - does not match the vault mint")]
    InvalidMint,
}

/// Program error code carried by an Anchor error, if it has one
pub fn error_code(err: &anchor_lang::error::Error) -> Option<u32> {
    match err {
        anchor_lang::error::Error::AnchorError(anchor_error) => {
            Some(anchor_error.error_code_number)
        }
        anchor_lang::error::Error::ProgramError(_) => None,
    }
}
