//! In-memory ledger used as the transport in integration tests.
//!
//! `submit` applies the account constraints Anchor generates for
//! `InitializeVault`, then runs the instruction body (`process_initialize`)
//! against a working copy of the accounts and commits it only on success, the
//! way the runtime commits a transaction. A single mutex serializes
//! transactions.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::Instruction;
use anchor_lang::error::ErrorCode;
use anchor_lang::Discriminator;
use anchor_spl::token::TokenAccount;
use mint_vault::{
    client::{RawAccount, TransactionId, Transport, TransportError},
    constants::VAULT_ACCOUNT_SIZE,
    derivation::{derive_vault_address, vault_token_address},
    errors::error_code,
    instructions::{process_initialize, SuppliedAccounts},
    state::{InitializationOutcome, VaultAccount},
};

/// Message of the associated token program when the address is not the
/// derived one
pub const INVALID_SEEDS: &str = "Provided seeds do not result in a valid address";

/// Size of an SPL token account
const TOKEN_ACCOUNT_LEN: usize = 165;

/// Encode an initialized SPL token account with no delegate, not native and
/// no close authority.
pub fn token_account_data(mint: &Pubkey, owner: &Pubkey) -> Vec<u8> {
    let mut data = vec![0u8; TOKEN_ACCOUNT_LEN];
    data[0..32].copy_from_slice(mint.as_ref());
    data[32..64].copy_from_slice(owner.as_ref());
    // amount (8) + delegate option (36) precede the state byte
    data[108] = 1;
    data
}

pub fn vault_account_data(vault: &VaultAccount) -> Vec<u8> {
    let mut data = Vec::with_capacity(VAULT_ACCOUNT_SIZE);
    vault.try_serialize(&mut data).unwrap();
    data.resize(VAULT_ACCOUNT_SIZE, 0);
    data
}

#[derive(Clone, Default)]
struct LedgerState {
    accounts: HashMap<Pubkey, RawAccount>,
    mints: HashMap<Pubkey, u8>,
    vault_creations: usize,
    token_account_creations: usize,
    initialized_events: usize,
    transactions: u64,
}

fn rejected(err: &anchor_lang::error::Error) -> TransportError {
    TransportError::Rejected {
        code: error_code(err),
        message: err.to_string(),
    }
}

fn rejected_with(code: ErrorCode) -> TransportError {
    let message = format!("{:?}", code);
    TransportError::Rejected {
        code: Some(code as u32),
        message,
    }
}

pub struct Ledger {
    program_id: Pubkey,
    state: Mutex<LedgerState>,
    wallet: Mutex<HashSet<Pubkey>>,
    clock: i64,
    drop_next_confirmation: AtomicBool,
    fail_next_submission: AtomicBool,
    refuse_signatures: AtomicBool,
}

impl Ledger {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            state: Mutex::new(LedgerState::default()),
            wallet: Mutex::new(HashSet::new()),
            clock: 1_700_000_000,
            drop_next_confirmation: AtomicBool::new(false),
            fail_next_submission: AtomicBool::new(false),
            refuse_signatures: AtomicBool::new(false),
        }
    }

    /// Fresh key the wallet can sign for
    pub fn new_payer(&self) -> Pubkey {
        let payer = Pubkey::new_unique();
        self.wallet.lock().unwrap().insert(payer);
        payer
    }

    pub fn create_mint(&self, decimals: u8) -> Pubkey {
        let mint = Pubkey::new_unique();
        self.state.lock().unwrap().mints.insert(mint, decimals);
        mint
    }

    pub fn insert_token_account(&self, address: Pubkey, mint: &Pubkey, owner: &Pubkey) {
        self.state.lock().unwrap().accounts.insert(
            address,
            RawAccount {
                owner: anchor_spl::token::ID,
                data: token_account_data(mint, owner),
            },
        );
    }

    pub fn insert_vault(&self, address: Pubkey, owner: Pubkey, vault: &VaultAccount) {
        self.state.lock().unwrap().accounts.insert(
            address,
            RawAccount {
                owner,
                data: vault_account_data(vault),
            },
        );
    }

    /// Commit the next transaction but report it as unconfirmed
    pub fn drop_next_confirmation(&self) {
        self.drop_next_confirmation.store(true, Ordering::SeqCst);
    }

    /// Lose the next transaction before it reaches the program
    pub fn fail_next_submission(&self) {
        self.fail_next_submission.store(true, Ordering::SeqCst);
    }

    /// The wallet claims keys but produces no signatures
    pub fn refuse_signatures(&self) {
        self.refuse_signatures.store(true, Ordering::SeqCst);
    }

    pub fn vault_creations(&self) -> usize {
        self.state.lock().unwrap().vault_creations
    }

    pub fn token_account_creations(&self) -> usize {
        self.state.lock().unwrap().token_account_creations
    }

    pub fn initialized_events(&self) -> usize {
        self.state.lock().unwrap().initialized_events
    }

    pub fn transactions(&self) -> u64 {
        self.state.lock().unwrap().transactions
    }

    pub fn account(&self, address: &Pubkey) -> Option<RawAccount> {
        self.state.lock().unwrap().accounts.get(address).cloned()
    }

    pub fn vault(&self, address: &Pubkey) -> Option<VaultAccount> {
        self.account(address)
            .map(|raw| VaultAccount::try_deserialize(&mut raw.data.as_slice()).unwrap())
    }

    pub fn token_account(&self, address: &Pubkey) -> Option<TokenAccount> {
        self.account(address)
            .map(|raw| TokenAccount::try_deserialize(&mut raw.data.as_slice()).unwrap())
    }

    fn execute(
        &self,
        state: &mut LedgerState,
        instruction: &Instruction,
        signers: &[Pubkey],
    ) -> std::result::Result<(), TransportError> {
        if instruction.program_id != self.program_id
            || instruction.data != mint_vault::instruction::InitializeVault::DISCRIMINATOR
        {
            return Err(rejected_with(ErrorCode::InstructionFallbackNotFound));
        }
        if instruction.accounts.len() != 8 {
            return Err(rejected_with(ErrorCode::AccountNotEnoughKeys));
        }

        let payer = &instruction.accounts[0];
        if !payer.is_signer
            || !signers.contains(&payer.pubkey)
            || self.refuse_signatures.load(Ordering::SeqCst)
        {
            return Err(rejected_with(ErrorCode::AccountNotSigner));
        }

        let mint = instruction.accounts[1].pubkey;
        if !state.mints.contains_key(&mint) {
            return Err(rejected_with(ErrorCode::AccountNotInitialized));
        }

        // vault: seeds, then init_if_needed
        let (expected_vault, canonical_bump) =
            derive_vault_address(&mint, &self.program_id).map_err(|err| rejected(&err))?;
        let vault_address = instruction.accounts[2].pubkey;
        if vault_address != expected_vault {
            return Err(rejected_with(ErrorCode::ConstraintSeeds));
        }
        match state.accounts.get(&vault_address) {
            None => {
                state.accounts.insert(
                    vault_address,
                    RawAccount {
                        owner: self.program_id,
                        data: vault_account_data(&VaultAccount::unstarted()),
                    },
                );
                state.vault_creations += 1;
            }
            Some(raw) if raw.owner != self.program_id => {
                return Err(rejected_with(ErrorCode::AccountOwnedByWrongProgram));
            }
            Some(_) => {}
        }

        // vault_token: created through the associated token program, then
        // the associated_token constraints
        let expected_vault_token = vault_token_address(&vault_address, &mint);
        let vault_token_key = instruction.accounts[3].pubkey;
        match state.accounts.get(&vault_token_key) {
            None => {
                if vault_token_key != expected_vault_token {
                    return Err(TransportError::Rejected {
                        code: None,
                        message: INVALID_SEEDS.to_string(),
                    });
                }
                state.accounts.insert(
                    vault_token_key,
                    RawAccount {
                        owner: anchor_spl::token::ID,
                        data: token_account_data(&mint, &vault_address),
                    },
                );
                state.token_account_creations += 1;
            }
            Some(raw) if raw.owner != anchor_spl::token::ID => {
                return Err(rejected_with(ErrorCode::AccountOwnedByWrongProgram));
            }
            Some(_) => {}
        }
        let token =
            TokenAccount::try_deserialize(&mut state.accounts[&vault_token_key].data.as_slice())
                .map_err(|err| rejected(&err))?;
        if token.mint != mint {
            return Err(rejected_with(ErrorCode::ConstraintTokenMint));
        }
        if token.owner != vault_address {
            return Err(rejected_with(ErrorCode::ConstraintTokenOwner));
        }
        if vault_token_key != expected_vault_token {
            return Err(rejected_with(ErrorCode::AccountNotAssociatedTokenAccount));
        }

        let vault_owner = state.accounts[&vault_address].owner;
        let mut vault =
            VaultAccount::try_deserialize(&mut state.accounts[&vault_address].data.as_slice())
                .map_err(|err| rejected(&err))?;
        let supplied =
            SuppliedAccounts::new(vault_address, vault_owner, &vault, vault_token_key, &token);

        let outcome = process_initialize(
            &self.program_id,
            &mint,
            &supplied,
            &mut vault,
            canonical_bump,
            self.clock,
        )
        .map_err(|err| rejected(&err))?;
        if outcome == InitializationOutcome::Created {
            state.initialized_events += 1;
        }

        state.accounts.insert(
            vault_address,
            RawAccount {
                owner: vault_owner,
                data: vault_account_data(&vault),
            },
        );
        Ok(())
    }
}

impl Transport for Ledger {
    fn get_account(&self, address: &Pubkey) -> std::result::Result<Option<RawAccount>, TransportError> {
        Ok(self.account(address))
    }

    fn submit(
        &self,
        instruction: Instruction,
        signers: &[Pubkey],
    ) -> std::result::Result<TransactionId, TransportError> {
        if self.fail_next_submission.swap(false, Ordering::SeqCst) {
            return Err(TransportError::Unconfirmed("connection reset".to_string()));
        }

        let mut state = self.state.lock().unwrap();
        let mut working = state.clone();
        self.execute(&mut working, &instruction, signers)?;

        working.transactions += 1;
        let transaction_id = TransactionId(format!("tx-{}", working.transactions));
        *state = working;

        if self.drop_next_confirmation.swap(false, Ordering::SeqCst) {
            return Err(TransportError::Unconfirmed(
                "timed out awaiting confirmation".to_string(),
            ));
        }
        Ok(transaction_id)
    }

    fn can_sign(&self, signer: &Pubkey) -> bool {
        self.wallet.lock().unwrap().contains(signer)
    }
}
