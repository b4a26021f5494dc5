#![allow(dead_code)]

use std::collections::HashMap;

use vestige_account::{
    Account, AccountRecord, DELEGATION_PROGRAM_ID, DELEGATION_STATE_DELEGATED, DelegationRecord,
    seeds,
};
use vestige_keypair::{Keypair, TransactionSigner};
use vestige_program::{
    AccountInfo, Effect, InvokeContext, ProgramPolicy, VestigeError, client,
    instruction::InitializeLaunchParams, process_instruction,
};
use vestige_pubkey::Pubkey;
use vestige_transaction::{Instruction, Layer};

pub const SOL: u64 = 1_000_000_000;
pub const START: i64 = 1_700_000_000;
pub const END: i64 = START + 86_400;

/// Single-layer harness: runs instructions straight through the program
/// against an in-memory account map, committing only on success.
pub struct TestFixture {
    pub accounts: HashMap<Pubkey, Account>,
    pub layer: Layer,
    pub now: i64,
    pub policy: ProgramPolicy,
    pub creator: Keypair,
    pub mint: Pubkey,
    pub launch: Pubkey,
    pub effects: Vec<Effect>,
    pub logs: Vec<String>,
}

impl TestFixture {
    pub fn new() -> Self {
        let creator = Keypair::from_label("creator");
        let mint = Pubkey::from_label("mint");
        let (launch, _) = seeds::derive_launch_pda(&creator.pubkey(), &mint);
        let mut fixture = Self {
            accounts: HashMap::new(),
            layer: Layer::Base,
            now: START,
            policy: ProgramPolicy::default(),
            creator,
            mint,
            launch,
            effects: Vec::new(),
            logs: Vec::new(),
        };
        fixture.airdrop(&fixture.creator.pubkey(), 100 * SOL);
        fixture
    }

    pub fn airdrop(&mut self, to: &Pubkey, lamports: u64) {
        self.accounts
            .entry(*to)
            .or_insert_with(|| Account::new_wallet(0))
            .lamports += lamports;
    }

    pub fn user(&mut self, label: &str, lamports: u64) -> Keypair {
        let kp = Keypair::from_label(label);
        self.airdrop(&kp.pubkey(), lamports);
        kp
    }

    pub fn send(&mut self, ix: Instruction) -> Result<(), VestigeError> {
        let mut infos: Vec<AccountInfo> = ix
            .accounts
            .iter()
            .map(|meta| {
                let account = self.accounts.get(&meta.pubkey).cloned().unwrap_or_default();
                AccountInfo::new(meta.pubkey, meta.is_signer, meta.is_writable, account)
            })
            .collect();

        let mut ctx = InvokeContext::new(self.layer, self.now, self.policy);
        process_instruction(&mut ctx, &ix.program_id, &mut infos, &ix.data)?;

        for info in infos {
            if info.is_writable {
                self.accounts.insert(info.key, info.account);
            }
        }
        let (logs, effects) = ctx.into_parts();
        for effect in &effects {
            if let Effect::Delegate { account, owner_program, validator } = effect {
                self.apply_delegate(account, owner_program, validator);
            }
        }
        self.logs.extend(logs);
        self.effects.extend(effects);
        Ok(())
    }

    fn apply_delegate(&mut self, account: &Pubkey, owner_program: &Pubkey, validator: &Pubkey) {
        if let Some(acc) = self.accounts.get_mut(account) {
            acc.owner = DELEGATION_PROGRAM_ID;
        }
        let record = DelegationRecord {
            account: *account,
            owner_program: *owner_program,
            validator: *validator,
            state: DELEGATION_STATE_DELEGATED,
            requested_at: self.now,
        };
        let (record_pda, _) = seeds::derive_delegation_record_pda(account);
        self.accounts.insert(
            record_pda,
            Account::new_owned(DELEGATION_PROGRAM_ID, record.to_account_data().unwrap()),
        );
    }

    pub fn load<T: AccountRecord>(&self, address: &Pubkey) -> T {
        let account = self.accounts.get(address).expect("account missing");
        T::from_account_data(&account.data).expect("decode failed")
    }

    pub fn lamports(&self, address: &Pubkey) -> u64 {
        self.accounts.get(address).map(|a| a.lamports).unwrap_or(0)
    }

    pub fn launch_params(&self) -> InitializeLaunchParams {
        InitializeLaunchParams {
            token_mint: self.mint,
            token_supply: 1_000_000_000,
            start_time: START,
            end_time: END,
            graduation_target: 10 * SOL,
            min_commitment: SOL / 10,
            max_commitment: 5 * SOL,
        }
    }

    pub fn initialize_launch(&mut self) -> Result<(), VestigeError> {
        let ix = client::initialize_launch(&self.creator.pubkey(), &self.launch_params())?;
        self.send(ix)
    }

    pub fn init_participant(&mut self, user: &Keypair) -> Result<(), VestigeError> {
        self.send(client::init_user_commitment(&user.pubkey(), &self.launch))?;
        self.send(client::init_ephemeral_holding(&user.pubkey(), &self.launch))
    }

    pub fn commit(&mut self, user: &Keypair, amount: u64) -> Result<(), VestigeError> {
        let ix = client::commit(&user.pubkey(), &self.launch, amount)?;
        self.send(ix)
    }

    pub fn graduate(&mut self) -> Result<(), VestigeError> {
        let ix = client::graduate(&self.creator.pubkey(), &self.launch);
        self.send(ix)
    }

    pub fn pool(&self) -> Pubkey {
        seeds::derive_pool_pda(&self.launch).0
    }

    pub fn vault(&self) -> Pubkey {
        seeds::derive_vault_pda(&self.launch).0
    }
}
