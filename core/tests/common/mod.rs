#![allow(dead_code)]

use std::sync::Arc;

use vestige_core::{
    ClusterClock, ClusterConfig, CommitmentFlow, CreatorFlow, LaunchTerms, LocalCluster,
    RetryPolicy, Session,
};
use vestige_keypair::{Keypair, TransactionSigner};
use vestige_program::ProgramPolicy;
use vestige_pubkey::Pubkey;

pub const SOL: u64 = 1_000_000_000;
pub const START: i64 = 1_700_000_000;
pub const END: i64 = START + 86_400;
pub const SUPPLY: u64 = 1_000_000_000;
pub const WALLET: u64 = 10 * SOL;

pub fn terms() -> LaunchTerms {
    LaunchTerms {
        token_supply: SUPPLY,
        start_time: START,
        end_time: END,
        graduation_target: 10 * SOL,
        min_commitment: SOL / 10,
        max_commitment: 5 * SOL,
    }
}

/// A local cluster with one launch created by "creator" at `START`.
pub struct Harness {
    pub cluster: Arc<LocalCluster>,
    pub creator: CreatorFlow,
    pub creator_session: Arc<Session>,
    pub mint: Pubkey,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_policy(ProgramPolicy::default()).await
    }

    pub async fn with_policy(policy: ProgramPolicy) -> Self {
        let cluster = Arc::new(LocalCluster::new(ClusterConfig {
            policy,
            clock: ClusterClock::Manual(START),
            ..ClusterConfig::default()
        }));

        let creator_key = Keypair::from_label("creator");
        let mint = Pubkey::from_label("mint");
        cluster.airdrop(&creator_key.pubkey(), 100 * SOL).await;
        cluster
            .mint_tokens(&mint, &creator_key.pubkey(), SUPPLY)
            .await
            .unwrap();

        let creator_session = Arc::new(Session::new(
            Arc::new(creator_key),
            cluster.clone(),
            RetryPolicy::default(),
        ));
        let creator = CreatorFlow::new(creator_session.clone(), mint, cluster.validator());
        creator.create_launch(&terms()).await.unwrap();

        Self {
            cluster,
            creator,
            creator_session,
            mint,
        }
    }

    pub fn launch(&self) -> Pubkey {
        self.creator.launch()
    }

    pub fn session(&self, label: &str) -> Arc<Session> {
        Arc::new(Session::new(
            Arc::new(Keypair::from_label(label)),
            self.cluster.clone(),
            RetryPolicy::default(),
        ))
    }

    /// A participant holding `WALLET` lamports.
    pub async fn participant(&self, label: &str) -> CommitmentFlow {
        let session = self.session(label);
        self.cluster.airdrop(&session.identity(), WALLET).await;
        CommitmentFlow::new(session, self.launch(), self.cluster.validator())
    }

    pub async fn wallet(&self, flow: &CommitmentFlow) -> u64 {
        self.cluster.lamports(&flow.user()).await
    }

    pub async fn vault(&self) -> u64 {
        self.cluster
            .lamports(&vestige_account::seeds::derive_vault_pda(&self.launch()).0)
            .await
    }
}
