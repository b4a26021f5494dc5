//! Local Sale Simulation
//!
//! Runs one launch end to end on an in-process two-layer cluster and
//! reports what every participant ended up with.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;
use vestige_account::seeds;
use vestige_config::VestigeConfig;
use vestige_core::{
    ClusterClock, CommitmentFlow, CommitmentState, CreatorFlow, LaunchTerms, LocalCluster,
    RuntimeConfig, Session, Sweeper,
};
use vestige_keypair::{Keypair, TransactionSigner};
use vestige_pubkey::Pubkey;
use vestige_transaction::Layer;

const SOL: u64 = 1_000_000_000;
const SALE_SECS: i64 = 3_600;
const WALLET_LAMPORTS: u64 = 10 * SOL;
/// Commit sizes handed out to participants in turn, in lamports.
const COMMIT_PATTERN: [u64; 5] = [SOL, 2 * SOL, 5 * SOL / 2, 5 * SOL / 2, 5 * SOL / 2];

/// Configuration for a simulated sale
#[derive(Debug, Clone)]
pub struct SimulateConfig {
    /// Route commitments through the execution layer
    pub private: bool,
    pub participants: usize,
    /// Seconds between consecutive commits
    pub spacing_secs: i64,
}

impl Default for SimulateConfig {
    fn default() -> Self {
        Self {
            private: false,
            participants: 5,
            spacing_secs: 60,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ParticipantReport {
    pub label: String,
    pub identity: String,
    pub committed: u64,
    pub weight_bps: u64,
    pub tokens: u64,
    pub state: CommitmentState,
}

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub mode: &'static str,
    pub launch: String,
    pub total_committed: u64,
    pub total_participants: u64,
    pub tokens_claimed: u64,
    pub token_supply: u64,
    pub withdrawn: u64,
    pub participants: Vec<ParticipantReport>,
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub async fn run_simulation(config: SimulateConfig) -> Result<SimulationReport> {
    let file_config = VestigeConfig::load().context("Failed to load configuration")?;
    let start = unix_now();
    let runtime = RuntimeConfig::from_config(&file_config).with_clock(ClusterClock::Manual(start));
    info!("Simulation settings: {:?}", runtime.summary());

    let cluster = Arc::new(LocalCluster::new(runtime.cluster.clone()));
    let session = |key: Keypair| Arc::new(Session::new(Arc::new(key), cluster.clone(), runtime.retry));

    // Creator and launch
    let creator_key = Keypair::from_label("simulation-creator");
    let mint = Pubkey::from_label("simulation-mint");
    let terms = LaunchTerms {
        token_supply: 1_000_000_000,
        start_time: start,
        end_time: start + SALE_SECS,
        graduation_target: 10 * SOL,
        min_commitment: SOL / 10,
        max_commitment: 5 * SOL,
    };
    cluster.airdrop(&creator_key.pubkey(), 100 * SOL).await;
    cluster
        .mint_tokens(&mint, &creator_key.pubkey(), terms.token_supply)
        .await
        .context("Failed to mint sale supply")?;

    let creator_session = session(creator_key);
    let creator = CreatorFlow::new(creator_session.clone(), mint, cluster.validator());
    creator.create_launch(&terms).await?;
    if config.private {
        creator.enable_private_mode(Vec::new()).await?;
    }
    info!("Launch {} ready ({} mode)", creator.launch(), mode(&config));

    // Commit phase
    let mut flows = Vec::with_capacity(config.participants);
    for i in 0..config.participants {
        let label = format!("participant-{i}");
        let participant = session(Keypair::from_label(&label));
        cluster.airdrop(&participant.identity(), WALLET_LAMPORTS).await;

        let flow = CommitmentFlow::new(participant, creator.launch(), cluster.validator());
        let amount = COMMIT_PATTERN[i % COMMIT_PATTERN.len()];
        match flow.commit(amount).await {
            Ok(state) => info!("{} committed {} lamports ({})", label, amount, state),
            Err(e) => warn!("{} could not commit {} lamports: {}", label, amount, e),
        }
        flows.push((label, flow));
        cluster.advance_clock(config.spacing_secs).await;
    }

    // Graduation
    cluster.set_unix_timestamp(start + SALE_SECS).await;
    creator.graduate_auto().await.context("Graduation failed")?;

    // Private holdings come home first; the sweeper moves them into the Vault.
    if config.private {
        let sweeper = Sweeper::new(creator_session.clone(), creator.launch(), runtime.sweeper);
        for (label, flow) in &flows {
            sweeper.register(flow.user());
            if let Err(e) = flow.undelegate().await {
                warn!("{} could not undelegate: {}", label, e);
            }
        }
        let report = sweeper.run_once().await?;
        info!(
            "Sweep: {} swept, {} pending, {} failed",
            report.swept, report.pending, report.failed
        );
    }

    let mut participants = Vec::with_capacity(flows.len());
    for (label, flow) in &flows {
        let state = flow
            .settle()
            .await
            .with_context(|| format!("Failed to settle {label}"))?;
        let commitment: Option<vestige_account::UserCommitment> = flow
            .session()
            .fetch_record(Layer::Base, &flow.addresses().commitment)
            .await?;
        let allocation = flow.allocation().await?;
        participants.push(ParticipantReport {
            label: label.clone(),
            identity: flow.user().to_string(),
            committed: commitment.map(|c| c.amount).unwrap_or(0),
            weight_bps: allocation.map(|a| a.weight_bps).unwrap_or(0),
            tokens: allocation.map(|a| a.tokens_allocated).unwrap_or(0),
            state,
        });
    }

    let withdrawn = creator.withdraw_funds().await?;
    let launch = creator.launch_state().await?;
    let vault = cluster.lamports(&seeds::derive_vault_pda(&creator.launch()).0).await;
    if vault != 0 {
        warn!("Vault still holds {} lamports after withdrawal", vault);
    }

    Ok(SimulationReport {
        mode: mode(&config),
        launch: creator.launch().to_string(),
        total_committed: launch.total_committed,
        total_participants: launch.total_participants,
        tokens_claimed: participants.iter().map(|p| p.tokens).sum(),
        token_supply: launch.token_supply,
        withdrawn,
        participants,
    })
}

fn mode(config: &SimulateConfig) -> &'static str {
    if config.private { "private" } else { "public" }
}
