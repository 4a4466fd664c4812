#![forbid(unsafe_code)]
//! Mines a short chain on top of in-memory state.
//!
//! Every round assembles a task from the mempool, searches for a nonce with
//! the configured number of threads and verifies the sealed block. When the
//! coinbase key is generated locally, each mined reward is partly spent in
//! the following block so the pending-transaction path is exercised too.

use clap::Parser;
use colored::Colorize;
use forgechain::blockchain::{AccountState, AccountStateView, BlockHeader, TransferChainView};
use forgechain::config::load_config;
use forgechain::crypto::{address_from_string, address_to_hex, KeyPair};
use forgechain::economics::HalvingReward;
use forgechain::mempool::Mempool;
use forgechain::miner::{AssemblyContext, DifficultyTarget, DivisorTarget, Miner, RoundOutcome, Task};
use forgechain::transaction::{Amount, Transaction};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "forge-miner", about = "Assemble and mine ForgeChain blocks")]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "forgechain.toml")]
    config: PathBuf,

    /// Worker threads (overrides config; 0 = one per CPU)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Difficulty of every mined block (overrides config)
    #[arg(short, long)]
    difficulty: Option<u64>,

    /// Number of blocks to mine
    #[arg(short, long, default_value_t = 3)]
    blocks: u64,

    /// Print each mined block as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args.config)?;
    if !config.miner.enabled {
        warn!("mining is disabled in {}", args.config.display());
        return Ok(());
    }

    let threads = args.threads.unwrap_or(config.miner.threads);
    let difficulty = args.difficulty.unwrap_or(config.chain.initial_difficulty);

    // Without a configured coinbase, mine to a fresh key we can spend from.
    let configured = config.miner.coinbase_address()?;
    let local_key = if configured == [0u8; 32] {
        Some(KeyPair::generate()?)
    } else {
        None
    };
    let coinbase = local_key.as_ref().map_or(configured, KeyPair::address);

    let miner = Miner::new(threads, DivisorTarget);
    let reward_policy = HalvingReward::default();
    let chain = TransferChainView;
    let mut state = AccountState::new();
    let mut mempool = Mempool::new();
    let recipient = address_from_string("forge-miner demo recipient");

    info!(
        "mining {} blocks to {} with {} threads at difficulty {}",
        args.blocks,
        address_to_hex(&coinbase),
        miner.threads(),
        difficulty
    );

    let mut previous_hash = [0u8; 32];
    for height in 1..=args.blocks {
        let candidates = mempool.candidates(config.chain.max_block_transactions);
        let mut ctx = AssemblyContext {
            coinbase,
            pending: &mut mempool,
            chain: &chain,
            reward: &reward_policy,
        };
        let header = BlockHeader::template(height, previous_hash, difficulty);
        let (task, report) = Task::assemble(header, &mut ctx, &mut state, candidates);

        let started = Instant::now();
        let result = match miner.mine(task)? {
            RoundOutcome::Found(result) => result,
            other => {
                warn!("round at height {} ended without a block: {:?}", height, other);
                break;
            }
        };
        let elapsed = started.elapsed();

        let block = result.block;
        block.verify_seal(&miner.difficulty_target().target(difficulty))?;
        previous_hash = block.header_hash;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&block)?);
        } else {
            println!(
                "{} #{} {}",
                "Block mined".green().bold(),
                height,
                hex::encode(block.header_hash).cyan()
            );
            println!("  nonce:        {}", block.header.nonce);
            println!("  transactions: {}", block.transactions.len());
            println!("  dropped:      {}", report.dropped.len());
            println!("  reward:       {}", report.reward);
            println!("  state root:   {}", hex::encode(block.header.state_root));
            println!("  mining time:  {:.3}s", elapsed.as_secs_f64());
        }

        if let Some(key) = &local_key {
            let amount = state.balance(&coinbase) / Amount::from(10u64);
            let mut tx =
                Transaction::new_transfer(coinbase, recipient, amount, state.nonce(&coinbase));
            tx.sign(key);
            mempool.add_transaction(tx)?;
        }
    }

    println!(
        "{} coinbase balance {} / recipient balance {}",
        "Done.".bold(),
        state.balance(&coinbase),
        state.balance(&recipient)
    );
    Ok(())
}
