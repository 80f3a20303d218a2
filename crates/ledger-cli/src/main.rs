use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ledger_core::{Address, KeyPair, Ledger, LedgerConfig, Transaction};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "Drive an in-memory proof-of-work ledger")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a wallet key pair
    Keygen,
    /// Run the two-wallet transfer scenario
    Demo {
        /// Leading zero hex digits required per block
        #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u32).range(0..=64))]
        difficulty: u32,
        /// Mining reward per block
        #[arg(long, default_value_t = 100)]
        reward: u64,
        /// Amount wallet A sends to wallet B
        #[arg(long, default_value_t = 10)]
        amount: u64,
        /// Secret key (hex) for wallet A; a fresh one is generated otherwise
        #[arg(long)]
        secret: Option<String>,
        /// Refuse transfers the sender cannot cover
        #[arg(long)]
        enforce_balance: bool,
        /// Give up mining after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Overwrite the mined transfer amount afterwards and re-validate
        #[arg(long)]
        tamper: bool,
        /// Print the whole ledger as JSON at the end
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Keygen => {
            let keypair = KeyPair::generate();
            println!("address: {}", keypair.address());
            println!("secret:  {}", keypair.secret_hex());
        }
        Command::Demo {
            difficulty,
            reward,
            amount,
            secret,
            enforce_balance,
            timeout_secs,
            tamper,
            json,
        } => {
            let config = LedgerConfig::default()
                .with_difficulty(difficulty)
                .with_mining_reward(reward)
                .with_enforce_balance(enforce_balance);
            let wallet_a = match secret {
                Some(hex) => KeyPair::from_secret_hex(&hex).context("loading wallet A")?,
                None => KeyPair::generate(),
            };
            let wallet_b = KeyPair::generate();
            run_demo(config, &wallet_a, &wallet_b.address(), amount, timeout_secs, tamper, json)?;
        }
    }
    Ok(())
}

fn run_demo(
    config: LedgerConfig,
    wallet_a: &KeyPair,
    wallet_b: &Address,
    amount: u64,
    timeout_secs: Option<u64>,
    tamper: bool,
    json: bool,
) -> Result<()> {
    let mut ledger = Ledger::new(config);
    let a = wallet_a.address();

    if ledger.config().enforce_balance {
        info!("funding wallet A before transferring");
        mine(&mut ledger, &a, timeout_secs)?;
    }

    let mut tx = Transaction::new(a.clone(), wallet_b.clone(), amount);
    tx.sign(wallet_a)?;
    ledger.add_transaction(tx)?;

    println!("Starting the miner...");
    mine(&mut ledger, &a, timeout_secs)?;

    println!("Balance of A is {}", ledger.balance_of(&a));
    println!("Balance of B is {}", ledger.balance_of(wallet_b));
    println!("Chain length: {}", ledger.len());
    println!("Is chain valid? {}", ledger.is_valid());

    if tamper {
        let mut forged = ledger.clone();
        forge_first_transfer(&mut forged)?;
        println!("After tampering, is chain valid? {}", forged.is_valid());
        if let Err(e) = forged.validate() {
            println!("  {e}");
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&ledger)?);
    }
    Ok(())
}

fn mine(ledger: &mut Ledger, reward_address: &Address, timeout_secs: Option<u64>) -> Result<()> {
    let cancel = Arc::new(AtomicBool::new(false));
    if let Some(secs) = timeout_secs {
        let flag = Arc::clone(&cancel);
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(secs));
            flag.store(true, Ordering::Relaxed);
        });
    }
    let mined = ledger
        .mine_pending_transactions_cancellable(reward_address, &cancel)?
        .map(|block| block.hash_hex());
    match mined {
        Some(hash) => {
            println!("Block mined: {hash}");
            Ok(())
        }
        None => bail!(
            "mining timed out; {} transactions still pending",
            ledger.pending_transactions().len()
        ),
    }
}

/// Rebuilds the ledger with the tip's first transfer amount overwritten to 1,
/// keeping the stored signature and hash as they were.
fn forge_first_transfer(ledger: &mut Ledger) -> Result<()> {
    let mut blocks = ledger.chain().to_vec();
    let tx = blocks
        .last_mut()
        .and_then(|b| b.txs.iter_mut().find(|tx| !tx.is_reward()))
        .context("no transfer to tamper with")?;
    tx.amount = 1;
    *ledger = Ledger::from_blocks(ledger.config().clone(), blocks);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_flag_is_bounded_by_hash_length() {
        assert!(Cli::try_parse_from(["ledger-cli", "demo", "--difficulty", "64"]).is_ok());
        assert!(Cli::try_parse_from(["ledger-cli", "demo", "--difficulty", "65"]).is_err());
    }
}
