//! The append-only chain together with its pool of pending transfers.

use crate::constants::{
    DEFAULT_DIFFICULTY, DEFAULT_MINING_REWARD, GENESIS_DATA, GENESIS_TIMESTAMP, HASH_HEX_SIZE,
};
use crate::crypto::Address;
use crate::error::{IntegrityFault, LedgerError, Result};
use crate::mine::MineOutcome;
use crate::transaction::{Sender, Transaction};
use crate::{now_millis, Block};
use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicBool;
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Leading zero hex digits a mined block hash must have.
    pub difficulty: u32,
    /// Amount credited to the miner of each block.
    pub mining_reward: u64,
    /// Reject submissions the sender cannot cover (confirmed balance minus pending spends).
    pub enforce_balance: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            mining_reward: DEFAULT_MINING_REWARD,
            enforce_balance: false,
        }
    }
}

impl LedgerConfig {
    pub fn with_difficulty(mut self, difficulty: u32) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_mining_reward(mut self, mining_reward: u64) -> Self {
        self.mining_reward = mining_reward;
        self
    }

    pub fn with_enforce_balance(mut self, enforce_balance: bool) -> Self {
        self.enforce_balance = enforce_balance;
        self
    }

    /// A difficulty above the hash's hex length can never be met, so mining would not return.
    pub fn validate(&self) -> Result<()> {
        if self.difficulty as usize > HASH_HEX_SIZE {
            return Err(LedgerError::Validation(format!(
                "difficulty {} exceeds the {} hex digits of a block hash",
                self.difficulty, HASH_HEX_SIZE
            )));
        }
        Ok(())
    }
}

/// The fixed first block. Never mined; rebuilt on demand to detect tampering.
pub fn genesis_block() -> Block {
    Block::with_data(GENESIS_TIMESTAMP, GENESIS_DATA, [0u8; 32])
}

#[derive(Clone, Debug, Serialize)]
pub struct Ledger {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
    config: LedgerConfig,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            chain: vec![genesis_block()],
            pending: Vec::new(),
            config,
        }
    }

    /// Wraps an externally supplied chain for inspection. Nothing is checked here;
    /// call [`Ledger::validate`] before trusting it. An empty list yields a fresh ledger.
    ///
    /// Validation also requires every block hash to meet `config.difficulty`, so a
    /// chain mined at a lower difficulty than `config` reports
    /// [`IntegrityFault::InsufficientWork`].
    pub fn from_blocks(config: LedgerConfig, blocks: Vec<Block>) -> Self {
        if blocks.is_empty() {
            return Self::new(config);
        }
        Self {
            chain: blocks,
            pending: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn pending_transactions(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Always false: the genesis block is present from construction.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn latest_block(&self) -> &Block {
        // chain is never empty
        &self.chain[self.chain.len() - 1]
    }

    /// Validates a user transfer and queues it for the next block.
    /// On error nothing is queued.
    pub fn add_transaction(&mut self, tx: Transaction) -> Result<()> {
        if let Err(e) = self.check_submission(&tx) {
            warn!("rejected transaction: {}", e);
            return Err(e);
        }
        debug!(
            "accepted transaction of {} to {} ({} pending)",
            tx.amount,
            tx.to,
            self.pending.len() + 1
        );
        self.pending.push(tx);
        Ok(())
    }

    fn check_submission(&self, tx: &Transaction) -> Result<()> {
        if tx.to.is_empty() {
            return Err(LedgerError::validation("transaction must include a recipient address"));
        }
        let from = match &tx.from {
            Sender::Reward => {
                return Err(LedgerError::validation(
                    "reward transactions are created by mining, not submitted",
                ))
            }
            Sender::Wallet(addr) if addr.is_empty() => {
                return Err(LedgerError::validation("transaction must include a sender address"))
            }
            Sender::Wallet(addr) => addr,
        };
        if tx.amount == 0 {
            return Err(LedgerError::validation("transaction amount must be positive"));
        }
        if !tx.verify()? {
            return Err(LedgerError::validation("cannot add invalid transaction to chain"));
        }
        if self.config.enforce_balance {
            let committed: u64 = self
                .pending
                .iter()
                .filter(|p| p.from.address() == Some(from))
                .map(|p| p.amount)
                .sum();
            let spendable = self.balance_of(from) - committed as i128;
            if spendable < tx.amount as i128 {
                return Err(LedgerError::Validation(format!(
                    "insufficient balance: {} available, {} requested",
                    spendable, tx.amount
                )));
            }
        }
        Ok(())
    }

    /// Bundles the pending pool plus a reward for `reward_address` into a new
    /// block, mines it, appends it and clears the pool.
    pub fn mine_pending_transactions(&mut self, reward_address: &Address) -> Result<&Block> {
        let cancel = AtomicBool::new(false);
        let mined = self
            .mine_pending_transactions_cancellable(reward_address, &cancel)?
            .is_some();
        if !mined {
            // nothing else holds the flag
            return Err(LedgerError::validation("mining was cancelled"));
        }
        Ok(self.latest_block())
    }

    /// Like [`Ledger::mine_pending_transactions`], but gives up when `cancel` is set.
    /// A cancelled search returns `Ok(None)` and leaves the chain and pool as they were.
    pub fn mine_pending_transactions_cancellable(
        &mut self,
        reward_address: &Address,
        cancel: &AtomicBool,
    ) -> Result<Option<&Block>> {
        if reward_address.is_empty() {
            return Err(LedgerError::validation("reward address must not be empty"));
        }
        self.config.validate()?;
        let mut txs = self.pending.clone();
        txs.push(Transaction::reward(reward_address.clone(), self.config.mining_reward));

        let index = self.chain.len();
        let mut block = Block::new(now_millis(), txs, self.latest_block().hash);
        info!(
            "Mining block {} with {} transactions at difficulty {}",
            index,
            block.txs.len(),
            self.config.difficulty
        );

        match block.mine_parallel(self.config.difficulty, cancel) {
            MineOutcome::Found { .. } => {
                self.chain.push(block);
                self.pending.clear();
                Ok(Some(self.latest_block()))
            }
            MineOutcome::Cancelled => {
                info!("mining of block {} cancelled; pending pool kept", index);
                Ok(None)
            }
        }
    }

    /// Net amount received by `address` across the whole chain. Negative when
    /// the address spent more than it received, which submission allows unless
    /// `enforce_balance` is on.
    pub fn balance_of(&self, address: &Address) -> i128 {
        let mut balance: i128 = 0;
        for tx in self.chain.iter().flat_map(|b| b.txs.iter()) {
            if tx.from.address() == Some(address) {
                balance -= tx.amount as i128;
            }
            if tx.to == *address {
                balance += tx.amount as i128;
            }
        }
        balance
    }

    /// Every confirmed transaction sent or received by `address`, oldest first.
    pub fn transactions_for(&self, address: &Address) -> Vec<&Transaction> {
        self.chain
            .iter()
            .flat_map(|b| b.txs.iter())
            .filter(|tx| tx.from.address() == Some(address) || tx.to == *address)
            .collect()
    }

    /// Re-derives every hash and link and reports the first failure.
    pub fn validate(&self) -> Result<()> {
        let fail = |index: usize, fault: IntegrityFault| {
            warn!("chain invalid at block {}: {}", index, fault);
            Err(LedgerError::Integrity { index, fault })
        };

        if self.chain.first() != Some(&genesis_block()) {
            return fail(0, IntegrityFault::GenesisMismatch);
        }

        for (i, pair) in self.chain.windows(2).enumerate() {
            let (prev, block) = (&pair[0], &pair[1]);
            let index = i + 1;
            if !block.transactions_valid() {
                return fail(index, IntegrityFault::InvalidTransactions);
            }
            if block.hash != block.compute_hash() {
                return fail(index, IntegrityFault::HashMismatch);
            }
            if block.prev_hash != prev.hash {
                return fail(index, IntegrityFault::BrokenLink);
            }
            if !block.has_valid_pow(self.config.difficulty) {
                return fail(index, IntegrityFault::InsufficientWork);
            }
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
