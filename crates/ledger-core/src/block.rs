use crate::constants::ENCODING_VERSION;
use crate::encoding;
use crate::mine::{mine_block_parallel, MineOutcome};
use crate::pow::meets_difficulty;
use crate::transaction::Transaction;
use crate::Hash;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::atomic::AtomicBool;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub timestamp: u64,
    pub txs: Vec<Transaction>,
    /// Opaque payload for blocks that carry no transactions (the genesis sentinel).
    pub data: Option<String>,
    /// Copy of the predecessor's hash.
    #[serde(with = "hex::serde")]
    pub prev_hash: Hash,
    pub nonce: u64,
    /// Memoized result of [`Block::compute_hash`].
    #[serde(with = "hex::serde")]
    pub hash: Hash,
}

impl Block {
    pub fn new(timestamp: u64, txs: Vec<Transaction>, prev_hash: Hash) -> Self {
        Self::assemble(timestamp, txs, None, prev_hash)
    }

    pub fn with_data(timestamp: u64, data: impl Into<String>, prev_hash: Hash) -> Self {
        Self::assemble(timestamp, Vec::new(), Some(data.into()), prev_hash)
    }

    fn assemble(timestamp: u64, txs: Vec<Transaction>, data: Option<String>, prev_hash: Hash) -> Self {
        let mut block = Block {
            timestamp,
            txs,
            data,
            prev_hash,
            nonce: 0,
            hash: [0u8; 32],
        };
        block.hash = block.compute_hash();
        block
    }

    /// Canonical encoding of everything except the nonce, which is appended last.
    pub(crate) fn hash_prefix(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + 8 + 32 + 5 + 4 + self.txs.len() * 165);
        bytes.push(ENCODING_VERSION);
        encoding::put_u64(&mut bytes, self.timestamp);
        bytes.extend_from_slice(&self.prev_hash);
        encoding::put_opt_str(&mut bytes, self.data.as_deref());
        encoding::put_u32(&mut bytes, self.txs.len() as u32);
        for tx in &self.txs {
            bytes.extend_from_slice(&tx.fingerprint());
            encoding::put_opt_str(&mut bytes, tx.signature.as_deref());
        }
        bytes
    }

    pub fn hash_bytes(&self) -> Vec<u8> {
        let mut bytes = self.hash_prefix();
        encoding::put_u64(&mut bytes, self.nonce);
        bytes
    }

    /// Hashes the block's current field values. Never reads `self.hash`.
    pub fn compute_hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.hash_bytes());
        hasher.finalize().into()
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    /// Single-threaded proof-of-work: bump the nonce until the hash has
    /// `difficulty` leading zero hex digits. Does not return before it succeeds.
    pub fn mine(&mut self, difficulty: u32) {
        while !meets_difficulty(&self.hash, difficulty) {
            self.nonce = self.nonce.wrapping_add(1);
            self.hash = self.compute_hash();
        }
    }

    /// Multi-threaded variant of [`Block::mine`] that gives up once `cancel` is set.
    pub fn mine_parallel(&mut self, difficulty: u32, cancel: &AtomicBool) -> MineOutcome {
        mine_block_parallel(self, difficulty, cancel)
    }

    pub fn has_valid_pow(&self, difficulty: u32) -> bool {
        meets_difficulty(&self.hash, difficulty)
    }

    /// True iff every transaction verifies; stops at the first that doesn't.
    pub fn transactions_valid(&self) -> bool {
        self.txs.iter().all(|tx| matches!(tx.verify(), Ok(true)))
    }
}
