use crate::{pow::meets_difficulty, Block, Hash};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MineOutcome {
    Found { nonce: u64, hash: Hash },
    Cancelled,
}

fn hash_with_nonce(base: &Sha256, nonce: u64) -> Hash {
    let mut hasher = base.clone();
    hasher.update(nonce.to_le_bytes());
    hasher.finalize().into()
}

/// Searches nonces in parallel until the block hash has `difficulty` leading zero hex digits.
///
/// Rayon splits the nonce range across its pool; the first hit stops the other workers.
/// Setting `cancel` aborts the search, in which case the block is left untouched.
pub fn mine_block_parallel(block: &mut Block, difficulty: u32, cancel: &AtomicBool) -> MineOutcome {
    // Everything but the nonce is fixed, so prime one hasher and clone it per attempt.
    let base = Sha256::new_with_prefix(block.hash_prefix());

    let found = (0u64..u64::MAX)
        .into_par_iter()
        .find_map_any(|nonce| {
            if cancel.load(Ordering::Relaxed) {
                return Some(None);
            }
            let hash = hash_with_nonce(&base, nonce);
            meets_difficulty(&hash, difficulty).then_some(Some((nonce, hash)))
        })
        .flatten();

    match found {
        Some((nonce, hash)) => {
            block.nonce = nonce;
            block.hash = hash;
            info!(
                "Mined block with nonce {} and hash {}",
                nonce,
                hex::encode(hash)
            );
            MineOutcome::Found { nonce, hash }
        }
        None => {
            debug!("nonce search cancelled at difficulty {}", difficulty);
            MineOutcome::Cancelled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Address;
    use crate::transaction::Transaction;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn template() -> Block {
        let txs = vec![Transaction::reward(Address::from("miner"), 100)];
        Block::new(1_600_000_000, txs, [3u8; 32])
    }

    #[test]
    fn primed_hasher_matches_full_hash() {
        let mut block = template();
        block.nonce = 12345;
        let base = Sha256::new_with_prefix(block.hash_prefix());
        assert_eq!(hash_with_nonce(&base, 12345), block.compute_hash());
    }

    #[test]
    fn parallel_mining_finds_valid_nonce() {
        let mut block = template();
        let cancel = AtomicBool::new(false);
        let outcome = mine_block_parallel(&mut block, 3, &cancel);
        match outcome {
            MineOutcome::Found { nonce, hash } => {
                assert_eq!(block.nonce, nonce);
                assert_eq!(block.hash, hash);
                assert_eq!(block.hash, block.compute_hash());
                assert!(block.hash_hex().starts_with("000"));
            }
            MineOutcome::Cancelled => panic!("search should not be cancelled"),
        }
    }

    #[test]
    fn pre_cancelled_search_leaves_block_untouched() {
        let mut block = template();
        let before = block.clone();
        let cancel = AtomicBool::new(true);
        assert_eq!(mine_block_parallel(&mut block, 3, &cancel), MineOutcome::Cancelled);
        assert_eq!(block, before);
    }

    #[test]
    fn cancellation_stops_unbounded_search() {
        let mut block = template();
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            flag.store(true, Ordering::Relaxed);
        });
        // 64 leading zero digits is unreachable in practice.
        let outcome = mine_block_parallel(&mut block, 64, &cancel);
        canceller.join().unwrap();
        assert_eq!(outcome, MineOutcome::Cancelled);
        assert_eq!(block.nonce, 0);
    }
}
