pub mod block;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod mine;
pub mod shared;
pub mod transaction;

pub use block::Block;
pub use crypto::{Address, KeyPair};
pub use error::{IntegrityFault, LedgerError, Result};
pub use ledger::{Ledger, LedgerConfig};
pub use mine::MineOutcome;
pub use shared::SharedLedger;
pub use transaction::{Sender, Transaction};

pub type Hash = [u8; 32];

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Building blocks of the canonical byte encoding fed to SHA-256.
/// Integers are fixed-width little-endian, strings are u32-length-prefixed UTF-8
/// and optional values carry a 0/1 tag byte.
pub(crate) mod encoding {
    pub fn put_u32(buf: &mut Vec<u8>, v: u32) {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_u64(buf: &mut Vec<u8>, v: u64) {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_str(buf: &mut Vec<u8>, s: &str) {
        put_u32(buf, s.len() as u32);
        buf.extend_from_slice(s.as_bytes());
    }

    pub fn put_opt_str(buf: &mut Vec<u8>, s: Option<&str>) {
        match s {
            None => buf.push(0),
            Some(s) => {
                buf.push(1);
                put_str(buf, s);
            }
        }
    }
}

pub mod pow {
    use super::Hash;

    /// Number of leading `0` hex digits in the hash's hex rendering.
    pub fn count_leading_zero_nibbles(hash: &Hash) -> u32 {
        let mut total = 0u32;
        for b in hash {
            if *b == 0 {
                total += 2;
            } else {
                if *b < 0x10 {
                    total += 1;
                }
                break;
            }
        }
        total
    }

    pub fn meets_difficulty(hash: &Hash, difficulty: u32) -> bool {
        count_leading_zero_nibbles(hash) >= difficulty
    }
}
