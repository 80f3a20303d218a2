use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Reason a chain failed integrity validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum IntegrityFault {
    /// Block 0 differs from a freshly built genesis block.
    GenesisMismatch,
    /// At least one transaction in the block does not verify.
    InvalidTransactions,
    /// Stored hash differs from the hash recomputed from the block's fields.
    HashMismatch,
    /// `prev_hash` does not equal the predecessor's stored hash.
    BrokenLink,
    /// Stored hash lacks the ledger's required leading zeros.
    InsufficientWork,
}

impl fmt::Display for IntegrityFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            IntegrityFault::GenesisMismatch => "genesis block has been altered",
            IntegrityFault::InvalidTransactions => "block contains an invalid transaction",
            IntegrityFault::HashMismatch => "stored hash does not match block contents",
            IntegrityFault::BrokenLink => "previous hash does not match predecessor",
            IntegrityFault::InsufficientWork => "hash does not satisfy difficulty",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Malformed or policy-violating transaction.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("authorization error: cannot sign transactions for another wallet")]
    Authorization,

    #[error("missing signature: transaction is not signed")]
    MissingSignature,

    #[error("integrity error at block {index}: {fault}")]
    Integrity { index: usize, fault: IntegrityFault },

    /// Unparseable key or signature material.
    #[error("crypto error: {0}")]
    Crypto(String),
}

impl LedgerError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        LedgerError::Validation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
