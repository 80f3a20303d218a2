use crate::constants::ENCODING_VERSION;
use crate::crypto::{self, Address, KeyPair};
use crate::encoding;
use crate::error::{LedgerError, Result};
use crate::{now_millis, Hash};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Who a transfer is paid from. Only the mining reward has no wallet behind it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    Reward,
    Wallet(Address),
}

impl Sender {
    pub fn address(&self) -> Option<&Address> {
        match self {
            Sender::Reward => None,
            Sender::Wallet(addr) => Some(addr),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub from: Sender,
    pub to: Address,
    pub amount: u64,
    pub timestamp: u64,
    /// Hex compact ECDSA signature over [`Transaction::fingerprint`].
    pub signature: Option<String>,
}

impl Transaction {
    /// An unsigned transfer stamped with the current time. Nothing is validated here.
    pub fn new(from: Address, to: Address, amount: u64) -> Self {
        Self::with_timestamp(Sender::Wallet(from), to, amount, now_millis())
    }

    pub fn reward(to: Address, amount: u64) -> Self {
        Self::with_timestamp(Sender::Reward, to, amount, now_millis())
    }

    pub fn with_timestamp(from: Sender, to: Address, amount: u64, timestamp: u64) -> Self {
        Self {
            from,
            to,
            amount,
            timestamp,
            signature: None,
        }
    }

    pub fn is_reward(&self) -> bool {
        matches!(self.from, Sender::Reward)
    }

    pub fn hash_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + 1 + 4 + 66 + 4 + 66 + 8 + 8);
        bytes.push(ENCODING_VERSION);
        match &self.from {
            Sender::Reward => bytes.push(0),
            Sender::Wallet(addr) => {
                bytes.push(1);
                encoding::put_str(&mut bytes, addr.as_str());
            }
        }
        encoding::put_str(&mut bytes, self.to.as_str());
        encoding::put_u64(&mut bytes, self.amount);
        encoding::put_u64(&mut bytes, self.timestamp);
        bytes
    }

    /// SHA-256 of the canonical encoding of `(from, to, amount, timestamp)`.
    /// This is the message that gets signed.
    pub fn fingerprint(&self) -> Hash {
        crypto::sha256(&self.hash_bytes())
    }

    pub fn sign(&mut self, keypair: &KeyPair) -> Result<()> {
        match &self.from {
            Sender::Wallet(addr) if *addr == keypair.address() => {}
            _ => return Err(LedgerError::Authorization),
        }
        self.signature = Some(keypair.sign(&self.fingerprint()));
        Ok(())
    }

    pub fn verify(&self) -> Result<bool> {
        let from = match &self.from {
            Sender::Reward => return Ok(true),
            Sender::Wallet(addr) => addr,
        };
        let signature = self
            .signature
            .as_deref()
            .ok_or(LedgerError::MissingSignature)?;
        match crypto::verify_signature(from, &self.fingerprint(), signature) {
            // undecodable key or signature material cannot verify
            Err(LedgerError::Crypto(reason)) => {
                debug!("signature check failed: {}", reason);
                Ok(false)
            }
            other => other,
        }
    }
}
