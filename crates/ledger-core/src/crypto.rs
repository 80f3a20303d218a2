//! Key pairs, addresses and ECDSA signatures over secp256k1.

use crate::error::{LedgerError, Result};
use crate::Hash;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{COMPACT_SIGNATURE_SIZE, PUBLIC_KEY_SIZE, SECRET_KEY_SIZE},
    ecdsa::Signature,
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

pub fn sha256(bytes: &[u8]) -> Hash {
    Sha256::digest(bytes).into()
}

/// A wallet address: the hex-encoded compressed public key of its owner.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(s: impl Into<String>) -> Self {
        Address(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    fn public_key(&self) -> Result<PublicKey> {
        let bytes = hex::decode(&self.0)
            .map_err(|e| LedgerError::Crypto(format!("address is not hex: {}", e)))?;
        if bytes.len() != PUBLIC_KEY_SIZE {
            return Err(LedgerError::Crypto(format!(
                "public key must be exactly {} bytes (compressed), got {}",
                PUBLIC_KEY_SIZE,
                bytes.len()
            )));
        }
        PublicKey::from_slice(&bytes)
            .map_err(|e| LedgerError::Crypto(format!("invalid public key: {}", e)))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Address(s.to_string())
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Address(s)
    }
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        Self::from_secret_key(SecretKey::new(&mut OsRng))
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    pub fn from_secret_hex(secret_hex: &str) -> Result<Self> {
        let bytes = hex::decode(secret_hex.trim())
            .map_err(|e| LedgerError::Crypto(format!("secret key is not hex: {}", e)))?;
        if bytes.len() != SECRET_KEY_SIZE {
            return Err(LedgerError::Crypto(format!(
                "secret key must be {} bytes, got {}",
                SECRET_KEY_SIZE,
                bytes.len()
            )));
        }
        let secret_key = SecretKey::from_slice(&bytes)
            .map_err(|e| LedgerError::Crypto(format!("invalid secret key bytes: {}", e)))?;
        Ok(Self::from_secret_key(secret_key))
    }

    /// The wallet address owned by this key pair.
    pub fn address(&self) -> Address {
        Address(hex::encode(self.public_key.serialize()))
    }

    pub fn secret_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Signs SHA-256(`message`) and returns the compact signature as hex.
    pub fn sign(&self, message: &[u8]) -> String {
        let digest = Message::from_digest(sha256(message));
        let signature = SECP256K1_CONTEXT.sign_ecdsa(&digest, &self.secret_key);
        hex::encode(signature.serialize_compact())
    }
}

/// Checks a hex compact signature over SHA-256(`message`) against `address`.
///
/// Malformed key or signature material is an error; a well-formed signature
/// that does not match yields `Ok(false)`.
pub fn verify_signature(address: &Address, message: &[u8], signature_hex: &str) -> Result<bool> {
    let public_key = address.public_key()?;
    let sig_bytes = hex::decode(signature_hex)
        .map_err(|e| LedgerError::Crypto(format!("signature is not hex: {}", e)))?;
    if sig_bytes.len() != COMPACT_SIGNATURE_SIZE {
        return Err(LedgerError::Crypto(format!(
            "signature must be exactly {} bytes (compact), got {}",
            COMPACT_SIGNATURE_SIZE,
            sig_bytes.len()
        )));
    }
    let signature = Signature::from_compact(&sig_bytes)
        .map_err(|e| LedgerError::Crypto(format!("invalid signature: {}", e)))?;
    let digest = Message::from_digest(sha256(message));
    Ok(SECP256K1_CONTEXT
        .verify_ecdsa(&digest, &signature, &public_key)
        .is_ok())
}
