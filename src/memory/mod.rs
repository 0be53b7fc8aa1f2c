//! In-memory keypair signer, the legacy signing primitive of raw keypair handles

use std::fs;

use crate::error::SignerError;
use crate::sdk_adapter::{
    keypair_from_bytes, keypair_from_seed, keypair_pubkey, keypair_sign_message, Keypair, Pubkey,
    Signature,
};
use crate::traits::SolanaSigner;

const KEYPAIR_LENGTH: usize = 64;

/// Signs with a Solana keypair held in process memory
pub struct MemorySigner {
    keypair: Keypair,
}

impl std::fmt::Debug for MemorySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySigner")
            .field("pubkey", &self.pubkey())
            .finish_non_exhaustive()
    }
}

impl MemorySigner {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    /// Signer for the 64-byte `seed || public key` keypair encoding
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignerError> {
        if bytes.len() != KEYPAIR_LENGTH {
            return Err(SignerError::InvalidPrivateKey(format!(
                "Keypair must be {KEYPAIR_LENGTH} bytes, got {}",
                bytes.len()
            )));
        }
        let keypair = keypair_from_bytes(bytes).map_err(|e| {
            SignerError::InvalidPrivateKey(format!("Invalid keypair bytes: {e}"))
        })?;
        Ok(Self::new(keypair))
    }

    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self::new(keypair_from_seed(seed))
    }

    /// Parses a key given as a keypair file path, a `[u8, ...]` JSON array,
    /// or a base58 string, in that order
    pub fn from_private_key_string(private_key: &str) -> Result<Self, SignerError> {
        if let Ok(contents) = fs::read_to_string(private_key) {
            return Self::from_json_array(&contents);
        }

        let trimmed = private_key.trim();
        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            return Self::from_json_array(trimmed);
        }

        let decoded = bs58::decode(trimmed)
            .into_vec()
            .map_err(|e| SignerError::InvalidPrivateKey(format!("Invalid base58 string: {e}")))?;
        Self::from_bytes(&decoded)
    }

    fn from_json_array(json: &str) -> Result<Self, SignerError> {
        let bytes: Vec<u8> = serde_json::from_str(json.trim()).map_err(|e| {
            SignerError::InvalidPrivateKey(format!(
                "Expected a JSON array of {KEYPAIR_LENGTH} bytes: {e}"
            ))
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl From<Keypair> for MemorySigner {
    fn from(keypair: Keypair) -> Self {
        Self::new(keypair)
    }
}

#[async_trait::async_trait]
impl SolanaSigner for MemorySigner {
    fn pubkey(&self) -> Pubkey {
        keypair_pubkey(&self.keypair)
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature, SignerError> {
        Ok(keypair_sign_message(&self.keypair, message))
    }

    async fn is_available(&self) -> bool {
        true
    }
}
