//! In-process Ed25519 key pair with platform-style export rules

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

use super::{
    CryptoKeyPair, ExportedKey, JsonWebKey, KeyFormat, KeyUsage, ED25519_ALGORITHM,
    PKCS8_ED25519_PREFIX,
};
use crate::error::SignerError;
use crate::sdk_adapter::{
    keypair_from_seed, keypair_pubkey, keypair_seed, keypair_sign_message, Keypair, Pubkey,
    Signature,
};

/// A [`CryptoKeyPair`] held in process memory
///
/// Behaves like a platform key: a non-extractable instance refuses every
/// private export but can still sign.
pub struct SoftwareKeyPair {
    keypair: Keypair,
    extractable: bool,
    raw_private_export: bool,
    public_export: bool,
    algorithm: String,
    usages: Vec<KeyUsage>,
    private_export_attempts: AtomicUsize,
}

impl std::fmt::Debug for SoftwareKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareKeyPair")
            .field("pubkey", &self.pubkey())
            .field("extractable", &self.extractable)
            .finish_non_exhaustive()
    }
}

impl SoftwareKeyPair {
    /// Generate a fresh key pair
    pub fn generate(extractable: bool) -> Self {
        Self::from_keypair(Keypair::new(), extractable)
    }

    pub fn from_keypair(keypair: Keypair, extractable: bool) -> Self {
        Self {
            keypair,
            extractable,
            raw_private_export: true,
            public_export: true,
            algorithm: ED25519_ALGORITHM.to_string(),
            usages: vec![KeyUsage::Sign],
            private_export_attempts: AtomicUsize::new(0),
        }
    }

    /// Refuse raw private exports, the way most platforms do for Ed25519
    pub fn without_raw_private_export(mut self) -> Self {
        self.raw_private_export = false;
        self
    }

    pub fn pubkey(&self) -> Pubkey {
        keypair_pubkey(&self.keypair)
    }

    /// Number of private key exports requested so far
    pub fn private_export_attempts(&self) -> usize {
        self.private_export_attempts.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub(crate) fn with_algorithm(mut self, algorithm: &str) -> Self {
        self.algorithm = algorithm.to_string();
        self
    }

    #[cfg(test)]
    pub(crate) fn with_usages(mut self, usages: Vec<KeyUsage>) -> Self {
        self.usages = usages;
        self
    }

    #[cfg(test)]
    pub(crate) fn without_public_export(mut self) -> Self {
        self.public_export = false;
        self
    }

    fn seed(&self) -> [u8; 32] {
        keypair_seed(&self.keypair)
    }
}

impl From<[u8; 32]> for SoftwareKeyPair {
    /// Extractable key pair from a 32-byte seed
    fn from(seed: [u8; 32]) -> Self {
        Self::from_keypair(keypair_from_seed(seed), true)
    }
}

#[async_trait]
impl CryptoKeyPair for SoftwareKeyPair {
    fn algorithm(&self) -> &str {
        &self.algorithm
    }

    fn private_key_usages(&self) -> Vec<KeyUsage> {
        self.usages.clone()
    }

    fn private_key_extractable(&self) -> bool {
        self.extractable
    }

    async fn export_private_key(&self, format: KeyFormat) -> Result<ExportedKey, SignerError> {
        self.private_export_attempts.fetch_add(1, Ordering::SeqCst);

        if !self.extractable {
            return Err(SignerError::NotAvailable(
                "Private key is not extractable".to_string(),
            ));
        }

        match format {
            KeyFormat::Raw if self.raw_private_export => Ok(ExportedKey::Bytes(self.seed().to_vec())),
            KeyFormat::Raw => Err(SignerError::NotAvailable(
                "Raw export of private keys is not supported".to_string(),
            )),
            KeyFormat::Pkcs8 => {
                let mut der = PKCS8_ED25519_PREFIX.to_vec();
                der.extend_from_slice(&self.seed());
                Ok(ExportedKey::Bytes(der))
            }
            KeyFormat::Jwk => Ok(ExportedKey::Jwk(JsonWebKey {
                kty: "OKP".to_string(),
                crv: ED25519_ALGORITHM.to_string(),
                x: URL_SAFE_NO_PAD.encode(self.pubkey().to_bytes()),
                d: Some(URL_SAFE_NO_PAD.encode(self.seed())),
            })),
        }
    }

    async fn export_public_key_raw(&self) -> Result<Vec<u8>, SignerError> {
        if !self.public_export {
            return Err(SignerError::NotAvailable(
                "Public key export failed".to_string(),
            ));
        }
        Ok(self.pubkey().to_bytes().to_vec())
    }

    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SignerError> {
        Ok(keypair_sign_message(&self.keypair, message).as_ref().to_vec())
    }

    async fn verify(&self, signature: &[u8], message: &[u8]) -> Result<bool, SignerError> {
        let Ok(bytes) = <[u8; 64]>::try_from(signature) else {
            return Ok(false);
        };
        Ok(Signature::from(bytes).verify(self.pubkey().as_ref(), message))
    }
}
