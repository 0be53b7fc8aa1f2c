//! Key material bridge for opaque platform key pairs
//!
//! Turns a [`CryptoKeyPair`] into a [`SolanaSigner`] without assuming the
//! private key is extractable. Extraction strategies are tried in a fixed
//! order (raw export, PKCS#8 export, JWK export); when every one of them
//! fails the result is a [`BridgeSigner`] that calls the platform's sign
//! primitive for each message and never exports the private key.

mod software;
mod types;

pub use software::SoftwareKeyPair;
pub use types::{ExportedKey, JsonWebKey, KeyFormat, KeyUsage};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

use crate::error::SignerError;
use crate::memory::MemorySigner;
use crate::sdk_adapter::{keypair_from_seed, keypair_pubkey, Pubkey, Signature};
use crate::traits::SolanaSigner;

/// Algorithm name of the only supported key family
pub const ED25519_ALGORITHM: &str = "Ed25519";

/// Fixed PKCS#8 v1 prefix of an Ed25519 private key; the 32-byte seed follows
pub const PKCS8_ED25519_PREFIX: [u8; 16] = [
    0x30, 0x2e, 0x02, 0x01, 0x00, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x04, 0x22, 0x04, 0x20,
];

const SEED_LENGTH: usize = 32;

/// A platform asymmetric key pair whose private half may be non-extractable
#[async_trait]
pub trait CryptoKeyPair: Send + Sync {
    fn algorithm(&self) -> &str;

    fn private_key_usages(&self) -> Vec<KeyUsage>;

    fn private_key_extractable(&self) -> bool;

    async fn export_private_key(&self, format: KeyFormat) -> Result<ExportedKey, SignerError>;

    async fn export_public_key_raw(&self) -> Result<Vec<u8>, SignerError>;

    /// Sign with the private key, inside the platform
    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SignerError>;

    async fn verify(&self, signature: &[u8], message: &[u8]) -> Result<bool, SignerError>;
}

/// One way of pulling the 32-byte private seed out of a key pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    Raw,
    Pkcs8,
    Jwk,
}

impl ExtractionStrategy {
    /// The order strategies are attempted in
    pub const ORDER: [ExtractionStrategy; 3] = [Self::Raw, Self::Pkcs8, Self::Jwk];

    pub async fn extract(&self, key_pair: &dyn CryptoKeyPair) -> Result<[u8; 32], SignerError> {
        let seed = match self {
            Self::Raw => match key_pair.export_private_key(KeyFormat::Raw).await? {
                ExportedKey::Bytes(bytes) => bytes.get(..SEED_LENGTH).map(<[u8]>::to_vec),
                ExportedKey::Jwk(_) => None,
            },
            Self::Pkcs8 => match key_pair.export_private_key(KeyFormat::Pkcs8).await? {
                ExportedKey::Bytes(der) if der.len() >= SEED_LENGTH => {
                    Some(der[der.len() - SEED_LENGTH..].to_vec())
                }
                _ => None,
            },
            Self::Jwk => match key_pair.export_private_key(KeyFormat::Jwk).await? {
                ExportedKey::Jwk(jwk) => {
                    let d = jwk.d.ok_or_else(|| {
                        SignerError::InvalidPrivateKey("JWK has no private scalar".to_string())
                    })?;
                    Some(URL_SAFE_NO_PAD.decode(d.trim_end_matches('=')).map_err(|e| {
                        SignerError::InvalidPrivateKey(format!("Invalid JWK private scalar: {e}"))
                    })?)
                }
                ExportedKey::Bytes(_) => None,
            },
        };

        seed.and_then(|seed| <[u8; 32]>::try_from(seed.as_slice()).ok())
            .ok_or_else(|| {
                SignerError::InvalidPrivateKey(format!("{self:?} export has unexpected shape"))
            })
    }
}

fn check_key_pair(key_pair: &dyn CryptoKeyPair) -> Result<(), SignerError> {
    if key_pair.algorithm() != ED25519_ALGORITHM {
        return Err(SignerError::InvalidPrivateKey(format!(
            "Unsupported key algorithm {}, expected {ED25519_ALGORITHM}",
            key_pair.algorithm()
        )));
    }
    if !key_pair.private_key_usages().contains(&KeyUsage::Sign) {
        return Err(SignerError::InvalidPrivateKey(
            "Private key lacks sign usage".to_string(),
        ));
    }
    Ok(())
}

async fn public_key_of(key_pair: &dyn CryptoKeyPair) -> Result<Pubkey, SignerError> {
    let raw = key_pair.export_public_key_raw().await.map_err(|e| {
        SignerError::KeyExtractionExhausted(format!("Public key cannot be exported: {e}"))
    })?;
    Pubkey::try_from(raw.as_slice()).map_err(|_| {
        SignerError::KeyExtractionExhausted(format!(
            "Public key has {} bytes, expected 32",
            raw.len()
        ))
    })
}

/// Extract the private seed with the first strategy that works and matches
/// the exported public key
pub async fn extract_private_key(key_pair: &dyn CryptoKeyPair) -> Result<[u8; 32], SignerError> {
    check_key_pair(key_pair)?;
    let expected = public_key_of(key_pair).await?;

    if !key_pair.private_key_extractable() {
        log::debug!("Private key is marked non-extractable, skipping export strategies");
        return Err(SignerError::KeyExtractionExhausted(
            "Private key is not extractable".to_string(),
        ));
    }

    for strategy in ExtractionStrategy::ORDER {
        match strategy.extract(key_pair).await {
            Ok(seed) if keypair_pubkey(&keypair_from_seed(seed)) == expected => return Ok(seed),
            Ok(_) => log::warn!("{strategy:?} export does not match the public key"),
            Err(e) => log::debug!("{strategy:?} extraction failed: {e}"),
        }
    }

    Err(SignerError::KeyExtractionExhausted(
        "No extraction strategy succeeded".to_string(),
    ))
}

/// Signs by delegating every message to the key pair's own sign primitive
#[derive(Clone)]
pub struct BridgeSigner {
    address: Pubkey,
    key_pair: Arc<dyn CryptoKeyPair>,
}

impl std::fmt::Debug for BridgeSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl BridgeSigner {
    /// Build a bridge signer; only the public key is exported
    pub async fn new(key_pair: Arc<dyn CryptoKeyPair>) -> Result<Self, SignerError> {
        check_key_pair(key_pair.as_ref())?;
        let address = public_key_of(key_pair.as_ref()).await?;
        Ok(Self { address, key_pair })
    }

    /// Base58 address derived from the public key
    pub fn address(&self) -> String {
        self.address.to_string()
    }

    /// Sign each message, returning one `{address: signature}` map per message
    pub async fn sign_messages(
        &self,
        messages: &[Vec<u8>],
    ) -> Result<Vec<HashMap<String, Signature>>, SignerError> {
        let address = self.address();
        let mut signed = Vec::with_capacity(messages.len());
        for message in messages {
            let signature = self.sign_bytes(message).await?;
            signed.push(HashMap::from([(address.clone(), signature)]));
        }
        Ok(signed)
    }

    async fn sign_bytes(&self, message: &[u8]) -> Result<Signature, SignerError> {
        let raw = self.key_pair.sign(message).await?;
        let bytes: [u8; 64] = raw.as_slice().try_into().map_err(|_| {
            SignerError::SigningFailed(format!(
                "Platform signature has {} bytes, expected 64",
                raw.len()
            ))
        })?;
        Ok(Signature::from(bytes))
    }
}

#[async_trait]
impl SolanaSigner for BridgeSigner {
    fn pubkey(&self) -> Pubkey {
        self.address
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature, SignerError> {
        self.sign_bytes(message).await
    }

    async fn is_available(&self) -> bool {
        true
    }
}

/// Outcome of [`extract_signer`]
#[derive(Debug)]
pub enum ExtractedSigner {
    /// Private key material was exported into an in-memory keypair
    Keypair(MemorySigner),
    /// The private key stays inside the platform
    Bridge(BridgeSigner),
}

/// Obtain a signer for a key pair, extracting the key if the platform allows
/// and bridging to its sign primitive otherwise
pub async fn extract_signer(key_pair: Arc<dyn CryptoKeyPair>) -> Result<ExtractedSigner, SignerError> {
    match extract_private_key(key_pair.as_ref()).await {
        Ok(seed) => Ok(ExtractedSigner::Keypair(MemorySigner::new(keypair_from_seed(seed)))),
        Err(SignerError::KeyExtractionExhausted(reason)) => {
            log::debug!("Falling back to bridge signer: {reason}");
            Ok(ExtractedSigner::Bridge(BridgeSigner::new(key_pair).await?))
        }
        Err(e) => Err(e),
    }
}

#[async_trait]
impl SolanaSigner for ExtractedSigner {
    fn pubkey(&self) -> Pubkey {
        match self {
            ExtractedSigner::Keypair(s) => s.pubkey(),
            ExtractedSigner::Bridge(s) => s.pubkey(),
        }
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature, SignerError> {
        match self {
            ExtractedSigner::Keypair(s) => s.sign_message(message).await,
            ExtractedSigner::Bridge(s) => s.sign_message(message).await,
        }
    }

    async fn is_available(&self) -> bool {
        match self {
            ExtractedSigner::Keypair(s) => s.is_available().await,
            ExtractedSigner::Bridge(s) => s.is_available().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::LegacyTransaction;
    use crate::test_util::create_test_transaction;

    #[tokio::test]
    async fn test_all_strategies_yield_identical_seed() {
        let key_pair = SoftwareKeyPair::generate(true);
        let mut seeds = Vec::new();
        for strategy in ExtractionStrategy::ORDER {
            seeds.push(strategy.extract(&key_pair).await.unwrap());
        }
        assert_eq!(seeds.len(), 3);
        assert!(seeds.iter().all(|seed| *seed == seeds[0]));
        assert_eq!(extract_private_key(&key_pair).await.unwrap(), seeds[0]);
    }

    #[tokio::test]
    async fn test_falls_through_to_pkcs8_when_raw_is_unsupported() {
        let key_pair = SoftwareKeyPair::generate(true).without_raw_private_export();
        assert!(ExtractionStrategy::Raw.extract(&key_pair).await.is_err());

        let seed = extract_private_key(&key_pair).await.unwrap();
        assert_eq!(seed, ExtractionStrategy::Jwk.extract(&key_pair).await.unwrap());
    }

    #[tokio::test]
    async fn test_extractable_key_becomes_keypair_signer() {
        let key_pair = Arc::new(SoftwareKeyPair::generate(true));
        let expected = key_pair.pubkey();
        let signer = extract_signer(key_pair).await.unwrap();
        assert!(matches!(signer, ExtractedSigner::Keypair(_)));
        assert_eq!(signer.pubkey(), expected);
    }

    #[tokio::test]
    async fn test_non_extractable_key_becomes_bridge_signer() {
        let key_pair = Arc::new(SoftwareKeyPair::generate(false));
        let signer = extract_signer(Arc::clone(&key_pair) as Arc<dyn CryptoKeyPair>)
            .await
            .unwrap();
        assert!(matches!(signer, ExtractedSigner::Bridge(_)));
        assert_eq!(signer.pubkey(), key_pair.pubkey());
        assert_eq!(key_pair.private_export_attempts(), 0);
    }

    #[tokio::test]
    async fn test_bridge_signature_verifies_without_private_export() {
        let key_pair = Arc::new(SoftwareKeyPair::generate(false));
        let bridge = BridgeSigner::new(Arc::clone(&key_pair) as Arc<dyn CryptoKeyPair>)
            .await
            .unwrap();

        let message = b"bridge me".to_vec();
        let signed = bridge.sign_messages(&[message.clone()]).await.unwrap();
        let signature = signed[0].get(&bridge.address()).unwrap();

        assert!(key_pair.verify(signature.as_ref(), &message).await.unwrap());
        assert_eq!(key_pair.private_export_attempts(), 0);
    }

    #[tokio::test]
    async fn test_bridge_signs_legacy_transaction() {
        let key_pair = Arc::new(SoftwareKeyPair::generate(false));
        let bridge = BridgeSigner::new(Arc::clone(&key_pair) as Arc<dyn CryptoKeyPair>)
            .await
            .unwrap();
        let keypair_for_tx = crate::sdk_adapter::keypair_from_seed([0u8; 32]);
        let mut tx = create_test_transaction(&keypair_for_tx);
        tx.message.account_keys[0] = bridge.pubkey();
        let mut tx = LegacyTransaction::from(tx);

        let (_, signature) = bridge.sign_transaction(&mut tx).await.unwrap();
        assert_eq!(tx.signatures()[0], signature);
        assert!(signature.verify(bridge.pubkey().as_ref(), &tx.message_data()));
    }

    #[tokio::test]
    async fn test_rejects_wrong_algorithm() {
        let key_pair = Arc::new(SoftwareKeyPair::generate(true).with_algorithm("ECDSA"));
        let result = extract_signer(key_pair).await;
        assert!(matches!(result, Err(SignerError::InvalidPrivateKey(_))));
    }

    #[tokio::test]
    async fn test_rejects_key_without_sign_usage() {
        let key_pair = Arc::new(SoftwareKeyPair::generate(false).with_usages(vec![KeyUsage::Verify]));
        let result = BridgeSigner::new(key_pair).await;
        assert!(matches!(result, Err(SignerError::InvalidPrivateKey(_))));
    }

    #[tokio::test]
    async fn test_unexportable_public_key_is_fatal() {
        let key_pair = Arc::new(SoftwareKeyPair::generate(false).without_public_export());
        let result = extract_signer(key_pair).await;
        assert!(matches!(result, Err(SignerError::KeyExtractionExhausted(_))));
    }
}
