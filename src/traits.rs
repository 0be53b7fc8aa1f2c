//! Core trait definitions for Solana signers and the network primitive

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SignerError;
use crate::payload::LegacyTransaction;
use crate::sdk_adapter::{Hash, Pubkey, Signature};
use crate::transaction_util::TransactionUtil;

/// Base64-encoded signed transaction together with this signer's signature
pub type SignedTransaction = (String, Signature);

/// Trait for signing legacy Solana transactions and raw messages
///
/// Implemented by the in-memory keypair signer and by both outcomes of the
/// key bridge, so the legacy signing path treats them uniformly.
#[async_trait]
pub trait SolanaSigner: Send + Sync {
    /// Get the public key of this signer
    fn pubkey(&self) -> Pubkey;

    /// Sign an arbitrary message
    ///
    /// # Arguments
    ///
    /// * `message` - The message bytes to sign
    ///
    /// # Returns
    ///
    /// The signature produced by signing the message
    async fn sign_message(&self, message: &[u8]) -> Result<Signature, SignerError>;

    /// Sign a legacy transaction in place
    ///
    /// The signature is written at this signer's position among the required
    /// signers; signatures of other signers are left untouched.
    ///
    /// # Arguments
    ///
    /// * `tx` - The transaction to sign (will be modified in place)
    async fn sign_transaction(
        &self,
        tx: &mut LegacyTransaction,
    ) -> Result<SignedTransaction, SignerError> {
        let signature = self.sign_message(&tx.message_data()).await?;
        TransactionUtil::add_signature_to_transaction(tx, &self.pubkey(), signature)?;
        Ok((TransactionUtil::serialize_transaction(tx)?, signature))
    }

    /// Check if the signer is available and healthy
    async fn is_available(&self) -> bool;
}

/// Result of `getLatestBlockhash`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestBlockhash {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// Options forwarded with a raw transaction submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOptions {
    #[serde(default)]
    pub skip_preflight: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preflight_commitment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_context_slot: Option<u64>,
}

/// The network submission primitive
///
/// Nothing beyond these two operations is assumed about the transport.
#[async_trait]
pub trait NetworkClient: Send + Sync {
    async fn get_latest_blockhash(&self) -> Result<LatestBlockhash, SignerError>;

    /// Submit signed wire bytes, returning the base58 transaction signature
    async fn send_raw_transaction(
        &self,
        transaction: &[u8],
        options: &SendOptions,
    ) -> Result<String, SignerError>;
}
