//! Transaction payload models: legacy transactions and kit transaction messages

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::classifier::{self, Architecture, FieldShape};
use crate::error::SignerError;
use crate::sdk_adapter::{Hash, MessageHeader, Pubkey, Signature, Transaction, VersionedMessage, VersionedTransaction};

/// Version tag of a versioned transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionVersion {
    Legacy,
    Number(u8),
}

impl fmt::Display for TransactionVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => write!(f, "legacy"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// A transaction in the legacy data model (blockhash, fee payer, signature list)
///
/// The variant is the caller's shape and is preserved by every signing path:
/// an unversioned transaction is never upgraded and a versioned one never
/// downgraded.
#[derive(Debug, Clone, PartialEq)]
pub enum LegacyTransaction {
    Unversioned(Transaction),
    Versioned(VersionedTransaction),
}

impl LegacyTransaction {
    /// The version tag, `None` for unversioned transactions
    pub fn version(&self) -> Option<TransactionVersion> {
        match self {
            Self::Unversioned(_) => None,
            Self::Versioned(tx) => Some(match tx.message {
                VersionedMessage::Legacy(_) => TransactionVersion::Legacy,
                VersionedMessage::V0(_) => TransactionVersion::Number(0),
            }),
        }
    }

    pub fn is_versioned(&self) -> bool {
        matches!(self, Self::Versioned(_))
    }

    /// The serialized message, i.e. the bytes each signer signs
    pub fn message_data(&self) -> Vec<u8> {
        match self {
            Self::Unversioned(tx) => tx.message_data(),
            Self::Versioned(tx) => tx.message.serialize(),
        }
    }

    pub fn header(&self) -> &MessageHeader {
        match self {
            Self::Unversioned(tx) => &tx.message.header,
            Self::Versioned(tx) => tx.message.header(),
        }
    }

    pub fn account_keys(&self) -> &[Pubkey] {
        match self {
            Self::Unversioned(tx) => &tx.message.account_keys,
            Self::Versioned(tx) => tx.message.static_account_keys(),
        }
    }

    /// The fee payer, if the message has at least one required signer
    pub fn fee_payer(&self) -> Option<Pubkey> {
        if self.header().num_required_signatures == 0 {
            return None;
        }
        self.account_keys().first().copied()
    }

    pub fn recent_blockhash(&self) -> Hash {
        match self {
            Self::Unversioned(tx) => tx.message.recent_blockhash,
            Self::Versioned(tx) => *tx.message.recent_blockhash(),
        }
    }

    /// Replaces the blockhash. Existing signatures are cleared since they no
    /// longer cover the message.
    pub fn set_recent_blockhash(&mut self, blockhash: Hash) {
        match self {
            Self::Unversioned(tx) => {
                tx.message.recent_blockhash = blockhash;
                tx.signatures.iter_mut().for_each(|s| *s = Signature::default());
            }
            Self::Versioned(tx) => {
                tx.message.set_recent_blockhash(blockhash);
                tx.signatures.iter_mut().for_each(|s| *s = Signature::default());
            }
        }
    }

    pub fn signatures(&self) -> &[Signature] {
        match self {
            Self::Unversioned(tx) => &tx.signatures,
            Self::Versioned(tx) => &tx.signatures,
        }
    }

    pub fn signatures_mut(&mut self) -> &mut Vec<Signature> {
        match self {
            Self::Unversioned(tx) => &mut tx.signatures,
            Self::Versioned(tx) => &mut tx.signatures,
        }
    }

    /// Wire-format bytes of the whole transaction
    pub fn to_wire_bytes(&self) -> Result<Vec<u8>, SignerError> {
        let bytes = match self {
            Self::Unversioned(tx) => bincode::serialize(tx),
            Self::Versioned(tx) => bincode::serialize(tx),
        };
        bytes.map_err(|e| {
            SignerError::SerializationError(format!("Failed to serialize transaction: {e}"))
        })
    }

    /// Decodes wire bytes into the same shape as `self`
    pub fn decode_same_shape(&self, bytes: &[u8]) -> Result<Self, SignerError> {
        let decoded = match self {
            Self::Unversioned(_) => bincode::deserialize::<Transaction>(bytes).map(Self::Unversioned),
            Self::Versioned(_) => {
                bincode::deserialize::<VersionedTransaction>(bytes).map(Self::Versioned)
            }
        };
        decoded.map_err(|e| {
            SignerError::MalformedWalletResponse(format!(
                "Failed to deserialize signed transaction: {e}"
            ))
        })
    }
}

impl From<Transaction> for LegacyTransaction {
    fn from(tx: Transaction) -> Self {
        Self::Unversioned(tx)
    }
}

impl From<VersionedTransaction> for LegacyTransaction {
    fn from(tx: VersionedTransaction) -> Self {
        Self::Versioned(tx)
    }
}

impl FieldShape for LegacyTransaction {
    fn has_field(&self, name: &str) -> bool {
        match self {
            Self::Unversioned(_) => matches!(
                name,
                classifier::fields::SIGNATURES
                    | classifier::fields::RECENT_BLOCKHASH
                    | classifier::fields::FEE_PAYER
                    | classifier::fields::INSTRUCTIONS
            ),
            Self::Versioned(_) => matches!(
                name,
                classifier::fields::SIGNATURES
                    | classifier::fields::MESSAGE
                    | classifier::fields::VERSION
            ),
        }
    }
}

/// Role of an account referenced by a kit instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccountRole {
    Readonly,
    Writable,
    ReadonlySigner,
    WritableSigner,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KitAccountMeta {
    pub address: String,
    pub role: AccountRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KitInstruction {
    pub program_address: String,
    #[serde(default)]
    pub accounts: Vec<KitAccountMeta>,
    #[serde(default)]
    pub data: Vec<u8>,
}

/// Lifetime attached to a kit message separately from its instructions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", untagged)]
pub enum KitLifetime {
    #[serde(rename_all = "camelCase")]
    Blockhash {
        blockhash: String,
        last_valid_block_height: u64,
    },
    #[serde(rename_all = "camelCase")]
    DurableNonce {
        nonce: String,
        nonce_account_address: String,
    },
}

/// A transaction message in the kit data model: an instruction list with no
/// blockhash or version field of its own
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KitTransactionMessage {
    pub instructions: Vec<KitInstruction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_payer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifetime_constraint: Option<KitLifetime>,
}

impl FieldShape for KitTransactionMessage {
    fn has_field(&self, name: &str) -> bool {
        match name {
            classifier::fields::INSTRUCTIONS => true,
            classifier::fields::FEE_PAYER => self.fee_payer.is_some(),
            classifier::fields::LIFETIME_CONSTRAINT => self.lifetime_constraint.is_some(),
            _ => false,
        }
    }
}

/// Either transaction data model, as handed in by the caller
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionPayload {
    Legacy(LegacyTransaction),
    Kit(KitTransactionMessage),
}

impl TransactionPayload {
    pub fn architecture(&self) -> Architecture {
        classifier::classify_payload(self)
    }

    pub fn as_legacy(&self) -> Option<&LegacyTransaction> {
        match self {
            Self::Legacy(tx) => Some(tx),
            Self::Kit(_) => None,
        }
    }

    pub fn into_legacy(self) -> Option<LegacyTransaction> {
        match self {
            Self::Legacy(tx) => Some(tx),
            Self::Kit(_) => None,
        }
    }
}

impl FieldShape for TransactionPayload {
    fn has_field(&self, name: &str) -> bool {
        match self {
            Self::Legacy(tx) => tx.has_field(name),
            Self::Kit(message) => message.has_field(name),
        }
    }
}

impl From<LegacyTransaction> for TransactionPayload {
    fn from(tx: LegacyTransaction) -> Self {
        Self::Legacy(tx)
    }
}

impl From<Transaction> for TransactionPayload {
    fn from(tx: Transaction) -> Self {
        Self::Legacy(LegacyTransaction::Unversioned(tx))
    }
}

impl From<VersionedTransaction> for TransactionPayload {
    fn from(tx: VersionedTransaction) -> Self {
        Self::Legacy(LegacyTransaction::Versioned(tx))
    }
}

impl From<KitTransactionMessage> for TransactionPayload {
    fn from(message: KitTransactionMessage) -> Self {
        Self::Kit(message)
    }
}
