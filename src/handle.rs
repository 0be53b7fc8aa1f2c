//! Wallet handles: the key sources a caller can hand to the signing engine

use std::str::FromStr;
use std::sync::Arc;

use crate::adapter::WalletAdapter;
use crate::classifier::{self, fields, Architecture, FieldShape};
use crate::error::SignerError;
use crate::key_bridge::CryptoKeyPair;
use crate::memory::MemorySigner;
use crate::sdk_adapter::{Keypair, Pubkey};

/// A key source, tagged once when it enters the crate
#[derive(Clone)]
pub enum WalletHandle {
    /// An in-memory keypair
    Keypair(Arc<MemorySigner>),
    /// A connectable wallet, including wrapped Wallet Standard wallets
    Adapter(Arc<dyn WalletAdapter>),
    /// A platform key pair whose private half may be non-extractable
    CryptoKey(Arc<dyn CryptoKeyPair>),
    /// A base58 address with no signing capability
    Address(String),
}

impl WalletHandle {
    pub fn architecture(&self) -> Architecture {
        classifier::classify_wallet(self)
    }

    /// The handle's public key, when it is known without I/O
    pub fn pubkey(&self) -> Option<Pubkey> {
        match self {
            Self::Keypair(signer) => Some(crate::traits::SolanaSigner::pubkey(signer.as_ref())),
            Self::Adapter(adapter) => adapter.public_key(),
            Self::CryptoKey(_) => None,
            Self::Address(address) => Pubkey::from_str(address).ok(),
        }
    }

    /// Parse a bare address handle
    pub fn address(address: &str) -> Result<Self, SignerError> {
        Pubkey::from_str(address).map_err(|e| {
            SignerError::InvalidPublicKey(format!("Invalid address {address}: {e}"))
        })?;
        Ok(Self::Address(address.to_string()))
    }
}

impl FieldShape for WalletHandle {
    fn has_field(&self, name: &str) -> bool {
        match self {
            Self::Keypair(_) => matches!(name, fields::SECRET_KEY | fields::PUBLIC_KEY),
            Self::Adapter(_) => matches!(name, fields::PUBLIC_KEY | fields::CONNECTED),
            Self::CryptoKey(_) => matches!(name, fields::PRIVATE_KEY | fields::PUBLIC_KEY),
            Self::Address(_) => false,
        }
    }
}

impl std::fmt::Debug for WalletHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keypair(signer) => f.debug_tuple("WalletHandle::Keypair").field(signer).finish(),
            Self::Adapter(adapter) => f
                .debug_tuple("WalletHandle::Adapter")
                .field(&adapter.name())
                .finish(),
            Self::CryptoKey(key) => f
                .debug_tuple("WalletHandle::CryptoKey")
                .field(&key.algorithm())
                .finish(),
            Self::Address(address) => f.debug_tuple("WalletHandle::Address").field(address).finish(),
        }
    }
}

impl From<MemorySigner> for WalletHandle {
    fn from(signer: MemorySigner) -> Self {
        Self::Keypair(Arc::new(signer))
    }
}

impl From<Keypair> for WalletHandle {
    fn from(keypair: Keypair) -> Self {
        Self::Keypair(Arc::new(MemorySigner::new(keypair)))
    }
}

impl From<Arc<dyn WalletAdapter>> for WalletHandle {
    fn from(adapter: Arc<dyn WalletAdapter>) -> Self {
        Self::Adapter(adapter)
    }
}

impl From<Arc<dyn CryptoKeyPair>> for WalletHandle {
    fn from(key_pair: Arc<dyn CryptoKeyPair>) -> Self {
        Self::CryptoKey(key_pair)
    }
}
