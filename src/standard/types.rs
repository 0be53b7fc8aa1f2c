//! Wallet Standard types: accounts, feature inputs/outputs and the feature dictionary

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SignerError;
use crate::payload::TransactionVersion;
use crate::sign_in::SignInInput;
use crate::traits::SendOptions;

pub const STANDARD_CONNECT: &str = "standard:connect";
pub const STANDARD_DISCONNECT: &str = "standard:disconnect";
pub const STANDARD_EVENTS: &str = "standard:events";
pub const SOLANA_SIGN_TRANSACTION: &str = "solana:signTransaction";
pub const SOLANA_SIGN_AND_SEND_TRANSACTION: &str = "solana:signAndSendTransaction";
pub const SOLANA_SIGN_MESSAGE: &str = "solana:signMessage";
pub const SOLANA_SIGN_IN: &str = "solana:signIn";

/// Prefix shared by every Solana chain identifier
pub const SOLANA_CHAIN_PREFIX: &str = "solana:";

/// An account as reported by a wallet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAccount {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<Vec<u8>>,
    #[serde(default)]
    pub chains: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectInput {
    pub silent: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectOutput {
    pub accounts: Vec<WalletAccount>,
}

/// Properties that changed inside the wallet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletChange {
    pub chains: Option<Vec<String>>,
    pub accounts: Option<Vec<WalletAccount>>,
}

pub type ChangeListener = Arc<dyn Fn(WalletChange) + Send + Sync>;

/// Removes a change listener when called
pub type Unsubscribe = Box<dyn FnOnce() + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignTransactionInput {
    pub account: WalletAccount,
    pub transaction: Vec<u8>,
    pub chain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignTransactionOutput {
    pub signed_transaction: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignAndSendTransactionInput {
    pub account: WalletAccount,
    pub transaction: Vec<u8>,
    pub chain: String,
    pub options: Option<SendOptions>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignAndSendTransactionOutput {
    /// Raw 64-byte transaction signature
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignMessageInput {
    pub account: WalletAccount,
    pub message: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignMessageOutput {
    pub signed_message: Vec<u8>,
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInFeatureOutput {
    pub account: WalletAccount,
    pub signed_message: Vec<u8>,
    pub signature: Vec<u8>,
}

#[async_trait]
pub trait ConnectFeature: Send + Sync {
    async fn connect(&self, input: ConnectInput) -> Result<ConnectOutput, SignerError>;
}

#[async_trait]
pub trait DisconnectFeature: Send + Sync {
    async fn disconnect(&self) -> Result<(), SignerError>;
}

pub trait EventsFeature: Send + Sync {
    /// Register a listener for wallet property changes
    fn on_change(&self, listener: ChangeListener) -> Unsubscribe;
}

#[async_trait]
pub trait SignTransactionFeature: Send + Sync {
    fn supported_transaction_versions(&self) -> Vec<TransactionVersion>;

    async fn sign_transaction(
        &self,
        inputs: Vec<SignTransactionInput>,
    ) -> Result<Vec<SignTransactionOutput>, SignerError>;
}

#[async_trait]
pub trait SignAndSendTransactionFeature: Send + Sync {
    fn supported_transaction_versions(&self) -> Vec<TransactionVersion>;

    async fn sign_and_send_transaction(
        &self,
        inputs: Vec<SignAndSendTransactionInput>,
    ) -> Result<Vec<SignAndSendTransactionOutput>, SignerError>;
}

#[async_trait]
pub trait SignMessageFeature: Send + Sync {
    async fn sign_message(
        &self,
        inputs: Vec<SignMessageInput>,
    ) -> Result<Vec<SignMessageOutput>, SignerError>;
}

#[async_trait]
pub trait SignInFeature: Send + Sync {
    async fn sign_in(
        &self,
        inputs: Vec<SignInInput>,
    ) -> Result<Vec<SignInFeatureOutput>, SignerError>;
}

/// One entry of a wallet's feature dictionary
#[derive(Clone)]
pub enum WalletFeature {
    Connect(Arc<dyn ConnectFeature>),
    Disconnect(Arc<dyn DisconnectFeature>),
    Events(Arc<dyn EventsFeature>),
    SignTransaction(Arc<dyn SignTransactionFeature>),
    SignAndSendTransaction(Arc<dyn SignAndSendTransactionFeature>),
    SignMessage(Arc<dyn SignMessageFeature>),
    SignIn(Arc<dyn SignInFeature>),
}

impl WalletFeature {
    /// The dictionary key this feature is registered under
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connect(_) => STANDARD_CONNECT,
            Self::Disconnect(_) => STANDARD_DISCONNECT,
            Self::Events(_) => STANDARD_EVENTS,
            Self::SignTransaction(_) => SOLANA_SIGN_TRANSACTION,
            Self::SignAndSendTransaction(_) => SOLANA_SIGN_AND_SEND_TRANSACTION,
            Self::SignMessage(_) => SOLANA_SIGN_MESSAGE,
            Self::SignIn(_) => SOLANA_SIGN_IN,
        }
    }
}

/// A wallet's capabilities keyed by feature name
#[derive(Clone, Default)]
pub struct WalletFeatures {
    features: BTreeMap<String, WalletFeature>,
}

impl std::fmt::Debug for WalletFeatures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.features.keys()).finish()
    }
}

impl WalletFeatures {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, feature: WalletFeature) -> Self {
        self.insert(feature);
        self
    }

    pub fn insert(&mut self, feature: WalletFeature) {
        self.features.insert(feature.name().to_string(), feature);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.features.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.features.keys().map(String::as_str)
    }

    pub fn connect(&self) -> Option<Arc<dyn ConnectFeature>> {
        match self.features.get(STANDARD_CONNECT)? {
            WalletFeature::Connect(f) => Some(Arc::clone(f)),
            _ => None,
        }
    }

    pub fn disconnect(&self) -> Option<Arc<dyn DisconnectFeature>> {
        match self.features.get(STANDARD_DISCONNECT)? {
            WalletFeature::Disconnect(f) => Some(Arc::clone(f)),
            _ => None,
        }
    }

    pub fn events(&self) -> Option<Arc<dyn EventsFeature>> {
        match self.features.get(STANDARD_EVENTS)? {
            WalletFeature::Events(f) => Some(Arc::clone(f)),
            _ => None,
        }
    }

    pub fn sign_transaction(&self) -> Option<Arc<dyn SignTransactionFeature>> {
        match self.features.get(SOLANA_SIGN_TRANSACTION)? {
            WalletFeature::SignTransaction(f) => Some(Arc::clone(f)),
            _ => None,
        }
    }

    pub fn sign_and_send_transaction(&self) -> Option<Arc<dyn SignAndSendTransactionFeature>> {
        match self.features.get(SOLANA_SIGN_AND_SEND_TRANSACTION)? {
            WalletFeature::SignAndSendTransaction(f) => Some(Arc::clone(f)),
            _ => None,
        }
    }

    pub fn sign_message(&self) -> Option<Arc<dyn SignMessageFeature>> {
        match self.features.get(SOLANA_SIGN_MESSAGE)? {
            WalletFeature::SignMessage(f) => Some(Arc::clone(f)),
            _ => None,
        }
    }

    pub fn sign_in(&self) -> Option<Arc<dyn SignInFeature>> {
        match self.features.get(SOLANA_SIGN_IN)? {
            WalletFeature::SignIn(f) => Some(Arc::clone(f)),
            _ => None,
        }
    }
}

/// A wallet announced by the host environment
pub trait StandardWallet: Send + Sync {
    fn name(&self) -> &str;

    fn icon(&self) -> &str;

    fn website(&self) -> Option<&str> {
        None
    }

    fn chains(&self) -> Vec<String>;

    fn features(&self) -> WalletFeatures;
}
