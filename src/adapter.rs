//! The uniform wallet adapter surface exposed to callers

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::SignerError;
use crate::payload::{LegacyTransaction, TransactionVersion};
use crate::sdk_adapter::{Pubkey, Signature};
use crate::sign_in::{SignInInput, SignInOutput};
use crate::traits::{NetworkClient, SendOptions};

/// Capacity of each adapter's event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WalletReadyState {
    Installed,
    NotDetected,
    Loadable,
    Unsupported,
}

/// Notification delivered to adapter subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterEvent {
    Connect(Pubkey),
    Disconnect,
    Error(SignerError),
    ReadyStateChange(WalletReadyState),
}

/// Optional operations an adapter actually provides
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdapterCapabilities {
    pub sign_transaction: bool,
    pub sign_all_transactions: bool,
    pub sign_and_send_transaction: bool,
    pub sign_message: bool,
    pub sign_in: bool,
}

/// A connectable wallet
///
/// Optional capabilities are discovered through [`WalletAdapter::capabilities`];
/// calling one that is absent fails with
/// [`SignerError::UnsupportedCapability`].
#[async_trait]
pub trait WalletAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn url(&self) -> &str;

    fn icon(&self) -> &str;

    fn ready_state(&self) -> WalletReadyState;

    fn public_key(&self) -> Option<Pubkey>;

    fn connected(&self) -> bool {
        self.public_key().is_some()
    }

    fn connecting(&self) -> bool;

    fn capabilities(&self) -> AdapterCapabilities;

    /// Versions the wallet accepts for versioned transactions, `None` when it
    /// only handles legacy messages
    fn supported_transaction_versions(&self) -> Option<HashSet<TransactionVersion>> {
        None
    }

    /// Subscribe to connect, disconnect, error and ready-state notifications
    fn subscribe(&self) -> broadcast::Receiver<AdapterEvent>;

    /// Publish a failure detected outside the adapter on its error channel
    fn emit_error(&self, _error: &SignerError) {}

    async fn connect(&self) -> Result<(), SignerError>;

    async fn disconnect(&self) -> Result<(), SignerError>;

    /// Sign and submit a transaction, returning its base58 signature
    async fn send_transaction(
        &self,
        transaction: LegacyTransaction,
        network: &dyn NetworkClient,
        options: &SendOptions,
    ) -> Result<String, SignerError>;

    async fn sign_transaction(
        &self,
        _transaction: LegacyTransaction,
    ) -> Result<LegacyTransaction, SignerError> {
        Err(SignerError::UnsupportedCapability(format!(
            "{} does not support signTransaction",
            self.name()
        )))
    }

    async fn sign_all_transactions(
        &self,
        _transactions: Vec<LegacyTransaction>,
    ) -> Result<Vec<LegacyTransaction>, SignerError> {
        Err(SignerError::UnsupportedCapability(format!(
            "{} does not support signAllTransactions",
            self.name()
        )))
    }

    async fn sign_message(&self, _message: &[u8]) -> Result<Signature, SignerError> {
        Err(SignerError::UnsupportedCapability(format!(
            "{} does not support signMessage",
            self.name()
        )))
    }

    async fn sign_in(&self, _input: SignInInput) -> Result<SignInOutput, SignerError> {
        Err(SignerError::UnsupportedCapability(format!(
            "{} does not support signIn",
            self.name()
        )))
    }
}
