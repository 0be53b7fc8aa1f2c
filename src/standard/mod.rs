//! Wallet Standard bridge
//!
//! Wraps a wallet announced through the Wallet Standard (a dictionary of named
//! features) into the uniform [`WalletAdapter`] surface.

mod account;
mod state;
pub mod types;

pub use account::{account_pubkey, select_account};
pub use state::{transition, ConnectionState, StateInput};

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::adapter::{
    AdapterCapabilities, AdapterEvent, WalletAdapter, WalletReadyState, EVENT_CHANNEL_CAPACITY,
};
use crate::cluster::Cluster;
use crate::error::SignerError;
use crate::payload::{LegacyTransaction, TransactionVersion};
use crate::sdk_adapter::{Pubkey, Signature};
use crate::sign_in::{SignInInput, SignInOutput};
use crate::traits::{NetworkClient, SendOptions};
use crate::transaction_util::TransactionUtil;
use types::{
    ConnectInput, SignAndSendTransactionInput, SignMessageInput, SignTransactionInput,
    StandardWallet, Unsubscribe, WalletAccount, WalletChange, WalletFeatures,
    SOLANA_CHAIN_PREFIX, SOLANA_SIGN_AND_SEND_TRANSACTION, SOLANA_SIGN_TRANSACTION,
    STANDARD_CONNECT, STANDARD_EVENTS,
};

/// Whether a wallet exposes the minimal feature set the adapter needs:
/// connect, events, and at least one of sign or sign-and-send.
pub fn is_wallet_adapter_compatible(features: &WalletFeatures) -> bool {
    features.contains(STANDARD_CONNECT)
        && features.contains(STANDARD_EVENTS)
        && (features.contains(SOLANA_SIGN_TRANSACTION)
            || features.contains(SOLANA_SIGN_AND_SEND_TRANSACTION))
}

#[derive(Default)]
struct AdapterState {
    connection: ConnectionState,
    account: Option<WalletAccount>,
}

/// `Installed` while the wallet announces at least one Solana chain
fn ready_state_for(chains: &[String]) -> WalletReadyState {
    if chains.iter().any(|chain| chain.starts_with(SOLANA_CHAIN_PREFIX)) {
        WalletReadyState::Installed
    } else {
        WalletReadyState::Unsupported
    }
}

struct AdapterInner {
    name: String,
    signing_features: Vec<&'static str>,
    state: Mutex<AdapterState>,
    ready_state: Mutex<WalletReadyState>,
    events: broadcast::Sender<AdapterEvent>,
    off: Mutex<Option<Unsubscribe>>,
}

impl AdapterInner {
    fn state(&self) -> MutexGuard<'_, AdapterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: AdapterEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    fn report<T>(&self, result: Result<T, SignerError>) -> Result<T, SignerError> {
        if let Err(e) = &result {
            self.emit(AdapterEvent::Error(e.clone()));
        }
        result
    }

    /// Apply one state-machine step, store `account` when the step lands in
    /// `Connected`, and deliver the resulting notifications.
    fn apply(&self, input: StateInput, account: Option<WalletAccount>) -> ConnectionState {
        let (next, events) = {
            let mut state = self.state();
            let (next, events) = transition(state.connection, input);
            state.connection = next;
            match next {
                ConnectionState::Connected(_) => {
                    if let Some(account) = account {
                        state.account = Some(account);
                    }
                }
                _ => state.account = None,
            }
            (next, events)
        };

        if next == ConnectionState::Disconnected {
            self.release_subscription();
        }
        for event in events {
            self.emit(event);
        }
        next
    }

    /// Runs the wallet's unsubscribe handle at most once per subscription
    fn release_subscription(&self) {
        let off = self.off.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(off) = off {
            log::debug!("Releasing account-change subscription for {}", self.name);
            off();
        }
    }

    fn ready_state(&self) -> WalletReadyState {
        *self.ready_state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update_ready_state(&self, chains: &[String]) {
        let next = ready_state_for(chains);
        let changed = {
            let mut current = self.ready_state.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, next) != next
        };
        if changed {
            log::debug!("{} ready state is now {next:?}", self.name);
            self.emit(AdapterEvent::ReadyStateChange(next));
        }
    }

    fn handle_change(&self, change: WalletChange) {
        if let Some(chains) = &change.chains {
            self.update_ready_state(chains);
        }
        let Some(accounts) = change.accounts else {
            return;
        };
        if !matches!(self.state().connection, ConnectionState::Connected(_)) {
            return;
        }

        let selected = select_account(&accounts, &self.signing_features)
            .and_then(|account| account_pubkey(account).ok().map(|pk| (account.clone(), pk)));
        match selected {
            Some((account, pubkey)) => {
                log::debug!("{} switched account to {pubkey}", self.name);
                self.apply(StateInput::AccountChanged(Some(pubkey)), Some(account));
            }
            None => {
                log::debug!("{} reported no compatible accounts, disconnecting", self.name);
                self.apply(StateInput::AccountChanged(None), None);
            }
        }
    }
}

/// Adapter over a Wallet Standard wallet
pub struct StandardWalletAdapter {
    wallet: Arc<dyn StandardWallet>,
    features: WalletFeatures,
    url: String,
    cluster: Cluster,
    supported_versions: Option<HashSet<TransactionVersion>>,
    inner: Arc<AdapterInner>,
}

impl std::fmt::Debug for StandardWalletAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandardWalletAdapter")
            .field("name", &self.inner.name)
            .field("features", &self.features)
            .field("state", &self.inner.state().connection)
            .finish_non_exhaustive()
    }
}

impl StandardWalletAdapter {
    /// Wrap a discovered wallet
    ///
    /// Fails with [`SignerError::InvalidWalletCapabilitySet`] unless the wallet
    /// exposes connect, events, and sign or sign-and-send.
    pub fn new(wallet: Arc<dyn StandardWallet>) -> Result<Self, SignerError> {
        let features = wallet.features();
        if !is_wallet_adapter_compatible(&features) {
            return Err(SignerError::InvalidWalletCapabilitySet(format!(
                "{} must expose {STANDARD_CONNECT}, {STANDARD_EVENTS} and {SOLANA_SIGN_TRANSACTION} or {SOLANA_SIGN_AND_SEND_TRANSACTION}",
                wallet.name()
            )));
        }

        let mut signing_features = Vec::new();
        if features.contains(SOLANA_SIGN_TRANSACTION) {
            signing_features.push(SOLANA_SIGN_TRANSACTION);
        }
        if features.contains(SOLANA_SIGN_AND_SEND_TRANSACTION) {
            signing_features.push(SOLANA_SIGN_AND_SEND_TRANSACTION);
        }

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let inner = Arc::new(AdapterInner {
            name: wallet.name().to_string(),
            signing_features,
            state: Mutex::new(AdapterState::default()),
            ready_state: Mutex::new(ready_state_for(&wallet.chains())),
            events,
            off: Mutex::new(None),
        });

        Ok(Self {
            url: wallet.website().unwrap_or_default().to_string(),
            supported_versions: Self::declared_versions(&features),
            features,
            cluster: Cluster::default(),
            wallet,
            inner,
        })
    }

    /// Target a specific cluster when attaching chain ids to requests
    #[must_use]
    pub fn with_cluster(mut self, cluster: Cluster) -> Self {
        self.cluster = cluster;
        self
    }

    pub fn wallet(&self) -> &Arc<dyn StandardWallet> {
        &self.wallet
    }

    pub fn features(&self) -> &WalletFeatures {
        &self.features
    }

    /// The connected account, if any
    pub fn account(&self) -> Option<WalletAccount> {
        self.inner.state().account.clone()
    }

    fn declared_versions(features: &WalletFeatures) -> Option<HashSet<TransactionVersion>> {
        let versions = if let Some(feature) = features.sign_and_send_transaction() {
            feature.supported_transaction_versions()
        } else {
            features.sign_transaction()?.supported_transaction_versions()
        };
        if versions.is_empty() || versions == [TransactionVersion::Legacy] {
            None
        } else {
            Some(versions.into_iter().collect())
        }
    }

    fn connected_account(&self) -> Result<(WalletAccount, Pubkey), SignerError> {
        let state = self.inner.state();
        match (state.connection, &state.account) {
            (ConnectionState::Connected(pubkey), Some(account)) => Ok((account.clone(), pubkey)),
            _ => Err(SignerError::NotConnected),
        }
    }

    fn chain_for(&self, account: &WalletAccount) -> Option<String> {
        let chain = self.cluster.chain();
        account
            .chains
            .iter()
            .any(|c| c == chain)
            .then(|| chain.to_string())
    }

    fn subscribe_to_changes(&self) {
        let mut off = self.inner.off.lock().unwrap_or_else(PoisonError::into_inner);
        if off.is_some() {
            return;
        }
        let Some(events) = self.features.events() else {
            return;
        };
        let weak: Weak<AdapterInner> = Arc::downgrade(&self.inner);
        *off = Some(events.on_change(Arc::new(move |change| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_change(change);
            }
        })));
    }

    /// Move into `Connected` with an account the wallet handed back outside of
    /// `connect`, e.g. from sign-in
    fn adopt_account(&self, account: WalletAccount) -> Result<Pubkey, SignerError> {
        let pubkey = account_pubkey(&account)?;
        let current = self.inner.state().connection;
        match current {
            ConnectionState::Connected(_) => {
                self.inner.apply(StateInput::AccountChanged(Some(pubkey)), Some(account));
            }
            _ => {
                self.inner.apply(StateInput::ConnectStarted, None);
                self.subscribe_to_changes();
                self.inner.apply(StateInput::ConnectSucceeded(pubkey), Some(account));
            }
        }
        Ok(pubkey)
    }

    async fn connect_inner(&self) -> Result<(), SignerError> {
        // Check and enter `Connecting` under one lock so a second caller
        // returns early instead of reaching the wallet
        {
            let mut state = self.inner.state();
            let (next, _) = transition(state.connection, StateInput::ConnectStarted);
            if next != ConnectionState::Connecting || state.connection == next {
                return Ok(());
            }
            state.connection = next;
        }

        match self.request_account().await {
            Ok((account, pubkey)) => {
                self.subscribe_to_changes();
                match self
                    .inner
                    .apply(StateInput::ConnectSucceeded(pubkey), Some(account))
                {
                    ConnectionState::Connected(_) => {
                        log::debug!("Connected to {} as {pubkey}", self.inner.name);
                        Ok(())
                    }
                    _ => {
                        // A disconnect landed while the wallet was approving
                        log::debug!("Connect to {} was cancelled by disconnect", self.inner.name);
                        self.inner.release_subscription();
                        Err(SignerError::NotConnected)
                    }
                }
            }
            Err(e) => {
                self.inner.apply(StateInput::ConnectFailed, None);
                Err(e)
            }
        }
    }

    async fn request_account(&self) -> Result<(WalletAccount, Pubkey), SignerError> {
        let connect = self.features.connect().ok_or_else(|| {
            SignerError::UnsupportedCapability(format!("{} has no {STANDARD_CONNECT}", self.inner.name))
        })?;
        let output = connect.connect(ConnectInput::default()).await?;

        let account = select_account(&output.accounts, &self.inner.signing_features)
            .cloned()
            .ok_or_else(|| SignerError::NoCompatibleAccount(self.inner.name.clone()))?;
        let pubkey = account_pubkey(&account)?;
        Ok((account, pubkey))
    }

    async fn sign_transactions_inner(
        &self,
        transactions: Vec<LegacyTransaction>,
    ) -> Result<Vec<LegacyTransaction>, SignerError> {
        let (account, _) = self.connected_account()?;
        let feature = self.features.sign_transaction().ok_or_else(|| {
            SignerError::UnsupportedCapability(format!(
                "{} has no {SOLANA_SIGN_TRANSACTION}",
                self.inner.name
            ))
        })?;

        let chain = self.chain_for(&account);
        let inputs = transactions
            .iter()
            .map(|tx| {
                Ok(SignTransactionInput {
                    account: account.clone(),
                    transaction: tx.to_wire_bytes()?,
                    chain: chain.clone(),
                })
            })
            .collect::<Result<Vec<_>, SignerError>>()?;

        let outputs = feature.sign_transaction(inputs).await?;
        if outputs.len() != transactions.len() {
            return Err(SignerError::MalformedWalletResponse(format!(
                "Expected {} signed transactions, got {}",
                transactions.len(),
                outputs.len()
            )));
        }

        transactions
            .iter()
            .zip(outputs)
            .map(|(tx, output)| tx.decode_same_shape(&output.signed_transaction))
            .collect()
    }

    async fn send_inner(
        &self,
        mut transaction: LegacyTransaction,
        network: &dyn NetworkClient,
        options: &SendOptions,
    ) -> Result<String, SignerError> {
        let (account, pubkey) = self.connected_account()?;
        TransactionUtil::prepare_transaction(
            &mut transaction,
            &pubkey,
            network,
            self.supported_versions.as_ref(),
        )
        .await?;

        let Some(feature) = self.features.sign_and_send_transaction() else {
            log::debug!("{} has no {SOLANA_SIGN_AND_SEND_TRANSACTION}, signing then submitting", self.inner.name);
            let signed = self
                .sign_transactions_inner(vec![transaction])
                .await?
                .pop()
                .ok_or_else(|| {
                    SignerError::MalformedWalletResponse("No signed transaction returned".to_string())
                })?;
            return network
                .send_raw_transaction(&signed.to_wire_bytes()?, options)
                .await;
        };

        let chain = self.chain_for(&account).ok_or_else(|| {
            SignerError::UnsupportedCapability(format!(
                "Account does not support chain {}",
                self.cluster.chain()
            ))
        })?;
        let input = SignAndSendTransactionInput {
            account,
            transaction: transaction.to_wire_bytes()?,
            chain,
            options: Some(options.clone()),
        };

        let output = feature.sign_and_send_transaction(vec![input]).await?;
        let signature = output.first().ok_or_else(|| {
            SignerError::MalformedWalletResponse("No signature returned".to_string())
        })?;
        let signature = signature_from_bytes(&signature.signature)?;
        Ok(signature.to_string())
    }

    async fn sign_message_inner(&self, message: &[u8]) -> Result<Signature, SignerError> {
        let (account, _) = self.connected_account()?;
        let feature = self.features.sign_message().ok_or_else(|| {
            SignerError::UnsupportedCapability(format!("{} has no solana:signMessage", self.inner.name))
        })?;

        let outputs = feature
            .sign_message(vec![SignMessageInput {
                account,
                message: message.to_vec(),
            }])
            .await?;
        let output = outputs.first().ok_or_else(|| {
            SignerError::MalformedWalletResponse("No message signature returned".to_string())
        })?;
        signature_from_bytes(&output.signature)
    }

    async fn sign_in_inner(&self, input: SignInInput) -> Result<SignInOutput, SignerError> {
        let feature = self.features.sign_in().ok_or_else(|| {
            SignerError::UnsupportedCapability(format!("{} has no solana:signIn", self.inner.name))
        })?;

        let mut outputs = feature.sign_in(vec![input]).await?;
        if outputs.is_empty() {
            return Err(SignerError::MalformedWalletResponse(
                "No sign-in output returned".to_string(),
            ));
        }
        let output = outputs.swap_remove(0);
        let signature = signature_from_bytes(&output.signature)?;
        self.adopt_account(output.account.clone())?;
        Ok(SignInOutput::from_signed(
            output.account,
            output.signed_message,
            signature,
        ))
    }
}

fn signature_from_bytes(bytes: &[u8]) -> Result<Signature, SignerError> {
    let bytes: [u8; 64] = bytes.try_into().map_err(|_| {
        SignerError::MalformedWalletResponse(format!(
            "Invalid signature length: expected 64 bytes, got {}",
            bytes.len()
        ))
    })?;
    Ok(Signature::from(bytes))
}

#[async_trait]
impl WalletAdapter for StandardWalletAdapter {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn icon(&self) -> &str {
        self.wallet.icon()
    }

    fn ready_state(&self) -> WalletReadyState {
        self.inner.ready_state()
    }

    fn public_key(&self) -> Option<Pubkey> {
        self.inner.state().connection.public_key()
    }

    fn connecting(&self) -> bool {
        self.inner.state().connection == ConnectionState::Connecting
    }

    fn capabilities(&self) -> AdapterCapabilities {
        let sign = self.features.sign_transaction().is_some();
        AdapterCapabilities {
            sign_transaction: sign,
            sign_all_transactions: sign,
            sign_and_send_transaction: self.features.sign_and_send_transaction().is_some(),
            sign_message: self.features.sign_message().is_some(),
            sign_in: self.features.sign_in().is_some(),
        }
    }

    fn supported_transaction_versions(&self) -> Option<HashSet<TransactionVersion>> {
        self.supported_versions.clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<AdapterEvent> {
        self.inner.events.subscribe()
    }

    fn emit_error(&self, error: &SignerError) {
        self.inner.emit(AdapterEvent::Error(error.clone()));
    }

    async fn connect(&self) -> Result<(), SignerError> {
        let result = self.connect_inner().await;
        self.inner.report(result)
    }

    async fn disconnect(&self) -> Result<(), SignerError> {
        if let Some(feature) = self.features.disconnect() {
            if let Err(e) = feature.disconnect().await {
                log::warn!("{} disconnect failed: {e}", self.inner.name);
                self.inner.emit(AdapterEvent::Error(e));
            }
        }
        self.inner.apply(StateInput::DisconnectRequested, None);
        Ok(())
    }

    async fn send_transaction(
        &self,
        transaction: LegacyTransaction,
        network: &dyn NetworkClient,
        options: &SendOptions,
    ) -> Result<String, SignerError> {
        let result = self.send_inner(transaction, network, options).await;
        self.inner.report(result)
    }

    async fn sign_transaction(
        &self,
        transaction: LegacyTransaction,
    ) -> Result<LegacyTransaction, SignerError> {
        let result = match TransactionUtil::check_supported_version(
            &transaction,
            self.supported_versions.as_ref(),
        ) {
            Ok(()) => self
                .sign_transactions_inner(vec![transaction])
                .await
                .and_then(|mut signed| {
                    signed.pop().ok_or_else(|| {
                        SignerError::MalformedWalletResponse(
                            "No signed transaction returned".to_string(),
                        )
                    })
                }),
            Err(e) => Err(e),
        };
        self.inner.report(result)
    }

    async fn sign_all_transactions(
        &self,
        transactions: Vec<LegacyTransaction>,
    ) -> Result<Vec<LegacyTransaction>, SignerError> {
        let checked = transactions.iter().try_for_each(|tx| {
            TransactionUtil::check_supported_version(tx, self.supported_versions.as_ref())
        });
        let result = match checked {
            Ok(()) => self.sign_transactions_inner(transactions).await,
            Err(e) => Err(e),
        };
        self.inner.report(result)
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature, SignerError> {
        let result = self.sign_message_inner(message).await;
        self.inner.report(result)
    }

    async fn sign_in(&self, input: SignInInput) -> Result<SignInOutput, SignerError> {
        let result = self.sign_in_inner(input).await;
        self.inner.report(result)
    }
}
