use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::SignerError;
use crate::payload::TransactionVersion;
use crate::sdk_adapter::{
    v0, AccountMeta, Hash, Instruction, Keypair, Message, Pubkey, Signature, Signer, Transaction,
    VersionedMessage, VersionedTransaction,
};
use crate::sign_in::SignInInput;
use crate::standard::types::{
    ChangeListener, ConnectFeature, ConnectInput, ConnectOutput, DisconnectFeature, EventsFeature,
    SignAndSendTransactionFeature, SignAndSendTransactionInput, SignAndSendTransactionOutput,
    SignInFeature, SignInFeatureOutput, SignMessageFeature, SignMessageInput, SignMessageOutput,
    SignTransactionFeature, SignTransactionInput, SignTransactionOutput, StandardWallet,
    Unsubscribe, WalletAccount, WalletChange, WalletFeature, WalletFeatures,
    SOLANA_SIGN_AND_SEND_TRANSACTION, SOLANA_SIGN_TRANSACTION,
};
use crate::traits::{LatestBlockhash, NetworkClient, SendOptions};

fn transfer_like_instruction(from: &Pubkey) -> Instruction {
    let to = Pubkey::new_unique();
    let mut data = vec![2, 0, 0, 0];
    data.extend_from_slice(&1_000_000u64.to_le_bytes());
    Instruction::new_with_bytes(
        Pubkey::default(),
        &data,
        vec![AccountMeta::new(*from, true), AccountMeta::new(to, false)],
    )
}

pub fn create_test_transaction(signer: &Keypair) -> Transaction {
    let from = signer.pubkey();
    let message = Message::new(&[transfer_like_instruction(&from)], Some(&from));
    let mut tx = Transaction::new_unsigned(message);
    tx.message.recent_blockhash = Hash::default();
    tx
}

pub fn create_test_v0_transaction(signer: &Keypair) -> VersionedTransaction {
    let from = signer.pubkey();
    let message = v0::Message::try_compile(
        &from,
        &[transfer_like_instruction(&from)],
        &[],
        Hash::default(),
    )
    .expect("compile v0 message");
    let num_signers = message.header.num_required_signatures as usize;
    VersionedTransaction {
        signatures: vec![Signature::default(); num_signers],
        message: VersionedMessage::V0(message),
    }
}

/// Network double serving a fixed blockhash and recording submissions
pub struct MockNetwork {
    blockhash: Hash,
    blockhash_calls: AtomicUsize,
    sent: Mutex<Vec<Vec<u8>>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self {
            blockhash: Hash::new_unique(),
            blockhash_calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn blockhash(&self) -> Hash {
        self.blockhash
    }

    pub fn blockhash_calls(&self) -> usize {
        self.blockhash_calls.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NetworkClient for MockNetwork {
    async fn get_latest_blockhash(&self) -> Result<LatestBlockhash, SignerError> {
        self.blockhash_calls.fetch_add(1, Ordering::SeqCst);
        Ok(LatestBlockhash {
            blockhash: self.blockhash,
            last_valid_block_height: 1_000,
        })
    }

    async fn send_raw_transaction(
        &self,
        transaction: &[u8],
        _options: &SendOptions,
    ) -> Result<String, SignerError> {
        let tx: VersionedTransaction = bincode::deserialize(transaction)?;
        self.sent.lock().unwrap().push(transaction.to_vec());
        let signature = tx.signatures.first().copied().unwrap_or_default();
        Ok(signature.to_string())
    }
}

/// Call counters and switches shared by a [`MockWallet`] and its features
#[derive(Default)]
pub struct MockWalletState {
    connect_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
    sign_calls: AtomicUsize,
    send_calls: AtomicUsize,
    unsubscribe_calls: AtomicUsize,
    next_listener: AtomicUsize,
    listeners: Mutex<Vec<(usize, ChangeListener)>>,
    connect_accounts: Mutex<Option<Vec<WalletAccount>>>,
    fail_disconnect: AtomicBool,
    truncate_signatures: AtomicBool,
}

impl MockWalletState {
    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }

    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub fn unsubscribe_calls(&self) -> usize {
        self.unsubscribe_calls.load(Ordering::SeqCst)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    /// Accounts returned by the next connect instead of the wallet's own
    pub fn set_connect_accounts(&self, accounts: Vec<WalletAccount>) {
        *self.connect_accounts.lock().unwrap() = Some(accounts);
    }

    pub fn fail_disconnect(&self, fail: bool) {
        self.fail_disconnect.store(fail, Ordering::SeqCst);
    }

    /// Return 32-byte signatures from signMessage
    pub fn truncate_signatures(&self, truncate: bool) {
        self.truncate_signatures.store(truncate, Ordering::SeqCst);
    }
}

struct MockFeatures {
    keypair: Arc<Keypair>,
    versions: Vec<TransactionVersion>,
    state: Arc<MockWalletState>,
}

impl MockFeatures {
    fn account(&self) -> WalletAccount {
        MockWallet::account_for(&self.keypair)
    }

    fn sign_wire(&self, bytes: &[u8]) -> Result<Vec<u8>, SignerError> {
        let mut tx: VersionedTransaction = bincode::deserialize(bytes)?;
        let pubkey = self.keypair.pubkey();
        let num_signers = tx.message.header().num_required_signatures as usize;
        let position = tx.message.static_account_keys()[..num_signers]
            .iter()
            .position(|key| *key == pubkey)
            .ok_or_else(|| SignerError::SigningFailed("Wallet is not a signer".to_string()))?;
        if tx.signatures.len() < num_signers {
            tx.signatures.resize(num_signers, Signature::default());
        }
        tx.signatures[position] = self.keypair.sign_message(&tx.message.serialize());
        Ok(bincode::serialize(&tx)?)
    }
}

#[async_trait]
impl ConnectFeature for MockFeatures {
    async fn connect(&self, _input: ConnectInput) -> Result<ConnectOutput, SignerError> {
        self.state.connect_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        let accounts = self
            .state
            .connect_accounts
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| vec![self.account()]);
        Ok(ConnectOutput { accounts })
    }
}

#[async_trait]
impl DisconnectFeature for MockFeatures {
    async fn disconnect(&self) -> Result<(), SignerError> {
        self.state.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_disconnect.load(Ordering::SeqCst) {
            return Err(SignerError::RemoteApiError("disconnect rejected".to_string()));
        }
        Ok(())
    }
}

impl EventsFeature for MockFeatures {
    fn on_change(&self, listener: ChangeListener) -> Unsubscribe {
        let id = self.state.next_listener.fetch_add(1, Ordering::SeqCst);
        self.state.listeners.lock().unwrap().push((id, listener));
        let state = Arc::clone(&self.state);
        Box::new(move || {
            state.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
            state.listeners.lock().unwrap().retain(|(other, _)| *other != id);
        })
    }
}

#[async_trait]
impl SignTransactionFeature for MockFeatures {
    fn supported_transaction_versions(&self) -> Vec<TransactionVersion> {
        self.versions.clone()
    }

    async fn sign_transaction(
        &self,
        inputs: Vec<SignTransactionInput>,
    ) -> Result<Vec<SignTransactionOutput>, SignerError> {
        self.state.sign_calls.fetch_add(1, Ordering::SeqCst);
        inputs
            .iter()
            .map(|input| {
                Ok::<_, SignerError>(SignTransactionOutput {
                    signed_transaction: self.sign_wire(&input.transaction)?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl SignAndSendTransactionFeature for MockFeatures {
    fn supported_transaction_versions(&self) -> Vec<TransactionVersion> {
        self.versions.clone()
    }

    async fn sign_and_send_transaction(
        &self,
        inputs: Vec<SignAndSendTransactionInput>,
    ) -> Result<Vec<SignAndSendTransactionOutput>, SignerError> {
        self.state.send_calls.fetch_add(1, Ordering::SeqCst);
        inputs
            .iter()
            .map(|input| {
                let signed: VersionedTransaction =
                    bincode::deserialize(&self.sign_wire(&input.transaction)?)?;
                let signature = signed.signatures.first().copied().unwrap_or_default();
                Ok::<_, SignerError>(SignAndSendTransactionOutput {
                    signature: signature.as_ref().to_vec(),
                })
            })
            .collect()
    }
}

#[async_trait]
impl SignMessageFeature for MockFeatures {
    async fn sign_message(
        &self,
        inputs: Vec<SignMessageInput>,
    ) -> Result<Vec<SignMessageOutput>, SignerError> {
        let truncate = self.state.truncate_signatures.load(Ordering::SeqCst);
        Ok(inputs
            .into_iter()
            .map(|input| {
                let mut signature = self.keypair.sign_message(&input.message).as_ref().to_vec();
                if truncate {
                    signature.truncate(32);
                }
                SignMessageOutput {
                    signed_message: input.message,
                    signature,
                }
            })
            .collect())
    }
}

#[async_trait]
impl SignInFeature for MockFeatures {
    async fn sign_in(
        &self,
        inputs: Vec<SignInInput>,
    ) -> Result<Vec<SignInFeatureOutput>, SignerError> {
        Ok(inputs
            .into_iter()
            .map(|mut input| {
                input.address = Some(self.keypair.pubkey().to_string());
                let signed_message = input.to_message_text().into_bytes();
                let signature = self.keypair.sign_message(&signed_message).as_ref().to_vec();
                SignInFeatureOutput {
                    account: self.account(),
                    signed_message,
                    signature,
                }
            })
            .collect())
    }
}

/// In-process Wallet Standard wallet backed by a generated keypair
pub struct MockWallet {
    name: String,
    website: String,
    keypair: Arc<Keypair>,
    features: WalletFeatures,
    state: Arc<MockWalletState>,
}

impl MockWallet {
    pub fn builder(name: &str) -> MockWalletBuilder {
        MockWalletBuilder {
            name: name.to_string(),
            events: true,
            disconnect: true,
            sign_transaction: true,
            sign_and_send: false,
            sign_message: false,
            sign_in: false,
            versions: vec![TransactionVersion::Legacy, TransactionVersion::Number(0)],
        }
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    pub fn state(&self) -> &MockWalletState {
        &self.state
    }

    /// A mainnet/devnet account for `keypair` declaring both signing features
    pub fn account_for(keypair: &Keypair) -> WalletAccount {
        let pubkey = keypair.pubkey();
        WalletAccount {
            address: pubkey.to_string(),
            public_key: Some(pubkey.to_bytes().to_vec()),
            chains: vec!["solana:mainnet".to_string(), "solana:devnet".to_string()],
            features: vec![
                SOLANA_SIGN_TRANSACTION.to_string(),
                SOLANA_SIGN_AND_SEND_TRANSACTION.to_string(),
            ],
            label: None,
            icon: None,
        }
    }

    /// Notify every registered listener that the account list changed
    pub fn emit_change(&self, accounts: Vec<WalletAccount>) {
        self.emit_wallet_change(WalletChange {
            accounts: Some(accounts),
            ..WalletChange::default()
        });
    }

    pub fn emit_wallet_change(&self, change: WalletChange) {
        let listeners: Vec<ChangeListener> = self
            .state
            .listeners
            .lock()
            .unwrap()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(change.clone());
        }
    }
}

impl StandardWallet for MockWallet {
    fn name(&self) -> &str {
        &self.name
    }

    fn icon(&self) -> &str {
        "data:image/svg+xml;base64,PHN2Zy8+"
    }

    fn website(&self) -> Option<&str> {
        Some(&self.website)
    }

    fn chains(&self) -> Vec<String> {
        vec!["solana:mainnet".to_string(), "solana:devnet".to_string()]
    }

    fn features(&self) -> WalletFeatures {
        self.features.clone()
    }
}

pub struct MockWalletBuilder {
    name: String,
    events: bool,
    disconnect: bool,
    sign_transaction: bool,
    sign_and_send: bool,
    sign_message: bool,
    sign_in: bool,
    versions: Vec<TransactionVersion>,
}

impl MockWalletBuilder {
    pub fn events(mut self, enabled: bool) -> Self {
        self.events = enabled;
        self
    }

    pub fn disconnect(mut self, enabled: bool) -> Self {
        self.disconnect = enabled;
        self
    }

    pub fn sign_transaction(mut self, enabled: bool) -> Self {
        self.sign_transaction = enabled;
        self
    }

    pub fn sign_and_send(mut self, enabled: bool) -> Self {
        self.sign_and_send = enabled;
        self
    }

    pub fn sign_message(mut self, enabled: bool) -> Self {
        self.sign_message = enabled;
        self
    }

    pub fn sign_in(mut self, enabled: bool) -> Self {
        self.sign_in = enabled;
        self
    }

    /// Declare only legacy transaction support
    pub fn legacy_only(mut self) -> Self {
        self.versions = vec![TransactionVersion::Legacy];
        self
    }

    pub fn build(self) -> Arc<MockWallet> {
        let keypair = Arc::new(Keypair::new());
        let state = Arc::new(MockWalletState::default());
        let mock = Arc::new(MockFeatures {
            keypair: Arc::clone(&keypair),
            versions: self.versions,
            state: Arc::clone(&state),
        });

        let mut features = WalletFeatures::new().with(WalletFeature::Connect(mock.clone()));
        if self.events {
            features.insert(WalletFeature::Events(mock.clone()));
        }
        if self.disconnect {
            features.insert(WalletFeature::Disconnect(mock.clone()));
        }
        if self.sign_transaction {
            features.insert(WalletFeature::SignTransaction(mock.clone()));
        }
        if self.sign_and_send {
            features.insert(WalletFeature::SignAndSendTransaction(mock.clone()));
        }
        if self.sign_message {
            features.insert(WalletFeature::SignMessage(mock.clone()));
        }
        if self.sign_in {
            features.insert(WalletFeature::SignIn(mock));
        }

        Arc::new(MockWallet {
            website: format!("https://{}.example", self.name.to_lowercase()),
            name: self.name,
            keypair,
            features,
            state,
        })
    }
}
