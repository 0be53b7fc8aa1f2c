//! Dual-architecture signing engine
//!
//! Entry points take a [`TransactionPayload`] or message, a [`WalletHandle`]
//! and a [`SigningPolicy`], and dispatch over wallet architecture × payload
//! architecture:
//!
//! | wallet \ payload | legacy                                  | kit                          |
//! |------------------|-----------------------------------------|------------------------------|
//! | legacy           | keypair signs / adapter delegates       | conversion unimplemented     |
//! | kit              | opaque key via key bridge, if allowed   | unimplemented / no key       |
//!
//! Unimplemented conversions fail with
//! [`SignerError::ArchitectureConversionUnimplemented`] before any wallet or
//! network call is made.

mod policy;

pub use policy::SigningPolicy;

use std::sync::Arc;

use crate::adapter::WalletAdapter;
use crate::classifier::Architecture;
use crate::error::SignerError;
use crate::handle::WalletHandle;
use crate::key_bridge::{extract_signer, BridgeSigner, CryptoKeyPair};
use crate::payload::{LegacyTransaction, TransactionPayload};
use crate::sdk_adapter::{Pubkey, Signature};
use crate::sign_in::{SignInInput, SignInOutput};
use crate::standard::types::WalletAccount;
use crate::traits::{NetworkClient, SendOptions, SolanaSigner};
use crate::transaction_util::TransactionUtil;

/// Who signs a legacy payload once dispatch is decided
enum LegacySigner {
    Local(Arc<dyn SolanaSigner>),
    Adapter(Arc<dyn WalletAdapter>),
}

fn no_private_key() -> SignerError {
    SignerError::NoPrivateKey("A bare address cannot sign".to_string())
}

/// Publish a failure the engine detected on the adapter's error channel
fn checked<T>(
    adapter: &dyn WalletAdapter,
    result: Result<T, SignerError>,
) -> Result<T, SignerError> {
    if let Err(e) = &result {
        adapter.emit_error(e);
    }
    result
}

fn connected_key(adapter: &dyn WalletAdapter) -> Result<Pubkey, SignerError> {
    adapter.public_key().ok_or(SignerError::NotConnected)
}

fn account_descriptor(pubkey: &Pubkey) -> WalletAccount {
    WalletAccount {
        address: pubkey.to_string(),
        public_key: Some(pubkey.to_bytes().to_vec()),
        ..WalletAccount::default()
    }
}

/// Every signed transaction must come back in the shape it was sent in
fn ensure_same_shapes(
    originals: &[bool],
    signed: &[LegacyTransaction],
) -> Result<(), SignerError> {
    if originals.len() != signed.len() {
        return Err(SignerError::MalformedWalletResponse(format!(
            "Expected {} signed transactions, got {}",
            originals.len(),
            signed.len()
        )));
    }
    if originals
        .iter()
        .zip(signed)
        .any(|(versioned, tx)| *versioned != tx.is_versioned())
    {
        return Err(SignerError::MalformedWalletResponse(
            "Wallet changed the transaction version".to_string(),
        ));
    }
    Ok(())
}

/// Entry points of the signing engine
pub struct SigningEngine;

impl SigningEngine {
    fn kit_payload_error(handle: &WalletHandle, policy: &SigningPolicy) -> SignerError {
        match (handle.architecture(), handle) {
            (_, WalletHandle::Address(_)) => no_private_key(),
            (Architecture::Kit, _) => SignerError::ArchitectureConversionUnimplemented(
                "Kit-native transaction signing is not implemented".to_string(),
            ),
            (Architecture::Legacy, _) if !policy.fallback_to_legacy => {
                SignerError::ArchitectureConversionUnimplemented(
                    "Kit payload refused for a legacy wallet: fallback to legacy is disabled"
                        .to_string(),
                )
            }
            (Architecture::Legacy, _) => SignerError::ArchitectureConversionUnimplemented(
                "Converting a kit payload for a legacy wallet is not implemented".to_string(),
            ),
        }
    }

    async fn legacy_signer(
        handle: &WalletHandle,
        policy: &SigningPolicy,
    ) -> Result<LegacySigner, SignerError> {
        match handle {
            WalletHandle::Keypair(signer) => {
                Ok(LegacySigner::Local(Arc::clone(signer) as Arc<dyn SolanaSigner>))
            }
            WalletHandle::Adapter(adapter) => Ok(LegacySigner::Adapter(Arc::clone(adapter))),
            WalletHandle::CryptoKey(key_pair) if policy.fallback_to_legacy => {
                log::debug!("Bridging opaque key to the legacy signing path");
                Ok(LegacySigner::Local(Self::opaque_signer(key_pair, policy).await?))
            }
            WalletHandle::CryptoKey(_) => Err(SignerError::ArchitectureConversionUnimplemented(
                "Legacy payload refused for an opaque key: fallback to legacy is disabled".to_string(),
            )),
            WalletHandle::Address(_) => Err(no_private_key()),
        }
    }

    /// Decide the signer for one payload, rejecting kit payloads up front
    async fn route(
        payload: TransactionPayload,
        handle: &WalletHandle,
        policy: &SigningPolicy,
    ) -> Result<(LegacySigner, LegacyTransaction), SignerError> {
        let wallet = handle.architecture();
        let kind = payload.architecture();
        log::debug!("Dispatching {wallet:?} wallet with {kind:?} payload");

        if kind == Architecture::Kit {
            return Err(Self::kit_payload_error(handle, policy));
        }
        let tx = payload
            .into_legacy()
            .ok_or_else(|| Self::kit_payload_error(handle, policy))?;
        Ok((Self::legacy_signer(handle, policy).await?, tx))
    }

    /// An opaque key's signer: extracted when the policy allows, bridged
    /// through the handle otherwise
    async fn opaque_signer(
        key_pair: &Arc<dyn CryptoKeyPair>,
        policy: &SigningPolicy,
    ) -> Result<Arc<dyn SolanaSigner>, SignerError> {
        if policy.allows_extraction() {
            Ok(Arc::new(extract_signer(Arc::clone(key_pair)).await?))
        } else {
            Ok(Arc::new(BridgeSigner::new(Arc::clone(key_pair)).await?))
        }
    }

    async fn sign_locally(
        signer: &dyn SolanaSigner,
        tx: &mut LegacyTransaction,
    ) -> Result<(), SignerError> {
        TransactionUtil::ensure_fee_payer(tx, &signer.pubkey())?;
        signer.sign_transaction(tx).await?;
        Ok(())
    }

    async fn submit_locally(
        signer: &dyn SolanaSigner,
        mut tx: LegacyTransaction,
        network: &dyn NetworkClient,
        options: &SendOptions,
    ) -> Result<String, SignerError> {
        TransactionUtil::ensure_fee_payer(&mut tx, &signer.pubkey())?;
        TransactionUtil::ensure_recent_blockhash(&mut tx, network).await?;
        signer.sign_transaction(&mut tx).await?;
        network.send_raw_transaction(&tx.to_wire_bytes()?, options).await
    }

    /// Connected, sign-capable, version-supported, fee payer populated
    fn prepare_for_adapter(
        adapter: &dyn WalletAdapter,
        transactions: &mut [LegacyTransaction],
    ) -> Result<(), SignerError> {
        let pubkey = connected_key(adapter)?;
        if !adapter.capabilities().sign_transaction {
            return Err(SignerError::UnsupportedCapability(format!(
                "{} does not support signTransaction",
                adapter.name()
            )));
        }
        let supported = adapter.supported_transaction_versions();
        for tx in transactions.iter_mut() {
            TransactionUtil::check_supported_version(tx, supported.as_ref())?;
            TransactionUtil::ensure_fee_payer(tx, &pubkey)?;
        }
        Ok(())
    }

    async fn sign_with_adapter(
        adapter: &dyn WalletAdapter,
        mut transactions: Vec<LegacyTransaction>,
    ) -> Result<Vec<LegacyTransaction>, SignerError> {
        checked(adapter, Self::prepare_for_adapter(adapter, &mut transactions))?;
        let shapes: Vec<bool> = transactions.iter().map(LegacyTransaction::is_versioned).collect();

        let signed = if transactions.len() > 1 && adapter.capabilities().sign_all_transactions {
            adapter.sign_all_transactions(transactions).await?
        } else {
            let mut signed = Vec::with_capacity(transactions.len());
            for tx in transactions {
                signed.push(adapter.sign_transaction(tx).await?);
            }
            signed
        };

        checked(adapter, ensure_same_shapes(&shapes, &signed))?;
        Ok(signed)
    }

    /// Sign one payload, returning it in the shape it was given
    pub async fn sign_transaction(
        payload: TransactionPayload,
        handle: &WalletHandle,
        policy: SigningPolicy,
    ) -> Result<TransactionPayload, SignerError> {
        let (signer, mut tx) = Self::route(payload, handle, &policy).await?;
        match signer {
            LegacySigner::Local(signer) => {
                Self::sign_locally(signer.as_ref(), &mut tx).await?;
                Ok(tx.into())
            }
            LegacySigner::Adapter(adapter) => {
                let signed = Self::sign_with_adapter(adapter.as_ref(), vec![tx]).await?;
                signed.into_iter().next().map(Into::into).ok_or_else(|| {
                    SignerError::MalformedWalletResponse(
                        "No signed transaction returned".to_string(),
                    )
                })
            }
        }
    }

    /// Sign a batch; any kit payload rejects the whole batch before signing
    pub async fn sign_all_transactions(
        payloads: Vec<TransactionPayload>,
        handle: &WalletHandle,
        policy: SigningPolicy,
    ) -> Result<Vec<TransactionPayload>, SignerError> {
        if payloads.iter().any(|p| p.architecture() == Architecture::Kit) {
            return Err(Self::kit_payload_error(handle, &policy));
        }
        if payloads.is_empty() {
            return Ok(Vec::new());
        }
        let mut transactions: Vec<LegacyTransaction> = payloads
            .into_iter()
            .filter_map(TransactionPayload::into_legacy)
            .collect();

        let signed = match Self::legacy_signer(handle, &policy).await? {
            LegacySigner::Local(signer) => {
                for tx in transactions.iter_mut() {
                    Self::sign_locally(signer.as_ref(), tx).await?;
                }
                transactions
            }
            LegacySigner::Adapter(adapter) => {
                Self::sign_with_adapter(adapter.as_ref(), transactions).await?
            }
        };
        Ok(signed.into_iter().map(Into::into).collect())
    }

    /// Sign and submit, preferring an adapter's own send path
    pub async fn send_transaction(
        network: &dyn NetworkClient,
        payload: TransactionPayload,
        handle: &WalletHandle,
        policy: SigningPolicy,
        options: &SendOptions,
    ) -> Result<String, SignerError> {
        let (signer, tx) = Self::route(payload, handle, &policy).await?;
        match signer {
            LegacySigner::Local(signer) => {
                Self::submit_locally(signer.as_ref(), tx, network, options).await
            }
            LegacySigner::Adapter(adapter) => {
                let adapter = adapter.as_ref();
                checked(adapter, Self::check_sender(adapter, &tx))?;
                adapter.send_transaction(tx, network, options).await
            }
        }
    }

    /// Sign through the engine, then submit the raw bytes to the network.
    /// Adapters without a sign capability fall back to their own send.
    pub async fn sign_and_send_transaction(
        network: &dyn NetworkClient,
        payload: TransactionPayload,
        handle: &WalletHandle,
        policy: SigningPolicy,
        options: &SendOptions,
    ) -> Result<String, SignerError> {
        let (signer, mut tx) = Self::route(payload, handle, &policy).await?;
        let adapter = match signer {
            LegacySigner::Local(signer) => {
                return Self::submit_locally(signer.as_ref(), tx, network, options).await;
            }
            LegacySigner::Adapter(adapter) => adapter,
        };
        let adapter = adapter.as_ref();

        if !adapter.capabilities().sign_transaction {
            log::debug!("{} cannot sign, using its send path", adapter.name());
            checked(adapter, Self::check_sender(adapter, &tx))?;
            return adapter.send_transaction(tx, network, options).await;
        }

        checked(adapter, Self::prepare_for_adapter(adapter, std::slice::from_mut(&mut tx)))?;
        checked(adapter, TransactionUtil::ensure_recent_blockhash(&mut tx, network).await)?;
        let versioned = tx.is_versioned();
        let signed = adapter.sign_transaction(tx).await?;
        checked(adapter, ensure_same_shapes(&[versioned], std::slice::from_ref(&signed)))?;
        network.send_raw_transaction(&signed.to_wire_bytes()?, options).await
    }

    fn check_sender(
        adapter: &dyn WalletAdapter,
        tx: &LegacyTransaction,
    ) -> Result<(), SignerError> {
        connected_key(adapter)?;
        let capabilities = adapter.capabilities();
        if !capabilities.sign_and_send_transaction && !capabilities.sign_transaction {
            return Err(SignerError::UnsupportedCapability(format!(
                "{} can neither sign nor send transactions",
                adapter.name()
            )));
        }
        let supported = adapter.supported_transaction_versions();
        TransactionUtil::check_supported_version(tx, supported.as_ref())
    }

    pub async fn sign_message(
        message: &[u8],
        handle: &WalletHandle,
        policy: SigningPolicy,
    ) -> Result<Signature, SignerError> {
        match handle {
            WalletHandle::Keypair(_) => Err(SignerError::UnsupportedCapability(
                "Raw keypairs do not sign messages; use a wallet adapter or key pair".to_string(),
            )),
            WalletHandle::Adapter(adapter) => {
                let adapter = adapter.as_ref();
                checked(adapter, Self::check_message_signer(adapter))?;
                adapter.sign_message(message).await
            }
            WalletHandle::CryptoKey(key_pair) => {
                Self::opaque_signer(key_pair, &policy)
                    .await?
                    .sign_message(message)
                    .await
            }
            WalletHandle::Address(_) => Err(no_private_key()),
        }
    }

    fn check_message_signer(adapter: &dyn WalletAdapter) -> Result<(), SignerError> {
        connected_key(adapter)?;
        if !adapter.capabilities().sign_message {
            return Err(SignerError::UnsupportedCapability(format!(
                "{} does not support signMessage",
                adapter.name()
            )));
        }
        Ok(())
    }

    /// Challenge-response sign-in
    ///
    /// Adapters with native sign-in use it. Otherwise the adapter is connected
    /// if needed and the Sign-In With Solana message is built and signed
    /// here, which requires `input.domain`.
    pub async fn sign_in(
        handle: &WalletHandle,
        input: Option<SignInInput>,
        policy: SigningPolicy,
    ) -> Result<SignInOutput, SignerError> {
        let input = input.unwrap_or_default();
        match handle {
            WalletHandle::Keypair(_) => Err(SignerError::UnsupportedCapability(
                "Sign-in requires a connectable wallet, not a raw keypair".to_string(),
            )),
            WalletHandle::Adapter(adapter) => {
                Self::sign_in_with_adapter(adapter.as_ref(), input).await
            }
            WalletHandle::CryptoKey(key_pair) => {
                let signer = Self::opaque_signer(key_pair, &policy).await?;
                let input = input.complete_for(&signer.pubkey())?;
                let message = input.to_message_text().into_bytes();
                let signature = signer.sign_message(&message).await?;
                Ok(SignInOutput::from_signed(
                    account_descriptor(&signer.pubkey()),
                    message,
                    signature,
                ))
            }
            WalletHandle::Address(_) => Err(no_private_key()),
        }
    }

    async fn sign_in_with_adapter(
        adapter: &dyn WalletAdapter,
        input: SignInInput,
    ) -> Result<SignInOutput, SignerError> {
        let capabilities = adapter.capabilities();
        if capabilities.sign_in {
            return adapter.sign_in(input).await;
        }
        if !capabilities.sign_message {
            return checked(
                adapter,
                Err(SignerError::UnsupportedCapability(format!(
                    "{} supports neither signIn nor signMessage",
                    adapter.name()
                ))),
            );
        }

        if !adapter.connected() {
            adapter.connect().await?;
        }
        let pubkey = checked(adapter, connected_key(adapter))?;
        let input = checked(adapter, input.complete_for(&pubkey))?;
        let message = input.to_message_text().into_bytes();
        log::debug!("Signing sign-in message for {} via signMessage", adapter.name());
        let signature = adapter.sign_message(&message).await?;
        Ok(SignInOutput::from_signed(
            account_descriptor(&pubkey),
            message,
            signature,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AdapterEvent;
    use crate::key_bridge::SoftwareKeyPair;
    use crate::memory::MemorySigner;
    use crate::payload::{KitInstruction, KitTransactionMessage};
    use crate::sdk_adapter::{AccountMeta, Instruction, Keypair, Message, Signer, Transaction};
    use crate::standard::types::StandardWallet;
    use crate::standard::StandardWalletAdapter;
    use crate::test_util::{
        create_test_transaction, create_test_v0_transaction, MockNetwork, MockWallet,
    };

    fn kit_payload() -> TransactionPayload {
        TransactionPayload::Kit(KitTransactionMessage {
            instructions: vec![KitInstruction {
                program_address: Pubkey::new_unique().to_string(),
                accounts: vec![],
                data: vec![1, 2, 3],
            }],
            ..KitTransactionMessage::default()
        })
    }

    /// An unversioned transaction with no fee payer yet
    fn payerless_transaction() -> Transaction {
        let ix = Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[9],
            vec![AccountMeta::new(Pubkey::new_unique(), false)],
        );
        Transaction::new_unsigned(Message::new(&[ix], None))
    }

    fn adapter_handle(wallet: &Arc<MockWallet>) -> (Arc<StandardWalletAdapter>, WalletHandle) {
        let adapter = Arc::new(
            StandardWalletAdapter::new(Arc::clone(wallet) as Arc<dyn StandardWallet>).unwrap(),
        );
        let handle = WalletHandle::Adapter(Arc::clone(&adapter) as Arc<dyn WalletAdapter>);
        (adapter, handle)
    }

    fn legacy(payload: TransactionPayload) -> LegacyTransaction {
        payload.into_legacy().expect("legacy payload")
    }

    #[tokio::test]
    async fn test_keypair_signs_legacy_payload_in_place() {
        let keypair = Keypair::new();
        let pubkey = keypair.pubkey();
        let handle = WalletHandle::from(MemorySigner::new(keypair.insecure_clone()));

        let signed = SigningEngine::sign_transaction(
            create_test_transaction(&keypair).into(),
            &handle,
            SigningPolicy::default(),
        )
        .await
        .unwrap();
        let signed = legacy(signed);
        assert!(!signed.is_versioned());
        assert!(signed.signatures()[0].verify(pubkey.as_ref(), &signed.message_data()));

        let signed = SigningEngine::sign_transaction(
            create_test_v0_transaction(&keypair).into(),
            &handle,
            SigningPolicy::default(),
        )
        .await
        .unwrap();
        assert!(legacy(signed).is_versioned());
    }

    #[tokio::test]
    async fn test_keypair_rejects_kit_payload() {
        let handle = WalletHandle::from(Keypair::new());
        for policy in [SigningPolicy::default(), SigningPolicy::strict()] {
            let result = SigningEngine::sign_transaction(kit_payload(), &handle, policy).await;
            assert!(matches!(
                result,
                Err(SignerError::ArchitectureConversionUnimplemented(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_kit_payload_with_strict_policy_never_reaches_network() {
        let wallet = MockWallet::builder("Phantom").build();
        let (adapter, handle) = adapter_handle(&wallet);
        adapter.connect().await.unwrap();
        let network = MockNetwork::new();

        let result = SigningEngine::sign_transaction(kit_payload(), &handle, SigningPolicy::strict()).await;
        assert!(matches!(
            result,
            Err(SignerError::ArchitectureConversionUnimplemented(_))
        ));

        let result = SigningEngine::send_transaction(
            &network,
            kit_payload(),
            &handle,
            SigningPolicy::strict(),
            &SendOptions::default(),
        )
        .await;
        assert!(matches!(
            result,
            Err(SignerError::ArchitectureConversionUnimplemented(_))
        ));
        assert_eq!(network.blockhash_calls(), 0);
        assert!(network.sent().is_empty());
        assert_eq!(wallet.state().sign_calls(), 0);
    }

    #[tokio::test]
    async fn test_opaque_key_signs_legacy_payload_through_bridge() {
        let key_pair = Arc::new(SoftwareKeyPair::generate(false));
        let pubkey = key_pair.pubkey();
        let handle = WalletHandle::CryptoKey(Arc::clone(&key_pair) as Arc<dyn CryptoKeyPair>);

        let signed = SigningEngine::sign_transaction(
            payerless_transaction().into(),
            &handle,
            SigningPolicy::default(),
        )
        .await
        .unwrap();
        let signed = legacy(signed);

        assert_eq!(signed.fee_payer(), Some(pubkey));
        assert!(signed.signatures()[0].verify(pubkey.as_ref(), &signed.message_data()));
    }

    #[tokio::test]
    async fn test_extractable_key_signs_legacy_payload() {
        let key_pair = Arc::new(SoftwareKeyPair::generate(true));
        let pubkey = key_pair.pubkey();
        let handle = WalletHandle::CryptoKey(Arc::clone(&key_pair) as Arc<dyn CryptoKeyPair>);

        let signed = SigningEngine::sign_transaction(
            payerless_transaction().into(),
            &handle,
            SigningPolicy::default(),
        )
        .await
        .unwrap();
        let signed = legacy(signed);
        assert!(signed.signatures()[0].verify(pubkey.as_ref(), &signed.message_data()));
        assert!(key_pair.private_export_attempts() > 0);
    }

    #[tokio::test]
    async fn test_opaque_key_policy_refusals() {
        let handle = WalletHandle::CryptoKey(Arc::new(SoftwareKeyPair::generate(true)));

        let result = SigningEngine::sign_transaction(
            payerless_transaction().into(),
            &handle,
            SigningPolicy::strict(),
        )
        .await;
        assert!(matches!(
            result,
            Err(SignerError::ArchitectureConversionUnimplemented(_))
        ));

        let result =
            SigningEngine::sign_transaction(kit_payload(), &handle, SigningPolicy::default()).await;
        assert!(matches!(
            result,
            Err(SignerError::ArchitectureConversionUnimplemented(_))
        ));
    }

    #[tokio::test]
    async fn test_prefer_kit_still_falls_back_for_legacy_payload() {
        let prefer_kit = SigningPolicy {
            fallback_to_legacy: true,
            prefer_kit: true,
        };

        for extractable in [false, true] {
            let key_pair = Arc::new(SoftwareKeyPair::generate(extractable));
            let pubkey = key_pair.pubkey();
            let handle = WalletHandle::CryptoKey(Arc::clone(&key_pair) as Arc<dyn CryptoKeyPair>);

            let signed = SigningEngine::sign_transaction(
                payerless_transaction().into(),
                &handle,
                prefer_kit,
            )
            .await
            .unwrap();
            let signed = legacy(signed);
            assert_eq!(signed.fee_payer(), Some(pubkey));
            assert!(signed.signatures()[0].verify(pubkey.as_ref(), &signed.message_data()));
            // Signed through the handle, no export attempted
            assert_eq!(key_pair.private_export_attempts(), 0);
        }
    }

    #[tokio::test]
    async fn test_bare_address_never_signs() {
        let handle = WalletHandle::address(&Pubkey::new_unique().to_string()).unwrap();
        let network = MockNetwork::new();

        let result = SigningEngine::sign_transaction(
            payerless_transaction().into(),
            &handle,
            SigningPolicy::default(),
        )
        .await;
        assert!(matches!(result, Err(SignerError::NoPrivateKey(_))));

        let result =
            SigningEngine::sign_transaction(kit_payload(), &handle, SigningPolicy::default()).await;
        assert!(matches!(result, Err(SignerError::NoPrivateKey(_))));

        let result = SigningEngine::sign_message(b"hi", &handle, SigningPolicy::default()).await;
        assert!(matches!(result, Err(SignerError::NoPrivateKey(_))));

        let result = SigningEngine::send_transaction(
            &network,
            payerless_transaction().into(),
            &handle,
            SigningPolicy::default(),
            &SendOptions::default(),
        )
        .await;
        assert!(matches!(result, Err(SignerError::NoPrivateKey(_))));
        assert_eq!(network.blockhash_calls(), 0);
    }

    #[tokio::test]
    async fn test_keypair_send_populates_blockhash_and_submits() {
        let keypair = Keypair::new();
        let handle = WalletHandle::from(MemorySigner::new(keypair.insecure_clone()));
        let network = MockNetwork::new();

        let signature = SigningEngine::send_transaction(
            &network,
            create_test_transaction(&keypair).into(),
            &handle,
            SigningPolicy::default(),
            &SendOptions::default(),
        )
        .await
        .unwrap();

        let sent = network.sent();
        assert_eq!(sent.len(), 1);
        let submitted: Transaction = bincode::deserialize(&sent[0]).unwrap();
        assert_eq!(submitted.message.recent_blockhash, network.blockhash());
        assert_eq!(submitted.signatures[0].to_string(), signature);
        assert!(submitted.signatures[0].verify(keypair.pubkey().as_ref(), &submitted.message_data()));
    }

    #[tokio::test]
    async fn test_sign_and_send_only_wallet_connects_before_sending() {
        let wallet = MockWallet::builder("SendOnly")
            .sign_transaction(false)
            .sign_and_send(true)
            .build();
        let (adapter, handle) = adapter_handle(&wallet);
        let network = MockNetwork::new();
        let mut events = adapter.subscribe();

        let tx = create_test_transaction(wallet.keypair());
        let result = SigningEngine::send_transaction(
            &network,
            tx.clone().into(),
            &handle,
            SigningPolicy::default(),
            &SendOptions::default(),
        )
        .await;
        assert_eq!(result, Err(SignerError::NotConnected));
        assert!(!adapter.connected());
        assert_eq!(
            events.recv().await.unwrap(),
            AdapterEvent::Error(SignerError::NotConnected)
        );

        adapter.connect().await.unwrap();
        assert!(adapter.connected());
        let signature = SigningEngine::send_transaction(
            &network,
            tx.into(),
            &handle,
            SigningPolicy::default(),
            &SendOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(bs58::decode(&signature).into_vec().unwrap().len(), 64);
        assert_eq!(wallet.state().send_calls(), 1);
    }

    #[tokio::test]
    async fn test_sign_and_send_signs_through_adapter_then_submits() {
        let wallet = MockWallet::builder("Phantom").sign_and_send(true).build();
        let (adapter, handle) = adapter_handle(&wallet);
        adapter.connect().await.unwrap();
        let network = MockNetwork::new();

        let signature = SigningEngine::sign_and_send_transaction(
            &network,
            create_test_v0_transaction(wallet.keypair()).into(),
            &handle,
            SigningPolicy::default(),
            &SendOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(wallet.state().sign_calls(), 1);
        assert_eq!(wallet.state().send_calls(), 0);
        let sent = network.sent();
        assert_eq!(sent.len(), 1);
        let submitted: crate::sdk_adapter::VersionedTransaction =
            bincode::deserialize(&sent[0]).unwrap();
        assert_eq!(*submitted.message.recent_blockhash(), network.blockhash());
        assert_eq!(submitted.signatures[0].to_string(), signature);
    }

    #[tokio::test]
    async fn test_sign_and_send_falls_back_to_adapter_send() {
        let wallet = MockWallet::builder("SendOnly")
            .sign_transaction(false)
            .sign_and_send(true)
            .build();
        let (adapter, handle) = adapter_handle(&wallet);
        adapter.connect().await.unwrap();
        let network = MockNetwork::new();

        SigningEngine::sign_and_send_transaction(
            &network,
            create_test_transaction(wallet.keypair()).into(),
            &handle,
            SigningPolicy::default(),
            &SendOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(wallet.state().send_calls(), 1);
        assert!(network.sent().is_empty());
    }

    #[tokio::test]
    async fn test_adapter_sign_preserves_shape_and_checks_versions() {
        let wallet = MockWallet::builder("Phantom").build();
        let (adapter, handle) = adapter_handle(&wallet);
        adapter.connect().await.unwrap();

        let payloads = vec![
            TransactionPayload::from(create_test_transaction(wallet.keypair())),
            TransactionPayload::from(create_test_v0_transaction(wallet.keypair())),
        ];
        let signed = SigningEngine::sign_all_transactions(payloads, &handle, SigningPolicy::default())
            .await
            .unwrap();
        assert_eq!(signed.len(), 2);
        assert!(!signed[0].as_legacy().unwrap().is_versioned());
        assert!(signed[1].as_legacy().unwrap().is_versioned());

        let legacy_wallet = MockWallet::builder("LegacyOnly").legacy_only().build();
        let (adapter, handle) = adapter_handle(&legacy_wallet);
        adapter.connect().await.unwrap();
        let result = SigningEngine::sign_transaction(
            create_test_v0_transaction(legacy_wallet.keypair()).into(),
            &handle,
            SigningPolicy::default(),
        )
        .await;
        assert!(matches!(
            result,
            Err(SignerError::UnsupportedTransactionVersion(_))
        ));
        assert_eq!(legacy_wallet.state().sign_calls(), 0);
    }

    #[tokio::test]
    async fn test_batch_with_kit_payload_signs_nothing() {
        let wallet = MockWallet::builder("Phantom").build();
        let (adapter, handle) = adapter_handle(&wallet);
        adapter.connect().await.unwrap();

        let payloads = vec![
            TransactionPayload::from(create_test_transaction(wallet.keypair())),
            kit_payload(),
        ];
        let result =
            SigningEngine::sign_all_transactions(payloads, &handle, SigningPolicy::default()).await;
        assert!(matches!(
            result,
            Err(SignerError::ArchitectureConversionUnimplemented(_))
        ));
        assert_eq!(wallet.state().sign_calls(), 0);
    }

    #[tokio::test]
    async fn test_sign_message_per_handle() {
        let keypair_handle = WalletHandle::from(Keypair::new());
        assert!(matches!(
            SigningEngine::sign_message(b"msg", &keypair_handle, SigningPolicy::default()).await,
            Err(SignerError::UnsupportedCapability(_))
        ));

        let key_pair = Arc::new(SoftwareKeyPair::generate(false));
        let handle = WalletHandle::CryptoKey(Arc::clone(&key_pair) as Arc<dyn CryptoKeyPair>);
        for policy in [SigningPolicy::default(), SigningPolicy::strict()] {
            let signature = SigningEngine::sign_message(b"msg", &handle, policy).await.unwrap();
            assert!(key_pair.verify(signature.as_ref(), b"msg").await.unwrap());
        }

        let wallet = MockWallet::builder("Phantom").sign_message(true).build();
        let (adapter, handle) = adapter_handle(&wallet);
        adapter.connect().await.unwrap();
        let signature = SigningEngine::sign_message(b"msg", &handle, SigningPolicy::default())
            .await
            .unwrap();
        assert!(signature.verify(wallet.keypair().pubkey().as_ref(), b"msg"));
    }

    #[tokio::test]
    async fn test_sign_in_rejects_raw_keypair() {
        let handle = WalletHandle::from(Keypair::new());
        let result = SigningEngine::sign_in(&handle, None, SigningPolicy::default()).await;
        assert!(matches!(result, Err(SignerError::UnsupportedCapability(_))));
    }

    #[tokio::test]
    async fn test_sign_in_uses_native_capability() {
        let wallet = MockWallet::builder("Solflare").sign_in(true).build();
        let (adapter, handle) = adapter_handle(&wallet);

        let output = SigningEngine::sign_in(
            &handle,
            Some(SignInInput {
                domain: Some("example.com".to_string()),
                nonce: Some("n0nce12345".to_string()),
                ..SignInInput::default()
            }),
            SigningPolicy::default(),
        )
        .await
        .unwrap();

        assert!(adapter.connected());
        assert_eq!(output.nonce.as_deref(), Some("n0nce12345"));
        assert!(output.verify());
    }

    #[tokio::test]
    async fn test_sign_in_synthesizes_message_and_connects() {
        let wallet = MockWallet::builder("Phantom").sign_message(true).build();
        let (adapter, handle) = adapter_handle(&wallet);
        assert!(!adapter.connected());

        let output = SigningEngine::sign_in(
            &handle,
            Some(SignInInput {
                domain: Some("example.com".to_string()),
                statement: Some("Welcome back".to_string()),
                ..SignInInput::default()
            }),
            SigningPolicy::default(),
        )
        .await
        .unwrap();

        assert!(adapter.connected());
        assert_eq!(wallet.state().connect_calls(), 1);
        assert_eq!(output.account.address, wallet.keypair().pubkey().to_string());
        assert_eq!(output.domain.as_deref(), Some("example.com"));
        assert_eq!(output.nonce.as_ref().map(String::len), Some(16));
        assert!(output.issued_at.is_some());
        assert!(output.verify());
    }

    #[tokio::test]
    async fn test_sign_in_without_message_capability() {
        let wallet = MockWallet::builder("Phantom").build();
        let (_, handle) = adapter_handle(&wallet);
        let result = SigningEngine::sign_in(&handle, None, SigningPolicy::default()).await;
        assert!(matches!(result, Err(SignerError::UnsupportedCapability(_))));
        assert_eq!(wallet.state().connect_calls(), 0);
    }

    #[tokio::test]
    async fn test_sign_in_with_opaque_key() {
        let key_pair = Arc::new(SoftwareKeyPair::generate(false));
        let handle = WalletHandle::CryptoKey(Arc::clone(&key_pair) as Arc<dyn CryptoKeyPair>);

        let output = SigningEngine::sign_in(
            &handle,
            Some(SignInInput {
                domain: Some("example.com".to_string()),
                ..SignInInput::default()
            }),
            SigningPolicy::default(),
        )
        .await
        .unwrap();
        assert_eq!(output.account.address, key_pair.pubkey().to_string());
        assert!(output.verify());

        let result = SigningEngine::sign_in(&handle, None, SigningPolicy::default()).await;
        assert!(matches!(result, Err(SignerError::ConfigError(_))));
    }
}
