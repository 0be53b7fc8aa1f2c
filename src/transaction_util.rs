use std::collections::HashSet;

use crate::error::SignerError;
use crate::payload::{LegacyTransaction, TransactionVersion};
use crate::sdk_adapter::{AccountMeta, Hash, Instruction, Message, Pubkey, Signature, Transaction};
use crate::traits::NetworkClient;
use base64::{engine::general_purpose::STANDARD, Engine};

pub struct TransactionUtil;

impl TransactionUtil {
    /// Encodes a transaction to a base64 serialized String
    pub fn serialize_transaction(transaction: &LegacyTransaction) -> Result<String, SignerError> {
        Ok(STANDARD.encode(transaction.to_wire_bytes()?))
    }

    /// Get the position of a pubkey in the transaction's signing keypair positions.
    /// Returns the index where this signer's signature should be placed.
    pub fn get_signing_keypair_position(
        transaction: &LegacyTransaction,
        pubkey: &Pubkey,
    ) -> Result<usize, SignerError> {
        let num_required_signatures = transaction.header().num_required_signatures as usize;
        let account_keys = transaction.account_keys();

        if account_keys.len() < num_required_signatures {
            return Err(SignerError::SigningFailed(
                "Invalid account index: not enough account keys".to_string(),
            ));
        }

        account_keys[..num_required_signatures]
            .iter()
            .position(|x| x == pubkey)
            .ok_or_else(|| {
                SignerError::SigningFailed(format!(
                    "Pubkey {} not found in transaction signers",
                    pubkey
                ))
            })
    }

    /// Add a signature to the transaction at the correct position.
    pub fn add_signature_to_transaction(
        transaction: &mut LegacyTransaction,
        pubkey: &Pubkey,
        signature: Signature,
    ) -> Result<(), SignerError> {
        let position = Self::get_signing_keypair_position(transaction, pubkey)?;

        let num_required_signatures = transaction.header().num_required_signatures as usize;
        let signatures = transaction.signatures_mut();
        if signatures.len() < num_required_signatures {
            signatures.resize(num_required_signatures, Signature::default());
        }

        signatures[position] = signature;

        Ok(())
    }

    /// Make `payer` the fee payer of a message that has no required signers.
    ///
    /// A message that already names a fee payer is left as is. Unversioned
    /// messages are recompiled around the new payer; versioned messages fix
    /// their account list at compile time and are rejected.
    pub fn ensure_fee_payer(
        transaction: &mut LegacyTransaction,
        payer: &Pubkey,
    ) -> Result<(), SignerError> {
        if transaction.fee_payer().is_some() {
            return Ok(());
        }

        match transaction {
            LegacyTransaction::Unversioned(tx) => {
                *tx = Self::recompile_with_fee_payer(tx, payer)?;
                Ok(())
            }
            LegacyTransaction::Versioned(_) => Err(SignerError::SigningFailed(
                "Versioned transaction has no fee payer".to_string(),
            )),
        }
    }

    fn recompile_with_fee_payer(tx: &Transaction, payer: &Pubkey) -> Result<Transaction, SignerError> {
        let message = &tx.message;
        let keys = &message.account_keys;
        let header = message.header;
        let num_signed = header.num_required_signatures as usize;
        let writable_signed = num_signed.saturating_sub(header.num_readonly_signed_accounts as usize);
        let writable_unsigned = keys
            .len()
            .saturating_sub(header.num_readonly_unsigned_accounts as usize);

        let key_at = |index: u8| {
            keys.get(index as usize).copied().ok_or_else(|| {
                SignerError::SerializationError(format!("Account index {index} out of range"))
            })
        };

        let mut instructions = Vec::with_capacity(message.instructions.len());
        for compiled in &message.instructions {
            let mut accounts = Vec::with_capacity(compiled.accounts.len());
            for &index in &compiled.accounts {
                let i = index as usize;
                accounts.push(AccountMeta {
                    pubkey: key_at(index)?,
                    is_signer: i < num_signed,
                    is_writable: if i < num_signed {
                        i < writable_signed
                    } else {
                        i < writable_unsigned
                    },
                });
            }
            instructions.push(Instruction {
                program_id: key_at(compiled.program_id_index)?,
                accounts,
                data: compiled.data.clone(),
            });
        }

        let mut recompiled = Message::new(&instructions, Some(payer));
        recompiled.recent_blockhash = message.recent_blockhash;
        Ok(Transaction::new_unsigned(recompiled))
    }

    /// Fill in the recent blockhash from the network when it is still unset
    pub async fn ensure_recent_blockhash(
        transaction: &mut LegacyTransaction,
        network: &dyn NetworkClient,
    ) -> Result<(), SignerError> {
        if transaction.recent_blockhash() != Hash::default() {
            return Ok(());
        }
        let latest = network.get_latest_blockhash().await?;
        log::debug!("Populating recent blockhash {}", latest.blockhash);
        transaction.set_recent_blockhash(latest.blockhash);
        Ok(())
    }

    /// Reject versioned transactions whose version the wallet did not declare.
    /// Unversioned transactions are always accepted.
    pub fn check_supported_version(
        transaction: &LegacyTransaction,
        supported: Option<&HashSet<TransactionVersion>>,
    ) -> Result<(), SignerError> {
        let Some(version) = transaction.version() else {
            return Ok(());
        };
        match supported {
            Some(versions) if versions.contains(&version) => Ok(()),
            Some(_) => Err(SignerError::UnsupportedTransactionVersion(format!(
                "Sending transaction version {version} isn't supported by this wallet"
            ))),
            None => Err(SignerError::UnsupportedTransactionVersion(
                "Sending versioned transactions isn't supported by this wallet".to_string(),
            )),
        }
    }

    /// Populate fee payer and blockhash, then validate the version
    pub async fn prepare_transaction(
        transaction: &mut LegacyTransaction,
        fee_payer: &Pubkey,
        network: &dyn NetworkClient,
        supported: Option<&HashSet<TransactionVersion>>,
    ) -> Result<(), SignerError> {
        Self::check_supported_version(transaction, supported)?;
        Self::ensure_fee_payer(transaction, fee_payer)?;
        Self::ensure_recent_blockhash(transaction, network).await
    }
}
