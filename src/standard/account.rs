//! Account selection for wallets returning one or more accounts on connect

use std::str::FromStr;

use super::types::{WalletAccount, SOLANA_CHAIN_PREFIX};
use crate::error::SignerError;
use crate::sdk_adapter::Pubkey;

/// Pick the account to connect with from a wallet's account list.
///
/// Heuristics are tried in order, to tolerate wallets that do not fill in
/// every account field:
/// 1. an account on a Solana chain that declares one of `signing_features`
/// 2. any account with non-empty raw public key bytes
/// 3. the first account with a public key field at all
pub fn select_account<'a>(
    accounts: &'a [WalletAccount],
    signing_features: &[&str],
) -> Option<&'a WalletAccount> {
    accounts
        .iter()
        .find(|account| {
            account
                .chains
                .iter()
                .any(|chain| chain.starts_with(SOLANA_CHAIN_PREFIX))
                && account
                    .features
                    .iter()
                    .any(|feature| signing_features.contains(&feature.as_str()))
        })
        .or_else(|| {
            accounts
                .iter()
                .find(|account| account.public_key.as_ref().is_some_and(|key| !key.is_empty()))
        })
        .or_else(|| accounts.iter().find(|account| account.public_key.is_some()))
}

/// Derive the public key of an account, from its raw bytes when they are a
/// full 32-byte key, otherwise from its base58 address
pub fn account_pubkey(account: &WalletAccount) -> Result<Pubkey, SignerError> {
    if let Some(bytes) = account.public_key.as_deref() {
        if let Ok(pubkey) = Pubkey::try_from(bytes) {
            return Ok(pubkey);
        }
    }
    Pubkey::from_str(&account.address).map_err(|e| {
        SignerError::InvalidPublicKey(format!("Invalid account address: {e}"))
    })
}
