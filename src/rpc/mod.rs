//! JSON-RPC implementation of the network submission primitive

mod types;

use std::str::FromStr;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{de::DeserializeOwned, Serialize};
use types::{
    BlockhashValue, CommitmentConfig, RpcRequest, RpcResponse, SendTransactionConfig, WithContext,
};

use crate::error::SignerError;
use crate::sdk_adapter::Hash;
use crate::traits::{LatestBlockhash, NetworkClient, SendOptions};

/// Environment variable read by [`RpcNetworkClient::from_env`]
pub const RPC_URL_ENV: &str = "SOLANA_RPC_URL";
pub const DEFAULT_RPC_URL: &str = "http://localhost:8899";
const DEFAULT_COMMITMENT: &str = "confirmed";

/// Solana JSON-RPC client exposing `getLatestBlockhash` and `sendTransaction`
#[derive(Clone)]
pub struct RpcNetworkClient {
    url: String,
    commitment: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for RpcNetworkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcNetworkClient")
            .field("url", &self.url)
            .field("commitment", &self.commitment)
            .finish_non_exhaustive()
    }
}

impl RpcNetworkClient {
    /// Create a client for an `http` or `https` endpoint
    pub fn new(url: impl Into<String>) -> Result<Self, SignerError> {
        let url = url.into();
        let parsed = reqwest::Url::parse(&url)
            .map_err(|e| SignerError::ConfigError(format!("Invalid RPC URL {url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SignerError::ConfigError(format!(
                "RPC URL must use http or https, got {}",
                parsed.scheme()
            )));
        }
        Ok(Self {
            url,
            commitment: DEFAULT_COMMITMENT.to_string(),
            client: reqwest::Client::new(),
        })
    }

    /// Create a client from `SOLANA_RPC_URL`, falling back to a local validator
    pub fn from_env() -> Result<Self, SignerError> {
        let url = std::env::var(RPC_URL_ENV).unwrap_or_else(|_| DEFAULT_RPC_URL.to_string());
        Self::new(url)
    }

    #[must_use]
    pub fn with_commitment(mut self, commitment: impl Into<String>) -> Self {
        self.commitment = commitment.into();
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<P: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<T, SignerError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };

        let response = self.client.post(&self.url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());

            #[cfg(feature = "unsafe-debug")]
            log::error!("RPC {method} error - status: {status}, response: {error_text}");

            #[cfg(not(feature = "unsafe-debug"))]
            {
                let _ = error_text;
                log::error!("RPC {method} error - status: {status}");
            }

            return Err(SignerError::HttpError(format!("RPC HTTP error {status}")));
        }

        let body: RpcResponse<T> = response.json().await?;
        if let Some(error) = body.error {
            #[cfg(feature = "unsafe-debug")]
            log::error!("RPC {method} failed - code: {}, message: {}", error.code, error.message);

            #[cfg(not(feature = "unsafe-debug"))]
            log::error!("RPC {method} failed - code: {}", error.code);

            return Err(SignerError::RemoteApiError(format!(
                "RPC error {}: {}",
                error.code, error.message
            )));
        }
        body.result.ok_or_else(|| {
            SignerError::RemoteApiError(format!("RPC {method} returned no result"))
        })
    }
}

#[async_trait]
impl NetworkClient for RpcNetworkClient {
    async fn get_latest_blockhash(&self) -> Result<LatestBlockhash, SignerError> {
        let response: WithContext<BlockhashValue> = self
            .call(
                "getLatestBlockhash",
                [CommitmentConfig {
                    commitment: &self.commitment,
                }],
            )
            .await?;
        let blockhash = Hash::from_str(&response.value.blockhash).map_err(|e| {
            SignerError::SerializationError(format!("Invalid blockhash from RPC: {e}"))
        })?;
        Ok(LatestBlockhash {
            blockhash,
            last_valid_block_height: response.value.last_valid_block_height,
        })
    }

    async fn send_raw_transaction(
        &self,
        transaction: &[u8],
        options: &SendOptions,
    ) -> Result<String, SignerError> {
        let config = SendTransactionConfig {
            encoding: "base64",
            skip_preflight: options.skip_preflight,
            preflight_commitment: options
                .preflight_commitment
                .as_deref()
                .unwrap_or(&self.commitment),
            max_retries: options.max_retries,
            min_context_slot: options.min_context_slot,
        };
        let encoded = STANDARD.encode(transaction);
        let signature: String = self
            .call("sendTransaction", (encoded, config))
            .await?;
        log::debug!("Submitted transaction {signature}");
        Ok(signature)
    }
}
