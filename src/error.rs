//! Error types for signer, adapter and engine operations

use std::fmt;
use thiserror::Error;

/// Errors that can occur while connecting wallets, extracting keys, or signing
#[derive(Error, Clone, PartialEq, Eq)]
pub enum SignerError {
    /// The adapter has no connected account
    #[error("Wallet not connected")]
    NotConnected,

    /// A required sign/send/message/sign-in capability is absent
    #[error("Unsupported capability: {0}")]
    UnsupportedCapability(String),

    /// Connect succeeded but none of the returned accounts is usable
    #[error("No compatible account found in wallet {0}")]
    NoCompatibleAccount(String),

    /// A capability reply is missing or carries an invalid signature or transaction
    #[error("Malformed wallet response: {0}")]
    MalformedWalletResponse(String),

    /// Legacy and kit payloads cannot be converted into each other yet
    #[error("Architecture conversion not implemented: {0}")]
    ArchitectureConversionUnimplemented(String),

    /// The wallet's declared version set excludes the payload's version
    #[error("Unsupported transaction version: {0}")]
    UnsupportedTransactionVersion(String),

    /// No extraction strategy worked and no bridge signer could be built
    #[error("Key extraction exhausted: {0}")]
    KeyExtractionExhausted(String),

    /// A discovered wallet lacks the minimal feature set
    #[error("Invalid wallet capability set: {0}")]
    InvalidWalletCapabilitySet(String),

    /// The handle is a bare address with nothing to sign with
    #[error("No private key available: {0}")]
    NoPrivateKey(String),

    /// Invalid private key format
    #[error("Invalid private key format: {0}")]
    InvalidPrivateKey(String),

    /// Invalid public key format
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Signing operation failed
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// Remote API error (RPC node, wallet)
    #[error("Remote API error: {0}")]
    RemoteApiError(String),

    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Signer not available
    #[error("Signer not available: {0}")]
    NotAvailable(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    IoError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for SignerError {
    fn from(err: std::io::Error) -> Self {
        SignerError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for SignerError {
    fn from(err: serde_json::Error) -> Self {
        SignerError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for SignerError {
    fn from(err: bincode::Error) -> Self {
        SignerError::SerializationError(err.to_string())
    }
}

#[cfg(feature = "rpc")]
impl From<reqwest::Error> for SignerError {
    fn from(err: reqwest::Error) -> Self {
        SignerError::HttpError(err.to_string())
    }
}

// Custom Debug implementation to prevent leaking sensitive information
impl fmt::Debug for SignerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignerError::NotConnected => return write!(f, "SignerError::NotConnected"),
            SignerError::UnsupportedCapability(_) => "UnsupportedCapability",
            SignerError::NoCompatibleAccount(_) => "NoCompatibleAccount",
            SignerError::MalformedWalletResponse(_) => "MalformedWalletResponse",
            SignerError::ArchitectureConversionUnimplemented(_) => {
                "ArchitectureConversionUnimplemented"
            }
            SignerError::UnsupportedTransactionVersion(_) => "UnsupportedTransactionVersion",
            SignerError::KeyExtractionExhausted(_) => "KeyExtractionExhausted",
            SignerError::InvalidWalletCapabilitySet(_) => "InvalidWalletCapabilitySet",
            SignerError::NoPrivateKey(_) => "NoPrivateKey",
            SignerError::InvalidPrivateKey(_) => "InvalidPrivateKey",
            SignerError::InvalidPublicKey(_) => "InvalidPublicKey",
            SignerError::SigningFailed(_) => "SigningFailed",
            SignerError::RemoteApiError(_) => "RemoteApiError",
            SignerError::HttpError(_) => "HttpError",
            SignerError::SerializationError(_) => "SerializationError",
            SignerError::ConfigError(_) => "ConfigError",
            SignerError::NotAvailable(_) => "NotAvailable",
            SignerError::IoError(_) => "IoError",
            SignerError::Other(_) => "Other",
        };
        write!(f, "SignerError::{name}([REDACTED])")
    }
}
