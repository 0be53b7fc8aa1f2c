//! Uniform Solana signing across key sources
//!
//! A caller holds one of several kinds of key source: an in-memory
//! keypair, a connectable wallet (including any Wallet Standard wallet
//! wrapped by [`StandardWalletAdapter`]), an opaque platform key pair, or a
//! bare address. [`SigningEngine`] classifies the [`WalletHandle`] and the
//! [`TransactionPayload`] it is given and routes each operation to the
//! signing path that key source supports.
//!
//! # Features
//!
//! ## SDK Version Selection
//! - `sdk-v2` (default): Use Solana SDK v2.3.x
//! - `sdk-v3`: Use Solana SDK v3.x
//!
//! **Note**: Only one SDK version can be enabled at a time.
//!
//! ## Network
//! - `rpc` (default): [`RpcNetworkClient`], a JSON-RPC implementation of
//!   [`NetworkClient`]
//!
//! ## Debugging
//! - `unsafe-debug`: log full RPC error bodies. Never enable in production.

pub mod adapter;
pub mod aggregator;
pub mod classifier;
pub mod cluster;
pub mod engine;
pub mod error;
pub mod handle;
pub mod key_bridge;
pub mod memory;
pub mod payload;
#[cfg(feature = "rpc")]
pub mod rpc;
mod sdk_adapter;
pub mod sign_in;
pub mod standard;
#[cfg(test)]
pub mod test_util;
pub mod traits;
pub mod transaction_util;

// Re-export core types
pub use error::SignerError;
pub use traits::{LatestBlockhash, NetworkClient, SendOptions, SolanaSigner};

pub use adapter::{AdapterCapabilities, AdapterEvent, WalletAdapter, WalletReadyState};
pub use aggregator::{AppIdentity, MobileWalletFactory, WalletAggregator, WalletRegistry};
pub use classifier::Architecture;
pub use cluster::Cluster;
pub use engine::{SigningEngine, SigningPolicy};
pub use handle::WalletHandle;
pub use key_bridge::{BridgeSigner, CryptoKeyPair, SoftwareKeyPair};
pub use memory::MemorySigner;
pub use payload::{KitTransactionMessage, LegacyTransaction, TransactionPayload};
pub use sign_in::{SignInInput, SignInOutput};
pub use standard::StandardWalletAdapter;

#[cfg(feature = "rpc")]
pub use rpc::RpcNetworkClient;

// Solana types, resolved against the selected SDK version
pub use sdk_adapter::{
    v0, Hash, Instruction, Keypair, Message, Pubkey, Signature, Signer, Transaction,
    VersionedMessage, VersionedTransaction,
};
