//! Adapter for Solana SDK v2.x

// Re-export core types from solana-sdk v2
pub use solana_sdk::hash::Hash;
#[allow(unused_imports)]
pub use solana_sdk::instruction::{AccountMeta, Instruction};
pub use solana_sdk::message::{v0, Message, MessageHeader, VersionedMessage};
pub use solana_sdk::pubkey::Pubkey;
pub use solana_sdk::signature::{Keypair, Signature};
pub use solana_sdk::signer::Signer;
pub use solana_sdk::transaction::{Transaction, VersionedTransaction};

/// Parse a keypair from bytes (v2 adapter)
pub fn keypair_from_bytes(bytes: &[u8]) -> Result<Keypair, String> {
    #[allow(deprecated)]
    Keypair::from_bytes(bytes).map_err(|e| e.to_string())
}

/// Build a keypair from a 32-byte ed25519 seed (v2 adapter)
pub fn keypair_from_seed(seed: [u8; 32]) -> Keypair {
    Keypair::new_from_array(seed)
}

/// Get the 32-byte seed of a keypair (v2 adapter)
pub fn keypair_seed(keypair: &Keypair) -> [u8; 32] {
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&keypair.to_bytes()[..32]);
    seed
}

/// Get the public key from a keypair (v2 adapter)
pub fn keypair_pubkey(keypair: &Keypair) -> Pubkey {
    keypair.pubkey()
}

/// Sign a message with a keypair (v2 adapter)
pub fn keypair_sign_message(keypair: &Keypair, message: &[u8]) -> Signature {
    keypair.sign_message(message)
}
