//! Adapter for Solana SDK v3.x

// Re-export core types from solana-sdk v3
pub use solana_sdk_v3::hash::Hash;
#[allow(unused_imports)]
pub use solana_sdk_v3::instruction::{AccountMeta, Instruction};
pub use solana_sdk_v3::message::{v0, Message, MessageHeader, VersionedMessage};
pub use solana_sdk_v3::pubkey::Pubkey;
pub use solana_sdk_v3::signature::{Keypair, Signature};
pub use solana_sdk_v3::signer::Signer;
pub use solana_sdk_v3::transaction::{Transaction, VersionedTransaction};

/// Parse a keypair from bytes (v3 adapter)
pub fn keypair_from_bytes(bytes: &[u8]) -> Result<Keypair, String> {
    Keypair::try_from(bytes).map_err(|e| format!("Invalid keypair bytes: {}", e))
}

/// Build a keypair from a 32-byte ed25519 seed (v3 adapter)
pub fn keypair_from_seed(seed: [u8; 32]) -> Keypair {
    Keypair::new_from_array(seed)
}

/// Get the 32-byte seed of a keypair (v3 adapter)
pub fn keypair_seed(keypair: &Keypair) -> [u8; 32] {
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&keypair.to_bytes()[..32]);
    seed
}

/// Get the public key from a keypair (v3 adapter)
pub fn keypair_pubkey(keypair: &Keypair) -> Pubkey {
    keypair.pubkey()
}

/// Sign a message with a keypair (v3 adapter)
pub fn keypair_sign_message(keypair: &Keypair, message: &[u8]) -> Signature {
    keypair.sign_message(message)
}
