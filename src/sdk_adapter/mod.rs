//! SDK adapter layer for supporting multiple Solana SDK versions
//!
//! Every Solana type used by the signing engine, the Wallet Standard bridge
//! and the key bridge is imported from here, never from `solana_sdk` directly.

#[cfg(feature = "sdk-v2")]
mod v2;
#[cfg(feature = "sdk-v3")]
mod v3;

#[cfg(feature = "sdk-v2")]
pub use v2::*;

#[cfg(feature = "sdk-v3")]
pub use v3::*;

#[cfg(all(feature = "sdk-v2", feature = "sdk-v3"))]
compile_error!("Cannot enable both sdk-v2 and sdk-v3 features. Choose one.");

#[cfg(not(any(feature = "sdk-v2", feature = "sdk-v3")))]
compile_error!("Must enable either sdk-v2 or sdk-v3 feature.");
