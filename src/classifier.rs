//! Architecture classification of wallet handles and payloads
//!
//! Classification is structural: it looks only at which fields a value
//! carries. The predicates are pure, so the same value can be classified any
//! number of times with the same answer. [`WalletHandle`](crate::WalletHandle)
//! and [`TransactionPayload`](crate::TransactionPayload) are tagged once at the
//! boundary and report their fields through [`FieldShape`]; host objects
//! arriving as JSON go through the same predicates via the `serde_json::Value`
//! implementation.

use serde_json::Value;

/// Field names inspected by the classifier
pub mod fields {
    pub const SECRET_KEY: &str = "secretKey";
    pub const PUBLIC_KEY: &str = "publicKey";
    pub const PRIVATE_KEY: &str = "privateKey";
    pub const CONNECTED: &str = "connected";
    pub const INSTRUCTIONS: &str = "instructions";
    pub const RECENT_BLOCKHASH: &str = "recentBlockhash";
    pub const VERSION: &str = "version";
    pub const FEE_PAYER: &str = "feePayer";
    pub const SIGNATURES: &str = "signatures";
    pub const MESSAGE: &str = "message";
    pub const LIFETIME_CONSTRAINT: &str = "lifetimeConstraint";
}

/// Which data model a handle or payload belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture {
    Legacy,
    Kit,
}

/// A value whose field layout can be inspected
pub trait FieldShape {
    /// Whether the value carries a field with this name
    fn has_field(&self, name: &str) -> bool;

    /// Whether the field exists and holds a boolean
    fn has_bool_field(&self, name: &str) -> bool {
        self.has_field(name)
    }
}

impl FieldShape for Value {
    fn has_field(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    fn has_bool_field(&self, name: &str) -> bool {
        self.get(name).is_some_and(Value::is_boolean)
    }
}

/// True for a keypair (private scalar field) or a connectable adapter
/// (public key field plus a boolean `connected` flag)
pub fn is_legacy_wallet<T: FieldShape + ?Sized>(value: &T) -> bool {
    value.has_field(fields::SECRET_KEY)
        || (value.has_field(fields::PUBLIC_KEY) && value.has_bool_field(fields::CONNECTED))
}

pub fn is_kit_wallet<T: FieldShape + ?Sized>(value: &T) -> bool {
    !is_legacy_wallet(value)
}

/// True iff the value has an instruction list and neither a blockhash nor a
/// version field
pub fn is_kit_payload<T: FieldShape + ?Sized>(value: &T) -> bool {
    value.has_field(fields::INSTRUCTIONS)
        && !value.has_field(fields::RECENT_BLOCKHASH)
        && !value.has_field(fields::VERSION)
}

pub fn classify_wallet<T: FieldShape + ?Sized>(value: &T) -> Architecture {
    if is_legacy_wallet(value) {
        Architecture::Legacy
    } else {
        Architecture::Kit
    }
}

pub fn classify_payload<T: FieldShape + ?Sized>(value: &T) -> Architecture {
    if is_kit_payload(value) {
        Architecture::Kit
    } else {
        Architecture::Legacy
    }
}
