//! Export formats and key descriptors of platform key pairs

use serde::{Deserialize, Serialize};

/// Export format requested from [`super::CryptoKeyPair::export_private_key`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFormat {
    Raw,
    Pkcs8,
    Jwk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyUsage {
    Sign,
    Verify,
}

/// JSON Web Key of an OKP key; `d` is present only for private exports
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKey {
    pub kty: String,
    pub crv: String,
    pub x: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
}

impl std::fmt::Debug for JsonWebKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonWebKey")
            .field("kty", &self.kty)
            .field("crv", &self.crv)
            .field("x", &self.x)
            .field("d", &self.d.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Exported key material
#[derive(Clone, PartialEq, Eq)]
pub enum ExportedKey {
    Bytes(Vec<u8>),
    Jwk(JsonWebKey),
}

impl std::fmt::Debug for ExportedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bytes(bytes) => write!(f, "ExportedKey::Bytes([REDACTED; {}])", bytes.len()),
            Self::Jwk(jwk) => f.debug_tuple("ExportedKey::Jwk").field(jwk).finish(),
        }
    }
}
