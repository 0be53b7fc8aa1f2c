use serde::{Deserialize, Serialize};

/// Per-call conversion policy of the signing engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SigningPolicy {
    /// Allow a kit wallet or payload to be brought down to the legacy path
    pub fallback_to_legacy: bool,
    /// Prefer the kit path when both would work; opaque keys then sign
    /// through their handle instead of being extracted
    pub prefer_kit: bool,
}

impl Default for SigningPolicy {
    fn default() -> Self {
        Self {
            fallback_to_legacy: true,
            prefer_kit: false,
        }
    }
}

impl SigningPolicy {
    /// Policy refusing any kit-to-legacy conversion
    pub fn strict() -> Self {
        Self {
            fallback_to_legacy: false,
            prefer_kit: false,
        }
    }

    /// Whether an opaque key may be extracted into a local keypair
    pub(crate) fn allows_extraction(&self) -> bool {
        self.fallback_to_legacy && !self.prefer_kit
    }
}
