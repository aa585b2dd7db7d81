//! Schema fingerprints for identity and change detection

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA256 fingerprint of a schema document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint of the raw schema text
    pub fn of_text(text: &str) -> Self {
        let hash = Sha256::digest(text.as_bytes());
        Self(format!("{:x}", hash))
    }

    /// Fingerprint of a parsed document, canonicalized so that formatting
    /// variants of the same schema share a fingerprint
    pub fn of_document(value: &serde_json::Value) -> Self {
        let canonical = serde_json::to_string(value).unwrap_or_default();
        Self::of_text(&canonical)
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form used in log lines and CLI output
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }

    /// Verify that schema text matches this fingerprint
    pub fn verify(&self, text: &str) -> bool {
        let computed = Self::of_text(text);
        self.0 == computed.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
