use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Stable identity of a link: lowercase hex SHA-256 of its URL string.
///
/// Values read back from a ledger are kept verbatim, so older ledgers with
/// other hash formats still deserialize; they simply never match new links.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DedupHash(String);

impl DedupHash {
    pub fn of(url: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let digest = hasher.finalize();
        let mut hex = String::with_capacity(digest.len() * 2);
        for byte in digest.iter() {
            use std::fmt::Write;
            let _ = write!(&mut hex, "{byte:02x}");
        }
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for DedupHash {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for DedupHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
