use serde::{Deserialize, Serialize};

pub const LINK_TYPE_GENERAL: &str = "general";
pub const LINK_TYPE_MAGNET: &str = "magnet";
pub const LINK_TYPE_TORRENT: &str = "torrent";

/// How a source provider is driven. Only `Period` providers take part in scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderType {
    Period,
    Other,
}

/// One candidate resource as reported by a source provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub link: String,
    /// Destination relative to the base directory of `file_type`.
    pub path: String,
    pub file_type: String,
}

impl LinkRecord {
    pub fn new(
        link: impl Into<String>,
        path: impl Into<String>,
        file_type: impl Into<String>,
    ) -> Self {
        Self {
            link: link.into(),
            path: path.into(),
            file_type: file_type.into(),
        }
    }
}
