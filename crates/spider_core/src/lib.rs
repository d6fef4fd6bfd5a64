//! Spider core: pure data model for period scans and the dedup ledger.
mod backoff;
mod hash;
mod layout;
mod link;
mod state;

pub use backoff::{BackoffPolicy, Pacing, DEFAULT_ERROR_BACKOFF, DEFAULT_PERIOD};
pub use hash::DedupHash;
pub use layout::{DestinationLayout, FILE_TYPE_COMMON};
pub use link::{
    LinkRecord, ProviderType, LINK_TYPE_GENERAL, LINK_TYPE_MAGNET, LINK_TYPE_TORRENT,
};
pub use state::{Ledger, ProviderState};
