use std::io;

use spider_core::{LinkRecord, ProviderType};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("source unreachable: {0}")]
    Unreachable(String),
    #[error("invalid provider configuration: {0}")]
    InvalidConfig(String),
    #[error("malformed source data: {0}")]
    Malformed(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// A pluggable origin of candidate links (feed, scraper, ...).
#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    fn name(&self) -> &str;

    fn provider_type(&self) -> ProviderType;

    /// Refresh the provider's own configuration before a scan.
    async fn load_config(&self) -> Result<(), ProviderError>;

    /// Current candidate links, in discovery order.
    async fn get_links(&self, query: &str) -> Result<Vec<LinkRecord>, ProviderError>;

    fn link_type(&self) -> &str;

    /// Name of the download provider that must handle this provider's links.
    fn download_provider_override(&self) -> Option<&str> {
        None
    }
}
