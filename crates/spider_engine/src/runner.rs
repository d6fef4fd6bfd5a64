use std::sync::Arc;

use spider_core::{DedupHash, DestinationLayout, ProviderType};
use spider_logging::{spider_debug, spider_info, spider_warn};
use thiserror::Error;

use crate::download::{DownloadError, DownloadRequest, Downloader, FailureKind};
use crate::provider::{ProviderError, SourceProvider};
use crate::store::{LedgerStore, StoreError};

const LOGGED_LINK_MAX: usize = 100;

/// Counters for one provider run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// The provider is not periodic and was not scanned.
    pub ineligible: bool,
    pub links: usize,
    pub already_seen: usize,
    pub downloaded: usize,
}

impl RunReport {
    pub fn ineligible() -> Self {
        Self {
            ineligible: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("provider {provider}: failed to load config: {source}")]
    Config {
        provider: String,
        source: ProviderError,
    },
    #[error("provider {provider}: failed to fetch links: {source}")]
    Links {
        provider: String,
        source: ProviderError,
    },
    /// Progress made before the failing link is already persisted.
    #[error("provider {provider}: download of {url} failed: {source}")]
    Download {
        provider: String,
        url: String,
        source: DownloadError,
        report: RunReport,
    },
    #[error("provider {provider}: ledger error: {source}")]
    Store {
        provider: String,
        source: StoreError,
    },
    #[error("provider {provider}: run panicked: {message}")]
    Panicked { provider: String, message: String },
}

impl RunError {
    pub fn provider(&self) -> &str {
        match self {
            RunError::Config { provider, .. }
            | RunError::Links { provider, .. }
            | RunError::Download { provider, .. }
            | RunError::Store { provider, .. }
            | RunError::Panicked { provider, .. } => provider,
        }
    }
}

/// Executes one provider's scan, dedup, download and persist cycle.
#[derive(Clone)]
pub struct ProviderRunner {
    downloader: Arc<dyn Downloader>,
    store: LedgerStore,
    layout: DestinationLayout,
}

impl ProviderRunner {
    pub fn new(
        downloader: Arc<dyn Downloader>,
        store: LedgerStore,
        layout: DestinationLayout,
    ) -> Self {
        Self {
            downloader,
            store,
            layout,
        }
    }

    /// Runs `provider` once.
    ///
    /// Links are processed in the order the provider returned them and the
    /// run stops at the first failed download. The ledger entry is saved
    /// after the loop in every case where it was loaded.
    pub async fn run(&self, provider: &dyn SourceProvider) -> Result<RunReport, RunError> {
        let name = provider.name().to_string();
        if provider.provider_type() != ProviderType::Period {
            spider_debug!("Skipping non-periodic provider {}", name);
            return Ok(RunReport::ineligible());
        }

        provider.load_config().await.map_err(|source| RunError::Config {
            provider: name.clone(),
            source,
        })?;
        let links = provider.get_links("").await.map_err(|source| RunError::Links {
            provider: name.clone(),
            source,
        })?;
        let link_type = provider.link_type().to_string();
        let provider_override = provider.download_provider_override().map(str::to_string);

        let store = self.store.clone();
        let key = name.clone();
        let mut state = on_blocking_thread(&name, move || store.load(&key)).await?;

        let mut report = RunReport {
            links: links.len(),
            ..RunReport::default()
        };
        let mut failure = None;
        for link in &links {
            let hash = DedupHash::of(&link.link);
            if state.contains(&hash) {
                report.already_seen += 1;
                continue;
            }

            spider_info!("Find new resource: {}/{}", name, abbreviate(&link.link));
            let result = match self.layout.destination_for(link) {
                Some(destination) => {
                    let request = DownloadRequest {
                        url: link.link.clone(),
                        destination,
                        link_type: link_type.clone(),
                        provider_override: provider_override.clone(),
                    };
                    self.downloader.download_file(&request).await
                }
                None => Err(DownloadError::new(FailureKind::UnsafePath, link.path.clone())),
            };
            if let Err(err) = result {
                spider_warn!("Provider {}: download of {} failed: {}", name, link.link, err);
                failure = Some((link.link.clone(), err));
                break;
            }
            state.push(hash);
            report.downloaded += 1;
        }

        let store = self.store.clone();
        let key = name.clone();
        on_blocking_thread(&name, move || store.save(&key, &state)).await?;

        match failure {
            Some((url, source)) => Err(RunError::Download {
                provider: name,
                url,
                source,
                report,
            }),
            None => Ok(report),
        }
    }
}

/// Runs a ledger file operation off the async worker threads.
async fn on_blocking_thread<T, F>(provider: &str, op: F) -> Result<T, RunError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    match tokio::task::spawn_blocking(op).await {
        Ok(result) => result.map_err(|source| RunError::Store {
            provider: provider.to_string(),
            source,
        }),
        Err(err) => Err(RunError::Panicked {
            provider: provider.to_string(),
            message: err.to_string(),
        }),
    }
}

fn abbreviate(link: &str) -> String {
    if link.chars().count() <= LOGGED_LINK_MAX {
        return link.to_string();
    }
    let head: String = link.chars().take(LOGGED_LINK_MAX).collect();
    format!("{head}...")
}
