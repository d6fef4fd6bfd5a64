use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use spider_logging::{spider_debug, spider_warn};

/// Everything a download provider needs to fetch one link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub destination: PathBuf,
    pub link_type: String,
    pub provider_override: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct DownloadError {
    pub kind: FailureKind,
    pub message: String,
}

impl DownloadError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Network,
    Io,
    Unsupported { link_type: String },
    UnknownProvider { name: String },
    Rejected,
    /// The link's relative path would leave its category directory.
    UnsafePath,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Io => write!(f, "io error"),
            FailureKind::Unsupported { link_type } => {
                write!(f, "no download provider for link type {link_type}")
            }
            FailureKind::UnknownProvider { name } => {
                write!(f, "unknown download provider {name}")
            }
            FailureKind::Rejected => write!(f, "rejected by download provider"),
            FailureKind::UnsafePath => write!(f, "destination escapes its directory"),
        }
    }
}

/// The download subsystem as seen by a provider run.
#[async_trait::async_trait]
pub trait Downloader: Send + Sync {
    async fn download_file(&self, request: &DownloadRequest) -> Result<(), DownloadError>;
}

/// One concrete transfer backend (direct HTTP, torrent client, ...).
#[async_trait::async_trait]
pub trait DownloadProvider: Send + Sync {
    fn name(&self) -> &str;

    fn supports(&self, link_type: &str) -> bool;

    async fn download(&self, request: &DownloadRequest) -> Result<(), DownloadError>;
}

/// Routes requests to registered download providers.
///
/// A request naming a provider goes to that provider only. Otherwise the
/// providers supporting the link type are tried in registration order until
/// one succeeds.
#[derive(Default, Clone)]
pub struct DownloadRouter {
    providers: Vec<Arc<dyn DownloadProvider>>,
}

impl DownloadRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn DownloadProvider>) {
        spider_debug!("Registering download provider {}", provider.name());
        self.providers.push(provider);
    }

    pub fn with(mut self, provider: Arc<dyn DownloadProvider>) -> Self {
        self.register(provider);
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait::async_trait]
impl Downloader for DownloadRouter {
    async fn download_file(&self, request: &DownloadRequest) -> Result<(), DownloadError> {
        if let Some(name) = request.provider_override.as_deref() {
            let provider = self
                .providers
                .iter()
                .find(|p| p.name() == name)
                .ok_or_else(|| {
                    DownloadError::new(
                        FailureKind::UnknownProvider {
                            name: name.to_string(),
                        },
                        request.url.clone(),
                    )
                })?;
            return provider.download(request).await;
        }

        let mut last_error = None;
        for provider in self.providers.iter().filter(|p| p.supports(&request.link_type)) {
            match provider.download(request).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    spider_warn!(
                        "Download provider {} failed for {}: {}",
                        provider.name(),
                        request.url,
                        err
                    );
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            DownloadError::new(
                FailureKind::Unsupported {
                    link_type: request.link_type.clone(),
                },
                request.url.clone(),
            )
        }))
    }
}
