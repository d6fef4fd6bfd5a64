use std::time::Duration;

use futures_util::StreamExt;
use spider_core::{LINK_TYPE_GENERAL, LINK_TYPE_TORRENT};
use spider_logging::spider_debug;

use crate::download::{DownloadError, DownloadProvider, DownloadRequest, FailureKind};
use crate::persist::{PersistError, StagedFile};

pub const HTTP_PROVIDER_NAME: &str = "http";

#[derive(Debug, Clone)]
pub struct HttpDownloadSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
}

impl Default for HttpDownloadSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30 * 60),
            redirect_limit: 5,
            max_bytes: 8 * 1024 * 1024 * 1024,
        }
    }
}

/// Fetches `general` and `torrent` links straight to their destination file.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    settings: HttpDownloadSettings,
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new(settings: HttpDownloadSettings) -> Result<Self, DownloadError> {
        let client = build_client(&settings)?;
        Ok(Self { settings, client })
    }

    fn too_large(&self, actual: u64) -> DownloadError {
        DownloadError::new(
            FailureKind::TooLarge {
                max_bytes: self.settings.max_bytes,
                actual: Some(actual),
            },
            "response too large",
        )
    }
}

fn build_client(settings: &HttpDownloadSettings) -> Result<reqwest::Client, DownloadError> {
    let redirect_limit = settings.redirect_limit;
    let policy = reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= redirect_limit {
            attempt.error("redirect limit exceeded")
        } else {
            attempt.follow()
        }
    });

    reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .redirect(policy)
        .build()
        .map_err(|err| DownloadError::new(FailureKind::Network, err.to_string()))
}

#[async_trait::async_trait]
impl DownloadProvider for HttpDownloader {
    fn name(&self) -> &str {
        HTTP_PROVIDER_NAME
    }

    fn supports(&self, link_type: &str) -> bool {
        link_type == LINK_TYPE_GENERAL || link_type == LINK_TYPE_TORRENT
    }

    async fn download(&self, request: &DownloadRequest) -> Result<(), DownloadError> {
        let parsed = reqwest::Url::parse(&request.url)
            .map_err(|err| DownloadError::new(FailureKind::InvalidUrl, err.to_string()))?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(self.too_large(content_len));
            }
        }

        let mut staged =
            StagedFile::for_target(&request.destination).map_err(map_persist_error)?;
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            written += chunk.len() as u64;
            if written > self.settings.max_bytes {
                return Err(self.too_large(written));
            }
            staged.append(&chunk).map_err(map_persist_error)?;
        }

        let path = staged.commit().map_err(map_persist_error)?;
        spider_debug!("Downloaded {} bytes to {:?}", written, path);
        Ok(())
    }
}

fn map_reqwest_error(err: reqwest::Error) -> DownloadError {
    if err.is_timeout() {
        return DownloadError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return DownloadError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    DownloadError::new(FailureKind::Network, err.to_string())
}

fn map_persist_error(err: PersistError) -> DownloadError {
    DownloadError::new(FailureKind::Io, err.to_string())
}
