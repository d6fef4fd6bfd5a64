#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use spider_core::{DestinationLayout, LinkRecord, ProviderType, LINK_TYPE_GENERAL};
use spider_engine::{
    DownloadError, DownloadRequest, Downloader, FailureKind, LedgerStore, ProviderError,
    ProviderRunner, SourceProvider,
};
use tokio::time::Instant;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(spider_logging::initialize_for_tests);
}

pub fn link(url: &str, path: &str) -> LinkRecord {
    LinkRecord::new(url, path, "video")
}

pub fn runner(dir: &Path, downloader: Arc<RecordingDownloader>) -> ProviderRunner {
    ProviderRunner::new(
        downloader,
        LedgerStore::new(dir.join("config")),
        DestinationLayout::under(&dir.join("media")),
    )
}

enum Failure {
    Config(String),
    Panic,
}

/// Source provider serving scripted link batches.
///
/// Each scan takes the next queued batch if there is one, otherwise repeats
/// the last batch served.
pub struct FakeProvider {
    name: String,
    provider_type: ProviderType,
    batches: Mutex<VecDeque<Vec<LinkRecord>>>,
    current: Mutex<Vec<LinkRecord>>,
    failure: Mutex<Option<Failure>>,
    download_override: Option<String>,
    scans: Mutex<Vec<Instant>>,
}

impl FakeProvider {
    pub fn period(name: &str, links: Vec<LinkRecord>) -> Self {
        Self::new(name, ProviderType::Period, links)
    }

    pub fn other(name: &str, links: Vec<LinkRecord>) -> Self {
        Self::new(name, ProviderType::Other, links)
    }

    fn new(name: &str, provider_type: ProviderType, links: Vec<LinkRecord>) -> Self {
        Self {
            name: name.to_string(),
            provider_type,
            batches: Mutex::new(VecDeque::new()),
            current: Mutex::new(links),
            failure: Mutex::new(None),
            download_override: None,
            scans: Mutex::new(Vec::new()),
        }
    }

    pub fn with_override(mut self, name: &str) -> Self {
        self.download_override = Some(name.to_string());
        self
    }

    pub fn queue_batch(&self, links: Vec<LinkRecord>) {
        self.batches.lock().unwrap().push_back(links);
    }

    pub fn fail_config(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(Failure::Config(message.to_string()));
    }

    pub fn panic_on_scan(&self) {
        *self.failure.lock().unwrap() = Some(Failure::Panic);
    }

    pub fn scan_times(&self) -> Vec<Instant> {
        self.scans.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SourceProvider for FakeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn provider_type(&self) -> ProviderType {
        self.provider_type
    }

    async fn load_config(&self) -> Result<(), ProviderError> {
        match &*self.failure.lock().unwrap() {
            Some(Failure::Config(message)) => Err(ProviderError::InvalidConfig(message.clone())),
            _ => Ok(()),
        }
    }

    async fn get_links(&self, query: &str) -> Result<Vec<LinkRecord>, ProviderError> {
        assert_eq!(query, "");
        self.scans.lock().unwrap().push(Instant::now());
        if matches!(&*self.failure.lock().unwrap(), Some(Failure::Panic)) {
            panic!("scraper exploded");
        }
        let mut current = self.current.lock().unwrap();
        if let Some(next) = self.batches.lock().unwrap().pop_front() {
            *current = next;
        }
        Ok(current.clone())
    }

    fn link_type(&self) -> &str {
        LINK_TYPE_GENERAL
    }

    fn download_provider_override(&self) -> Option<&str> {
        self.download_override.as_deref()
    }
}

/// Downloader recording every request; fails for selected URLs.
#[derive(Default)]
pub struct RecordingDownloader {
    calls: Mutex<Vec<DownloadRequest>>,
    failing: Mutex<HashSet<String>>,
    delay: Option<Duration>,
}

impl RecordingDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn fail_on(&self, url: &str) {
        self.failing.lock().unwrap().insert(url.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<DownloadRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.url).collect()
    }
}

#[async_trait::async_trait]
impl Downloader for RecordingDownloader {
    async fn download_file(&self, request: &DownloadRequest) -> Result<(), DownloadError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.lock().unwrap().push(request.clone());
        if self.failing.lock().unwrap().contains(&request.url) {
            return Err(DownloadError::new(FailureKind::HttpStatus(503), "unavailable"));
        }
        Ok(())
    }
}
