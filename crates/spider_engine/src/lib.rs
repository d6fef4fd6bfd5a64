//! Spider engine: provider runs, ledger persistence and the period scheduler.
mod config;
mod download;
mod http;
mod persist;
mod provider;
mod runner;
mod scheduler;
mod store;

pub use config::{ConfigError, SchedulerConfig};
pub use download::{
    DownloadError, DownloadProvider, DownloadRequest, DownloadRouter, Downloader, FailureKind,
};
pub use http::{HttpDownloadSettings, HttpDownloader, HTTP_PROVIDER_NAME};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError, StagedFile};
pub use provider::{ProviderError, SourceProvider};
pub use runner::{ProviderRunner, RunError, RunReport};
pub use scheduler::{CycleReport, ProviderOutcome, Scheduler, SchedulerHandle};
pub use store::{LedgerStore, StoreError, STATE_FILENAME};
