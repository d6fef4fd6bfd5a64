use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use spider_core::{
    BackoffPolicy, DestinationLayout, Pacing, DEFAULT_ERROR_BACKOFF, DEFAULT_PERIOD,
};
use spider_logging::spider_info;
use thiserror::Error;

use crate::store::LedgerStore;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub period: Duration,
    pub error_backoff: Duration,
    pub backoff_policy: BackoffPolicy,
    /// Directory holding the `state.cfg` ledger.
    pub state_dir: PathBuf,
    pub layout: DestinationLayout,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            error_backoff: DEFAULT_ERROR_BACKOFF,
            backoff_policy: BackoffPolicy::default(),
            state_dir: default_state_dir(),
            layout: DestinationLayout::under(&default_download_root()),
        }
    }
}

/// On-disk shape of the config file; every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    period_secs: Option<u64>,
    error_backoff_secs: Option<u64>,
    backoff_policy: Option<BackoffPolicy>,
    state_dir: Option<PathBuf>,
    download_root: Option<PathBuf>,
    file_type_dirs: BTreeMap<String, PathBuf>,
}

impl SchedulerConfig {
    /// Reads a RON config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                spider_info!("No config at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::from_ron(&content).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_ron(content: &str) -> Result<Self, String> {
        let file: ConfigFile = ron::from_str(content).map_err(|err| err.to_string())?;
        let defaults = Self::default();

        let mut layout = match file.download_root {
            Some(root) => DestinationLayout::under(&root),
            None => defaults.layout,
        };
        for (file_type, dir) in file.file_type_dirs {
            layout = layout.with_dir(file_type, dir);
        }

        Ok(Self {
            period: file
                .period_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.period),
            error_backoff: file
                .error_backoff_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.error_backoff),
            backoff_policy: file.backoff_policy.unwrap_or(defaults.backoff_policy),
            state_dir: file.state_dir.unwrap_or(defaults.state_dir),
            layout,
        })
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            period: self.period,
            error_backoff: self.error_backoff,
            policy: self.backoff_policy,
        }
    }

    pub fn ledger_store(&self) -> LedgerStore {
        LedgerStore::new(self.state_dir.clone())
    }
}

fn default_state_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".config"))
}

fn default_download_root() -> PathBuf {
    directories::UserDirs::new()
        .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
        .or_else(|| directories::BaseDirs::new().map(|dirs| dirs.home_dir().join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("downloads"))
}
