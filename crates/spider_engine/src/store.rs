use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use spider_core::{Ledger, ProviderState};
use spider_logging::{spider_debug, spider_warn};
use thiserror::Error;

use crate::persist::{AtomicFileWriter, PersistError};

pub const STATE_FILENAME: &str = "state.cfg";

/// Serializes every ledger file read-modify-write in the process.
static STATE_FILE_LOCK: Mutex<()> = Mutex::new(());

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read ledger {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write ledger: {0}")]
    Persist(#[from] PersistError),
    #[error("failed to serialize ledger: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Durable per-provider hash lists stored in `{dir}/state.cfg`.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    dir: PathBuf,
}

impl LedgerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(STATE_FILENAME)
    }

    /// Seen hashes of `provider`, empty when absent or when the file is missing/unparseable.
    pub fn load(&self, provider: &str) -> Result<ProviderState, StoreError> {
        let _guard = lock();
        Ok(self.read_ledger()?.get(provider))
    }

    /// Unions `state` into the stored entry of `provider` and writes the whole ledger back.
    ///
    /// Hashes persisted by other runs since `state` was loaded are kept.
    pub fn save(&self, provider: &str, state: &ProviderState) -> Result<(), StoreError> {
        let _guard = lock();
        let mut ledger = self.read_ledger()?;
        ledger.merge_provider(provider, state);
        let content = serde_json::to_string_pretty(&ledger)?;
        AtomicFileWriter::new(self.dir.clone()).write(STATE_FILENAME, content.as_bytes())?;
        spider_debug!(
            "Saved {} hashes for provider {} to {:?}",
            ledger.get(provider).len(),
            provider,
            self.path()
        );
        Ok(())
    }

    /// The whole ledger as currently persisted.
    pub fn snapshot(&self) -> Result<Ledger, StoreError> {
        let _guard = lock();
        self.read_ledger()
    }

    fn read_ledger(&self) -> Result<Ledger, StoreError> {
        let path = self.path();
        let content = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Ledger::new()),
            Err(source) => return Err(StoreError::Read { path, source }),
        };
        Ok(parse_ledger(&path, &content))
    }
}

fn parse_ledger(path: &Path, content: &[u8]) -> Ledger {
    if content.iter().all(u8::is_ascii_whitespace) {
        return Ledger::new();
    }
    match serde_json::from_slice(content) {
        Ok(ledger) => ledger,
        Err(err) => {
            spider_warn!("Ignoring unparseable ledger {:?}: {}", path, err);
            Ledger::new()
        }
    }
}

fn lock() -> MutexGuard<'static, ()> {
    STATE_FILE_LOCK
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}
