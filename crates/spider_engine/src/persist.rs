use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure `dir` exists and is writable; create it if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// A temp file living next to its final target, renamed into place on commit.
///
/// Dropping it without committing removes the temp file.
pub struct StagedFile {
    tmp: NamedTempFile,
    target: PathBuf,
}

impl StagedFile {
    /// Stage a new file for `target`, creating its parent directory if needed.
    pub fn for_target(target: &Path) -> Result<Self, PersistError> {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        ensure_output_dir(dir)?;
        let tmp = NamedTempFile::new_in(dir)?;
        Ok(Self {
            tmp,
            target: target.to_path_buf(),
        })
    }

    pub fn append(&mut self, bytes: &[u8]) -> Result<(), PersistError> {
        self.tmp.write_all(bytes)?;
        Ok(())
    }

    /// Flush, sync and rename over the target, replacing an existing file.
    pub fn commit(mut self) -> Result<PathBuf, PersistError> {
        self.tmp.flush()?;
        self.tmp.as_file_mut().sync_all()?;
        self.tmp
            .persist(&self.target)
            .map_err(|e| PersistError::Io(e.error))?;
        Ok(self.target)
    }
}

/// Atomically write content to `{dir}/{filename}` by writing a temp file then renaming.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        let mut staged = StagedFile::for_target(&self.dir.join(filename))?;
        staged.append(content)?;
        staged.commit()
    }
}
