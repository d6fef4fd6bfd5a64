use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::LinkRecord;

/// Category used when a link's `file_type` has no directory of its own.
pub const FILE_TYPE_COMMON: &str = "common";

const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("video", "Video"),
    ("tv", "TV"),
    ("movie", "Movie"),
    ("music", "Music"),
    ("picture", "Picture"),
    (FILE_TYPE_COMMON, "Common"),
];

/// Maps a link's `file_type` category to the base directory it is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationLayout {
    dirs: BTreeMap<String, PathBuf>,
    fallback: PathBuf,
}

impl DestinationLayout {
    /// Standard category directories (`Video`, `TV`, `Movie`, ...) below `root`.
    pub fn under(root: &Path) -> Self {
        let dirs = DEFAULT_CATEGORIES
            .iter()
            .map(|(category, dir)| (category.to_string(), root.join(dir)))
            .collect();
        Self {
            dirs,
            fallback: root.join("Common"),
        }
    }

    pub fn with_dir(mut self, file_type: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        self.dirs.insert(file_type.into(), dir.into());
        self
    }

    pub fn base_dir_for(&self, file_type: &str) -> &Path {
        self.dirs
            .get(file_type)
            .or_else(|| self.dirs.get(FILE_TYPE_COMMON))
            .unwrap_or(&self.fallback)
    }

    /// `base_dir_for(link.file_type) / link.path`, with a leading `/` on the
    /// provider's path ignored.
    ///
    /// Returns `None` when the path contains `..` or another component that
    /// would leave the base directory.
    pub fn destination_for(&self, link: &LinkRecord) -> Option<PathBuf> {
        let relative = Path::new(link.path.trim_start_matches('/'));
        let contained = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !contained {
            return None;
        }
        Some(self.base_dir_for(&link.file_type).join(relative))
    }
}
