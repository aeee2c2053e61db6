use crate::error::{ConfigError, IndexerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

const DEFAULT_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

/// Inclusion policy for [`FileScanner`].
///
/// Immutable once built; the extension set is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawScanConfig", into = "RawScanConfig")]
pub struct ScanConfig {
    include_hidden: bool,
    allowed_extensions: BTreeSet<String>,
}

impl ScanConfig {
    pub fn new<I, S>(include_hidden: bool, extensions: I) -> std::result::Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed_extensions: BTreeSet<String> = extensions
            .into_iter()
            .filter_map(|ext| normalize_extension(ext.as_ref()))
            .collect();
        if allowed_extensions.is_empty() {
            return Err(ConfigError::EmptyExtensions);
        }
        Ok(Self {
            include_hidden,
            allowed_extensions,
        })
    }

    /// Same extension set, different hidden-file policy
    #[must_use]
    pub fn with_include_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    pub const fn include_hidden(&self) -> bool {
        self.include_hidden
    }

    pub fn allowed_extensions(&self) -> impl Iterator<Item = &str> {
        self.allowed_extensions.iter().map(String::as_str)
    }

    /// Case-insensitive extension check
    pub fn allows(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.allowed_extensions.contains(&ext.to_lowercase()))
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            include_hidden: false,
            allowed_extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
        }
    }
}

fn normalize_extension(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

#[derive(Serialize, Deserialize)]
struct RawScanConfig {
    #[serde(default)]
    include_hidden: bool,
    #[serde(default = "default_extension_list")]
    allowed_extensions: Vec<String>,
}

fn default_extension_list() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect()
}

impl TryFrom<RawScanConfig> for ScanConfig {
    type Error = ConfigError;

    fn try_from(raw: RawScanConfig) -> std::result::Result<Self, Self::Error> {
        Self::new(raw.include_hidden, raw.allowed_extensions)
    }
}

impl From<ScanConfig> for RawScanConfig {
    fn from(config: ScanConfig) -> Self {
        Self {
            include_hidden: config.include_hidden,
            allowed_extensions: config.allowed_extensions.into_iter().collect(),
        }
    }
}

/// A file found under the scan root
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiscoveredFile {
    /// Path relative to the scan root
    pub relative: PathBuf,
    /// Root-joined path, ready to open
    pub absolute: PathBuf,
}

impl DiscoveredFile {
    /// Relative path with `/` separators regardless of platform
    pub fn relative_str(&self) -> String {
        self.relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Recursive scanner for API specification files
#[derive(Debug, Clone, Default)]
pub struct FileScanner {
    config: ScanConfig,
}

impl FileScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Start a lazy walk under `root`.
    ///
    /// Root problems are reported here, before anything is yielded, so an empty
    /// iterator always means "no matching files".
    pub fn scan(&self, root: impl AsRef<Path>) -> Result<ScanIter> {
        let root = root.as_ref();
        let meta = match std::fs::metadata(root) {
            Ok(meta) => meta,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(IndexerError::DirectoryNotFound(root.to_path_buf()));
            }
            Err(err) => return Err(IndexerError::IoError(err)),
        };
        if !meta.is_dir() {
            return Err(IndexerError::NotADirectory(root.to_path_buf()));
        }

        let include_hidden = self.config.include_hidden;
        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(move |entry| include_hidden || entry.depth() == 0 || !is_hidden(entry));

        Ok(ScanIter {
            root: root.to_path_buf(),
            config: self.config.clone(),
            walker: Box::new(walker),
        })
    }
}

/// Scan `root` with `config`; see [`FileScanner::scan`]
pub fn scan_directory(root: impl AsRef<Path>, config: &ScanConfig) -> Result<ScanIter> {
    FileScanner::new(config.clone()).scan(root)
}

fn is_hidden(entry: &DirEntry) -> bool {
    // Raw bytes, so non-UTF-8 names are judged too
    entry.file_name().as_encoded_bytes().first() == Some(&b'.')
}

/// Regular files, plus symlinks whose target is a regular file.
/// Symlinked directories are never descended into.
fn is_regular_file(entry: &DirEntry) -> bool {
    if entry.file_type().is_file() {
        return true;
    }
    entry.path_is_symlink() && entry.path().is_file()
}

type EntryCursor = Box<dyn Iterator<Item = walkdir::Result<DirEntry>> + Send>;

/// Single-pass cursor over matching files. A fresh `scan` re-walks the tree.
pub struct ScanIter {
    root: PathBuf,
    config: ScanConfig,
    walker: EntryCursor,
}

impl ScanIter {
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Iterator for ScanIter {
    type Item = DiscoveredFile;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    // Unreadable directories are skipped, the walk goes on.
                    log::debug!("Skipping unreadable entry: {err}");
                    continue;
                }
            };

            if !is_regular_file(&entry) || !self.config.allows(entry.path()) {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            return Some(DiscoveredFile {
                relative: relative.to_path_buf(),
                absolute: entry.path().to_path_buf(),
            });
        }
    }
}

impl std::fmt::Debug for ScanIter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanIter")
            .field("root", &self.root)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
