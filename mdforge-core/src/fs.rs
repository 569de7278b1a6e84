//! Filesystem abstractions used for scanning.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::config::{CancelFlag, IgnoreRules};
use crate::error::{ForgeError, Result};

/// A regular file discovered during a tree walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Path relative to the walk root.
    pub relative: PathBuf,
    /// File size in bytes.
    pub size: u64,
}

/// Result of walking a tree: the files found plus non-fatal problems.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeListing {
    /// Files sorted by relative path.
    pub files: Vec<TreeEntry>,
    /// Entries that could not be read.
    pub warnings: Vec<String>,
    /// Whether the walk stopped at the file ceiling.
    pub truncated: bool,
}

/// Abstraction over filesystem access for testability.
#[cfg_attr(test, mockall::automock)]
pub trait FileSystem {
    /// List regular files under `root`, skipping ignored names before recursion.
    ///
    /// Entries are visited in name order, so the files kept at the `max_files`
    /// ceiling are the same on every run. A raised `cancel` flag stops the walk
    /// with [`ForgeError::Cancelled`].
    fn list_tree(
        &self,
        root: &Path,
        ignore: &IgnoreRules,
        max_files: usize,
        cancel: &CancelFlag,
    ) -> Result<TreeListing>;
    /// Read a file's raw bytes.
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Default filesystem implementation backed by `std::fs`.
#[derive(Debug, Default, Clone)]
pub struct StdFileSystem;

impl StdFileSystem {
    /// Create a new standard filesystem adapter.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for StdFileSystem {
    fn list_tree(
        &self,
        root: &Path,
        ignore: &IgnoreRules,
        max_files: usize,
        cancel: &CancelFlag,
    ) -> Result<TreeListing> {
        if !root.is_dir() {
            return Err(ForgeError::InvalidRoot(root.to_path_buf()));
        }
        let root = root.canonicalize()?;
        let mut walk = Walk {
            root: root.clone(),
            ignore,
            max_files,
            cancel,
            seen: HashSet::from([root.clone()]),
            listing: TreeListing::default(),
        };
        let entries = std::fs::read_dir(&root)?;
        walk.visit(&root, entries)?;

        let mut listing = walk.listing;
        listing.files.sort_by(|a, b| a.relative.cmp(&b.relative));
        Ok(listing)
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(std::fs::read(path)?)
    }
}

/// Depth-first walk state for [`StdFileSystem::list_tree`].
struct Walk<'a> {
    root: PathBuf,
    ignore: &'a IgnoreRules,
    max_files: usize,
    cancel: &'a CancelFlag,
    seen: HashSet<PathBuf>,
    listing: TreeListing,
}

impl Walk<'_> {
    /// Visit one directory's entries in name order; `Ok(false)` means the walk
    /// hit the file ceiling and must stop.
    fn visit(&mut self, dir: &Path, entries: std::fs::ReadDir) -> Result<bool> {
        let mut paths = Vec::new();
        for entry in entries {
            if self.cancel.is_cancelled() {
                return Err(ForgeError::Cancelled);
            }
            match entry {
                Ok(entry) => paths.push(entry.path()),
                Err(err) => self.record(format!("cannot read {}: {err}", dir.display())),
            }
        }
        paths.sort();

        for path in paths {
            if self.cancel.is_cancelled() {
                return Err(ForgeError::Cancelled);
            }
            if is_ignored(&path, self.ignore) {
                continue;
            }
            // Follows symlinks; cycles are caught by the canonical `seen` set.
            let metadata = match std::fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(err) => {
                    self.record(format!("cannot stat {}: {err}", path.display()));
                    continue;
                }
            };
            if metadata.is_dir() {
                let real = match path.canonicalize() {
                    Ok(real) => real,
                    Err(err) => {
                        self.record(format!("cannot resolve {}: {err}", path.display()));
                        continue;
                    }
                };
                if !self.seen.insert(real) {
                    debug!("symlink cycle at {}, skipping", path.display());
                    continue;
                }
                let entries = match std::fs::read_dir(&path) {
                    Ok(entries) => entries,
                    Err(err) => {
                        self.record(format!("cannot read {}: {err}", path.display()));
                        continue;
                    }
                };
                if !self.visit(&path, entries)? {
                    return Ok(false);
                }
            } else if metadata.is_file() {
                if self.listing.files.len() >= self.max_files {
                    let max_files = self.max_files;
                    self.record(format!("reached file limit ({max_files}); scan truncated"));
                    self.listing.truncated = true;
                    return Ok(false);
                }
                let relative = path.strip_prefix(&self.root).unwrap_or(&path).to_path_buf();
                self.listing.files.push(TreeEntry {
                    path,
                    relative,
                    size: metadata.len(),
                });
            }
        }
        Ok(true)
    }

    fn record(&mut self, message: String) {
        warn!("{message}");
        self.listing.warnings.push(message);
    }
}

fn is_ignored(path: &Path, ignore: &IgnoreRules) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| ignore.is_ignored(name))
        .unwrap_or(false)
}
