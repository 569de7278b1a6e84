//! Evidence collection: raw per-file observations gathered from a tree walk.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::config::{CancelFlag, ScanConfig};
use crate::error::{ForgeError, Result};
use crate::fs::{FileSystem, TreeEntry};

/// Files whose contents are kept as evidence.
pub const MANIFEST_FILES: &[&str] = &[
    "package.json",
    "pyproject.toml",
    "Pipfile",
    "setup.cfg",
    "setup.py",
    "Cargo.toml",
    "go.mod",
    "Gemfile",
    "composer.json",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "README.md",
    "README.rst",
    "README.txt",
    "README",
];

/// Bytes inspected for NUL when deciding whether a file is binary.
const BINARY_SNIFF_LEN: usize = 8192;

/// One file seen during the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileObservation {
    /// Absolute path.
    pub path: PathBuf,
    /// Path relative to the scan root.
    pub relative: PathBuf,
    /// Lowercase extension without the dot; empty when there is none.
    pub extension: String,
    /// Size in bytes.
    pub size: u64,
    /// Line count; `None` for binary, oversized or unreadable files.
    pub lines: Option<usize>,
    /// Shebang interpreter of an extensionless text file, e.g. `python3`.
    pub interpreter: Option<String>,
}

/// A recognized manifest (or README) with its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFile {
    /// Absolute path.
    pub path: PathBuf,
    /// Path relative to the scan root.
    pub relative: PathBuf,
    /// File name, e.g. `package.json`.
    pub name: String,
    /// File contents, lossily decoded.
    pub contents: String,
}

/// Everything the collector saw, uninterpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observations {
    /// Scan root.
    pub root: PathBuf,
    /// Files sorted by relative path.
    pub files: Vec<FileObservation>,
    /// Manifests sorted by relative path.
    pub manifests: Vec<ManifestFile>,
    /// Non-fatal problems.
    pub warnings: Vec<String>,
}

impl Observations {
    /// Iterate relative paths of every observed file.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|file| file.relative.as_path())
    }

    /// Manifests with the given file name, shallowest first.
    pub fn manifests_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ManifestFile> {
        let mut found: Vec<&ManifestFile> = self
            .manifests
            .iter()
            .filter(|manifest| manifest.name == name)
            .collect();
        found.sort_by_key(|manifest| manifest.relative.components().count());
        found.into_iter()
    }

    /// The manifest with this name at the scan root.
    pub fn root_manifest(&self, name: &str) -> Option<&ManifestFile> {
        self.manifests
            .iter()
            .find(|manifest| manifest.relative == Path::new(name))
    }
}

/// Walks a tree and gathers observations.
pub struct EvidenceCollector<F: FileSystem> {
    fs: F,
    config: ScanConfig,
}

struct Observed {
    file: FileObservation,
    manifest: Option<ManifestFile>,
    warning: Option<String>,
}

impl<F: FileSystem + Sync> EvidenceCollector<F> {
    /// Create a collector with default configuration.
    pub fn new(fs: F) -> Self {
        Self::with_config(fs, ScanConfig::default())
    }

    /// Create a collector with a custom configuration.
    pub fn with_config(fs: F, config: ScanConfig) -> Self {
        Self { fs, config }
    }

    /// Collect observations under `root`.
    ///
    /// Unreadable entries become warnings. The cancel flag is checked for every
    /// walked entry and before every file read.
    pub fn collect(&self, root: &Path, cancel: &CancelFlag) -> Result<Observations> {
        if cancel.is_cancelled() {
            return Err(ForgeError::Cancelled);
        }
        let listing = self
            .fs
            .list_tree(root, &self.config.ignore, self.config.max_files, cancel)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers.unwrap_or(0))
            .build()
            .map_err(|err| ForgeError::Other(format!("cannot start scan workers: {err}")))?;
        let observed: Vec<Observed> = pool.install(|| {
            listing
                .files
                .par_iter()
                .map(|entry| {
                    if cancel.is_cancelled() {
                        return Err(ForgeError::Cancelled);
                    }
                    Ok(self.observe(entry))
                })
                .collect::<Result<Vec<Observed>>>()
        })?;

        let mut observations = Observations {
            root: root.to_path_buf(),
            warnings: listing.warnings,
            ..Observations::default()
        };
        for item in observed {
            if let Some(warning) = item.warning {
                observations.warnings.push(warning);
            }
            if let Some(manifest) = item.manifest {
                observations.manifests.push(manifest);
            }
            observations.files.push(item.file);
        }
        info!(
            "collected {} files and {} manifests under {}",
            observations.files.len(),
            observations.manifests.len(),
            root.display()
        );
        Ok(observations)
    }

    fn observe(&self, entry: &TreeEntry) -> Observed {
        let name = entry
            .relative
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        let mut file = FileObservation {
            path: entry.path.clone(),
            relative: entry.relative.clone(),
            extension: extension_of(&entry.relative),
            size: entry.size,
            lines: None,
            interpreter: None,
        };

        if entry.size > self.config.max_file_size {
            debug!("not line-scanning oversized file {}", entry.relative.display());
            return Observed {
                file,
                manifest: None,
                warning: None,
            };
        }

        let bytes = match self.fs.read_bytes(&entry.path) {
            Ok(bytes) => bytes,
            Err(err) => {
                let message = format!("cannot read {}: {err}", entry.relative.display());
                warn!("{message}");
                return Observed {
                    file,
                    manifest: None,
                    warning: Some(message),
                };
            }
        };

        file.lines = count_lines(&bytes);
        if file.lines.is_none() {
            debug!("not line-scanning binary file {}", entry.relative.display());
        } else if file.extension.is_empty() {
            file.interpreter = shebang_interpreter(&bytes);
        }
        let manifest = (file.lines.is_some() && is_manifest(&name)).then(|| ManifestFile {
            path: entry.path.clone(),
            relative: entry.relative.clone(),
            name,
            contents: String::from_utf8_lossy(&bytes).into_owned(),
        });

        Observed {
            file,
            manifest,
            warning: None,
        }
    }
}

/// Whether a file name is recognized manifest evidence.
pub fn is_manifest(name: &str) -> bool {
    MANIFEST_FILES.contains(&name) || (name.starts_with("requirements") && name.ends_with(".txt"))
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default()
}

/// Interpreter named by a `#!` first line, looking through `env`.
fn shebang_interpreter(bytes: &[u8]) -> Option<String> {
    let rest = bytes.strip_prefix(b"#!")?;
    let end = rest.iter().position(|byte| *byte == b'\n').unwrap_or(rest.len());
    let line = String::from_utf8_lossy(&rest[..end]);
    let mut words = line.split_whitespace();
    let program = words.next()?.rsplit('/').next()?;
    let interpreter = if program == "env" {
        words.find(|word| !word.starts_with('-') && !word.contains('='))?
    } else {
        program
    };
    Some(interpreter.to_string())
}

fn count_lines(bytes: &[u8]) -> Option<usize> {
    let sniff = &bytes[..bytes.len().min(BINARY_SNIFF_LEN)];
    if sniff.contains(&0) {
        return None;
    }
    Some(String::from_utf8_lossy(bytes).lines().count())
}
