//! Scan configuration: ignore rules, size ceilings and cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use glob::Pattern;
use log::warn;

/// Directory and file name patterns skipped by default.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "__pycache__",
    ".venv",
    "venv",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    ".ruff_cache",
    "target",
    "dist",
    "build",
    ".next",
    ".nuxt",
    "coverage",
    "*.pyc",
    "*.egg-info",
];

/// Files above this size are counted but not line-scanned.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 512 * 1024;

/// The walk stops after this many files.
pub const DEFAULT_MAX_FILES: usize = 10_000;

/// Glob patterns matched against individual path segment names.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    patterns: Vec<Pattern>,
}

impl IgnoreRules {
    /// Compile ignore rules from raw glob strings, skipping invalid patterns.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .filter_map(|raw| {
                let raw = raw.as_ref().trim();
                if raw.is_empty() {
                    return None;
                }
                match Pattern::new(raw) {
                    Ok(pattern) => Some(pattern),
                    Err(err) => {
                        warn!("ignoring invalid exclude pattern {raw:?}: {err}");
                        None
                    }
                }
            })
            .collect();
        Self { patterns }
    }

    /// Default rules extended with extra patterns.
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut raw: Vec<String> = DEFAULT_IGNORE_PATTERNS
            .iter()
            .map(|pattern| pattern.to_string())
            .collect();
        raw.extend(extra.into_iter().map(|pattern| pattern.as_ref().to_string()));
        Self::new(raw)
    }

    /// Whether an entry with this file name should be skipped.
    pub fn is_ignored(&self, name: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(name))
    }
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self::new(DEFAULT_IGNORE_PATTERNS)
    }
}

/// Options for a single scan.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Entries skipped before recursion.
    pub ignore: IgnoreRules,
    /// Size ceiling in bytes for line scanning.
    pub max_file_size: u64,
    /// Maximum number of files collected.
    pub max_files: usize,
    /// Worker threads for file reads; `None` uses one per CPU.
    pub workers: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            ignore: IgnoreRules::default(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_files: DEFAULT_MAX_FILES,
            workers: None,
        }
    }
}

/// Shared flag a caller sets to stop a running scan.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
