//! Repository scanning: evidence collection followed by fingerprint resolution.

use std::path::Path;

use log::info;

use crate::config::{CancelFlag, ScanConfig};
use crate::domain::ProjectFingerprint;
use crate::error::Result;
use crate::evidence::EvidenceCollector;
use crate::fs::FileSystem;
use crate::resolver::resolve;

/// Computes a [`ProjectFingerprint`] for a directory tree.
pub struct Scanner<F: FileSystem> {
    collector: EvidenceCollector<F>,
}

impl<F: FileSystem + Sync> Scanner<F> {
    /// Create a scanner with default configuration.
    pub fn new(fs: F) -> Self {
        Self::with_config(fs, ScanConfig::default())
    }

    /// Create a scanner with a custom configuration.
    pub fn with_config(fs: F, config: ScanConfig) -> Self {
        Self {
            collector: EvidenceCollector::with_config(fs, config),
        }
    }

    /// Scan `root` and resolve its fingerprint.
    pub fn scan(&self, root: &Path, cancel: &CancelFlag) -> Result<ProjectFingerprint> {
        let observations = self.collector.collect(root, cancel)?;
        let fingerprint = resolve(&observations);
        info!(
            "scanned {}: {} languages, primary {}",
            root.display(),
            fingerprint.languages.len(),
            fingerprint.primary_language().unwrap_or("none")
        );
        Ok(fingerprint)
    }
}
