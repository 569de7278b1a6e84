#![deny(missing_docs)]
//! mdforge core library.
//!
//! Scans a source tree into a [`ProjectFingerprint`], renders AI-assistant
//! context briefs from presets, and audits existing briefs for quality and
//! drift against the codebase.

pub mod audit;
pub mod config;
pub mod document;
pub mod domain;
pub mod error;
pub mod evidence;
pub mod fs;
pub mod generator;
pub mod languages;
pub mod manifest;
pub mod presets;
pub mod report;
pub mod resolver;
pub mod rules;
pub mod scanner;
pub mod template;

pub use audit::{REQUIRED_SECTIONS, Scorecard, audit, diff, score};
pub use config::{CancelFlag, IgnoreRules, ScanConfig};
pub use document::parse;
pub use domain::{
    AuditResult, Category, CategoryScore, DeclaredFacts, DriftField, DriftItem, Finding,
    LanguageStat, ParsedDocument, Preset, PresetSummary, ProjectFingerprint, ProjectMetadata,
    Section, Severity,
};
pub use error::{ForgeError, Result};
pub use evidence::{EvidenceCollector, Observations};
pub use fs::{FileSystem, StdFileSystem};
pub use generator::{Overrides, generate};
pub use presets::PresetRegistry;
pub use report::{
    render_audit_markdown, render_audit_text, render_drift_markdown, render_drift_text,
    render_fingerprint_markdown, render_fingerprint_text, render_json, render_presets_markdown,
    render_presets_text,
};
pub use resolver::resolve;
pub use scanner::Scanner;
