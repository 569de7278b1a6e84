//! Domain entities for mdforge.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Line and file totals for one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageStat {
    /// Display name of the language (e.g. "Python").
    pub name: String,
    /// Number of files mapped to the language.
    pub files: usize,
    /// Number of lines across those files.
    pub lines: usize,
}

/// Project facts read from manifests and the README.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Declared package name.
    pub name: Option<String>,
    /// Declared package version.
    pub version: Option<String>,
    /// Declared or README-derived description.
    pub description: Option<String>,
}

/// Computed summary of a codebase's technology profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFingerprint {
    /// Languages grouped by kind, then ordered by descending line count.
    ///
    /// Programming languages come first and page markup or stylesheets (HTML,
    /// CSS, Sass, LESS) after them, so markup is primary only when nothing else
    /// was found. Within a group, ties break on file count then name.
    pub languages: Vec<LanguageStat>,
    /// Detected framework, if any.
    pub framework: Option<String>,
    /// Detected package manager, if any.
    pub package_manager: Option<String>,
    /// Detected linters and formatters.
    pub linters: BTreeSet<String>,
    /// Detected test frameworks.
    pub test_frameworks: BTreeSet<String>,
    /// Detected CI system, if any.
    pub ci_system: Option<String>,
    /// Number of recognized source files.
    pub file_count: usize,
    /// Lines across recognized source files.
    pub total_lines: usize,
    /// Manifest metadata.
    pub metadata: ProjectMetadata,
    /// Non-fatal problems met while collecting evidence.
    pub warnings: Vec<String>,
}

impl ProjectFingerprint {
    /// The primary (highest ranked) language.
    pub fn primary_language(&self) -> Option<&str> {
        self.languages.first().map(|stat| stat.name.as_str())
    }
}

/// Named bundle of a document template plus standards and anti-patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    /// Registry identifier (e.g. "python-fastapi").
    pub id: String,
    /// Language or framework the preset targets.
    pub target: String,
    /// One-line summary shown in listings.
    pub summary: String,
    /// Document template text.
    pub template: String,
    /// Ordered rule statements.
    #[serde(default)]
    pub standards: Vec<String>,
    /// Ordered anti-pattern statements.
    #[serde(default)]
    pub anti_patterns: Vec<String>,
    /// Framework conventions, rendered only when a framework is detected.
    #[serde(default)]
    pub framework_conventions: Vec<String>,
}

/// Short description of a registered preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetSummary {
    /// Registry identifier.
    pub id: String,
    /// Language or framework the preset targets.
    pub target: String,
    /// One-line summary.
    pub summary: String,
}

/// A `## Heading` and its verbatim body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Heading text without the marker.
    pub heading: String,
    /// Body text between this heading and the next.
    pub body: String,
}

/// Facts a document declares about the project. Absent fields were not declared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredFacts {
    /// Declared project name.
    pub project_name: Option<String>,
    /// Declared version.
    pub version: Option<String>,
    /// Declared last-updated date, raw text.
    pub last_updated: Option<String>,
    /// Declared primary language.
    pub language: Option<String>,
    /// Declared framework; `none` is a valid declaration.
    pub framework: Option<String>,
    /// Declared package manager.
    pub package_manager: Option<String>,
    /// Declared linters.
    pub linters: Option<BTreeSet<String>>,
    /// Declared test frameworks.
    pub test_frameworks: Option<BTreeSet<String>>,
    /// Declared CI system.
    pub ci_system: Option<String>,
    /// Commands listed in the Commands section.
    pub commands: Vec<String>,
    /// Bullets listed in the Anti-Patterns section.
    pub anti_patterns: Vec<String>,
}

/// A document reverse-parsed into sections and facts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDocument {
    /// Level-one heading, if any.
    pub title: Option<String>,
    /// Sections in document order with unique headings.
    pub sections: Vec<Section>,
    /// Facts extracted from known sections.
    pub facts: DeclaredFacts,
    /// Tolerated irregularities (duplicate headings and the like).
    pub anomalies: Vec<String>,
}

impl ParsedDocument {
    /// Find a section by heading, ignoring case and punctuation.
    pub fn section(&self, heading: &str) -> Option<&Section> {
        let key = heading_key(heading);
        self.sections
            .iter()
            .find(|section| heading_key(&section.heading) == key)
    }
}

/// Normalize a heading for lookups: lowercase ASCII alphanumerics only.
pub fn heading_key(heading: &str) -> String {
    heading
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Rubric categories.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Required sections present with content.
    SectionCoverage,
    /// Declared facts agree with the fingerprint.
    Accuracy,
    /// Sections mention concrete identifiers.
    Specificity,
    /// Anti-pattern bullets listed.
    AntiPatterns,
    /// Version and date declared and recent.
    Freshness,
}

impl Category {
    /// All categories in rubric order.
    pub const ALL: [Category; 5] = [
        Category::SectionCoverage,
        Category::Accuracy,
        Category::Specificity,
        Category::AntiPatterns,
        Category::Freshness,
    ];

    /// Maximum points for the category.
    pub fn weight(self) -> u32 {
        match self {
            Category::SectionCoverage => 30,
            Category::Accuracy => 25,
            Category::Specificity => 20,
            Category::AntiPatterns => 15,
            Category::Freshness => 10,
        }
    }

    /// Human-readable name.
    pub fn label(self) -> &'static str {
        match self {
            Category::SectionCoverage => "section coverage",
            Category::Accuracy => "accuracy",
            Category::Specificity => "specificity",
            Category::AntiPatterns => "anti-patterns",
            Category::Freshness => "freshness",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Points earned in one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryScore {
    /// Rubric category.
    pub category: Category,
    /// Points earned.
    pub earned: u32,
    /// Points available.
    pub possible: u32,
}

/// Finding severity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// A required section is absent or empty.
    Missing,
    /// A declared fact disagrees with the codebase.
    Inaccurate,
    /// Content is present but weak.
    Warning,
    /// Advisory note.
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Missing => "missing",
            Severity::Inaccurate => "inaccurate",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        f.write_str(label)
    }
}

/// Advisory audit note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Severity of the note.
    pub severity: Severity,
    /// Category the note belongs to.
    pub category: Category,
    /// Message text.
    pub message: String,
}

/// Fields compared by the drift check, in report order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftField {
    /// Primary language.
    Language,
    /// Framework.
    Framework,
    /// Package manager.
    PackageManager,
    /// Linters.
    Linters,
    /// Test frameworks.
    TestFrameworks,
    /// CI system.
    CiSystem,
}

impl DriftField {
    /// All fields in priority order.
    pub const ALL: [DriftField; 6] = [
        DriftField::Language,
        DriftField::Framework,
        DriftField::PackageManager,
        DriftField::Linters,
        DriftField::TestFrameworks,
        DriftField::CiSystem,
    ];
}

impl fmt::Display for DriftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DriftField::Language => "language",
            DriftField::Framework => "framework",
            DriftField::PackageManager => "package manager",
            DriftField::Linters => "linters",
            DriftField::TestFrameworks => "test frameworks",
            DriftField::CiSystem => "CI",
        };
        f.write_str(label)
    }
}

/// A disagreement between a declared fact and the codebase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftItem {
    /// Field that drifted.
    pub field: DriftField,
    /// Declared value; `None` when the document does not declare the field.
    pub declared: Option<String>,
    /// Value computed from the codebase; `None` when nothing was detected.
    pub actual: Option<String>,
}

/// Output of an audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResult {
    /// Total score, 0-100.
    pub score: u8,
    /// Points per rubric category.
    pub category_scores: Vec<CategoryScore>,
    /// Advisory findings.
    pub findings: Vec<Finding>,
    /// Drift between document and codebase.
    pub drift_items: Vec<DriftItem>,
}
