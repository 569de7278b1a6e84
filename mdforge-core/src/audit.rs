//! Auditing: rubric scoring and drift detection.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::NaiveDate;
use log::info;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::{
    AuditResult, Category, CategoryScore, DriftField, DriftItem, Finding, ParsedDocument,
    ProjectFingerprint, Severity,
};
use crate::generator::NONE;

/// Sections every brief must carry, in document order.
pub const REQUIRED_SECTIONS: [&str; 6] = [
    "Project Overview",
    "Tech Stack",
    "Commands",
    "Code Standards",
    "Testing",
    "Anti-Patterns",
];

/// Identifiers counted per section, at most.
const IDENTIFIERS_PER_SECTION: u32 = 3;
/// Points per anti-pattern bullet.
const POINTS_PER_ANTI_PATTERN: u32 = 3;
/// Days a last-updated date stays fresh.
const FRESH_DAYS: i64 = 365;

static CODE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`\n]+`").expect("valid regex"));
static PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\.{1,2}/)?[A-Za-z0-9_.-]+(?:/[A-Za-z0-9_.-]+)+/?|\./[A-Za-z0-9_.-]+")
        .expect("valid regex")
});
static FILE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b[A-Za-z0-9_-]+\.(?:py|pyi|rs|ts|tsx|js|jsx|mjs|go|rb|php|java|kt|scala|toml|json|yaml|yml|md|txt|cfg|ini|lock|sh|sql|html|css|xml|gradle)\b",
    )
    .expect("valid regex")
});
static VERSION_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bv?\d+\.\d+(?:\.\d+)?\b").expect("valid regex"));
static FLAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)(--?[A-Za-z][A-Za-z0-9-]*)").expect("valid regex"));
static SEMVER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^v?\d+\.\d+(?:\.\d+)?(?:[-+][0-9A-Za-z.-]+)?$").expect("valid regex")
});

/// Score and findings without drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scorecard {
    /// Total score, 0-100.
    pub score: u8,
    /// Points per category in rubric order.
    pub category_scores: Vec<CategoryScore>,
    /// Advisory findings.
    pub findings: Vec<Finding>,
}

/// Score a document against the fingerprint of the tree it describes.
pub fn score(document: &ParsedDocument, fingerprint: &ProjectFingerprint, today: NaiveDate) -> Scorecard {
    let mut findings = Vec::new();
    let earned = [
        section_coverage(document, &mut findings),
        accuracy(document, fingerprint, &mut findings),
        specificity(document, &mut findings),
        anti_patterns(document, &mut findings),
        freshness(document, today, &mut findings),
    ];

    let category_scores: Vec<CategoryScore> = Category::ALL
        .iter()
        .zip(earned)
        .map(|(category, earned)| CategoryScore {
            category: *category,
            earned: earned.min(category.weight()),
            possible: category.weight(),
        })
        .collect();
    let total: u32 = category_scores.iter().map(|score| score.earned).sum();
    Scorecard {
        score: u8::try_from(total.min(100)).unwrap_or(100),
        category_scores,
        findings,
    }
}

/// Fields whose declared value disagrees with the fingerprint, in field order.
pub fn diff(document: &ParsedDocument, fingerprint: &ProjectFingerprint) -> Vec<DriftItem> {
    DriftField::ALL
        .iter()
        .filter_map(|field| {
            let (declared, actual) = field_values(document, fingerprint, *field);
            match compare(declared.as_ref(), actual.as_ref()) {
                Comparison::Match => None,
                Comparison::Undeclared if actual.is_none() => None,
                Comparison::Undeclared | Comparison::Mismatch => Some(DriftItem {
                    field: *field,
                    declared: declared.map(|value| value.render()),
                    actual: actual.map(|value| value.render()),
                }),
            }
        })
        .collect()
}

/// Score plus drift.
pub fn audit(document: &ParsedDocument, fingerprint: &ProjectFingerprint, today: NaiveDate) -> AuditResult {
    let scorecard = score(document, fingerprint, today);
    let drift_items = diff(document, fingerprint);
    info!(
        "audit scored {}/100 with {} findings and {} drift items",
        scorecard.score,
        scorecard.findings.len(),
        drift_items.len()
    );
    AuditResult {
        score: scorecard.score,
        category_scores: scorecard.category_scores,
        findings: scorecard.findings,
        drift_items,
    }
}

fn finding(severity: Severity, category: Category, message: String) -> Finding {
    Finding {
        severity,
        category,
        message,
    }
}

fn has_content(document: &ParsedDocument, heading: &str) -> bool {
    document
        .section(heading)
        .is_some_and(|section| !section.body.trim().is_empty())
}

fn section_coverage(document: &ParsedDocument, findings: &mut Vec<Finding>) -> u32 {
    let mut present = 0;
    for heading in REQUIRED_SECTIONS {
        if has_content(document, heading) {
            present += 1;
            continue;
        }
        let message = if document.section(heading).is_some() {
            format!("section \"{heading}\" is empty")
        } else {
            format!("section \"{heading}\" is missing")
        };
        findings.push(finding(Severity::Missing, Category::SectionCoverage, message));
    }
    Category::SectionCoverage.weight() * present / REQUIRED_SECTIONS.len() as u32
}

fn accuracy(document: &ParsedDocument, fingerprint: &ProjectFingerprint, findings: &mut Vec<Finding>) -> u32 {
    let mut matched = 0;
    for field in DriftField::ALL {
        let (declared, actual) = field_values(document, fingerprint, field);
        match compare(declared.as_ref(), actual.as_ref()) {
            Comparison::Match => matched += 1,
            Comparison::Mismatch => findings.push(finding(
                Severity::Inaccurate,
                Category::Accuracy,
                format!(
                    "{field} is declared as \"{}\" but the codebase shows \"{}\"",
                    declared.map(|value| value.render()).unwrap_or_default(),
                    actual.map_or_else(|| NONE.to_string(), |value| value.render()),
                ),
            )),
            Comparison::Undeclared => {}
        }
    }
    Category::Accuracy.weight() * matched / DriftField::ALL.len() as u32
}

fn specificity(document: &ParsedDocument, findings: &mut Vec<Finding>) -> u32 {
    let mut counted = 0;
    for heading in REQUIRED_SECTIONS {
        let Some(section) = document.section(heading) else {
            continue;
        };
        if section.body.trim().is_empty() {
            continue;
        }
        let identifiers = identifiers(&section.body).len() as u32;
        if identifiers == 0 {
            findings.push(finding(
                Severity::Warning,
                Category::Specificity,
                format!("section \"{heading}\" is generic: it names no commands, paths, versions or flags"),
            ));
        }
        counted += identifiers.min(IDENTIFIERS_PER_SECTION);
    }
    let possible = IDENTIFIERS_PER_SECTION * REQUIRED_SECTIONS.len() as u32;
    Category::Specificity.weight() * counted / possible
}

/// Distinct concrete identifiers in a block of text.
pub fn identifiers(text: &str) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    for pattern in [&*CODE_SPAN, &*PATH, &*FILE_NAME, &*VERSION_NUMBER] {
        found.extend(pattern.find_iter(text).map(|hit| hit.as_str().to_string()));
    }
    found.extend(
        FLAG.captures_iter(text)
            .filter_map(|captures| captures.get(1))
            .map(|flag| flag.as_str().to_string()),
    );
    found
}

fn anti_patterns(document: &ParsedDocument, findings: &mut Vec<Finding>) -> u32 {
    let bullets = document.facts.anti_patterns.len() as u32;
    if bullets == 0 && has_content(document, "Anti-Patterns") {
        findings.push(finding(
            Severity::Warning,
            Category::AntiPatterns,
            "section \"Anti-Patterns\" lists no anti-patterns".to_string(),
        ));
    }
    (bullets * POINTS_PER_ANTI_PATTERN).min(Category::AntiPatterns.weight())
}

fn freshness(document: &ParsedDocument, today: NaiveDate, findings: &mut Vec<Finding>) -> u32 {
    let facts = &document.facts;
    let has_overview = has_content(document, "Project Overview");
    let mut earned = 0;

    match facts.version.as_deref() {
        Some(version) if SEMVER.is_match(version) => earned += 5,
        Some(version) => findings.push(finding(
            Severity::Info,
            Category::Freshness,
            format!("version \"{version}\" is not a semantic version"),
        )),
        None if has_overview => findings.push(finding(
            Severity::Info,
            Category::Freshness,
            "no version declared".to_string(),
        )),
        None => {}
    }

    let date = facts
        .last_updated
        .as_deref()
        .map(|raw| (raw, NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")));
    match date {
        Some((_, Ok(date))) => {
            let age = (today - date).num_days();
            if age < 0 {
                findings.push(finding(
                    Severity::Warning,
                    Category::Freshness,
                    format!("last updated date {date} is in the future"),
                ));
            } else if age <= FRESH_DAYS {
                earned += 5;
            } else {
                earned += 2;
                findings.push(finding(
                    Severity::Warning,
                    Category::Freshness,
                    format!("last updated date {date} is {age} days old"),
                ));
            }
        }
        Some((raw, Err(_))) => findings.push(finding(
            Severity::Info,
            Category::Freshness,
            format!("last updated date \"{raw}\" is not YYYY-MM-DD"),
        )),
        None if has_overview => findings.push(finding(
            Severity::Info,
            Category::Freshness,
            "no last updated date declared".to_string(),
        )),
        None => {}
    }
    earned
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FactValue {
    Single(String),
    Set(BTreeSet<String>),
}

impl FactValue {
    fn render(&self) -> String {
        match self {
            FactValue::Single(value) => value.clone(),
            FactValue::Set(values) if values.is_empty() => NONE.to_string(),
            FactValue::Set(values) => values.iter().cloned().collect::<Vec<_>>().join(", "),
        }
    }

    /// Lowercased comparison form; `none` and empty sets collapse to absent.
    fn normalized(&self) -> Option<BTreeSet<String>> {
        let values: BTreeSet<String> = match self {
            FactValue::Single(value) => [value.trim().to_lowercase()].into_iter().collect(),
            FactValue::Set(values) => values.iter().map(|value| value.trim().to_lowercase()).collect(),
        };
        let values: BTreeSet<String> = values
            .into_iter()
            .filter(|value| !value.is_empty() && value != NONE)
            .collect();
        (!values.is_empty()).then_some(values)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Undeclared,
    Match,
    Mismatch,
}

fn compare(declared: Option<&FactValue>, actual: Option<&FactValue>) -> Comparison {
    let Some(declared) = declared else {
        return Comparison::Undeclared;
    };
    let actual = actual.and_then(FactValue::normalized);
    if declared.normalized() == actual {
        Comparison::Match
    } else {
        Comparison::Mismatch
    }
}

fn field_values(
    document: &ParsedDocument,
    fingerprint: &ProjectFingerprint,
    field: DriftField,
) -> (Option<FactValue>, Option<FactValue>) {
    let facts = &document.facts;
    let single = |value: &Option<String>| value.clone().map(FactValue::Single);
    let set = |values: &BTreeSet<String>| (!values.is_empty()).then(|| FactValue::Set(values.clone()));
    match field {
        DriftField::Language => (
            single(&facts.language),
            fingerprint
                .primary_language()
                .map(|language| FactValue::Single(language.to_string())),
        ),
        DriftField::Framework => (single(&facts.framework), single(&fingerprint.framework)),
        DriftField::PackageManager => (
            single(&facts.package_manager),
            single(&fingerprint.package_manager),
        ),
        DriftField::Linters => (
            facts.linters.clone().map(FactValue::Set),
            set(&fingerprint.linters),
        ),
        DriftField::TestFrameworks => (
            facts.test_frameworks.clone().map(FactValue::Set),
            set(&fingerprint.test_frameworks),
        ),
        DriftField::CiSystem => (single(&facts.ci_system), single(&fingerprint.ci_system)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse;
    use crate::domain::LanguageStat;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).expect("date")
    }

    fn python() -> ProjectFingerprint {
        ProjectFingerprint {
            languages: vec![LanguageStat {
                name: "Python".to_string(),
                files: 2,
                lines: 80,
            }],
            package_manager: Some("pip".to_string()),
            linters: ["ruff".to_string()].into_iter().collect(),
            ..ProjectFingerprint::default()
        }
    }

    const COMPLETE: &str = "\
# demo

## Project Overview

**Project**: demo
**Version**: 1.0.0
**Last Updated**: 2024-05-01

## Tech Stack

**Language**: Python
**Framework**: none
**Package Manager**: pip
**Linters**: ruff
**Test Frameworks**: none
**CI**: none

## Commands

- `pip install -r requirements.txt`
- `ruff check .`
- `python -m app --debug`

## Code Standards

- Keep modules under `src/app/` small, see docs/style.md and use ruff 0.4.

## Testing

- Run `pytest -x` against tests/unit and tests/integration.

## Anti-Patterns

- Bare except.
- Print debugging.
- Global state.
- Wildcard imports.
- Mutable defaults.
- Shadowing builtins.
";

    #[test]
    fn empty_document_scores_zero() {
        let card = score(&parse(""), &python(), today());
        assert_eq!(card.score, 0);
        assert_eq!(card.findings.len(), REQUIRED_SECTIONS.len());
        assert!(card
            .findings
            .iter()
            .all(|finding| finding.severity == Severity::Missing));
    }

    #[test]
    fn complete_document_scores_well() {
        let card = score(&parse(COMPLETE), &python(), today());
        let earned: Vec<u32> = card.category_scores.iter().map(|score| score.earned).collect();
        assert_eq!(earned[0], 30);
        assert_eq!(earned[1], 25);
        assert_eq!(earned[3], 15);
        assert_eq!(earned[4], 10);
        assert!(card.score >= 80, "score {}", card.score);
        assert!(card
            .findings
            .iter()
            .all(|finding| finding.severity != Severity::Inaccurate));
    }

    #[test]
    fn accuracy_counts_declared_matches_only() {
        let document = parse("## Tech Stack\n**Language**: JavaScript\n**Package Manager**: PIP\n");
        let card = score(&document, &python(), today());
        assert_eq!(card.category_scores[1].earned, 25 / 6);
        let inaccurate: Vec<&Finding> = card
            .findings
            .iter()
            .filter(|finding| finding.severity == Severity::Inaccurate)
            .collect();
        assert_eq!(inaccurate.len(), 1);
        assert!(inaccurate[0].message.contains("JavaScript"));
    }

    #[test]
    fn freshness_rules() {
        let stale = parse("## Project Overview\n**Version**: 2.1\n**Last Updated**: 2022-01-01\n");
        let card = score(&stale, &python(), today());
        assert_eq!(card.category_scores[4].earned, 7);
        assert!(card
            .findings
            .iter()
            .any(|finding| finding.severity == Severity::Warning && finding.message.contains("days old")));

        let future = parse("## Project Overview\n**Last Updated**: 2025-01-01\n");
        assert_eq!(score(&future, &python(), today()).category_scores[4].earned, 0);

        let undated = parse("## Project Overview\nText only.\n");
        let infos = score(&undated, &python(), today())
            .findings
            .into_iter()
            .filter(|finding| finding.severity == Severity::Info)
            .count();
        assert_eq!(infos, 2);
    }

    #[test]
    fn anti_patterns_are_capped() {
        let card = score(&parse(COMPLETE), &python(), today());
        assert_eq!(card.category_scores[3].earned, 15);

        let two = parse("## Anti-Patterns\n- one\n- two\n");
        assert_eq!(score(&two, &python(), today()).category_scores[3].earned, 6);

        let none = parse("## Anti-Patterns\n- None detected.\n");
        let card = score(&none, &python(), today());
        assert_eq!(card.category_scores[3].earned, 0);
        assert!(card
            .findings
            .iter()
            .any(|finding| finding.category == Category::AntiPatterns));
    }

    #[test]
    fn identifiers_are_distinct_and_classified() {
        let found = identifiers("Run `make` then ./run.sh --fast -v on v1.2.3 in src/lib, twice: `make`.");
        for expected in ["`make`", "./run.sh", "--fast", "-v", "v1.2.3", "src/lib", "run.sh"] {
            assert!(found.contains(expected), "missing {expected} in {found:?}");
        }
        assert!(identifiers("Write clean code and be nice.").is_empty());
    }

    #[test]
    fn drift_reports_mismatches_in_field_order() {
        let document = parse("## Tech Stack\n**Language**: JavaScript\n**Linters**: RUFF\n");
        let drift = diff(&document, &python());
        assert_eq!(
            drift,
            vec![
                DriftItem {
                    field: DriftField::Language,
                    declared: Some("JavaScript".to_string()),
                    actual: Some("Python".to_string()),
                },
                DriftItem {
                    field: DriftField::PackageManager,
                    declared: None,
                    actual: Some("pip".to_string()),
                },
            ]
        );
    }

    #[test]
    fn declared_none_matches_absent_actual() {
        let document = parse("## Tech Stack\n**Framework**: none\n**CI**: None\n**Test Frameworks**: none\n");
        let drift = diff(&document, &python());
        assert!(drift
            .iter()
            .all(|item| !matches!(item.field, DriftField::Framework | DriftField::CiSystem | DriftField::TestFrameworks)));
    }

    #[test]
    fn audit_is_idempotent() {
        let document = parse(COMPLETE);
        assert_eq!(
            audit(&document, &python(), today()),
            audit(&document, &python(), today())
        );
    }
}
