//! Reverse parsing of a generated (or hand-written) brief.
//!
//! The parser never fails. Anything it cannot classify is body text, and
//! irregularities it tolerates are recorded as anomalies.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::domain::{DeclaredFacts, ParsedDocument, Section, heading_key};

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})[ \t]+(.*?)(?:[ \t]+#+)?[ \t]*$").expect("valid regex"));
static FACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*+]\s+)?\*\*([^*:]+?)(?::\*\*|\*\*\s*:)\s*(.*?)\s*$").expect("valid regex")
});
static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*+]\s+(.*?)\s*$").expect("valid regex"));
static CODE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`\n]+)`").expect("valid regex"));

const OVERVIEW: &str = "projectoverview";
const TECH_STACK: &str = "techstack";
const COMMANDS: &str = "commands";
const ANTI_PATTERNS: &str = "antipatterns";

/// One classified line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    /// `#`-prefixed heading followed by whitespace and text.
    Heading {
        /// Number of `#` markers.
        level: usize,
        /// Heading text.
        text: &'a str,
    },
    /// `**Label**: value`.
    Fact {
        /// Label without emphasis markers.
        label: &'a str,
        /// Trimmed value.
        value: &'a str,
    },
    /// List item text.
    Bullet(&'a str),
    /// Code fence delimiter.
    Fence,
    /// Anything else, including every line inside a fence.
    Text(&'a str),
}

/// Classify every line of `text`. Returns each line with its byte offset.
pub fn tokenize(text: &str) -> Vec<(usize, Line<'_>)> {
    let mut lines = Vec::new();
    let mut offset = 0;
    let mut fence: Option<&str> = None;
    for raw in text.split_inclusive('\n') {
        let start = offset;
        offset += raw.len();
        let line = raw.trim_end_matches(['\n', '\r']);
        let trimmed = line.trim_start();

        if let Some(marker) = fence {
            if trimmed.starts_with(marker) {
                fence = None;
                lines.push((start, Line::Fence));
            } else {
                lines.push((start, Line::Text(line)));
            }
            continue;
        }
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            fence = Some(&trimmed[..3]);
            lines.push((start, Line::Fence));
            continue;
        }
        lines.push((start, classify(line)));
    }
    lines
}

fn classify(line: &str) -> Line<'_> {
    if let Some(captures) = HEADING.captures(line)
        && let (Some(marks), Some(text)) = (captures.get(1), captures.get(2))
        && !text.as_str().is_empty()
    {
        return Line::Heading {
            level: marks.as_str().len(),
            text: text.as_str(),
        };
    }
    if let Some(captures) = FACT.captures(line)
        && let (Some(label), Some(value)) = (captures.get(1), captures.get(2))
    {
        return Line::Fact {
            label: label.as_str().trim(),
            value: value.as_str(),
        };
    }
    if let Some(item) = BULLET.captures(line).and_then(|captures| captures.get(1)) {
        return Line::Bullet(item.as_str());
    }
    Line::Text(line)
}

/// Parse a document into title, sections, declared facts and anomalies.
pub fn parse(text: &str) -> ParsedDocument {
    let lines = tokenize(text);
    let mut document = ParsedDocument::default();
    // (heading, key, body start, kept)
    let mut current: Option<(String, String, usize, bool)> = None;
    let mut seen = BTreeSet::new();

    for (index, (start, line)) in lines.iter().enumerate() {
        match *line {
            Line::Heading { level: 1, text: heading } if document.title.is_none() && current.is_none() => {
                document.title = Some(heading.to_string());
            }
            Line::Heading { level: 2, text: heading } => {
                close_section(&mut document, current.take(), text, *start);
                let key = heading_key(heading);
                let kept = seen.insert(key.clone());
                if !kept {
                    document
                        .anomalies
                        .push(format!("duplicate section heading: {heading}"));
                }
                let body_start = lines
                    .get(index + 1)
                    .map_or(text.len(), |(next, _)| *next);
                current = Some((heading.to_string(), key, body_start, kept));
            }
            _ => {
                if let Some((_, key, _, true)) = &current {
                    record_fact(&mut document.facts, key, line);
                }
            }
        }
    }
    close_section(&mut document, current, text, text.len());
    debug!(
        "parsed {} sections, {} anomalies",
        document.sections.len(),
        document.anomalies.len()
    );
    document
}

fn close_section(
    document: &mut ParsedDocument,
    section: Option<(String, String, usize, bool)>,
    text: &str,
    end: usize,
) {
    if let Some((heading, _, body_start, true)) = section {
        let body = text.get(body_start.min(end)..end).unwrap_or_default();
        document.sections.push(Section {
            heading,
            body: body.to_string(),
        });
    }
}

fn record_fact(facts: &mut DeclaredFacts, section: &str, line: &Line<'_>) {
    match (section, *line) {
        (OVERVIEW | TECH_STACK, Line::Fact { label, value }) => {
            let value = clean_value(value);
            match heading_key(label).as_str() {
                "project" | "projectname" | "name" => set_once(&mut facts.project_name, value),
                "version" => set_once(&mut facts.version, value),
                "lastupdated" | "updated" | "date" => set_once(&mut facts.last_updated, value),
                "language" | "primarylanguage" => set_once(&mut facts.language, value),
                "framework" => set_once(&mut facts.framework, value),
                "packagemanager" => set_once(&mut facts.package_manager, value),
                "ci" | "cisystem" => set_once(&mut facts.ci_system, value),
                "linters" | "linter" => set_list_once(&mut facts.linters, &value),
                "testframeworks" | "testframework" => {
                    set_list_once(&mut facts.test_frameworks, &value)
                }
                _ => {}
            }
        }
        (COMMANDS, Line::Bullet(item)) => {
            facts.commands.extend(
                CODE_SPAN
                    .captures_iter(item)
                    .filter_map(|captures| captures.get(1))
                    .map(|span| span.as_str().trim().to_string()),
            );
        }
        (ANTI_PATTERNS, Line::Bullet(item)) if !is_placeholder_bullet(item) => {
            facts.anti_patterns.push(item.to_string());
        }
        _ => {}
    }
}

fn clean_value(value: &str) -> String {
    value.trim().trim_matches('`').trim().to_string()
}

fn set_once(slot: &mut Option<String>, value: String) {
    if slot.is_none() && !value.is_empty() {
        *slot = Some(value);
    }
}

fn set_list_once(slot: &mut Option<BTreeSet<String>>, value: &str) {
    if slot.is_some() || value.is_empty() {
        return;
    }
    let items = if value.eq_ignore_ascii_case("none") {
        BTreeSet::new()
    } else {
        value
            .split(',')
            .map(|item| item.trim().trim_matches('`').trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    };
    *slot = Some(items);
}

fn is_placeholder_bullet(item: &str) -> bool {
    let normalized = item.trim().trim_end_matches('.').to_ascii_lowercase();
    normalized == "none detected" || normalized == "none"
}
