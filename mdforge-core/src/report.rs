//! Report formatting utilities for mdforge outputs.

use std::fmt::Write;

use serde::Serialize;

use crate::domain::{AuditResult, DriftItem, Finding, LanguageStat, PresetSummary, ProjectFingerprint};
use crate::generator::NONE;

/// Render an audit as Markdown, suitable as a CI comment body.
pub fn render_audit_markdown(document: &str, result: &AuditResult) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# mdforge Audit Report\n");
    let _ = writeln!(output, "- Document: `{document}`");
    let _ = writeln!(output, "- Score: **{}/100**\n", result.score);

    let _ = writeln!(output, "### Categories");
    let _ = writeln!(output, "| Category | Points |");
    let _ = writeln!(output, "|---|---|");
    for score in &result.category_scores {
        let _ = writeln!(
            output,
            "| {} | {}/{} |",
            score.category, score.earned, score.possible
        );
    }
    let _ = writeln!(output);

    append_findings(&mut output, &result.findings);
    append_drift(&mut output, &result.drift_items);
    output
}

/// Render an audit as plain text.
pub fn render_audit_text(document: &str, result: &AuditResult) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "{document}: {}/100", result.score);
    for score in &result.category_scores {
        let _ = writeln!(
            output,
            "  {:<18} {:>2}/{}",
            score.category.label(),
            score.earned,
            score.possible
        );
    }
    if !result.findings.is_empty() {
        let _ = writeln!(output, "\nFindings:");
        for finding in &result.findings {
            let _ = writeln!(output, "  [{}] {}", finding.severity, finding.message);
        }
    }
    if !result.drift_items.is_empty() {
        let _ = writeln!(output);
        output.push_str(&render_drift_text(&result.drift_items));
    }
    output
}

/// Render any serializable report payload as JSON.
pub fn render_json<T: Serialize + ?Sized>(payload: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(payload)
}

/// Render a fingerprint as plain text.
pub fn render_fingerprint_text(fingerprint: &ProjectFingerprint) -> String {
    let mut output = String::new();
    if let Some(name) = &fingerprint.metadata.name {
        let _ = writeln!(output, "Project:          {name}");
    }
    if let Some(version) = &fingerprint.metadata.version {
        let _ = writeln!(output, "Version:          {version}");
    }
    let _ = writeln!(output, "Primary language: {}", or_none(fingerprint.primary_language()));
    let _ = writeln!(output, "Framework:        {}", or_none(fingerprint.framework.as_deref()));
    let _ = writeln!(
        output,
        "Package manager:  {}",
        or_none(fingerprint.package_manager.as_deref())
    );
    let _ = writeln!(output, "Linters:          {}", join_or_none(&fingerprint.linters));
    let _ = writeln!(
        output,
        "Test frameworks:  {}",
        join_or_none(&fingerprint.test_frameworks)
    );
    let _ = writeln!(output, "CI:               {}", or_none(fingerprint.ci_system.as_deref()));
    let _ = writeln!(
        output,
        "Files:            {} ({} lines)",
        fingerprint.file_count, fingerprint.total_lines
    );

    if fingerprint.languages.is_empty() {
        let _ = writeln!(output, "\nNo languages detected.");
    } else {
        let _ = writeln!(output, "\nLanguages:");
        for (stat, percent) in format_language_stats(&fingerprint.languages) {
            let _ = writeln!(
                output,
                "  {:<14} {:>6} lines {:>5} files {percent:>6.2}%",
                stat.name, stat.lines, stat.files
            );
        }
    }

    if !fingerprint.warnings.is_empty() {
        let _ = writeln!(output, "\nWarnings:");
        for warning in &fingerprint.warnings {
            let _ = writeln!(output, "  - {warning}");
        }
    }
    output
}

/// Render a fingerprint as Markdown: the text rendering in a fenced block.
pub fn render_fingerprint_markdown(fingerprint: &ProjectFingerprint) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# mdforge Scan Report\n");
    let _ = writeln!(
        output,
        "```text\n{}```",
        render_fingerprint_text(fingerprint)
    );
    output
}

/// Render drift items as plain text.
pub fn render_drift_text(items: &[DriftItem]) -> String {
    if items.is_empty() {
        return "No drift detected.\n".to_string();
    }
    let mut output = String::new();
    let _ = writeln!(output, "Drift:");
    for item in items {
        let _ = writeln!(output, "  {}", describe_drift(item));
    }
    output
}

/// Render drift items as Markdown.
pub fn render_drift_markdown(document: &str, items: &[DriftItem]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# mdforge Drift Report\n");
    let _ = writeln!(output, "- Document: `{document}`\n");
    append_drift(&mut output, items);
    output
}

/// Render the preset catalog as plain text.
pub fn render_presets_text(presets: &[PresetSummary]) -> String {
    let mut output = String::new();
    for preset in presets {
        let _ = writeln!(
            output,
            "{:<16} {:<12} {}",
            preset.id, preset.target, preset.summary
        );
    }
    output
}

/// Render the preset catalog as a Markdown table.
pub fn render_presets_markdown(presets: &[PresetSummary]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "| Preset | Target | Summary |");
    let _ = writeln!(output, "|---|---|---|");
    for preset in presets {
        let _ = writeln!(
            output,
            "| `{}` | {} | {} |",
            preset.id, preset.target, preset.summary
        );
    }
    output
}

/// Language line shares in ranking order, as percentages of all lines.
pub fn format_language_stats(languages: &[LanguageStat]) -> Vec<(&LanguageStat, f64)> {
    let total: usize = languages.iter().map(|stat| stat.lines).sum();
    languages
        .iter()
        .map(|stat| {
            let percent = if total == 0 {
                0.0
            } else {
                stat.lines as f64 * 100.0 / total as f64
            };
            (stat, percent)
        })
        .collect()
}

fn describe_drift(item: &DriftItem) -> String {
    match &item.declared {
        Some(declared) => format!(
            "{}: declared \"{declared}\", detected \"{}\"",
            item.field,
            or_none(item.actual.as_deref())
        ),
        None => format!(
            "{}: not declared, detected \"{}\"",
            item.field,
            or_none(item.actual.as_deref())
        ),
    }
}

fn append_findings(output: &mut String, findings: &[Finding]) {
    if findings.is_empty() {
        let _ = writeln!(output, "### Findings\nNo findings.\n");
        return;
    }
    let _ = writeln!(output, "### Findings");
    for finding in findings {
        let _ = writeln!(
            output,
            "- **{}** ({}): {}",
            finding.severity, finding.category, finding.message
        );
    }
    let _ = writeln!(output);
}

fn append_drift(output: &mut String, items: &[DriftItem]) {
    if items.is_empty() {
        let _ = writeln!(output, "### Drift\nNo drift detected.\n");
        return;
    }
    let _ = writeln!(output, "### Drift");
    for item in items {
        let _ = writeln!(output, "- {}", describe_drift(item));
    }
    let _ = writeln!(output);
}

fn or_none(value: Option<&str>) -> &str {
    value.unwrap_or(NONE)
}

fn join_or_none<'a, I>(values: I) -> String
where
    I: IntoIterator<Item = &'a String>,
{
    let joined: Vec<&str> = values.into_iter().map(String::as_str).collect();
    if joined.is_empty() {
        NONE.to_string()
    } else {
        joined.join(", ")
    }
}
