//! Document generation: fingerprint + preset + overrides -> text.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use chrono::NaiveDate;
use log::{debug, info};

use crate::domain::{LanguageStat, Preset, ProjectFingerprint};
use crate::error::Result;
use crate::rules::{install_command, lint_command, test_command};
use crate::template::{Bindings, render};

/// Text used for an absent single value or an empty inline set.
pub const NONE: &str = "none";

/// Bullet emitted for an empty list.
pub const EMPTY_LIST: &str = "- None detected.";

/// Name used when neither the caller nor the manifests name the project.
pub const DEFAULT_PROJECT_NAME: &str = "project";

/// Caller-supplied values that take precedence over detected metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Project name.
    pub project_name: Option<String>,
    /// One-line description.
    pub description: Option<String>,
    /// Project version.
    pub version: Option<String>,
    /// Date written as the last-updated fact; omitted when `None`.
    pub generated_on: Option<NaiveDate>,
    /// Extra placeholder values for custom templates.
    pub extra: BTreeMap<String, String>,
}

/// Render `preset` for `fingerprint`.
///
/// Fails with a configuration error when the template is malformed or names a
/// placeholder nothing binds. Identical inputs give identical output.
pub fn generate(
    fingerprint: &ProjectFingerprint,
    preset: &Preset,
    overrides: &Overrides,
) -> Result<String> {
    let bindings = bindings(fingerprint, preset, overrides);
    let document = render(&preset.template, &bindings)?;
    info!(
        "generated {} bytes with preset {}",
        document.len(),
        preset.id
    );
    Ok(document)
}

/// Bind every built-in placeholder plus the caller's extras.
pub fn bindings(fingerprint: &ProjectFingerprint, preset: &Preset, overrides: &Overrides) -> Bindings {
    let mut bindings = Bindings::new();
    for (name, value) in &overrides.extra {
        debug!("binding extra placeholder {name}");
        bindings.set(name, Some(value.clone()));
    }

    let metadata = &fingerprint.metadata;
    let pick = |over: &Option<String>, detected: &Option<String>| {
        over.clone()
            .or_else(|| detected.clone())
            .filter(|value| !value.trim().is_empty())
    };
    bindings
        .set_or(
            "PROJECT_NAME",
            pick(&overrides.project_name, &metadata.name),
            DEFAULT_PROJECT_NAME,
        )
        .set("DESCRIPTION", pick(&overrides.description, &metadata.description))
        .set("VERSION", pick(&overrides.version, &metadata.version))
        .set(
            "GENERATED_ON",
            overrides
                .generated_on
                .map(|date| date.format("%Y-%m-%d").to_string()),
        )
        .set("PRESET_ID", Some(preset.id.clone()))
        .set_or(
            "LANGUAGE",
            fingerprint.primary_language().map(str::to_string),
            NONE,
        )
        .set("LANGUAGES", Some(language_list(&fingerprint.languages)))
        .set_or("FRAMEWORK", fingerprint.framework.clone(), NONE)
        .set_or("PACKAGE_MANAGER", fingerprint.package_manager.clone(), NONE)
        .set("LINTERS", Some(inline_set(&fingerprint.linters)))
        .set("TEST_FRAMEWORKS", Some(inline_set(&fingerprint.test_frameworks)))
        .set_or("CI", fingerprint.ci_system.clone(), NONE)
        .set("FILE_COUNT", Some(fingerprint.file_count.to_string()))
        .set("TOTAL_LINES", Some(fingerprint.total_lines.to_string()))
        .set("COMMANDS", Some(bullets(&commands(fingerprint))))
        .set("STANDARDS", Some(bullets(&preset.standards)))
        .set("ANTI_PATTERNS", Some(bullets(&preset.anti_patterns)))
        .set(
            "FRAMEWORK_CONVENTIONS",
            Some(bullets(&preset.framework_conventions)),
        );
    bindings
}

/// Commands for the detected tools: install first, then tests, then linters.
pub fn commands(fingerprint: &ProjectFingerprint) -> Vec<String> {
    let mut commands = Vec::new();
    if let Some(manager) = fingerprint.package_manager.as_deref()
        && let Some(command) = install_command(manager)
    {
        commands.push(format!("Install dependencies: `{command}`"));
    }
    for framework in &fingerprint.test_frameworks {
        if let Some(command) = test_command(framework) {
            commands.push(format!("Run tests ({framework}): `{command}`"));
        }
    }
    for linter in &fingerprint.linters {
        if let Some(command) = lint_command(linter) {
            commands.push(format!("Lint ({linter}): `{command}`"));
        }
    }
    commands
}

fn language_list(languages: &[LanguageStat]) -> String {
    let items: Vec<String> = languages
        .iter()
        .map(|stat| format!("{}: {} files, {} lines", stat.name, stat.files, stat.lines))
        .collect();
    bullets(&items)
}

fn inline_set(values: &BTreeSet<String>) -> String {
    if values.is_empty() {
        return NONE.to_string();
    }
    values
        .iter()
        .map(|value| format!("`{value}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn bullets(items: &[String]) -> String {
    if items.is_empty() {
        return EMPTY_LIST.to_string();
    }
    let mut output = String::new();
    for item in items {
        let _ = writeln!(output, "- {item}");
    }
    output.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProjectMetadata;
    use crate::error::ForgeError;

    fn preset(template: &str) -> Preset {
        Preset {
            id: "test".to_string(),
            target: "any".to_string(),
            summary: "test preset".to_string(),
            template: template.to_string(),
            standards: vec!["Use `ruff`.".to_string()],
            anti_patterns: Vec::new(),
            framework_conventions: Vec::new(),
        }
    }

    fn python_fingerprint() -> ProjectFingerprint {
        ProjectFingerprint {
            languages: vec![LanguageStat {
                name: "Python".to_string(),
                files: 3,
                lines: 120,
            }],
            framework: Some("fastapi".to_string()),
            package_manager: Some("pip".to_string()),
            linters: ["ruff".to_string(), "mypy".to_string()].into_iter().collect(),
            test_frameworks: ["pytest".to_string()].into_iter().collect(),
            file_count: 3,
            total_lines: 120,
            metadata: ProjectMetadata {
                name: Some("detected".to_string()),
                version: Some("0.3.0".to_string()),
                description: None,
            },
            ..ProjectFingerprint::default()
        }
    }

    #[test]
    fn overrides_win_over_metadata() {
        let overrides = Overrides {
            project_name: Some("demo".to_string()),
            ..Overrides::default()
        };
        let text = generate(
            &python_fingerprint(),
            &preset("{{PROJECT_NAME}} {{VERSION}}"),
            &overrides,
        )
        .expect("generate");
        assert_eq!(text, "demo 0.3.0");
    }

    #[test]
    fn absent_values_render_none_and_empty_lists_say_so() {
        let text = generate(
            &ProjectFingerprint::default(),
            &preset("{{FRAMEWORK}}|{{LINTERS}}|{{CI}}\n{{ANTI_PATTERNS}}"),
            &Overrides::default(),
        )
        .expect("generate");
        assert_eq!(text, "none|none|none\n- None detected.");
    }

    #[test]
    fn absent_description_outside_block_fails() {
        let error = generate(
            &ProjectFingerprint::default(),
            &preset("{{DESCRIPTION}}"),
            &Overrides::default(),
        )
        .expect_err("unresolved");
        assert!(matches!(error, ForgeError::UnresolvedPlaceholder(name) if name == "DESCRIPTION"));
    }

    #[test]
    fn extra_values_fill_custom_placeholders() {
        let mut overrides = Overrides::default();
        overrides
            .extra
            .insert("TEAM".to_string(), "platform".to_string());
        let text = generate(&python_fingerprint(), &preset("owned by {{TEAM}}"), &overrides)
            .expect("generate");
        assert_eq!(text, "owned by platform");
    }

    #[test]
    fn inline_sets_are_code_spans() {
        let text = generate(
            &python_fingerprint(),
            &preset("{{LINTERS}} / {{TEST_FRAMEWORKS}}"),
            &Overrides::default(),
        )
        .expect("generate");
        assert_eq!(text, "`mypy`, `ruff` / `pytest`");
    }

    #[test]
    fn generated_on_is_formatted_iso() {
        let overrides = Overrides {
            generated_on: NaiveDate::from_ymd_opt(2024, 3, 9),
            ..Overrides::default()
        };
        let text = generate(
            &python_fingerprint(),
            &preset("{{#generated_on}}updated {{GENERATED_ON}}{{/generated_on}}"),
            &overrides,
        )
        .expect("generate");
        assert_eq!(text, "updated 2024-03-09");
    }

    #[test]
    fn commands_follow_detected_tools() {
        let commands = commands(&python_fingerprint());
        assert_eq!(
            commands,
            vec![
                "Install dependencies: `pip install -r requirements.txt`".to_string(),
                "Run tests (pytest): `pytest`".to_string(),
                "Lint (mypy): `mypy .`".to_string(),
                "Lint (ruff): `ruff check .`".to_string(),
            ]
        );
    }

    #[test]
    fn output_is_deterministic() {
        let fingerprint = python_fingerprint();
        let preset = preset("{{LANGUAGES}}\n{{COMMANDS}}\n{{STANDARDS}}");
        let first = generate(&fingerprint, &preset, &Overrides::default()).expect("generate");
        let second = generate(&fingerprint, &preset, &Overrides::default()).expect("generate");
        assert_eq!(first, second);
        assert!(first.starts_with("- Python: 3 files, 120 lines\n"));
    }
}
