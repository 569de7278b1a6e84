//! Fingerprint resolution: observations in, [`ProjectFingerprint`] out.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::domain::{LanguageStat, ProjectFingerprint};
use crate::evidence::Observations;
use crate::languages::{is_markup, language_of};
use crate::manifest::{dependencies, project_metadata};
use crate::rules::{
    CI_RULES, FRAMEWORK_RULES, LINTER_RULES, PACKAGE_MANAGER_RULES, Rule, RuleContext,
    TEST_FRAMEWORK_RULES,
};

/// Resolve a fingerprint from collected observations.
///
/// Each category resolves on its own from the same evidence, so the result is
/// independent of evaluation order and identical for identical observations.
pub fn resolve(observations: &Observations) -> ProjectFingerprint {
    let languages = rank_languages(observations);
    let deps = dependencies(observations);
    let context = RuleContext::new(observations, &deps);

    let fingerprint = ProjectFingerprint {
        file_count: languages.iter().map(|stat| stat.files).sum(),
        total_lines: languages.iter().map(|stat| stat.lines).sum(),
        framework: detect_framework(&context, &languages),
        package_manager: first_match(&context, PACKAGE_MANAGER_RULES),
        linters: all_matches(&context, LINTER_RULES),
        test_frameworks: all_matches(&context, TEST_FRAMEWORK_RULES),
        ci_system: first_match(&context, CI_RULES),
        metadata: project_metadata(observations),
        warnings: observations.warnings.clone(),
        languages,
    };
    debug!("resolved fingerprint: {fingerprint:?}");
    fingerprint
}

/// Aggregate per-language totals and rank them.
///
/// Order: programming languages before markup, then lines descending, then
/// files descending, then name ascending.
pub fn rank_languages(observations: &Observations) -> Vec<LanguageStat> {
    let mut totals: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for file in &observations.files {
        let Some(language) = language_of(file) else {
            continue;
        };
        let entry = totals.entry(language).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += file.lines.unwrap_or(0);
    }

    let mut languages: Vec<LanguageStat> = totals
        .into_iter()
        .map(|(name, (files, lines))| LanguageStat { name, files, lines })
        .collect();
    languages.sort_by(|a, b| {
        is_markup(&a.name)
            .cmp(&is_markup(&b.name))
            .then(b.lines.cmp(&a.lines))
            .then(b.files.cmp(&a.files))
            .then(a.name.cmp(&b.name))
    });
    languages
}

/// First framework rule matching a present language, visiting languages by rank.
pub fn detect_framework(context: &RuleContext<'_>, languages: &[LanguageStat]) -> Option<String> {
    languages.iter().find_map(|stat| {
        FRAMEWORK_RULES
            .iter()
            .find(|rule| context.matches_framework(rule, &stat.name))
            .map(|rule| rule.framework.to_string())
    })
}

fn first_match(context: &RuleContext<'_>, rules: &[Rule]) -> Option<String> {
    rules
        .iter()
        .find(|rule| context.matches(rule))
        .map(|rule| rule.value.to_string())
}

fn all_matches(context: &RuleContext<'_>, rules: &[Rule]) -> BTreeSet<String> {
    rules
        .iter()
        .filter(|rule| context.matches(rule))
        .map(|rule| rule.value.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{rank_languages, resolve};
    use crate::domain::LanguageStat;
    use crate::evidence::{FileObservation, ManifestFile, Observations};
    use std::path::PathBuf;

    fn file(path: &str, lines: usize) -> FileObservation {
        FileObservation {
            path: PathBuf::from("/repo").join(path),
            relative: PathBuf::from(path),
            extension: path
                .rsplit_once('.')
                .map(|(_, ext)| ext.to_lowercase())
                .filter(|ext| !ext.contains('/'))
                .unwrap_or_default(),
            size: lines as u64 * 10,
            lines: Some(lines),
            interpreter: None,
        }
    }

    fn script(path: &str, lines: usize, interpreter: &str) -> FileObservation {
        FileObservation {
            interpreter: Some(interpreter.to_string()),
            ..file(path, lines)
        }
    }

    fn manifest(path: &str, contents: &str) -> ManifestFile {
        ManifestFile {
            path: PathBuf::from("/repo").join(path),
            relative: PathBuf::from(path),
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            contents: contents.to_string(),
        }
    }

    fn observations(files: Vec<FileObservation>, manifests: Vec<ManifestFile>) -> Observations {
        Observations {
            root: PathBuf::from("/repo"),
            files,
            manifests,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn ranks_by_lines_then_files_then_name() {
        let obs = observations(
            vec![
                file("a.py", 10),
                file("b.py", 10),
                file("main.go", 20),
                file("lib.rs", 20),
                file("x.rb", 5),
            ],
            Vec::new(),
        );
        let ranked = rank_languages(&obs);
        let names: Vec<&str> = ranked.iter().map(|stat| stat.name.as_str()).collect();
        assert_eq!(names, vec!["Python", "Go", "Rust", "Ruby"]);
        assert_eq!(ranked[0].files, 2);
        assert_eq!(ranked[0].lines, 20);
    }

    #[test]
    fn markup_never_outranks_code() {
        let obs = observations(
            vec![file("index.html", 500), file("style.css", 300), file("app.py", 5)],
            Vec::new(),
        );
        let ranked = rank_languages(&obs);
        assert_eq!(ranked[0].name, "Python");
        assert_eq!(ranked[1].name, "HTML");
    }

    #[test]
    fn markup_only_tree_still_has_languages() {
        let obs = observations(vec![file("index.html", 5)], Vec::new());
        let fingerprint = resolve(&obs);
        assert_eq!(fingerprint.primary_language(), Some("HTML"));
    }

    #[test]
    fn fastapi_project_fingerprint() {
        let obs = observations(
            vec![file("main.py", 50), file("requirements.txt", 1)],
            vec![manifest("requirements.txt", "fastapi\n")],
        );
        let fingerprint = resolve(&obs);
        assert_eq!(fingerprint.languages.len(), 1);
        assert_eq!(fingerprint.languages[0].name, "Python");
        assert_eq!(fingerprint.languages[0].files, 1);
        assert_eq!(fingerprint.languages[0].lines, 50);
        assert_eq!(fingerprint.framework.as_deref(), Some("fastapi"));
        assert_eq!(fingerprint.package_manager.as_deref(), Some("pip"));
        assert_eq!(fingerprint.file_count, 1);
        assert_eq!(fingerprint.total_lines, 50);
        assert!(fingerprint.linters.is_empty());
        assert!(fingerprint.ci_system.is_none());
    }

    #[test]
    fn framework_must_belong_to_a_present_language() {
        let obs = observations(
            vec![file("main.py", 10), file("package.json", 3)],
            vec![manifest("package.json", r#"{"dependencies":{"react":"18"}}"#)],
        );
        let fingerprint = resolve(&obs);
        assert_eq!(fingerprint.framework, None);
    }

    #[test]
    fn nextjs_wins_over_react() {
        let obs = observations(
            vec![file("app/page.tsx", 40), file("package.json", 5), file("pnpm-lock.yaml", 9)],
            vec![manifest(
                "package.json",
                r#"{"dependencies":{"next":"14","react":"18"},"devDependencies":{"eslint":"8","vitest":"1"}}"#,
            )],
        );
        let fingerprint = resolve(&obs);
        assert_eq!(fingerprint.primary_language(), Some("TypeScript"));
        assert_eq!(fingerprint.framework.as_deref(), Some("nextjs"));
        assert_eq!(fingerprint.package_manager.as_deref(), Some("pnpm"));
        assert!(fingerprint.linters.contains("eslint"));
        assert!(fingerprint.test_frameworks.contains("vitest"));
    }

    #[test]
    fn multiple_linters_and_ci() {
        let obs = observations(
            vec![
                file("src/app.py", 30),
                file("pyproject.toml", 6),
                file("poetry.lock", 100),
                file("conftest.py", 3),
                file(".github/workflows/test.yml", 20),
                file(".gitlab-ci.yml", 10),
            ],
            vec![manifest(
                "pyproject.toml",
                "[tool.ruff]\nline-length = 100\n\n[tool.mypy]\nstrict = true\n",
            )],
        );
        let fingerprint = resolve(&obs);
        let linters: Vec<&str> = fingerprint.linters.iter().map(String::as_str).collect();
        assert_eq!(linters, vec!["mypy", "ruff"]);
        assert!(fingerprint.test_frameworks.contains("pytest"));
        assert_eq!(fingerprint.package_manager.as_deref(), Some("poetry"));
        assert_eq!(fingerprint.ci_system.as_deref(), Some("github-actions"));
    }

    #[test]
    fn resolution_is_deterministic() {
        let obs = observations(
            vec![file("a.ts", 10), file("b.js", 10), file("package.json", 3)],
            vec![manifest("package.json", "{}")],
        );
        assert_eq!(resolve(&obs), resolve(&obs));
        let names: Vec<String> = resolve(&obs)
            .languages
            .into_iter()
            .map(|stat| stat.name)
            .collect();
        assert_eq!(names, vec!["JavaScript".to_string(), "TypeScript".to_string()]);
    }

    #[test]
    fn shebang_scripts_count_without_reading_the_tree() {
        let obs = observations(
            vec![script("bin/run", 3, "python3"), file("bin/notes", 7)],
            Vec::new(),
        );
        let fingerprint = resolve(&obs);
        assert_eq!(
            fingerprint.languages,
            vec![LanguageStat {
                name: "Python".to_string(),
                files: 1,
                lines: 3,
            }]
        );
        assert_eq!(resolve(&obs), fingerprint);
    }
}
