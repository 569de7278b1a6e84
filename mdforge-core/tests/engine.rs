use chrono::NaiveDate;
use mdforge_core::{
    CancelFlag, DriftField, LanguageStat, Overrides, PresetRegistry, ProjectFingerprint,
    REQUIRED_SECTIONS, Scanner, Severity, StdFileSystem, audit, diff, generate, parse, score,
};
use std::fs;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date")
}

fn fastapi_fingerprint() -> ProjectFingerprint {
    ProjectFingerprint {
        languages: vec![
            LanguageStat {
                name: "Python".to_string(),
                files: 12,
                lines: 840,
            },
            LanguageStat {
                name: "Shell".to_string(),
                files: 1,
                lines: 20,
            },
        ],
        framework: Some("fastapi".to_string()),
        package_manager: Some("pip".to_string()),
        linters: ["ruff".to_string()].into_iter().collect(),
        test_frameworks: ["pytest".to_string()].into_iter().collect(),
        ci_system: Some("github-actions".to_string()),
        file_count: 13,
        total_lines: 860,
        ..ProjectFingerprint::default()
    }
}

fn overrides() -> Overrides {
    Overrides {
        project_name: Some("demo".to_string()),
        version: Some("1.2.0".to_string()),
        generated_on: Some(today()),
        ..Overrides::default()
    }
}

/// Body text between `## heading` and the next level-2 heading.
fn rendered_body<'a>(text: &'a str, heading: &str) -> &'a str {
    let marker = format!("## {heading}\n");
    let start = text.find(&marker).expect("heading rendered") + marker.len();
    let end = text[start..]
        .find("\n## ")
        .map_or(text.len(), |offset| start + offset + 1);
    &text[start..end]
}

fn generated(fingerprint: &ProjectFingerprint) -> String {
    let registry = PresetRegistry::embedded().expect("bundle");
    let preset = registry.suggest(fingerprint);
    generate(fingerprint, preset, &overrides()).expect("generate")
}

#[test]
fn generation_is_deterministic() {
    let fingerprint = fastapi_fingerprint();
    assert_eq!(generated(&fingerprint), generated(&fingerprint));
}

#[test]
fn generated_brief_parses_back_without_drift() {
    let fingerprint = fastapi_fingerprint();
    let text = generated(&fingerprint);
    let document = parse(&text);

    assert_eq!(document.title.as_deref(), Some("demo"));
    for heading in REQUIRED_SECTIONS {
        let section = document.section(heading).expect("required section");
        assert_eq!(section.body, rendered_body(&text, heading), "{heading} body differs");
        assert!(!section.body.trim().is_empty(), "{heading} is empty");
    }
    assert_eq!(parse(&generated(&fingerprint)).sections, document.sections);
    assert_eq!(document.facts.language.as_deref(), Some("Python"));
    assert_eq!(document.facts.framework.as_deref(), Some("fastapi"));
    assert!(document.anomalies.is_empty());
    assert!(diff(&document, &fingerprint).is_empty());

    let result = audit(&document, &fingerprint, today());
    assert!(result.score >= 80, "score was {}", result.score);
    assert!(
        result
            .findings
            .iter()
            .all(|finding| finding.severity != Severity::Missing)
    );
}

#[test]
fn fastapi_preset_names_the_project_and_framework() {
    let registry = PresetRegistry::embedded().expect("bundle");
    let preset = registry.lookup("python-fastapi").expect("preset");
    let text = generate(&fastapi_fingerprint(), preset, &overrides()).expect("generate");
    assert!(text.starts_with("# demo\n"));
    assert!(text.contains("**Framework**: `fastapi`"));
    let conventions = rendered_body(&text, "Framework Conventions");
    assert!(conventions.contains("`HTTPException`"));
    assert!(!text.contains("Next.js"));
    assert!(!text.contains("next/link"));
}

#[test]
fn framework_section_is_omitted_without_a_framework() {
    let fingerprint = ProjectFingerprint {
        framework: None,
        ..fastapi_fingerprint()
    };
    let registry = PresetRegistry::embedded().expect("bundle");
    let preset = registry.suggest(&fingerprint);
    assert_eq!(preset.id, "python");

    let text = generate(&fingerprint, preset, &overrides()).expect("generate");
    assert!(!text.contains("## Framework Conventions"));
    assert!(text.contains("**Framework**: `none`"));
    let document = parse(&text);
    assert!(document.section("Framework Conventions").is_none());
    for heading in REQUIRED_SECTIONS {
        assert!(document.section(heading).is_some(), "{heading} missing");
    }
    assert!(diff(&document, &fingerprint).is_empty());
}

#[test]
fn adding_sections_never_lowers_the_score() {
    let fingerprint = fastapi_fingerprint();
    let text = generated(&fingerprint);
    let mut cuts: Vec<usize> = text.match_indices("\n## ").map(|(index, _)| index + 1).collect();
    cuts.push(text.len());

    let mut previous = score(&parse(""), &fingerprint, today()).score;
    for cut in cuts {
        let current = score(&parse(&text[..cut]), &fingerprint, today()).score;
        assert!(current >= previous, "{current} < {previous} at byte {cut}");
        previous = current;
    }
}

#[test]
fn auditing_twice_gives_the_same_result() {
    let fingerprint = fastapi_fingerprint();
    let document = parse(&generated(&fingerprint));
    assert_eq!(
        audit(&document, &fingerprint, today()),
        audit(&document, &fingerprint, today())
    );
}

#[test]
fn drift_reports_each_changed_field_both_ways() {
    let before = fastapi_fingerprint();
    let after = ProjectFingerprint {
        framework: Some("flask".to_string()),
        ci_system: None,
        ..fastapi_fingerprint()
    };
    let document = parse(&generated(&before));

    let items = diff(&document, &after);
    let fields: Vec<DriftField> = items.iter().map(|item| item.field).collect();
    assert_eq!(fields, vec![DriftField::Framework, DriftField::CiSystem]);
    assert_eq!(items[0].declared.as_deref(), Some("fastapi"));
    assert_eq!(items[0].actual.as_deref(), Some("flask"));
    assert_eq!(items[1].actual, None);

    let reverse = diff(&parse(&generated(&after)), &before);
    let fields: Vec<DriftField> = reverse.iter().map(|item| item.field).collect();
    assert_eq!(fields, vec![DriftField::Framework, DriftField::CiSystem]);
}

#[test]
fn empty_document_scores_zero() {
    let result = audit(&parse(""), &fastapi_fingerprint(), today());
    assert_eq!(result.score, 0);
    let missing = result
        .findings
        .iter()
        .filter(|finding| finding.severity == Severity::Missing)
        .count();
    assert_eq!(missing, REQUIRED_SECTIONS.len());
}

#[test]
fn declared_language_mismatch_is_a_single_drift_item() {
    let fingerprint = ProjectFingerprint {
        languages: vec![LanguageStat {
            name: "Python".to_string(),
            files: 2,
            lines: 40,
        }],
        file_count: 2,
        total_lines: 40,
        ..ProjectFingerprint::default()
    };
    let document = parse("# demo\n\n## Tech Stack\n\n**Language**: JavaScript\n");

    let items = diff(&document, &fingerprint);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].field, DriftField::Language);
    assert_eq!(items[0].declared.as_deref(), Some("JavaScript"));
    assert_eq!(items[0].actual.as_deref(), Some("Python"));
}

#[test]
fn scans_a_fastapi_tree_on_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    fs::write(
        root.join("main.py"),
        "from fastapi import FastAPI\n\napp = FastAPI()\n\n\n@app.get(\"/\")\ndef index():\n    return {}\n",
    )
    .expect("write main.py");
    fs::write(root.join("requirements.txt"), "fastapi\npytest\n").expect("write requirements");
    fs::create_dir_all(root.join("node_modules/left-pad")).expect("create node_modules");
    fs::write(root.join("node_modules/left-pad/index.js"), "module.exports = 1;\n")
        .expect("write vendored js");

    let fingerprint = Scanner::new(StdFileSystem::new())
        .scan(root, &CancelFlag::new())
        .expect("scan");
    assert_eq!(
        fingerprint.languages,
        vec![LanguageStat {
            name: "Python".to_string(),
            files: 1,
            lines: 8,
        }]
    );
    assert_eq!(fingerprint.framework.as_deref(), Some("fastapi"));
    assert_eq!(fingerprint.package_manager.as_deref(), Some("pip"));
    assert!(fingerprint.test_frameworks.contains("pytest"));

    let registry = PresetRegistry::embedded().expect("bundle");
    assert_eq!(registry.suggest(&fingerprint).id, "python-fastapi");
}

#[test]
fn cancelled_scan_stops() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("main.py"), "print('hi')\n").expect("write");
    let cancel = CancelFlag::new();
    cancel.cancel();
    let result = Scanner::new(StdFileSystem::new()).scan(dir.path(), &cancel);
    assert!(matches!(result, Err(mdforge_core::ForgeError::Cancelled)));
}
