//! Manifest readers: dependency names and project metadata.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use log::debug;
use regex::Regex;
use serde_json::Value as JsonValue;
use toml::{Table, Value as TomlValue};

use crate::domain::ProjectMetadata;
use crate::evidence::{ManifestFile, Observations};

static REQUIREMENT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9][A-Za-z0-9._-]*)").expect("valid regex"));
static GEM_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*gem\s+['"]([^'"]+)['"]"#).expect("valid regex"));
static MAVEN_ARTIFACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<artifactId>\s*([^<\s]+)\s*</artifactId>").expect("valid regex"));
static GRADLE_COORDINATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"['"]([A-Za-z0-9._-]+):([A-Za-z0-9._-]+)(?::[^'"]*)?['"]"#).expect("valid regex")
});

const README_DESCRIPTION_LIMIT: usize = 200;

/// Declared dependency names grouped by ecosystem (`python`, `node`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
    by_ecosystem: BTreeMap<&'static str, BTreeSet<String>>,
}

impl Dependencies {
    /// Whether `name` is declared in `ecosystem`.
    pub fn contains(&self, ecosystem: &str, name: &str) -> bool {
        let name = normalize_name(ecosystem, name);
        self.by_ecosystem
            .get(ecosystem)
            .is_some_and(|names| names.contains(&name))
    }

    /// Whether `name` is declared in any ecosystem.
    pub fn contains_any(&self, name: &str) -> bool {
        self.by_ecosystem
            .keys()
            .any(|ecosystem| self.contains(ecosystem, name))
    }

    /// Names declared in one ecosystem.
    pub fn names(&self, ecosystem: &str) -> impl Iterator<Item = &str> {
        self.by_ecosystem
            .get(ecosystem)
            .into_iter()
            .flat_map(|names| names.iter().map(String::as_str))
    }

    fn extend<I: IntoIterator<Item = String>>(&mut self, ecosystem: &'static str, names: I) {
        let entry = self.by_ecosystem.entry(ecosystem).or_default();
        for name in names {
            let name = normalize_name(ecosystem, &name);
            if !name.is_empty() {
                entry.insert(name);
            }
        }
    }
}

/// Read every dependency declaration found in the observations.
pub fn dependencies(observations: &Observations) -> Dependencies {
    let mut deps = Dependencies::default();
    for manifest in &observations.manifests {
        match manifest.name.as_str() {
            "pyproject.toml" => deps.extend("python", pyproject_dependencies(manifest)),
            "Pipfile" => deps.extend("python", pipfile_dependencies(manifest)),
            "package.json" => deps.extend("node", package_json_dependencies(manifest)),
            "Cargo.toml" => deps.extend("rust", cargo_dependencies(manifest)),
            "go.mod" => deps.extend("go", go_mod_dependencies(&manifest.contents)),
            "Gemfile" => deps.extend("ruby", gemfile_dependencies(&manifest.contents)),
            "composer.json" => deps.extend("php", composer_dependencies(manifest)),
            "pom.xml" => deps.extend("jvm", maven_dependencies(&manifest.contents)),
            "build.gradle" | "build.gradle.kts" => {
                deps.extend("jvm", gradle_dependencies(&manifest.contents))
            }
            name if name.starts_with("requirements") => {
                deps.extend("python", requirements_dependencies(&manifest.contents))
            }
            _ => {}
        }
    }
    deps
}

/// Project name, version and description from root manifests, README as fallback.
pub fn project_metadata(observations: &Observations) -> ProjectMetadata {
    let mut metadata = ProjectMetadata::default();
    if let Some(manifest) = observations.root_manifest("pyproject.toml")
        && let Some(table) = parse_toml(manifest)
    {
        let project = table
            .get("project")
            .or_else(|| table.get("tool").and_then(|tool| tool.get("poetry")));
        fill_from_toml(&mut metadata, project);
    }
    if let Some(manifest) = observations.root_manifest("package.json")
        && let Some(json) = parse_json(manifest)
    {
        fill(&mut metadata.name, json.get("name").and_then(JsonValue::as_str));
        fill(&mut metadata.version, json.get("version").and_then(JsonValue::as_str));
        fill(
            &mut metadata.description,
            json.get("description").and_then(JsonValue::as_str),
        );
    }
    if let Some(manifest) = observations.root_manifest("Cargo.toml")
        && let Some(table) = parse_toml(manifest)
    {
        fill_from_toml(&mut metadata, table.get("package"));
    }
    if metadata.description.is_none() {
        metadata.description = ["README.md", "README.rst", "README.txt", "README"]
            .iter()
            .filter_map(|name| observations.root_manifest(name))
            .find_map(|readme| readme_description(&readme.contents));
    }
    metadata
}

fn fill_from_toml(metadata: &mut ProjectMetadata, table: Option<&TomlValue>) {
    let Some(table) = table else {
        return;
    };
    fill(&mut metadata.name, table.get("name").and_then(TomlValue::as_str));
    fill(&mut metadata.version, table.get("version").and_then(TomlValue::as_str));
    fill(
        &mut metadata.description,
        table.get("description").and_then(TomlValue::as_str),
    );
}

fn fill(slot: &mut Option<String>, value: Option<&str>) {
    if slot.is_none()
        && let Some(value) = value.map(str::trim).filter(|value| !value.is_empty())
    {
        *slot = Some(value.to_string());
    }
}

fn readme_description(text: &str) -> Option<String> {
    text.split("\n\n")
        .map(str::trim)
        .find(|paragraph| {
            !paragraph.is_empty()
                && !paragraph.starts_with('#')
                && !paragraph.starts_with('=')
                && !paragraph.starts_with("[![")
                && !paragraph.starts_with('<')
        })
        .map(|paragraph| {
            let flat = paragraph.split_whitespace().collect::<Vec<_>>().join(" ");
            flat.chars().take(README_DESCRIPTION_LIMIT).collect()
        })
}

fn normalize_name(ecosystem: &str, name: &str) -> String {
    let name = name.trim();
    match ecosystem {
        "python" => name.to_lowercase().replace('_', "-"),
        "ruby" | "php" | "jvm" => name.to_lowercase(),
        _ => name.to_string(),
    }
}

fn parse_toml(manifest: &ManifestFile) -> Option<Table> {
    match toml::from_str::<Table>(&manifest.contents) {
        Ok(table) => Some(table),
        Err(err) => {
            debug!("cannot parse {}: {err}", manifest.relative.display());
            None
        }
    }
}

fn parse_json(manifest: &ManifestFile) -> Option<JsonValue> {
    match serde_json::from_str(&manifest.contents) {
        Ok(value) => Some(value),
        Err(err) => {
            debug!("cannot parse {}: {err}", manifest.relative.display());
            None
        }
    }
}

fn requirement_name(spec: &str) -> Option<String> {
    REQUIREMENT_NAME
        .captures(spec.trim())
        .map(|captures| captures[1].to_string())
}

fn requirements_dependencies(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty() && !line.starts_with('-'))
        .filter_map(requirement_name)
        .collect()
}

fn pyproject_dependencies(manifest: &ManifestFile) -> Vec<String> {
    let Some(table) = parse_toml(manifest) else {
        return Vec::new();
    };
    let mut names = Vec::new();
    if let Some(project) = table.get("project") {
        names.extend(string_array(project.get("dependencies")));
        if let Some(optional) = project
            .get("optional-dependencies")
            .and_then(TomlValue::as_table)
        {
            for group in optional.values() {
                names.extend(string_array(Some(group)));
            }
        }
    }
    if let Some(groups) = table.get("dependency-groups").and_then(TomlValue::as_table) {
        for group in groups.values() {
            names.extend(string_array(Some(group)));
        }
    }
    if let Some(poetry) = table.get("tool").and_then(|tool| tool.get("poetry")) {
        names.extend(table_keys(poetry.get("dependencies")));
        names.extend(table_keys(poetry.get("dev-dependencies")));
        if let Some(groups) = poetry.get("group").and_then(TomlValue::as_table) {
            for group in groups.values() {
                names.extend(table_keys(group.get("dependencies")));
            }
        }
    }
    names.retain(|name| name != "python");
    names
}

fn string_array(value: Option<&TomlValue>) -> Vec<String> {
    value
        .and_then(TomlValue::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(TomlValue::as_str)
                .filter_map(requirement_name)
                .collect()
        })
        .unwrap_or_default()
}

fn table_keys(value: Option<&TomlValue>) -> Vec<String> {
    value
        .and_then(TomlValue::as_table)
        .map(|table| table.keys().cloned().collect())
        .unwrap_or_default()
}

fn pipfile_dependencies(manifest: &ManifestFile) -> Vec<String> {
    let Some(table) = parse_toml(manifest) else {
        return Vec::new();
    };
    let mut names = table_keys(table.get("packages"));
    names.extend(table_keys(table.get("dev-packages")));
    names
}

fn json_keys(json: &JsonValue, fields: &[&str]) -> Vec<String> {
    fields
        .iter()
        .filter_map(|field| json.get(*field).and_then(JsonValue::as_object))
        .flat_map(|object| object.keys().cloned())
        .collect()
}

fn package_json_dependencies(manifest: &ManifestFile) -> Vec<String> {
    parse_json(manifest)
        .map(|json| {
            json_keys(
                &json,
                &[
                    "dependencies",
                    "devDependencies",
                    "peerDependencies",
                    "optionalDependencies",
                ],
            )
        })
        .unwrap_or_default()
}

fn composer_dependencies(manifest: &ManifestFile) -> Vec<String> {
    parse_json(manifest)
        .map(|json| json_keys(&json, &["require", "require-dev"]))
        .unwrap_or_default()
}

fn cargo_dependencies(manifest: &ManifestFile) -> Vec<String> {
    let Some(table) = parse_toml(manifest) else {
        return Vec::new();
    };
    let mut names = table_keys(table.get("dependencies"));
    names.extend(table_keys(table.get("dev-dependencies")));
    names.extend(table_keys(
        table.get("workspace").and_then(|workspace| workspace.get("dependencies")),
    ));
    names
}

fn go_mod_dependencies(contents: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut in_block = false;
    for line in contents.lines() {
        let line = line.split("//").next().unwrap_or_default().trim();
        if in_block {
            if line.starts_with(')') {
                in_block = false;
            } else if let Some(module) = line.split_whitespace().next() {
                names.push(module.to_string());
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("require") {
            let rest = rest.trim();
            if rest.starts_with('(') {
                in_block = true;
            } else if let Some(module) = rest.split_whitespace().next() {
                names.push(module.to_string());
            }
        }
    }
    names
}

fn gemfile_dependencies(contents: &str) -> Vec<String> {
    contents
        .lines()
        .filter_map(|line| GEM_NAME.captures(line).map(|captures| captures[1].to_string()))
        .collect()
}

fn maven_dependencies(contents: &str) -> Vec<String> {
    MAVEN_ARTIFACT
        .captures_iter(contents)
        .map(|captures| captures[1].to_string())
        .collect()
}

fn gradle_dependencies(contents: &str) -> Vec<String> {
    GRADLE_COORDINATE
        .captures_iter(contents)
        .map(|captures| captures[2].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn manifest(relative: &str, contents: &str) -> ManifestFile {
        let relative = PathBuf::from(relative);
        ManifestFile {
            path: PathBuf::from("/repo").join(&relative),
            name: relative
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default()
                .to_string(),
            relative,
            contents: contents.to_string(),
        }
    }

    fn observations(manifests: Vec<ManifestFile>) -> Observations {
        Observations {
            root: PathBuf::from("/repo"),
            manifests,
            ..Observations::default()
        }
    }

    #[test]
    fn requirements_strip_specifiers_and_comments() {
        let names = requirements_dependencies(
            "# web\nFastAPI>=0.110\nuvicorn[standard]==0.29 ; python_version > '3.8'\n-r dev.txt\n\n",
        );
        assert_eq!(names, vec!["FastAPI".to_string(), "uvicorn".to_string()]);
    }

    #[test]
    fn python_names_are_normalized() {
        let obs = observations(vec![manifest("requirements.txt", "Django_REST_framework\n")]);
        let deps = dependencies(&obs);
        assert!(deps.contains("python", "django-rest-framework"));
        assert!(deps.contains_any("Django_Rest_Framework"));
    }

    #[test]
    fn pyproject_reads_pep621_and_poetry() {
        let obs = observations(vec![manifest(
            "pyproject.toml",
            r#"
[project]
name = "demo"
version = "1.2.0"
dependencies = ["flask>=3", "sqlalchemy"]

[project.optional-dependencies]
dev = ["pytest>=8"]

[tool.poetry.dependencies]
python = "^3.11"
celery = "*"
"#,
        )]);
        let deps = dependencies(&obs);
        let names: Vec<&str> = deps.names("python").collect();
        assert_eq!(names, vec!["celery", "flask", "pytest", "sqlalchemy"]);
    }

    #[test]
    fn package_json_collects_all_dependency_tables() {
        let obs = observations(vec![manifest(
            "package.json",
            r#"{"name":"web","dependencies":{"next":"14"},"devDependencies":{"jest":"29"}}"#,
        )]);
        let deps = dependencies(&obs);
        assert!(deps.contains("node", "next"));
        assert!(deps.contains("node", "jest"));
        assert!(!deps.contains("python", "jest"));
    }

    #[test]
    fn go_mod_reads_single_and_block_requires() {
        let names = go_mod_dependencies(
            "module example.com/app\n\nrequire github.com/labstack/echo/v4 v4.11.0\n\nrequire (\n\tgithub.com/gin-gonic/gin v1.9.1 // indirect\n)\n",
        );
        assert_eq!(
            names,
            vec![
                "github.com/labstack/echo/v4".to_string(),
                "github.com/gin-gonic/gin".to_string()
            ]
        );
    }

    #[test]
    fn gemfile_maven_and_gradle() {
        assert_eq!(
            gemfile_dependencies("source 'https://rubygems.org'\ngem 'rails', '~> 7.1'\n"),
            vec!["rails".to_string()]
        );
        assert_eq!(
            maven_dependencies("<artifactId>spring-boot-starter-web</artifactId>"),
            vec!["spring-boot-starter-web".to_string()]
        );
        assert_eq!(
            gradle_dependencies("implementation 'org.springframework.boot:spring-boot-starter:3.2.0'"),
            vec!["spring-boot-starter".to_string()]
        );
    }

    #[test]
    fn malformed_manifests_are_ignored() {
        let obs = observations(vec![
            manifest("package.json", "{ not json"),
            manifest("Cargo.toml", "[package\nname ="),
        ]);
        let deps = dependencies(&obs);
        assert_eq!(deps.names("node").count(), 0);
        assert_eq!(project_metadata(&obs), ProjectMetadata::default());
    }

    #[test]
    fn metadata_prefers_pyproject_then_readme() {
        let obs = observations(vec![
            manifest(
                "pyproject.toml",
                "[project]\nname = \"demo\"\nversion = \"0.3.1\"\n",
            ),
            manifest(
                "README.md",
                "# Demo\n\n[![ci](badge.svg)](x)\n\nA small   service\nfor demos.\n",
            ),
        ]);
        let metadata = project_metadata(&obs);
        assert_eq!(metadata.name.as_deref(), Some("demo"));
        assert_eq!(metadata.version.as_deref(), Some("0.3.1"));
        assert_eq!(
            metadata.description.as_deref(),
            Some("A small service for demos.")
        );
    }

    #[test]
    fn nested_manifests_do_not_provide_metadata() {
        let obs = observations(vec![manifest(
            "packages/web/package.json",
            r#"{"name":"web","version":"2.0.0"}"#,
        )]);
        assert_eq!(project_metadata(&obs).name, None);
    }
}
