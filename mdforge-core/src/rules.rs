//! Detection rule tables.
//!
//! Every category is an ordered table of `evidence -> value` rules. A rule
//! matches when any one of its evidence predicates holds. Tables never consult
//! each other; they all read the same [`RuleContext`].

use glob::Pattern;

use crate::evidence::Observations;
use crate::languages::ecosystem_of;
use crate::manifest::Dependencies;

/// A single observable fact a rule can test for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evidence {
    /// A dependency with this exact name is declared.
    Dependency(&'static str),
    /// A dependency whose name starts with this prefix is declared.
    DependencyPrefix(&'static str),
    /// A file with exactly this name exists anywhere in the tree.
    File(&'static str),
    /// A file whose name matches this glob exists anywhere in the tree.
    FileGlob(&'static str),
    /// A file exists under this relative directory prefix.
    PathPrefix(&'static str),
    /// A manifest with this name contains the given text.
    ManifestSection(&'static str, &'static str),
}

/// A rule that yields `value` when any evidence matches.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// Value reported on a match.
    pub value: &'static str,
    /// Alternative evidence; one match is enough.
    pub evidence: &'static [Evidence],
}

/// A framework rule, scoped to the languages the framework belongs to.
#[derive(Debug, Clone, Copy)]
pub struct FrameworkRule {
    /// Languages the framework is written in.
    pub languages: &'static [&'static str],
    /// Framework id reported on a match.
    pub framework: &'static str,
    /// Alternative evidence; dependencies are looked up in the language's ecosystem.
    pub evidence: &'static [Evidence],
}

use Evidence::{Dependency, DependencyPrefix, File, FileGlob, ManifestSection, PathPrefix};

const PYTHON: &[&str] = &["Python"];
const JS: &[&str] = &["TypeScript", "JavaScript", "Vue", "Svelte"];
const RUST: &[&str] = &["Rust"];
const GO: &[&str] = &["Go"];
const RUBY: &[&str] = &["Ruby"];
const PHP: &[&str] = &["PHP"];
const JVM: &[&str] = &["Java", "Kotlin", "Scala"];

/// Framework rules; first match per language wins, so specific frameworks
/// (Next.js) come before the libraries they build on (React).
#[rustfmt::skip]
pub const FRAMEWORK_RULES: &[FrameworkRule] = &[
    FrameworkRule { languages: PYTHON, framework: "django", evidence: &[Dependency("django"), File("manage.py")] },
    FrameworkRule { languages: PYTHON, framework: "fastapi", evidence: &[Dependency("fastapi")] },
    FrameworkRule { languages: PYTHON, framework: "flask", evidence: &[Dependency("flask")] },
    FrameworkRule { languages: JS, framework: "nextjs", evidence: &[Dependency("next"), FileGlob("next.config.*")] },
    FrameworkRule { languages: JS, framework: "nuxt", evidence: &[Dependency("nuxt"), FileGlob("nuxt.config.*")] },
    FrameworkRule { languages: JS, framework: "remix", evidence: &[Dependency("@remix-run/react")] },
    FrameworkRule { languages: JS, framework: "sveltekit", evidence: &[Dependency("@sveltejs/kit")] },
    FrameworkRule { languages: JS, framework: "astro", evidence: &[Dependency("astro"), FileGlob("astro.config.*")] },
    FrameworkRule { languages: JS, framework: "nestjs", evidence: &[Dependency("@nestjs/core")] },
    FrameworkRule { languages: JS, framework: "angular", evidence: &[Dependency("@angular/core"), File("angular.json")] },
    FrameworkRule { languages: JS, framework: "vue", evidence: &[Dependency("vue")] },
    FrameworkRule { languages: JS, framework: "svelte", evidence: &[Dependency("svelte")] },
    FrameworkRule { languages: JS, framework: "react", evidence: &[Dependency("react")] },
    FrameworkRule { languages: JS, framework: "express", evidence: &[Dependency("express")] },
    FrameworkRule { languages: JS, framework: "fastify", evidence: &[Dependency("fastify")] },
    FrameworkRule { languages: RUST, framework: "axum", evidence: &[Dependency("axum")] },
    FrameworkRule { languages: RUST, framework: "actix-web", evidence: &[Dependency("actix-web")] },
    FrameworkRule { languages: RUST, framework: "rocket", evidence: &[Dependency("rocket")] },
    FrameworkRule { languages: RUST, framework: "tauri", evidence: &[Dependency("tauri")] },
    FrameworkRule { languages: GO, framework: "gin", evidence: &[Dependency("github.com/gin-gonic/gin")] },
    FrameworkRule { languages: GO, framework: "echo", evidence: &[DependencyPrefix("github.com/labstack/echo")] },
    FrameworkRule { languages: GO, framework: "fiber", evidence: &[DependencyPrefix("github.com/gofiber/fiber")] },
    FrameworkRule { languages: GO, framework: "chi", evidence: &[DependencyPrefix("github.com/go-chi/chi")] },
    FrameworkRule { languages: RUBY, framework: "rails", evidence: &[Dependency("rails"), File("config.ru")] },
    FrameworkRule { languages: RUBY, framework: "sinatra", evidence: &[Dependency("sinatra")] },
    FrameworkRule { languages: PHP, framework: "laravel", evidence: &[Dependency("laravel/framework"), File("artisan")] },
    FrameworkRule { languages: PHP, framework: "symfony", evidence: &[Dependency("symfony/framework-bundle")] },
    FrameworkRule { languages: JVM, framework: "spring-boot", evidence: &[DependencyPrefix("spring-boot")] },
];

/// Package managers in priority order: lockfiles before bare manifests.
#[rustfmt::skip]
pub const PACKAGE_MANAGER_RULES: &[Rule] = &[
    Rule { value: "uv", evidence: &[File("uv.lock")] },
    Rule { value: "poetry", evidence: &[File("poetry.lock")] },
    Rule { value: "pdm", evidence: &[File("pdm.lock")] },
    Rule { value: "pipenv", evidence: &[File("Pipfile.lock"), File("Pipfile")] },
    Rule { value: "pnpm", evidence: &[File("pnpm-lock.yaml")] },
    Rule { value: "yarn", evidence: &[File("yarn.lock")] },
    Rule { value: "bun", evidence: &[File("bun.lockb"), File("bun.lock")] },
    Rule { value: "npm", evidence: &[File("package-lock.json")] },
    Rule { value: "cargo", evidence: &[File("Cargo.lock"), File("Cargo.toml")] },
    Rule { value: "go", evidence: &[File("go.sum"), File("go.mod")] },
    Rule { value: "bundler", evidence: &[File("Gemfile.lock"), File("Gemfile")] },
    Rule { value: "composer", evidence: &[File("composer.lock"), File("composer.json")] },
    Rule { value: "gradle", evidence: &[File("build.gradle"), File("build.gradle.kts"), File("gradlew")] },
    Rule { value: "maven", evidence: &[File("pom.xml")] },
    Rule { value: "pip", evidence: &[FileGlob("requirements*.txt"), File("setup.py"), File("pyproject.toml")] },
    Rule { value: "npm", evidence: &[File("package.json")] },
];

/// Linters and formatters; every match is reported.
#[rustfmt::skip]
pub const LINTER_RULES: &[Rule] = &[
    Rule { value: "ruff", evidence: &[File("ruff.toml"), File(".ruff.toml"), ManifestSection("pyproject.toml", "[tool.ruff"), Dependency("ruff")] },
    Rule { value: "black", evidence: &[ManifestSection("pyproject.toml", "[tool.black"), Dependency("black")] },
    Rule { value: "flake8", evidence: &[File(".flake8"), ManifestSection("setup.cfg", "[flake8]"), Dependency("flake8")] },
    Rule { value: "pylint", evidence: &[File(".pylintrc"), File("pylintrc"), ManifestSection("pyproject.toml", "[tool.pylint"), Dependency("pylint")] },
    Rule { value: "mypy", evidence: &[File("mypy.ini"), File(".mypy.ini"), ManifestSection("pyproject.toml", "[tool.mypy"), ManifestSection("setup.cfg", "[mypy"), Dependency("mypy")] },
    Rule { value: "eslint", evidence: &[FileGlob(".eslintrc*"), FileGlob("eslint.config.*"), Dependency("eslint")] },
    Rule { value: "prettier", evidence: &[FileGlob(".prettierrc*"), FileGlob("prettier.config.*"), Dependency("prettier")] },
    Rule { value: "biome", evidence: &[File("biome.json"), File("biome.jsonc"), Dependency("@biomejs/biome")] },
    Rule { value: "stylelint", evidence: &[FileGlob(".stylelintrc*"), Dependency("stylelint")] },
    Rule { value: "clippy", evidence: &[File("clippy.toml"), File(".clippy.toml")] },
    Rule { value: "rustfmt", evidence: &[File("rustfmt.toml"), File(".rustfmt.toml")] },
    Rule { value: "golangci-lint", evidence: &[FileGlob(".golangci.*")] },
    Rule { value: "rubocop", evidence: &[File(".rubocop.yml"), Dependency("rubocop")] },
    Rule { value: "php-cs-fixer", evidence: &[FileGlob(".php-cs-fixer*"), Dependency("friendsofphp/php-cs-fixer")] },
    Rule { value: "checkstyle", evidence: &[File("checkstyle.xml")] },
];

/// Test frameworks; every match is reported.
#[rustfmt::skip]
pub const TEST_FRAMEWORK_RULES: &[Rule] = &[
    Rule { value: "pytest", evidence: &[File("pytest.ini"), File("conftest.py"), ManifestSection("pyproject.toml", "[tool.pytest"), ManifestSection("setup.cfg", "[tool:pytest]"), Dependency("pytest")] },
    Rule { value: "jest", evidence: &[FileGlob("jest.config.*"), Dependency("jest")] },
    Rule { value: "vitest", evidence: &[FileGlob("vitest.config.*"), Dependency("vitest")] },
    Rule { value: "mocha", evidence: &[FileGlob(".mocharc*"), Dependency("mocha")] },
    Rule { value: "playwright", evidence: &[FileGlob("playwright.config.*"), Dependency("@playwright/test")] },
    Rule { value: "cypress", evidence: &[FileGlob("cypress.config.*"), File("cypress.json"), Dependency("cypress")] },
    Rule { value: "cargo-test", evidence: &[File("Cargo.toml")] },
    Rule { value: "go-test", evidence: &[FileGlob("*_test.go")] },
    Rule { value: "rspec", evidence: &[File(".rspec"), Dependency("rspec"), Dependency("rspec-rails")] },
    Rule { value: "minitest", evidence: &[Dependency("minitest")] },
    Rule { value: "phpunit", evidence: &[FileGlob("phpunit.xml*"), Dependency("phpunit/phpunit")] },
    Rule { value: "junit", evidence: &[DependencyPrefix("junit")] },
];

/// CI systems in priority order.
#[rustfmt::skip]
pub const CI_RULES: &[Rule] = &[
    Rule { value: "github-actions", evidence: &[PathPrefix(".github/workflows/")] },
    Rule { value: "gitlab-ci", evidence: &[File(".gitlab-ci.yml")] },
    Rule { value: "circleci", evidence: &[PathPrefix(".circleci/")] },
    Rule { value: "jenkins", evidence: &[File("Jenkinsfile")] },
    Rule { value: "azure-pipelines", evidence: &[File("azure-pipelines.yml")] },
    Rule { value: "bitbucket-pipelines", evidence: &[File("bitbucket-pipelines.yml")] },
    Rule { value: "travis", evidence: &[File(".travis.yml")] },
    Rule { value: "drone", evidence: &[File(".drone.yml")] },
];

/// Read-only view of the evidence the rules test against.
pub struct RuleContext<'a> {
    observations: &'a Observations,
    dependencies: &'a Dependencies,
    file_names: Vec<&'a str>,
    relative_paths: Vec<String>,
}

impl<'a> RuleContext<'a> {
    /// Build a context over observations and their parsed dependencies.
    pub fn new(observations: &'a Observations, dependencies: &'a Dependencies) -> Self {
        let file_names = observations
            .files
            .iter()
            .filter_map(|file| file.relative.file_name().and_then(|name| name.to_str()))
            .collect();
        let relative_paths = observations
            .paths()
            .map(|path| path.to_string_lossy().replace('\\', "/"))
            .collect();
        Self {
            observations,
            dependencies,
            file_names,
            relative_paths,
        }
    }

    /// Whether one evidence predicate holds. `ecosystem` scopes dependency lookups.
    pub fn holds(&self, evidence: &Evidence, ecosystem: Option<&str>) -> bool {
        match *evidence {
            Dependency(name) => match ecosystem {
                Some(ecosystem) => self.dependencies.contains(ecosystem, name),
                None => self.dependencies.contains_any(name),
            },
            DependencyPrefix(prefix) => match ecosystem {
                Some(ecosystem) => self
                    .dependencies
                    .names(ecosystem)
                    .any(|name| name.starts_with(prefix)),
                None => ["python", "node", "rust", "go", "ruby", "php", "jvm"]
                    .iter()
                    .any(|ecosystem| {
                        self.dependencies
                            .names(ecosystem)
                            .any(|name| name.starts_with(prefix))
                    }),
            },
            File(name) => self.file_names.contains(&name),
            FileGlob(pattern) => match Pattern::new(pattern) {
                Ok(pattern) => self.file_names.iter().any(|name| pattern.matches(name)),
                Err(_) => false,
            },
            PathPrefix(prefix) => self
                .relative_paths
                .iter()
                .any(|path| path.starts_with(prefix)),
            ManifestSection(manifest, text) => self
                .observations
                .manifests_named(manifest)
                .any(|found| found.contents.contains(text)),
        }
    }

    /// Whether any of a rule's evidence holds.
    pub fn matches(&self, rule: &Rule) -> bool {
        rule.evidence.iter().any(|evidence| self.holds(evidence, None))
    }

    /// Whether a framework rule matches for `language`.
    pub fn matches_framework(&self, rule: &FrameworkRule, language: &str) -> bool {
        if !rule.languages.contains(&language) {
            return false;
        }
        let ecosystem = ecosystem_of(language);
        rule.evidence
            .iter()
            .any(|evidence| self.holds(evidence, ecosystem))
    }
}

/// Command that installs dependencies for a package manager.
pub fn install_command(package_manager: &str) -> Option<&'static str> {
    let command = match package_manager {
        "uv" => "uv sync",
        "poetry" => "poetry install",
        "pdm" => "pdm install",
        "pipenv" => "pipenv install --dev",
        "pip" => "pip install -r requirements.txt",
        "pnpm" => "pnpm install",
        "yarn" => "yarn install",
        "bun" => "bun install",
        "npm" => "npm install",
        "cargo" => "cargo build",
        "go" => "go mod download",
        "bundler" => "bundle install",
        "composer" => "composer install",
        "gradle" => "./gradlew build",
        "maven" => "mvn install",
        _ => return None,
    };
    Some(command)
}

/// Command that runs a test framework.
pub fn test_command(test_framework: &str) -> Option<&'static str> {
    let command = match test_framework {
        "pytest" => "pytest",
        "jest" => "npx jest",
        "vitest" => "npx vitest run",
        "mocha" => "npx mocha",
        "playwright" => "npx playwright test",
        "cypress" => "npx cypress run",
        "cargo-test" => "cargo test",
        "go-test" => "go test ./...",
        "rspec" => "bundle exec rspec",
        "minitest" => "bundle exec rake test",
        "phpunit" => "vendor/bin/phpunit",
        "junit" => "mvn test",
        _ => return None,
    };
    Some(command)
}

/// Command that runs a linter or formatter check.
pub fn lint_command(linter: &str) -> Option<&'static str> {
    let command = match linter {
        "ruff" => "ruff check .",
        "black" => "black --check .",
        "flake8" => "flake8 .",
        "pylint" => "pylint src",
        "mypy" => "mypy .",
        "eslint" => "npx eslint .",
        "prettier" => "npx prettier --check .",
        "biome" => "npx biome check .",
        "stylelint" => "npx stylelint \"**/*.css\"",
        "clippy" => "cargo clippy -- -D warnings",
        "rustfmt" => "cargo fmt --check",
        "golangci-lint" => "golangci-lint run",
        "rubocop" => "bundle exec rubocop",
        "php-cs-fixer" => "vendor/bin/php-cs-fixer fix --dry-run",
        "checkstyle" => "mvn checkstyle:check",
        _ => return None,
    };
    Some(command)
}
