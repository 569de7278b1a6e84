//! Language mapping backed by `tokei`'s extension table.
//!
//! Mapping works only on what the collector already observed: the extension,
//! the file name and the shebang interpreter. Nothing here touches the disk.

use tokei::LanguageType;

use crate::evidence::FileObservation;

/// Formats tokei knows about that are data or prose rather than code.
const NON_LANGUAGES: &[&str] = &[
    "Plain Text",
    "JSON",
    "TOML",
    "YAML",
    "XML",
    "INI",
    "Markdown",
    "ReStructuredText",
    "AsciiDoc",
    "SVG",
    "Dockerfile",
    "Makefile",
];

/// Page markup and stylesheets; ranked after programming languages.
const MARKUP_LANGUAGES: &[&str] = &["HTML", "CSS", "Sass", "LESS"];

/// Extensionless file names that still carry code, mapped to an extension.
const FILE_NAMES: &[(&str, &str)] = &[
    ("Rakefile", "rb"),
    ("Vagrantfile", "rb"),
    ("Jenkinsfile", "groovy"),
];

/// Shebang interpreters (version suffix stripped), mapped to an extension.
const INTERPRETERS: &[(&str, &str)] = &[
    ("python", "py"),
    ("pypy", "py"),
    ("node", "js"),
    ("nodejs", "js"),
    ("deno", "ts"),
    ("bun", "js"),
    ("ruby", "rb"),
    ("perl", "pl"),
    ("php", "php"),
    ("lua", "lua"),
    ("bash", "bash"),
    ("sh", "sh"),
    ("dash", "sh"),
    ("ksh", "sh"),
    ("zsh", "zsh"),
    ("fish", "fish"),
    ("Rscript", "r"),
    ("tclsh", "tcl"),
];

/// Language of an observed file, or `None` for unrecognized and data files.
pub fn language_of(file: &FileObservation) -> Option<String> {
    let extension = if file.extension.is_empty() {
        implied_extension(file)?
    } else {
        file.extension.as_str()
    };
    let language = LanguageType::from_file_extension(extension)?;
    let name = canonical_name(language.name());
    if NON_LANGUAGES.contains(&name) {
        return None;
    }
    Some(name.to_string())
}

/// Whether a language is page markup or a stylesheet.
pub fn is_markup(language: &str) -> bool {
    MARKUP_LANGUAGES.contains(&language)
}

/// Package ecosystem a language's dependencies are declared in.
pub fn ecosystem_of(language: &str) -> Option<&'static str> {
    match language {
        "Python" => Some("python"),
        "JavaScript" | "TypeScript" | "Vue" | "Svelte" => Some("node"),
        "Rust" => Some("rust"),
        "Go" => Some("go"),
        "Ruby" => Some("ruby"),
        "PHP" => Some("php"),
        "Java" | "Kotlin" | "Scala" => Some("jvm"),
        _ => None,
    }
}

fn implied_extension(file: &FileObservation) -> Option<&'static str> {
    let name = file.relative.file_name().and_then(|name| name.to_str())?;
    if let Some((_, extension)) = FILE_NAMES.iter().find(|(known, _)| *known == name) {
        return Some(*extension);
    }
    let interpreter = file
        .interpreter
        .as_deref()?
        .trim_end_matches(|c: char| c.is_ascii_digit() || c == '.');
    INTERPRETERS
        .iter()
        .find(|(known, _)| *known == interpreter)
        .map(|(_, extension)| *extension)
}

fn canonical_name(name: &'static str) -> &'static str {
    match name {
        "JSX" => "JavaScript",
        "TSX" => "TypeScript",
        other => other,
    }
}
