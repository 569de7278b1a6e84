//! Error types for mdforge core.

use std::path::PathBuf;
use std::{error::Error, fmt, io};

/// Error type for mdforge core operations.
///
/// Only configuration problems and I/O failures on the scan root surface as
/// errors. Per-file evidence failures become warnings and never reach this type.
#[derive(Debug)]
pub enum ForgeError {
    /// An underlying I/O error.
    Io(io::Error),
    /// The scan root is missing or is not a directory.
    InvalidRoot(PathBuf),
    /// No preset is registered under the requested id.
    UnknownPreset(String),
    /// A template placeholder could not be resolved from the fingerprint or overrides.
    UnresolvedPlaceholder(String),
    /// A template is structurally broken (unbalanced or unterminated tags).
    TemplateSyntax(String),
    /// The embedded preset bundle failed to load.
    PresetBundle(String),
    /// The scan was cancelled through its cancel flag.
    Cancelled,
    /// A catch-all error with a message.
    Other(String),
}

impl fmt::Display for ForgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::InvalidRoot(path) => {
                write!(f, "project root is not a directory: {}", path.display())
            }
            Self::UnknownPreset(id) => write!(f, "unknown preset: {id}"),
            Self::UnresolvedPlaceholder(name) => {
                write!(f, "unresolved template placeholder: {{{{{name}}}}}")
            }
            Self::TemplateSyntax(message) => write!(f, "template syntax error: {message}"),
            Self::PresetBundle(message) => write!(f, "preset bundle error: {message}"),
            Self::Cancelled => write!(f, "scan cancelled"),
            Self::Other(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ForgeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ForgeError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl ForgeError {
    /// Whether the error is a configuration error (bad preset or template input).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownPreset(_)
                | Self::UnresolvedPlaceholder(_)
                | Self::TemplateSyntax(_)
                | Self::PresetBundle(_)
        )
    }
}

/// Convenience result type for mdforge core.
pub type Result<T> = std::result::Result<T, ForgeError>;
