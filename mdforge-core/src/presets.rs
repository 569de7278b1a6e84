//! Preset registry backed by an embedded TOML bundle.

use std::collections::BTreeSet;

use log::debug;
use serde::Deserialize;

use crate::domain::{Preset, PresetSummary, ProjectFingerprint};
use crate::error::{ForgeError, Result};

/// Id of the preset used when nothing more specific applies.
pub const GENERIC_PRESET: &str = "generic";

/// Template shared by presets that do not ship their own.
pub const BASE_TEMPLATE: &str = include_str!("../presets/base.md");

const BUNDLE: &[(&str, &str)] = &[
    ("generic.toml", include_str!("../presets/generic.toml")),
    ("go.toml", include_str!("../presets/go.toml")),
    ("javascript.toml", include_str!("../presets/javascript.toml")),
    ("nextjs.toml", include_str!("../presets/nextjs.toml")),
    ("python.toml", include_str!("../presets/python.toml")),
    ("python-django.toml", include_str!("../presets/python-django.toml")),
    ("python-fastapi.toml", include_str!("../presets/python-fastapi.toml")),
    ("python-flask.toml", include_str!("../presets/python-flask.toml")),
    ("react.toml", include_str!("../presets/react.toml")),
    ("rust.toml", include_str!("../presets/rust.toml")),
    ("typescript.toml", include_str!("../presets/typescript.toml")),
];

#[derive(Debug, Deserialize)]
struct PresetFile {
    id: String,
    target: String,
    summary: String,
    template: Option<String>,
    #[serde(default)]
    standards: Vec<String>,
    #[serde(default)]
    anti_patterns: Vec<String>,
    #[serde(default)]
    framework_conventions: Vec<String>,
}

/// Read-only catalog of presets, sorted by id.
#[derive(Debug, Clone)]
pub struct PresetRegistry {
    presets: Vec<Preset>,
    generic: usize,
}

impl PresetRegistry {
    /// Load the presets compiled into the crate.
    pub fn embedded() -> Result<Self> {
        Self::from_sources(BUNDLE.iter().copied(), BASE_TEMPLATE)
    }

    /// Build a registry from `(file name, TOML text)` pairs.
    ///
    /// Presets without a `template` key use `base_template`. Duplicate ids and a
    /// missing `generic` preset are bundle errors.
    pub fn from_sources<'a, I>(sources: I, base_template: &str) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut presets = Vec::new();
        let mut ids = BTreeSet::new();
        for (name, text) in sources {
            let file: PresetFile = toml::from_str(text)
                .map_err(|err| ForgeError::PresetBundle(format!("{name}: {err}")))?;
            if !ids.insert(file.id.clone()) {
                return Err(ForgeError::PresetBundle(format!(
                    "{name}: duplicate preset id {}",
                    file.id
                )));
            }
            presets.push(Preset {
                id: file.id,
                target: file.target,
                summary: file.summary,
                template: file.template.unwrap_or_else(|| base_template.to_string()),
                standards: file.standards,
                anti_patterns: file.anti_patterns,
                framework_conventions: file.framework_conventions,
            });
        }
        presets.sort_by(|a, b| a.id.cmp(&b.id));
        let generic = presets
            .iter()
            .position(|preset| preset.id == GENERIC_PRESET)
            .ok_or_else(|| {
                ForgeError::PresetBundle(format!("no `{GENERIC_PRESET}` preset in bundle"))
            })?;
        debug!("loaded {} presets", presets.len());
        Ok(Self { presets, generic })
    }

    /// Find a preset by id.
    pub fn lookup(&self, id: &str) -> Result<&Preset> {
        self.presets
            .iter()
            .find(|preset| preset.id == id)
            .ok_or_else(|| ForgeError::UnknownPreset(id.to_string()))
    }

    /// Summaries of every preset, sorted by id.
    pub fn list_available(&self) -> Vec<PresetSummary> {
        self.presets
            .iter()
            .map(|preset| PresetSummary {
                id: preset.id.clone(),
                target: preset.target.clone(),
                summary: preset.summary.clone(),
            })
            .collect()
    }

    /// Best preset for a fingerprint: framework, then primary language, then generic.
    pub fn suggest(&self, fingerprint: &ProjectFingerprint) -> &Preset {
        let by_target = |target: &str| {
            self.presets
                .iter()
                .find(|preset| preset.target.eq_ignore_ascii_case(target))
        };
        fingerprint
            .framework
            .as_deref()
            .and_then(by_target)
            .or_else(|| fingerprint.primary_language().and_then(by_target))
            .unwrap_or(&self.presets[self.generic])
    }
}
