use std::path::PathBuf;

use abspath::join_abspath;
use anyhow::{anyhow, Context};
use module_resolver::DEFAULT_ENTRY_FIELDS;
use serde::Deserialize;

/// A chunk entry point: the chunk's identity file plus the files whose
/// transitive dependencies seed the chunk (usually just the entry file).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub name: PathBuf,
    pub files: Vec<PathBuf>,
}

impl EntryPoint {
    /// An entry point whose only seed file is the entry file itself, the
    /// shape every dynamically-discovered chunk takes.
    pub fn from_file(name: PathBuf) -> Self {
        let files = vec![name.clone()];
        Self { name, files }
    }
}

/// An explicitly-attached chunk that dependency discovery would not find on
/// its own (e.g. a file loaded through a string built at runtime).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualEntryPoint {
    pub parent: PathBuf,
    pub child: EntryPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkNameStyle {
    #[default]
    Entrypoint,
    Numbered,
}

/// Fully-validated configuration for one chunk calculation.
#[derive(Debug, Clone)]
pub struct ChunkGraphConfig {
    pub entrypoints: Vec<EntryPoint>,
    pub manual_entrypoints: Vec<ManualEntryPoint>,
    /// package.json fields consulted for a package's entry, in order.
    pub package_json_entry_names: Vec<String>,
    /// Anchors bare-specifier metadata lookups and chunk-name relativization.
    pub base_directory: PathBuf,
    pub goog_base_path: Option<PathBuf>,
    pub goog_deps_files: Vec<PathBuf>,
    /// Extra (namespace, path) pairs merged over the parsed deps files.
    pub extra_deps: Vec<(String, PathBuf)>,
    pub name_style: ChunkNameStyle,
    pub chunk_name_prefix: String,
}

impl Default for ChunkGraphConfig {
    fn default() -> Self {
        Self {
            entrypoints: Vec::new(),
            manual_entrypoints: Vec::new(),
            package_json_entry_names: DEFAULT_ENTRY_FIELDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            base_directory: PathBuf::from("/"),
            goog_base_path: None,
            goog_deps_files: Vec::new(),
            extra_deps: Vec::new(),
            name_style: ChunkNameStyle::default(),
            chunk_name_prefix: String::new(),
        }
    }
}

/// A JSON serializable proxy for the [`ChunkGraphConfig`] struct. Paths may
/// be relative here; they are anchored at `baseDirectory` during conversion.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkGraphJsonConfig {
    pub entrypoints: Vec<JsonEntryPoint>,
    #[serde(default)]
    pub manual_entrypoints: Vec<JsonManualEntryPoint>,
    #[serde(default)]
    pub package_json_entry_names: Option<Vec<String>>,
    pub base_directory: String,
    #[serde(default)]
    pub goog_base_path: Option<String>,
    #[serde(default)]
    pub goog_deps_files: Vec<String>,
    #[serde(default)]
    pub extra_deps: Vec<JsonExtraDep>,
    #[serde(default)]
    pub name_style: ChunkNameStyle,
    #[serde(default)]
    pub chunk_name_prefix: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonEntryPoint {
    pub name: String,
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonManualEntryPoint {
    pub parent: String,
    pub child: JsonEntryPoint,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonExtraDep {
    pub namespace: String,
    pub path: String,
}

impl TryFrom<ChunkGraphJsonConfig> for ChunkGraphConfig {
    type Error = anyhow::Error;

    fn try_from(value: ChunkGraphJsonConfig) -> Result<Self, Self::Error> {
        let base_directory = PathBuf::from(&value.base_directory);
        if !base_directory.is_absolute() {
            return Err(anyhow!(
                "baseDirectory must be an absolute path, got {}",
                value.base_directory
            ));
        }

        let abs = |p: &str| -> Result<PathBuf, anyhow::Error> {
            join_abspath(&base_directory, p).with_context(|| format!("bad path {}", p))
        };
        let entry = |e: &JsonEntryPoint| -> Result<EntryPoint, anyhow::Error> {
            let name = abs(&e.name)?;
            let files = if e.files.is_empty() {
                vec![name.clone()]
            } else {
                e.files.iter().map(|f| abs(f)).collect::<Result<_, _>>()?
            };
            Ok(EntryPoint { name, files })
        };

        let entrypoints = value
            .entrypoints
            .iter()
            .map(|e| entry(e))
            .collect::<Result<Vec<_>, _>>()?;
        if entrypoints.is_empty() {
            return Err(anyhow!("at least one entry point is required"));
        }

        let manual_entrypoints = value
            .manual_entrypoints
            .iter()
            .map(|m| {
                Ok(ManualEntryPoint {
                    parent: abs(&m.parent)?,
                    child: entry(&m.child)?,
                })
            })
            .collect::<Result<Vec<_>, anyhow::Error>>()?;

        let goog_base_path = value.goog_base_path.as_deref().map(|p| abs(p)).transpose()?;
        let goog_deps_files = value
            .goog_deps_files
            .iter()
            .map(|p| abs(p))
            .collect::<Result<Vec<_>, _>>()?;
        let extra_deps = value
            .extra_deps
            .iter()
            .map(|d| Ok((d.namespace.clone(), abs(&d.path)?)))
            .collect::<Result<Vec<_>, anyhow::Error>>()?;

        Ok(ChunkGraphConfig {
            entrypoints,
            manual_entrypoints,
            package_json_entry_names: value.package_json_entry_names.unwrap_or_else(|| {
                DEFAULT_ENTRY_FIELDS.iter().map(|s| s.to_string()).collect()
            }),
            base_directory,
            goog_base_path,
            goog_deps_files,
            extra_deps,
            name_style: value.name_style,
            chunk_name_prefix: value.chunk_name_prefix.unwrap_or_default(),
        })
    }
}
