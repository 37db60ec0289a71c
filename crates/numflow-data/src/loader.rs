//! Resolution pipeline: reads data files, resolves shapes and operators,
//! validates and builds stage definitions.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers, plus the loaders for single stages, stage
//! catalogs, engine settings and whole stage packs.

use crate::schema::{StageData, TileData};
use numflow_core::direction::{GridPosition, Rotation};
use numflow_core::sim::SimConfig;
use numflow_core::stage::{
    InputPort, OutputPort, Stage, StageDefinition, StageError, TilePlacement,
};
use numflow_core::tile::{Operator, TileShape};
use numflow_core::validation::{ArithmeticHazard, lint_definition};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    #[error("unknown shape '{shape}' in stage '{stage}' ({file})")]
    UnknownShape {
        file: PathBuf,
        stage: String,
        shape: String,
    },

    #[error("unknown operator '{operator}' in stage '{stage}' ({file})")]
    UnknownOperator {
        file: PathBuf,
        stage: String,
        operator: String,
    },

    #[error("rotation {degrees} in stage '{stage}' is not a multiple of 90 below 360 ({file})")]
    InvalidRotation {
        file: PathBuf,
        stage: String,
        degrees: u32,
    },

    /// The stage resolved, but its layout is structurally unusable.
    #[error("invalid stage '{stage}' in {file}: {source}")]
    InvalidStage {
        file: PathBuf,
        stage: String,
        source: StageError,
    },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name (without extension).
///
/// Looks for `{base_name}.ron`, `{base_name}.toml`, and `{base_name}.json`.
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// multiple formats exist for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let extensions = ["ron", "toml", "json"];
    let mut found: Option<PathBuf> = None;

    for ext in &extensions {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(ref existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing.clone(),
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    deserialize_str(&content, format, path)
}

/// Deserialize already-read content. `path` is only used for error context.
pub fn deserialize_str<T: DeserializeOwned>(
    content: &str,
    format: Format,
    path: &Path,
) -> Result<T, DataLoadError> {
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        }),
        Format::Json => serde_json::from_str(content).map_err(|e| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        }),
        Format::Toml => toml::from_str(content).map_err(|e| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        }),
    }
}

// ===========================================================================
// Resolution
// ===========================================================================

fn pos(p: crate::schema::PosData) -> GridPosition {
    GridPosition::new(p.x, p.y)
}

fn resolve_tile(tile: &TileData, stage: &str, file: &Path) -> Result<TilePlacement, DataLoadError> {
    let shape = TileShape::from_symbol(&tile.shape).ok_or_else(|| DataLoadError::UnknownShape {
        file: file.to_path_buf(),
        stage: stage.to_string(),
        shape: tile.shape.clone(),
    })?;
    let operator =
        Operator::from_name(&tile.operator).ok_or_else(|| DataLoadError::UnknownOperator {
            file: file.to_path_buf(),
            stage: stage.to_string(),
            operator: tile.operator.clone(),
        })?;
    let rotation =
        Rotation::from_degrees(tile.rotation).ok_or_else(|| DataLoadError::InvalidRotation {
            file: file.to_path_buf(),
            stage: stage.to_string(),
            degrees: tile.rotation,
        })?;

    Ok(TilePlacement {
        position: pos(tile.pos),
        shape,
        rotation,
        operator,
        operand: tile.operand,
        fixed: tile.fixed,
    })
}

/// Resolve authored stage data into a validated [`StageDefinition`].
///
/// `file` is only used for error context.
pub fn resolve_stage(data: &StageData, file: &Path) -> Result<StageDefinition, DataLoadError> {
    let tiles = data
        .tiles
        .iter()
        .map(|t| resolve_tile(t, &data.name, file))
        .collect::<Result<Vec<_>, _>>()?;

    let definition = StageDefinition {
        name: data.name.clone(),
        width: data.grid_size.width,
        height: data.grid_size.height,
        inputs: data
            .inputs
            .iter()
            .map(|i| InputPort {
                position: pos(i.pos),
                value: i.value,
            })
            .collect(),
        outputs: data
            .outputs
            .iter()
            .map(|o| OutputPort {
                position: pos(o.pos),
                target: o.target_value,
            })
            .collect(),
        tiles,
    };

    // Build once so structural problems surface at load time.
    Stage::new(definition.clone()).map_err(|source| DataLoadError::InvalidStage {
        file: file.to_path_buf(),
        stage: data.name.clone(),
        source,
    })?;
    for hazard in lint_definition(&definition) {
        warn!(
            file = %file.display(),
            stage = %definition.name,
            position = %hazard.position,
            operator = hazard.operator.name(),
            operand = hazard.operand,
            "pipe aborts every run that reaches it"
        );
    }
    Ok(definition)
}

// ===========================================================================
// Loaders
// ===========================================================================

/// Load a single stage file.
pub fn load_stage(path: &Path) -> Result<StageDefinition, DataLoadError> {
    let data: StageData = deserialize_file(path)?;
    let definition = resolve_stage(&data, path)?;
    debug!(path = %path.display(), stage = %definition.name, "stage loaded");
    Ok(definition)
}

/// Stage definitions keyed by id, iterated in id order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageCatalog {
    stages: BTreeMap<String, StageDefinition>,
}

impl StageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, definition: StageDefinition) {
        self.stages.insert(id.into(), definition);
    }

    pub fn get(&self, id: &str) -> Option<&StageDefinition> {
        self.stages.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.stages.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StageDefinition)> {
        self.stages.iter().map(|(id, def)| (id.as_str(), def))
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Pipes whose arithmetic is undefined for any input, by stage id.
    pub fn hazards(&self) -> Vec<(&str, ArithmeticHazard)> {
        self.iter()
            .flat_map(|(id, def)| lint_definition(def).into_iter().map(move |h| (id, h)))
            .collect()
    }

    /// Build a playable stage. Catalog entries were validated on load.
    pub fn build(&self, id: &str) -> Option<Result<Stage, StageError>> {
        self.get(id).map(|def| Stage::new(def.clone()))
    }
}

/// Load a catalog file: a map of stage id to stage.
pub fn load_catalog(path: &Path) -> Result<StageCatalog, DataLoadError> {
    let raw: BTreeMap<String, StageData> = deserialize_file(path)?;
    let mut catalog = StageCatalog::new();
    for (id, data) in &raw {
        catalog.insert(id.clone(), resolve_stage(data, path)?);
    }
    info!(path = %path.display(), stages = catalog.len(), "stage catalog loaded");
    Ok(catalog)
}

/// Load engine settings. Missing fields take their defaults.
pub fn load_sim_config(path: &Path) -> Result<SimConfig, DataLoadError> {
    let config: SimConfig = deserialize_file(path)?;
    debug!(path = %path.display(), max_steps = config.max_steps, "engine settings loaded");
    Ok(config)
}

// ===========================================================================
// Stage packs
// ===========================================================================

/// Everything a game needs from a data directory.
#[derive(Debug, Clone)]
pub struct StagePack {
    pub catalog: StageCatalog,
    pub config: SimConfig,
}

/// Load a data directory: a required `stages` catalog and an optional
/// `engine` settings file, each in any supported format.
pub fn load_stage_pack(dir: &Path) -> Result<StagePack, DataLoadError> {
    let catalog = load_catalog(&require_data_file(dir, "stages")?)?;
    let config = match find_data_file(dir, "engine")? {
        Some(path) => load_sim_config(&path)?,
        None => SimConfig::default(),
    };
    Ok(StagePack { catalog, config })
}

// ===========================================================================
// Tests
// ===========================================================================
