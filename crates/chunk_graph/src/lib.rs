//! Computes an output-chunk specification for a whole-program JavaScript
//! optimizer: given entry points (plus optional legacy-namespace deps
//! files), discovers the transitive source set, splits it into chunks at
//! dynamic import boundaries, hoists shared sources to their lowest common
//! ancestor chunk, and emits the chunk dependency graph in the optimizer's
//! `--chunk` flag syntax together with a topologically ordered source list.

mod ancestry;
mod cfg;
mod context;
mod emit;
mod error;
mod graph;
mod logger;
mod normalize;
mod parse;
mod project;
mod walker;

use std::path::PathBuf;

use rayon::prelude::*;

use goog_deps::{parse_deps_src, GoogDepsMap};
use module_resolver::NodeModulesResolver;

pub use cfg::{
    ChunkGraphConfig, ChunkGraphJsonConfig, ChunkNameStyle, EntryPoint, JsonEntryPoint,
    JsonExtraDep, JsonManualEntryPoint, ManualEntryPoint,
};
pub use context::CancelFlag;
pub use emit::ChunkOutput;
pub use error::{Diagnostic, GraphError};
pub use logger::{Logger, StdioLogger, VecLogger};
pub use module_resolver::{FileSystem, OsFileSystem};

use context::{BuildContext, GoogContext};
use emit::ChunkNameMapper;
use walker::HoistMap;

/// Output plus everything non-fatal the build noticed along the way.
#[derive(Debug)]
pub struct ChunkCalcResult {
    pub output: ChunkOutput,
    pub diagnostics: Vec<Diagnostic>,
}

impl ChunkCalcResult {
    /// True when a diagnostic warrants an error exit even though output was
    /// produced (a chunk entry file owned by another chunk).
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.is_error())
    }
}

pub fn calculate_chunks(
    logger: impl Logger,
    fs: &(impl FileSystem + Sync),
    config: &ChunkGraphConfig,
) -> Result<ChunkCalcResult, GraphError> {
    calculate_chunks_cancellable(logger, fs, config, CancelFlag::new())
}

pub fn calculate_chunks_cancellable(
    logger: impl Logger,
    fs: &(impl FileSystem + Sync),
    config: &ChunkGraphConfig,
    cancel: CancelFlag,
) -> Result<ChunkCalcResult, GraphError> {
    if config.entrypoints.is_empty() {
        return Err(GraphError::NoEntrypoints);
    }

    let goog = GoogContext {
        base_path: config.goog_base_path.clone(),
        deps_map: build_goog_deps_map(fs, config)?,
    };

    let resolver = NodeModulesResolver::new(
        fs,
        config.base_directory.clone(),
        config.package_json_entry_names.clone(),
    );
    let mut ctx = BuildContext::new(fs, resolver, goog, cancel);

    // first pass: discover chunks and spot multi-owned sources
    let mut graph = graph::build_graph(
        &mut ctx,
        logger,
        &config.entrypoints,
        &config.manual_entrypoints,
        &HoistMap::default(),
    )?;
    let hoist_map = normalize::normalize(&mut graph, logger);

    // second pass: rebuild with the hoists applied, so hoisted sources load
    // from their final owner; then re-enforce single ownership
    if !hoist_map.is_empty() {
        graph = graph::build_graph(
            &mut ctx,
            logger,
            &config.entrypoints,
            &config.manual_entrypoints,
            &hoist_map,
        )?;
        normalize::normalize(&mut graph, logger);
    }

    let dep_graph = project::project(&graph)?;

    let mut mapper = ChunkNameMapper::new(
        config.name_style,
        &config.chunk_name_prefix,
        &config.base_directory,
    );
    let output = emit::emit(&graph, &dep_graph, &mut mapper, &mut ctx.diagnostics, logger)?;

    Ok(ChunkCalcResult {
        output,
        diagnostics: ctx.diagnostics,
    })
}

fn build_goog_deps_map(
    fs: &(impl FileSystem + Sync),
    config: &ChunkGraphConfig,
) -> Result<Option<GoogDepsMap>, GraphError> {
    if config.goog_deps_files.is_empty() && config.extra_deps.is_empty() {
        return Ok(None);
    }

    // relative paths inside a deps file join against the legacy base
    // file's directory when one is configured, else the base directory
    let deps_base_dir: PathBuf = config
        .goog_base_path
        .as_ref()
        .and_then(|base| base.parent())
        .map(|dir| dir.to_path_buf())
        .unwrap_or_else(|| config.base_directory.clone());

    let parsed: Vec<GoogDepsMap> = config
        .goog_deps_files
        .par_iter()
        .map(|file| -> Result<GoogDepsMap, GraphError> {
            let contents = fs
                .read_to_string(file)
                .map_err(|source| GraphError::ReadFile {
                    file: file.clone(),
                    source,
                })?;
            Ok(parse_deps_src(file, &contents, &deps_base_dir)?)
        })
        .collect::<Result<Vec<_>, GraphError>>()?;

    let mut deps_map = GoogDepsMap::default();
    for file_map in parsed {
        deps_map.extend(file_map);
    }
    for (namespace, path) in &config.extra_deps {
        deps_map.insert(namespace.clone(), path.clone());
    }

    Ok(Some(deps_map))
}
