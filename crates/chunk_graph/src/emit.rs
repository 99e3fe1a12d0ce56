//! Emits the optimizer-facing output: `name:count[:parents]` chunk strings
//! in topological order plus the flat source list.

use std::path::{Path, PathBuf};

use ahashmap::AHashSet;
use serde::Serialize;

use crate::cfg::ChunkNameStyle;
use crate::error::{Diagnostic, GraphError};
use crate::graph::LoadOrderGraph;
use crate::logger::Logger;
use crate::project::DepGraph;

/// The result object. Serializes as `{ "chunk": [...], "js": [...] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkOutput {
    pub chunk: Vec<String>,
    #[serde(rename = "js")]
    pub sources: Vec<String>,
}

/// Maps chunk entry paths to the short names used in the `--chunk` flag
/// strings. Stateful: collision suffixes and numbering depend on emission
/// order.
pub struct ChunkNameMapper<'a> {
    style: ChunkNameStyle,
    prefix: &'a str,
    base_directory: &'a Path,
    used: AHashSet<String>,
    next_number: usize,
}

impl<'a> ChunkNameMapper<'a> {
    pub fn new(style: ChunkNameStyle, prefix: &'a str, base_directory: &'a Path) -> Self {
        Self {
            style,
            prefix,
            base_directory,
            used: AHashSet::default(),
            next_number: 0,
        }
    }

    pub fn chunk_name(&mut self, entry_file: &Path, is_primary: bool) -> String {
        match self.style {
            ChunkNameStyle::Numbered => {
                let name = if is_primary {
                    "main".to_string()
                } else {
                    let n = self.next_number;
                    self.next_number += 1;
                    n.to_string()
                };
                format!("{}{}", self.prefix, name)
            }
            ChunkNameStyle::Entrypoint => {
                let relative = entry_file
                    .strip_prefix(self.base_directory)
                    .unwrap_or(entry_file);
                let stem = relative
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| relative.to_string_lossy().into_owned());
                let base = format!("{}{}", self.prefix, stem);

                let mut candidate = base.clone();
                let mut suffix = 1usize;
                while !self.used.insert(candidate.clone()) {
                    candidate = format!("{}{}", base, suffix);
                    suffix += 1;
                }
                candidate
            }
        }
    }
}

/// Topologically emit the dependency graph. A chunk is emitted only after
/// all of its parents; a pass with no progress is an ordering failure.
pub fn emit(
    graph: &LoadOrderGraph,
    dep_graph: &DepGraph,
    mapper: &mut ChunkNameMapper,
    diagnostics: &mut Vec<Diagnostic>,
    logger: impl Logger,
) -> Result<ChunkOutput, GraphError> {
    let total = graph.nodes.len();
    let mut names: Vec<Option<String>> = vec![None; total];
    let mut order: Vec<usize> = Vec::with_capacity(total);

    while order.len() < total {
        let mut progress = false;
        for id in 0..total {
            if names[id].is_some() {
                continue;
            }
            if dep_graph.parents[id].iter().any(|&p| names[p].is_none()) {
                continue;
            }
            let name = mapper.chunk_name(&graph.nodes[id].name, id == graph.primary);
            names[id] = Some(name);
            order.push(id);
            progress = true;
        }
        if !progress {
            return Err(GraphError::UnsortableChunks {
                emitted: order.len(),
                total,
            });
        }
    }

    let mut chunk_lines = Vec::with_capacity(total);
    let mut sources = Vec::new();
    for &id in &order {
        let node = &graph.nodes[id];
        if !node.contains_source(&node.name) {
            let diagnostic = Diagnostic::ChunkEntrypointMissing {
                chunk: node.name.clone(),
                referenced_by: synchronous_referencers(graph, id),
            };
            logger.log(diagnostic.to_string());
            diagnostics.push(diagnostic);
        }

        let name = names[id].as_ref().expect("emitted chunks are named");
        let line = if id == graph.primary {
            format!("{}:{}", name, node.sources.len())
        } else {
            let parent_names: Vec<&str> = dep_graph.parents[id]
                .iter()
                .map(|&p| names[p].as_deref().expect("parents emit first"))
                .collect();
            format!("{}:{}:{}", name, node.sources.len(), parent_names.join(","))
        };
        chunk_lines.push(line);

        sources.extend(
            node.sources
                .iter()
                .map(|s| s.to_string_lossy().into_owned()),
        );
    }

    Ok(ChunkOutput {
        chunk: chunk_lines,
        sources,
    })
}

// The chunks whose static deps pull in `entry` of chunk `id`: these are the
// importers that caused the entry file to be owned elsewhere.
fn synchronous_referencers(graph: &LoadOrderGraph, id: usize) -> Vec<PathBuf> {
    let entry = &graph.nodes[id].name;
    graph
        .nodes
        .iter()
        .enumerate()
        .filter(|(other, node)| *other != id && node.deps.contains(entry))
        .map(|(_, node)| node.name.clone())
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn entrypoint_names_are_relative_stems() {
        let base = PathBuf::from("/repo");
        let mut mapper = ChunkNameMapper::new(ChunkNameStyle::Entrypoint, "", &base);
        assert_eq!(
            mapper.chunk_name(Path::new("/repo/src/main.js"), true),
            "main"
        );
        assert_eq!(
            mapper.chunk_name(Path::new("/elsewhere/other.js"), false),
            "other"
        );
    }

    #[test]
    fn entrypoint_name_collisions_get_numeric_suffixes() {
        let base = PathBuf::from("/repo");
        let mut mapper = ChunkNameMapper::new(ChunkNameStyle::Entrypoint, "", &base);
        assert_eq!(mapper.chunk_name(Path::new("/repo/a/view.js"), true), "view");
        assert_eq!(
            mapper.chunk_name(Path::new("/repo/b/view.js"), false),
            "view1"
        );
        assert_eq!(
            mapper.chunk_name(Path::new("/repo/c/view.js"), false),
            "view2"
        );
    }

    #[test]
    fn entrypoint_prefix_is_applied() {
        let base = PathBuf::from("/repo");
        let mut mapper = ChunkNameMapper::new(ChunkNameStyle::Entrypoint, "app_", &base);
        assert_eq!(
            mapper.chunk_name(Path::new("/repo/main.js"), true),
            "app_main"
        );
    }

    #[test]
    fn numbered_names_count_in_emission_order() {
        let base = PathBuf::from("/repo");
        let mut mapper = ChunkNameMapper::new(ChunkNameStyle::Numbered, "", &base);
        assert_eq!(mapper.chunk_name(Path::new("/repo/a.js"), true), "main");
        assert_eq!(mapper.chunk_name(Path::new("/repo/b.js"), false), "0");
        assert_eq!(mapper.chunk_name(Path::new("/repo/c.js"), false), "1");
    }
}
