//! Load-order chunk graph: one node per chunk, an edge for every dynamic
//! import boundary.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use ahashmap::{AHashMap, AHashSet};
use tracing::debug;

use crate::cfg::{EntryPoint, ManualEntryPoint};
use crate::context::BuildContext;
use crate::error::GraphError;
use crate::logger::Logger;
use crate::walker::{push_unique, walk_file, HoistMap};

#[derive(Debug, Clone, Default)]
pub struct ChunkNode {
    /// The chunk's identity: the path of its entry file.
    pub name: PathBuf,
    /// Source files owned by this chunk, dependencies-first after the
    /// final reverse; `name` is the last element when the entry file is
    /// healthy.
    pub sources: Vec<PathBuf>,
    /// Every file the chunk's seed files transitively reference. Superset
    /// of `sources` once shared files have been hoisted elsewhere.
    pub deps: AHashSet<PathBuf>,
    /// Entry files of chunks this chunk dynamically imports, in discovery
    /// order.
    pub child_chunks: Vec<PathBuf>,

    source_set: AHashSet<PathBuf>,
}

impl ChunkNode {
    fn new(name: PathBuf) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    /// Node for a chunk discovered through a dynamic import: it owns its
    /// entry file from the start.
    fn new_chunk_entry(name: PathBuf) -> Self {
        let mut node = Self::new(name.clone());
        node.add_source(name);
        node
    }

    pub fn contains_source(&self, path: &Path) -> bool {
        self.source_set.contains(path)
    }

    fn add_source(&mut self, path: PathBuf) {
        if self.source_set.insert(path.clone()) {
            self.sources.push(path);
        }
    }

    pub(crate) fn remove_source(&mut self, path: &Path) {
        if self.source_set.remove(path) {
            self.sources.retain(|s| s != path);
        }
    }
}

/// Arena-style directed graph over [`ChunkNode`]s. Edges mean "loading the
/// parent makes the child reachable via a dynamic import".
#[derive(Debug, Default)]
pub struct LoadOrderGraph {
    pub nodes: Vec<ChunkNode>,
    pub path_to_id: AHashMap<PathBuf, usize>,
    pub children: Vec<AHashSet<usize>>,
    pub parents: Vec<AHashSet<usize>>,
    /// The first configured entry point; root of the graph.
    pub primary: usize,
}

impl LoadOrderGraph {
    fn add_node(&mut self, node: ChunkNode) -> usize {
        let id = self.nodes.len();
        self.path_to_id.insert(node.name.clone(), id);
        self.nodes.push(node);
        self.children.push(AHashSet::default());
        self.parents.push(AHashSet::default());
        id
    }

    fn add_edge(&mut self, parent: usize, child: usize) {
        self.children[parent].insert(child);
        self.parents[child].insert(parent);
    }

    pub fn has_edge(&self, parent: usize, child: usize) -> bool {
        self.children[parent].contains(&child)
    }

    pub fn node_id(&self, path: &Path) -> Option<usize> {
        self.path_to_id.get(path).copied()
    }

    /// Sorted parent ids, for deterministic traversals.
    pub fn sorted_parents(&self, id: usize) -> Vec<usize> {
        let mut parents: Vec<usize> = self.parents[id].iter().copied().collect();
        parents.sort_unstable();
        parents
    }
}

/// Build the load-order graph from the configured entry points, walking
/// static dependencies and splitting chunks at every dynamic import
/// boundary.
pub fn build_graph(
    ctx: &mut BuildContext,
    logger: impl Logger,
    entrypoints: &[EntryPoint],
    manual_entrypoints: &[ManualEntryPoint],
    hoist_map: &HoistMap,
) -> Result<LoadOrderGraph, GraphError> {
    if entrypoints.is_empty() {
        return Err(GraphError::NoEntrypoints);
    }

    let mut graph = LoadOrderGraph::default();
    let mut queue: VecDeque<EntryPoint> = VecDeque::new();
    let mut manual_queue: VecDeque<ManualEntryPoint> =
        manual_entrypoints.iter().cloned().collect();
    let mut visited: AHashSet<PathBuf> = AHashSet::default();

    for (index, entry) in entrypoints.iter().enumerate() {
        let id = graph.add_node(ChunkNode::new(entry.name.clone()));
        if index > 0 {
            graph.add_edge(graph.primary, id);
        }
        queue.push_back(entry.clone());
    }

    loop {
        while let Some(entry) = queue.pop_front() {
            if !visited.insert(entry.name.clone()) {
                continue;
            }
            let current = graph
                .node_id(&entry.name)
                .expect("queued entry points always have a node");
            debug!("processing chunk {}", entry.name.display());

            for file in &entry.files {
                let info = walk_file(ctx, logger, file, hoist_map)?;
                let node = &mut graph.nodes[current];
                for dep in info.deps {
                    node.deps.insert(dep.clone());
                    node.add_source(dep);
                }
                for child in info.child_chunks {
                    push_unique(&mut node.child_chunks, child);
                }
            }

            let discovered = graph.nodes[current].child_chunks.clone();
            for child_path in discovered {
                if child_path == entry.name {
                    // a chunk re-importing its own entry adds nothing
                    continue;
                }
                let child_id = match graph.node_id(&child_path) {
                    Some(id) => id,
                    None => {
                        let id = graph.add_node(ChunkNode::new_chunk_entry(child_path.clone()));
                        queue.push_back(EntryPoint::from_file(child_path));
                        id
                    }
                };
                // an edge in either direction takes precedence; refusing the
                // back-edge keeps the graph acyclic
                if !graph.has_edge(current, child_id) && !graph.has_edge(child_id, current) {
                    graph.add_edge(current, child_id);
                }
            }
        }

        let manual = match manual_queue.pop_front() {
            Some(manual) => manual,
            None => break,
        };

        let parent_id = graph.node_id(&manual.parent).ok_or_else(|| {
            GraphError::UnknownManualParent {
                parent: manual.parent.clone(),
                child: manual.child.name.clone(),
            }
        })?;
        let child_id = match graph.node_id(&manual.child.name) {
            Some(id) => id,
            None => graph.add_node(ChunkNode::new_chunk_entry(manual.child.name.clone())),
        };
        if parent_id != child_id
            && !graph.has_edge(parent_id, child_id)
            && !graph.has_edge(child_id, parent_id)
        {
            graph.add_edge(parent_id, child_id);
        }
        queue.push_back(manual.child.clone());
    }

    // sources were accumulated referrer-first; flip them into load order
    for node in &mut graph.nodes {
        node.sources.reverse();
    }

    Ok(graph)
}
