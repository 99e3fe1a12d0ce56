//! Projects the load-order graph into the optimizer's dependency graph:
//! an edge `A -> B` means chunk B cannot load until chunk A has loaded.

use std::collections::{BTreeSet, VecDeque};

use ahashmap::AHashMap;

use crate::error::GraphError;
use crate::graph::LoadOrderGraph;

/// The projected dependency graph, indexed like the load-order graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepGraph {
    pub parents: Vec<BTreeSet<usize>>,
    pub children: Vec<BTreeSet<usize>>,
}

pub fn project(graph: &LoadOrderGraph) -> Result<DepGraph, GraphError> {
    // after normalization each source has exactly one owner
    let mut source_owner: AHashMap<&std::path::Path, usize> = AHashMap::default();
    for (id, node) in graph.nodes.iter().enumerate() {
        for source in &node.sources {
            source_owner.insert(source.as_path(), id);
        }
    }

    // candidate parents: the primary entry, plus the owner of every static
    // dep that lives in another chunk
    let mut candidates: Vec<BTreeSet<usize>> = Vec::with_capacity(graph.nodes.len());
    for (id, node) in graph.nodes.iter().enumerate() {
        let mut parents = BTreeSet::new();
        if id != graph.primary {
            parents.insert(graph.primary);
        }
        for dep in &node.deps {
            if let Some(&owner) = source_owner.get(dep.as_path()) {
                if owner != id {
                    parents.insert(owner);
                }
            }
        }
        candidates.push(parents);
    }

    // drop parents that are reachable through another parent: if p is also
    // a candidate parent of candidate q, then q already implies p
    let parents: Vec<BTreeSet<usize>> = candidates
        .iter()
        .map(|node_candidates| {
            node_candidates
                .iter()
                .copied()
                .filter(|&p| {
                    !node_candidates
                        .iter()
                        .any(|&q| q != p && candidates[q].contains(&p))
                })
                .collect()
        })
        .collect();

    let mut children: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); graph.nodes.len()];
    for (child, child_parents) in parents.iter().enumerate() {
        for &parent in child_parents {
            children[parent].insert(child);
        }
    }

    let dep_graph = DepGraph { parents, children };
    check_acyclic(graph, &dep_graph)?;
    Ok(dep_graph)
}

// Kahn's algorithm; any node left with unprocessed parents sits on a cycle.
fn check_acyclic(graph: &LoadOrderGraph, dep_graph: &DepGraph) -> Result<(), GraphError> {
    let mut indegree: Vec<usize> = dep_graph.parents.iter().map(|p| p.len()).collect();
    let mut queue: VecDeque<usize> = indegree
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == 0)
        .map(|(id, _)| id)
        .collect();

    let mut processed = 0;
    while let Some(node) = queue.pop_front() {
        processed += 1;
        for &child in &dep_graph.children[node] {
            indegree[child] -= 1;
            if indegree[child] == 0 {
                queue.push_back(child);
            }
        }
    }

    if processed == graph.nodes.len() {
        return Ok(());
    }

    let cyclic = indegree
        .iter()
        .position(|&d| d > 0)
        .expect("a cycle leaves at least one node with positive indegree");
    Err(GraphError::CyclicChunkGraph {
        chunk: graph.nodes[cyclic].name.clone(),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graph::{ChunkNode, LoadOrderGraph};
    use ahashmap::AHashSet;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn node(name: &str, sources: &[&str], deps: &[&str]) -> ChunkNode {
        let mut node = ChunkNode::default();
        node.name = PathBuf::from(name);
        node.sources = sources.iter().map(|s| PathBuf::from(*s)).collect();
        node.deps = deps.iter().map(|s| PathBuf::from(*s)).collect();
        node
    }

    fn graph_of(nodes: Vec<ChunkNode>) -> LoadOrderGraph {
        let mut graph = LoadOrderGraph::default();
        for node in nodes {
            graph.path_to_id.insert(node.name.clone(), graph.nodes.len());
            graph.nodes.push(node);
            graph.children.push(AHashSet::default());
            graph.parents.push(AHashSet::default());
        }
        graph
    }

    #[test]
    fn every_chunk_depends_on_the_primary() {
        let graph = graph_of(vec![
            node("/e.js", &["/e.js"], &["/e.js"]),
            node("/b.js", &["/b.js"], &["/b.js"]),
        ]);
        let dep_graph = project(&graph).unwrap();

        assert_eq!(dep_graph.parents[0], BTreeSet::new());
        assert_eq!(dep_graph.parents[1], BTreeSet::from([0]));
    }

    #[test]
    fn dep_ownership_creates_parent_edges() {
        // b's deps include shared.js which is owned by mid
        let graph = graph_of(vec![
            node("/e.js", &["/e.js"], &["/e.js"]),
            node("/mid.js", &["/shared.js", "/mid.js"], &["/shared.js", "/mid.js"]),
            node("/b.js", &["/b.js"], &["/b.js", "/shared.js"]),
        ]);
        let dep_graph = project(&graph).unwrap();

        // e is a transitively-redundant parent of b through mid
        assert_eq!(dep_graph.parents[1], BTreeSet::from([0]));
        assert_eq!(dep_graph.parents[2], BTreeSet::from([1]));
    }

    #[test]
    fn redundant_grandparents_are_pruned() {
        let graph = graph_of(vec![
            node("/e.js", &["/e.js"], &["/e.js"]),
            node("/a.js", &["/a.js"], &["/a.js"]),
            node("/b.js", &["/b.js"], &["/b.js", "/a.js"]),
        ]);
        let dep_graph = project(&graph).unwrap();

        assert_eq!(dep_graph.parents[1], BTreeSet::from([0]));
        // b depends on a; a already depends on e, so the e edge is dropped
        assert_eq!(dep_graph.parents[2], BTreeSet::from([1]));
        assert_eq!(dep_graph.children[0], BTreeSet::from([1]));
        assert_eq!(dep_graph.children[1], BTreeSet::from([2]));
    }

    #[test]
    fn projection_is_idempotent_in_shape() {
        let graph = graph_of(vec![
            node("/e.js", &["/e.js"], &["/e.js"]),
            node("/a.js", &["/a.js"], &["/a.js"]),
            node("/b.js", &["/b.js"], &["/b.js", "/a.js"]),
        ]);
        let first = project(&graph).unwrap();
        let second = project(&graph).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn mutual_deps_are_a_cycle() {
        let graph = graph_of(vec![
            node("/e.js", &["/e.js"], &["/e.js"]),
            node("/a.js", &["/a.js"], &["/a.js", "/b.js"]),
            node("/b.js", &["/b.js"], &["/b.js", "/a.js"]),
        ]);
        let err = project(&graph).unwrap_err();
        assert!(matches!(err, GraphError::CyclicChunkGraph { .. }));
    }
}
