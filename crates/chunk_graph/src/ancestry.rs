//! Common-ancestor computation over the load-order graph.
//!
//! Path enumeration is exponential in the worst case, which is fine here:
//! the graph has one node per chunk, not per source file.

use std::collections::VecDeque;

use ahashmap::{AHashMap, AHashSet};

use crate::graph::LoadOrderGraph;

/// Memo of per-node "on every path" sets, valid for one graph shape.
pub type AncestryCache = AHashMap<usize, Option<AHashSet<usize>>>;

/// Unit-weight shortest-path distance from the primary entry to every node.
/// `None` for nodes the primary cannot reach.
pub fn distances_from_primary(graph: &LoadOrderGraph) -> Vec<Option<usize>> {
    let mut distances: Vec<Option<usize>> = vec![None; graph.nodes.len()];
    let mut queue = VecDeque::new();
    distances[graph.primary] = Some(0);
    queue.push_back(graph.primary);

    while let Some(node) = queue.pop_front() {
        let next = distances[node].expect("queued nodes have a distance") + 1;
        let mut children: Vec<usize> = graph.children[node].iter().copied().collect();
        children.sort_unstable();
        for child in children {
            if distances[child].is_none() {
                distances[child] = Some(next);
                queue.push_back(child);
            }
        }
    }

    distances
}

/// The set of nodes that lie on *every* simple path from `node` back to the
/// primary entry (following reversed edges). `None` when no path exists.
pub fn nodes_on_every_path(
    graph: &LoadOrderGraph,
    node: usize,
    cache: &mut AncestryCache,
) -> Option<AHashSet<usize>> {
    if let Some(cached) = cache.get(&node) {
        return cached.clone();
    }

    let result = enumerate_paths(graph, node);
    cache.insert(node, result.clone());
    result
}

// Explicit-stack DFS over reversed edges; recursion depth here would be
// bounded by the longest simple path, which an adversarial graph can make
// as long as the chunk count.
fn enumerate_paths(graph: &LoadOrderGraph, start: usize) -> Option<AHashSet<usize>> {
    struct Frame {
        node: usize,
        parents: Vec<usize>,
        next: usize,
    }

    let frame = |node: usize| Frame {
        node,
        parents: graph.sorted_parents(node),
        next: 0,
    };

    let mut stack = vec![frame(start)];
    let mut on_path = vec![start];
    let mut on_path_set: AHashSet<usize> = std::iter::once(start).collect();
    let mut common: Option<AHashSet<usize>> = None;

    while let Some(top) = stack.last_mut() {
        if top.node == graph.primary {
            // complete path; keep only nodes present on every one
            let path_set: AHashSet<usize> = on_path.iter().copied().collect();
            common = Some(match common {
                None => path_set,
                Some(prev) => prev.intersection(&path_set).copied().collect(),
            });
            stack.pop();
            let left = on_path.pop().expect("path stack mirrors the DFS stack");
            on_path_set.remove(&left);
            continue;
        }

        if top.next < top.parents.len() {
            let parent = top.parents[top.next];
            top.next += 1;
            if on_path_set.contains(&parent) {
                continue;
            }
            stack.push(frame(parent));
            on_path.push(parent);
            on_path_set.insert(parent);
        } else {
            stack.pop();
            let left = on_path.pop().expect("path stack mirrors the DFS stack");
            on_path_set.remove(&left);
        }
    }

    common
}

/// The deepest node that is an ancestor of every node in `nodes` along all
/// of its paths to the primary entry. Depth is shortest-path distance from
/// the primary entry; ties break lexicographically by node name.
pub fn lowest_common_ancestor(
    graph: &LoadOrderGraph,
    nodes: &[usize],
    distances: &[Option<usize>],
    cache: &mut AncestryCache,
) -> Option<usize> {
    let mut common: Option<AHashSet<usize>> = None;
    for &node in nodes {
        let on_every_path = nodes_on_every_path(graph, node, cache)?;
        common = Some(match common {
            None => on_every_path,
            Some(prev) => prev.intersection(&on_every_path).copied().collect(),
        });
    }

    let common = common?;
    let mut best: Option<(usize, usize)> = None; // (distance, id)
    for &candidate in &common {
        let distance = match distances[candidate] {
            Some(d) => d,
            None => continue,
        };
        best = Some(match best {
            None => (distance, candidate),
            Some((best_distance, best_id)) => {
                let better = distance > best_distance
                    || (distance == best_distance
                        && graph.nodes[candidate].name < graph.nodes[best_id].name);
                if better {
                    (distance, candidate)
                } else {
                    (best_distance, best_id)
                }
            }
        });
    }

    best.map(|(_, id)| id)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graph::{ChunkNode, LoadOrderGraph};
    use ahashmap::AHashSet;
    use std::path::PathBuf;

    // hand-assembled graphs; build_graph is exercised elsewhere
    fn make_graph(names: &[&str], edges: &[(usize, usize)]) -> LoadOrderGraph {
        let mut graph = LoadOrderGraph::default();
        for name in names {
            let mut node = ChunkNode::default();
            node.name = PathBuf::from(name);
            graph.path_to_id.insert(node.name.clone(), graph.nodes.len());
            graph.nodes.push(node);
            graph.children.push(AHashSet::default());
            graph.parents.push(AHashSet::default());
        }
        for &(parent, child) in edges {
            graph.children[parent].insert(child);
            graph.parents[child].insert(parent);
        }
        graph
    }

    #[test]
    fn distances_are_shortest_paths() {
        // 0 -> 1 -> 3, 0 -> 3
        let graph = make_graph(&["/e", "/a", "/b", "/c"], &[(0, 1), (1, 3), (0, 3)]);
        let distances = distances_from_primary(&graph);
        assert_eq!(distances, vec![Some(0), Some(1), None, Some(1)]);
    }

    #[test]
    fn diamond_common_ancestors() {
        // e -> a, e -> b, a -> d, b -> d: only e is on every path from d
        let graph = make_graph(&["/e", "/a", "/b", "/d"], &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let mut cache = AncestryCache::default();
        let on_every = nodes_on_every_path(&graph, 3, &mut cache).unwrap();
        let expected: AHashSet<usize> = [0, 3].into_iter().collect();
        assert_eq!(on_every, expected);
    }

    #[test]
    fn chain_keeps_all_nodes() {
        let graph = make_graph(&["/e", "/a", "/d"], &[(0, 1), (1, 2)]);
        let mut cache = AncestryCache::default();
        let on_every = nodes_on_every_path(&graph, 2, &mut cache).unwrap();
        let expected: AHashSet<usize> = [0, 1, 2].into_iter().collect();
        assert_eq!(on_every, expected);
    }

    #[test]
    fn lca_of_siblings_is_their_parent() {
        // e -> a, a -> b, a -> c
        let graph = make_graph(&["/e", "/a", "/b", "/c"], &[(0, 1), (1, 2), (1, 3)]);
        let distances = distances_from_primary(&graph);
        let mut cache = AncestryCache::default();
        let lca = lowest_common_ancestor(&graph, &[2, 3], &distances, &mut cache).unwrap();
        assert_eq!(lca, 1);
    }

    #[test]
    fn lca_respects_every_path() {
        // e -> a -> b, e -> b directly: a is NOT on every path from b
        let graph = make_graph(&["/e", "/a", "/b"], &[(0, 1), (1, 2), (0, 2)]);
        let distances = distances_from_primary(&graph);
        let mut cache = AncestryCache::default();
        let lca = lowest_common_ancestor(&graph, &[2], &distances, &mut cache).unwrap();
        assert_eq!(lca, 2);

        let lca = lowest_common_ancestor(&graph, &[1, 2], &distances, &mut cache).unwrap();
        assert_eq!(lca, 0);
    }

    #[test]
    fn lca_of_single_node_is_itself() {
        // candidates for {a} are {e, a}; a is deeper and wins
        let graph = make_graph(&["/e", "/a"], &[(0, 1)]);
        let distances = distances_from_primary(&graph);
        let mut cache = AncestryCache::default();
        let lca = lowest_common_ancestor(&graph, &[1], &distances, &mut cache).unwrap();
        assert_eq!(lca, 1);
    }

    #[test]
    fn unreachable_node_has_no_ancestry() {
        let graph = make_graph(&["/e", "/a", "/island"], &[(0, 1)]);
        let mut cache = AncestryCache::default();
        assert_eq!(nodes_on_every_path(&graph, 2, &mut cache), None);
    }

    #[test]
    fn cycle_does_not_hang_enumeration() {
        // e -> a <-> b (back edge between a and b)
        let graph = make_graph(&["/e", "/a", "/b"], &[(0, 1), (1, 2), (2, 1)]);
        let mut cache = AncestryCache::default();
        let on_every = nodes_on_every_path(&graph, 2, &mut cache).unwrap();
        let expected: AHashSet<usize> = [0, 1, 2].into_iter().collect();
        assert_eq!(on_every, expected);
    }
}
