//! Enforces single ownership of every source file by hoisting shared
//! sources into the lowest common ancestor of their owners.

use std::collections::BTreeMap;
use std::path::PathBuf;

use ahashmap::{AHashMap, AHashSet};

use crate::ancestry::{distances_from_primary, lowest_common_ancestor, AncestryCache};
use crate::graph::LoadOrderGraph;
use crate::logger::Logger;
use crate::walker::HoistMap;

/// Move every multi-owned source into the LCA of its owners, deleting it
/// from the other owners' `sources`. Returns the hoist map that must feed
/// the rebuild pass; graph topology is left untouched.
pub fn normalize(graph: &mut LoadOrderGraph, logger: impl Logger) -> HoistMap {
    // owners of each source, in node-id order
    let mut owners_by_source: AHashMap<PathBuf, Vec<usize>> = AHashMap::default();
    for (id, node) in graph.nodes.iter().enumerate() {
        for source in &node.sources {
            owners_by_source.entry(source.clone()).or_default().push(id);
        }
    }

    // group shared sources by their exact owner set; BTreeMap keys plus the
    // node-scan discovery order keep everything deterministic
    let mut groups: BTreeMap<Vec<usize>, Vec<PathBuf>> = BTreeMap::new();
    let mut grouped: AHashSet<PathBuf> = AHashSet::default();
    for node in &graph.nodes {
        for source in &node.sources {
            let owners = &owners_by_source[source];
            if owners.len() < 2 || !grouped.insert(source.clone()) {
                continue;
            }
            groups.entry(owners.clone()).or_default().push(source.clone());
        }
    }

    let distances = distances_from_primary(graph);
    let mut cache = AncestryCache::default();
    let mut hoist_map = HoistMap::default();

    for (owners, sources) in groups {
        let lca = match lowest_common_ancestor(graph, &owners, &distances, &mut cache) {
            Some(lca) => lca,
            None => {
                logger.log(format!(
                    "cannot hoist {} shared source(s): owners have no common ancestor",
                    sources.len()
                ));
                continue;
            }
        };

        let lca_name = graph.nodes[lca].name.clone();
        let hoisted = hoist_map.entry(lca_name).or_default();
        for source in sources {
            if !hoisted.contains(&source) {
                hoisted.push(source.clone());
            }
            for &owner in &owners {
                if owner != lca {
                    graph.nodes[owner].remove_source(&source);
                }
            }
        }
    }

    hoist_map
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cfg::EntryPoint;
    use crate::context::{BuildContext, CancelFlag, GoogContext};
    use crate::graph::build_graph;
    use crate::logger::VecLogger;
    use crate::walker::HoistMap;
    use module_resolver::{NodeModulesResolver, OsFileSystem};
    use pretty_assertions::assert_eq;
    use test_tmpdir::{test_tmpdir, TmpDir};

    fn build<'a>(
        fs: &'a OsFileSystem,
        tmpdir: &TmpDir,
        entry_names: &[&str],
        hoist_map: &HoistMap,
    ) -> (BuildContext<'a>, crate::graph::LoadOrderGraph) {
        let resolver = NodeModulesResolver::with_default_entry_fields(fs, tmpdir.root());
        let mut ctx = BuildContext::new(fs, resolver, GoogContext::default(), CancelFlag::new());
        let logger = VecLogger::new();
        let entries: Vec<EntryPoint> = entry_names
            .iter()
            .map(|name| EntryPoint::from_file(tmpdir.root_join(name)))
            .collect();
        let graph = build_graph(&mut ctx, &logger, &entries, &[], hoist_map).unwrap();
        (ctx, graph)
    }

    #[test]
    fn shared_source_hoists_to_parent() {
        let tmpdir = test_tmpdir!(
            "a.js" => "import('./b.js'); import('./c.js');",
            "b.js" => "import './shared.js';",
            "c.js" => "import './shared.js';",
            "shared.js" => ""
        );
        let fs = OsFileSystem;
        let (_, mut graph) = build(&fs, &tmpdir, &["a.js"], &HoistMap::default());
        let logger = VecLogger::new();

        let hoist_map = normalize(&mut graph, &logger);

        let a = tmpdir.root_join("a.js");
        let shared = tmpdir.root_join("shared.js");
        assert_eq!(hoist_map.len(), 1);
        assert_eq!(hoist_map[&a], vec![shared.clone()]);

        // shared was deleted from both former owners
        let b = graph.node_id(&tmpdir.root_join("b.js")).unwrap();
        let c = graph.node_id(&tmpdir.root_join("c.js")).unwrap();
        assert!(!graph.nodes[b].contains_source(&shared));
        assert!(!graph.nodes[c].contains_source(&shared));
    }

    #[test]
    fn rebuild_with_hoists_converges() {
        let tmpdir = test_tmpdir!(
            "a.js" => "import('./b.js'); import('./c.js');",
            "b.js" => "import './shared.js';",
            "c.js" => "import './shared.js';",
            "shared.js" => ""
        );
        let fs = OsFileSystem;
        let (_, mut graph) = build(&fs, &tmpdir, &["a.js"], &HoistMap::default());
        let logger = VecLogger::new();
        let hoist_map = normalize(&mut graph, &logger);

        let (_, mut rebuilt) = build(&fs, &tmpdir, &["a.js"], &hoist_map);
        normalize(&mut rebuilt, &logger);

        let a = rebuilt.node_id(&tmpdir.root_join("a.js")).unwrap();
        let shared = tmpdir.root_join("shared.js");
        assert!(rebuilt.nodes[a].contains_source(&shared));
        assert_eq!(
            rebuilt.nodes[a].sources,
            vec![shared, tmpdir.root_join("a.js")]
        );

        // every source now has exactly one owner, so a further pass is a no-op
        let empty = normalize(&mut rebuilt, &logger);
        assert!(empty.is_empty());
    }

    #[test]
    fn unshared_sources_are_untouched() {
        let tmpdir = test_tmpdir!(
            "a.js" => "import('./b.js'); import './own.js';",
            "b.js" => "",
            "own.js" => ""
        );
        let fs = OsFileSystem;
        let (_, mut graph) = build(&fs, &tmpdir, &["a.js"], &HoistMap::default());
        let logger = VecLogger::new();

        let hoist_map = normalize(&mut graph, &logger);
        assert!(hoist_map.is_empty());

        let a = graph.primary;
        assert_eq!(
            graph.nodes[a].sources,
            vec![tmpdir.root_join("own.js"), tmpdir.root_join("a.js")]
        );
    }
}
