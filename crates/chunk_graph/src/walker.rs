//! Transitive static-dependency walker with per-file memoization.

use std::path::{Path, PathBuf};

use ahashmap::{AHashMap, AHashSet};
use ecma_parse::{parse_ecma_src, parse_error_message};
use tracing::debug;

use crate::context::BuildContext;
use crate::error::{Diagnostic, GraphError};
use crate::logger::Logger;
use crate::parse::{extract_deps, StaticDep};

/// Sources a previous normalization pass decided to move, keyed by the
/// entry file of the chunk that now owns them.
pub type HoistMap = AHashMap<PathBuf, Vec<PathBuf>>;

/// The walk result for one file.
///
/// `deps` lists each reachable file exactly once, referrer before the
/// files it pulls in; the chunk builder reverses the accumulated sequence
/// once at the end to obtain a dependencies-first load order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDepInfo {
    pub file: PathBuf,
    pub deps: Vec<PathBuf>,
    pub child_chunks: Vec<PathBuf>,
}

/// Direct (non-transitive) results of parsing + resolving one file, cached
/// per absolute path for the lifetime of a build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectDeps {
    pub static_deps: Vec<PathBuf>,
    pub child_chunks: Vec<PathBuf>,
}

pub(crate) fn push_unique(list: &mut Vec<PathBuf>, path: PathBuf) {
    if !list.contains(&path) {
        list.push(path);
    }
}

/// Collect the transitive static dependencies and observed dynamic-import
/// children of `file`.
pub fn walk_file(
    ctx: &mut BuildContext,
    logger: impl Logger,
    file: &Path,
    hoist_map: &HoistMap,
) -> Result<FileDepInfo, GraphError> {
    let mut visited = AHashSet::default();
    let mut deps = Vec::new();
    let mut child_chunks = Vec::new();
    visit(
        ctx,
        logger,
        file,
        hoist_map,
        &mut visited,
        &mut deps,
        &mut child_chunks,
    )?;

    Ok(FileDepInfo {
        file: file.to_path_buf(),
        deps,
        child_chunks,
    })
}

fn visit(
    ctx: &mut BuildContext,
    logger: impl Logger,
    file: &Path,
    hoist_map: &HoistMap,
    visited: &mut AHashSet<PathBuf>,
    deps: &mut Vec<PathBuf>,
    child_chunks: &mut Vec<PathBuf>,
) -> Result<(), GraphError> {
    if visited.contains(file) {
        return Ok(());
    }
    if ctx.cancel.is_cancelled() {
        return Err(GraphError::BuildCancelled);
    }
    visited.insert(file.to_path_buf());
    deps.push(file.to_path_buf());

    let direct = direct_deps(ctx, logger, file)?;

    let mut static_deps = direct.static_deps;
    if let Some(hoisted) = hoist_map.get(file) {
        for path in hoisted {
            push_unique(&mut static_deps, path.clone());
        }
    }

    for child in direct.child_chunks {
        push_unique(child_chunks, child);
    }

    // Reverse exploration order so the final per-chunk reverse restores
    // source order among siblings.
    for dep in static_deps.iter().rev() {
        if dep.as_path() == file {
            // self-import is a no-op
            continue;
        }
        visit(ctx, logger, dep, hoist_map, visited, deps, child_chunks)?;
    }

    Ok(())
}

fn direct_deps(
    ctx: &mut BuildContext,
    logger: impl Logger,
    file: &Path,
) -> Result<DirectDeps, GraphError> {
    if let Some(cached) = ctx.file_deps_cache.get(file) {
        return Ok(cached.clone());
    }

    let computed = compute_direct_deps(ctx, logger, file)?;
    ctx.file_deps_cache
        .insert(file.to_path_buf(), computed.clone());
    Ok(computed)
}

fn compute_direct_deps(
    ctx: &mut BuildContext,
    logger: impl Logger,
    file: &Path,
) -> Result<DirectDeps, GraphError> {
    debug!("walking {}", file.display());

    // metadata files are carried as sources but never parsed
    if is_metadata_file(file) {
        return Ok(DirectDeps::default());
    }

    let contents = ctx
        .fs
        .read_to_string(file)
        .map_err(|source| GraphError::ReadFile {
            file: file.to_path_buf(),
            source,
        })?;

    let module = match parse_ecma_src(file.display().to_string(), contents) {
        Ok((_, module)) => module,
        Err(e) => {
            let message = parse_error_message(&e);
            logger.log(format!("failed to parse {}: {}", file.display(), message));
            ctx.diagnostics.push(Diagnostic::FileParseFailure {
                file: file.to_path_buf(),
                message,
            });
            return Ok(DirectDeps::default());
        }
    };

    let extracted = extract_deps(&module, file, &ctx.goog, &mut ctx.diagnostics)?;

    let mut static_deps = Vec::new();
    for dep in extracted.static_deps {
        match dep {
            StaticDep::Specifier(specifier) => {
                let resolution = ctx.resolver.resolve(file, &specifier)?;
                push_unique(&mut static_deps, resolution.path);
                if let Some(pkg_json) = resolution.package_json {
                    push_unique(&mut static_deps, pkg_json);
                }
            }
            StaticDep::Path(path) => push_unique(&mut static_deps, path),
        }
    }

    let mut child_chunks = Vec::new();
    for specifier in extracted.dynamic_imports {
        let resolution = ctx.resolver.resolve(file, &specifier)?;
        push_unique(&mut child_chunks, resolution.path);
    }

    Ok(DirectDeps {
        static_deps,
        child_chunks,
    })
}

fn is_metadata_file(file: &Path) -> bool {
    file.extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::context::{CancelFlag, GoogContext};
    use crate::logger::VecLogger;
    use module_resolver::{NodeModulesResolver, OsFileSystem};
    use pretty_assertions::assert_eq;
    use test_tmpdir::{test_tmpdir, TmpDir};

    fn build_ctx<'a>(fs: &'a OsFileSystem, tmpdir: &TmpDir) -> BuildContext<'a> {
        let resolver = NodeModulesResolver::with_default_entry_fields(fs, tmpdir.root());
        BuildContext::new(fs, resolver, GoogContext::default(), CancelFlag::new())
    }

    #[test]
    fn walks_transitive_static_deps() {
        let tmpdir = test_tmpdir!(
            "a.js" => "import './b.js';",
            "b.js" => "import './c.js';",
            "c.js" => ""
        );
        let fs = OsFileSystem;
        let mut ctx = build_ctx(&fs, &tmpdir);
        let logger = VecLogger::new();

        let info = walk_file(&mut ctx, &logger, &tmpdir.root_join("a.js"), &HoistMap::default())
            .unwrap();
        assert_eq!(
            info.deps,
            vec![
                tmpdir.root_join("a.js"),
                tmpdir.root_join("b.js"),
                tmpdir.root_join("c.js"),
            ]
        );
        assert_eq!(info.child_chunks, Vec::<std::path::PathBuf>::new());
    }

    #[test]
    fn collects_child_chunks_without_descending() {
        let tmpdir = test_tmpdir!(
            "a.js" => "import('./lazy.js');",
            "lazy.js" => "import './inner.js';",
            "inner.js" => ""
        );
        let fs = OsFileSystem;
        let mut ctx = build_ctx(&fs, &tmpdir);
        let logger = VecLogger::new();

        let info = walk_file(&mut ctx, &logger, &tmpdir.root_join("a.js"), &HoistMap::default())
            .unwrap();
        assert_eq!(info.deps, vec![tmpdir.root_join("a.js")]);
        assert_eq!(info.child_chunks, vec![tmpdir.root_join("lazy.js")]);
    }

    #[test]
    fn import_cycles_terminate() {
        let tmpdir = test_tmpdir!(
            "a.js" => "import './b.js';",
            "b.js" => "import './a.js';"
        );
        let fs = OsFileSystem;
        let mut ctx = build_ctx(&fs, &tmpdir);
        let logger = VecLogger::new();

        let info = walk_file(&mut ctx, &logger, &tmpdir.root_join("a.js"), &HoistMap::default())
            .unwrap();
        assert_eq!(
            info.deps,
            vec![tmpdir.root_join("a.js"), tmpdir.root_join("b.js")]
        );
    }

    #[test]
    fn hoisted_sources_are_appended() {
        let tmpdir = test_tmpdir!(
            "a.js" => "",
            "shared.js" => ""
        );
        let fs = OsFileSystem;
        let mut ctx = build_ctx(&fs, &tmpdir);
        let logger = VecLogger::new();

        let mut hoist_map = HoistMap::default();
        hoist_map.insert(tmpdir.root_join("a.js"), vec![tmpdir.root_join("shared.js")]);

        let info =
            walk_file(&mut ctx, &logger, &tmpdir.root_join("a.js"), &hoist_map).unwrap();
        assert_eq!(
            info.deps,
            vec![tmpdir.root_join("a.js"), tmpdir.root_join("shared.js")]
        );
    }

    #[test]
    fn unparseable_file_records_diagnostic_with_empty_deps() {
        let tmpdir = test_tmpdir!(
            "a.js" => "import './broken.js';",
            "broken.js" => "import {"
        );
        let fs = OsFileSystem;
        let mut ctx = build_ctx(&fs, &tmpdir);
        let logger = VecLogger::new();

        let info = walk_file(&mut ctx, &logger, &tmpdir.root_join("a.js"), &HoistMap::default())
            .unwrap();
        assert_eq!(
            info.deps,
            vec![tmpdir.root_join("a.js"), tmpdir.root_join("broken.js")]
        );
        assert!(matches!(
            ctx.diagnostics.as_slice(),
            [Diagnostic::FileParseFailure { .. }]
        ));
        assert_eq!(logger.logs().len(), 1);
    }

    #[test]
    fn unresolved_module_is_fatal() {
        let tmpdir = test_tmpdir!(
            "a.js" => "import './missing.js';"
        );
        let fs = OsFileSystem;
        let mut ctx = build_ctx(&fs, &tmpdir);
        let logger = VecLogger::new();

        let err = walk_file(&mut ctx, &logger, &tmpdir.root_join("a.js"), &HoistMap::default())
            .unwrap_err();
        assert!(matches!(err, GraphError::UnresolvedModule { .. }));
    }

    #[test]
    fn package_json_of_bare_import_becomes_a_dep() {
        let tmpdir = test_tmpdir!(
            "a.js" => "import 'dep';",
            "node_modules/dep/package.json" => r#"{ "main": "./index.js" }"#,
            "node_modules/dep/index.js" => ""
        );
        let fs = OsFileSystem;
        let mut ctx = build_ctx(&fs, &tmpdir);
        let logger = VecLogger::new();

        let info = walk_file(&mut ctx, &logger, &tmpdir.root_join("a.js"), &HoistMap::default())
            .unwrap();
        assert_eq!(
            info.deps,
            vec![
                tmpdir.root_join("a.js"),
                tmpdir.root_join("node_modules/dep/package.json"),
                tmpdir.root_join("node_modules/dep/index.js"),
            ]
        );
    }

    #[test]
    fn cancellation_stops_before_next_file() {
        let tmpdir = test_tmpdir!(
            "a.js" => "import './b.js';",
            "b.js" => ""
        );
        let fs = OsFileSystem;
        let mut ctx = build_ctx(&fs, &tmpdir);
        ctx.cancel.cancel();
        let logger = VecLogger::new();

        let err = walk_file(&mut ctx, &logger, &tmpdir.root_join("a.js"), &HoistMap::default())
            .unwrap_err();
        assert!(matches!(err, GraphError::BuildCancelled));
    }
}
