mod data;
mod deps_visitor;

pub use data::{ExtractedDeps, RawRef, StaticDep};
pub use deps_visitor::DepsVisitor;

use std::path::Path;

use ahashmap::AHashSet;
use swc_ecma_ast::Module;
use swc_ecma_visit::VisitWith;

use crate::context::GoogContext;
use crate::error::{Diagnostic, GraphError};

/// Extract the dependency surface of one parsed file: ordered static deps
/// (with legacy namespaces mapped to their providing files), ordered dynamic
/// import targets, and whether the legacy runtime base is needed.
pub fn extract_deps(
    module: &Module,
    file: &Path,
    goog: &GoogContext,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<ExtractedDeps, GraphError> {
    let mut visitor = DepsVisitor::new();
    module.visit_with(&mut visitor);

    for _ in 0..visitor.non_literal_dynamic_imports {
        diagnostics.push(Diagnostic::NonLiteralDynamicImport {
            file: file.to_path_buf(),
        });
    }

    let mut static_deps: Vec<StaticDep> = Vec::new();
    let mut seen = AHashSet::default();
    let mut push_static = |list: &mut Vec<StaticDep>, dep: StaticDep| {
        if seen.insert(dep.clone()) {
            list.push(dep);
        }
    };

    // The base file loads before anything else the file references.
    if visitor.uses_goog_base {
        if let Some(base) = &goog.base_path {
            if base.as_path() != file {
                push_static(&mut static_deps, StaticDep::Path(base.clone()));
            }
        }
    }

    for raw in visitor.static_refs {
        match raw {
            RawRef::Module(specifier) => {
                push_static(&mut static_deps, StaticDep::Specifier(specifier));
            }
            RawRef::Namespace(namespace) => {
                let resolved = goog
                    .deps_map
                    .as_ref()
                    .and_then(|map| map.get(&namespace))
                    .ok_or_else(|| GraphError::UnknownNamespace {
                        namespace: namespace.clone(),
                        file: file.to_path_buf(),
                    })?;
                push_static(&mut static_deps, StaticDep::Path(resolved.clone()));
            }
        }
    }

    let mut dynamic_imports: Vec<String> = Vec::new();
    let mut seen_dynamic = AHashSet::default();
    for specifier in visitor.dynamic_imports {
        if seen_dynamic.insert(specifier.clone()) {
            dynamic_imports.push(specifier);
        }
    }

    Ok(ExtractedDeps {
        static_deps,
        dynamic_imports,
        uses_goog_base: visitor.uses_goog_base,
    })
}
