//! Parser for closure-style dependency files.
//!
//! A deps file is a plain script of top-level `goog.addDependency(relPath,
//! [namespace, ...], ...)` calls, usually machine-generated. Only those
//! calls are interpreted; every other statement is ignored.

use std::path::{Path, PathBuf};

use abspath::join_abspath;
use ahashmap::AHashMap;
use ecma_parse::{parse_ecma_src, parse_error_message};
use swc_ecma_ast::{Callee, Expr, Lit, MemberProp, ModuleItem, Stmt};

use crate::error::DepsFileError;

/// Mapping from provided namespace to the absolute path of the file that
/// provides it.
pub type GoogDepsMap = AHashMap<String, PathBuf>;

/// Parse the contents of one deps file. Relative paths in the file join
/// against `base_dir`.
pub fn parse_deps_src(
    file: &Path,
    contents: &str,
    base_dir: &Path,
) -> Result<GoogDepsMap, DepsFileError> {
    let (_, module) = parse_ecma_src(file.display().to_string(), contents).map_err(|e| {
        DepsFileError::InvalidDepsFile {
            file: file.to_path_buf(),
            message: parse_error_message(&e),
        }
    })?;

    let mut deps = GoogDepsMap::default();
    for item in &module.body {
        let stmt = match item {
            ModuleItem::Stmt(stmt) => stmt,
            ModuleItem::ModuleDecl(_) => continue,
        };
        let call = match stmt {
            Stmt::Expr(expr_stmt) => match &*expr_stmt.expr {
                Expr::Call(call) => call,
                _ => continue,
            },
            _ => continue,
        };

        if !is_add_dependency_callee(&call.callee) {
            continue;
        }

        let rel_path = match call.args.first().and_then(|arg| as_str_lit(&arg.expr)) {
            Some(path) => path,
            None => continue,
        };
        let namespaces = match call.args.get(1).map(|arg| &*arg.expr) {
            Some(Expr::Array(array)) => array,
            _ => continue,
        };

        let abs_path = join_abspath(base_dir, &rel_path)?;
        for element in namespaces.elems.iter().flatten() {
            if let Some(namespace) = as_str_lit(&element.expr) {
                deps.insert(namespace, abs_path.clone());
            }
        }
    }

    Ok(deps)
}

fn is_add_dependency_callee(callee: &Callee) -> bool {
    let expr = match callee {
        Callee::Expr(expr) => expr,
        _ => return false,
    };
    let member = match expr.as_member() {
        Some(member) => member,
        None => return false,
    };
    let obj_is_goog = member
        .obj
        .as_ident()
        .map(|ident| ident.sym.as_ref() == "goog")
        .unwrap_or(false);
    let prop_is_add_dependency = match &member.prop {
        MemberProp::Ident(prop) => prop.sym.as_ref() == "addDependency",
        _ => false,
    };
    obj_is_goog && prop_is_add_dependency
}

fn as_str_lit(expr: &Expr) -> Option<String> {
    match expr.as_lit() {
        Some(Lit::Str(value)) => Some(value.value.to_string()),
        _ => None,
    }
}
