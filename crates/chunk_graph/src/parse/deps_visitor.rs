use ahashmap::AHashSet;
use swc_ecma_ast::{
    BindingIdent, CallExpr, Callee, ExportAll, Id, ImportDecl, Lit, MemberExpr, MemberProp,
    NamedExport,
};
use swc_ecma_visit::{Visit, VisitWith};

use super::data::RawRef;

/// AST walker that records every dependency-bearing construct in source
/// order: import/export declarations, string-literal `require()` calls,
/// `goog.require`/`goog.requireType`, dynamic `import()` expressions, and
/// any `goog.*` member access (which pulls in the legacy runtime base).
#[derive(Debug, Default)]
pub struct DepsVisitor {
    pub static_refs: Vec<RawRef>,
    pub dynamic_imports: Vec<String>,
    pub uses_goog_base: bool,
    pub non_literal_dynamic_imports: usize,
    // local bindings named `require` shadow the CommonJS function
    require_identifiers: AHashSet<Id>,
}

impl DepsVisitor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Visit for DepsVisitor {
    fn visit_import_decl(&mut self, node: &ImportDecl) {
        self.static_refs
            .push(RawRef::Module(node.src.value.to_string()));
        node.visit_children_with(self);
    }

    fn visit_named_export(&mut self, export: &NamedExport) {
        if let Some(src) = &export.src {
            self.static_refs.push(RawRef::Module(src.value.to_string()));
        }
        export.visit_children_with(self);
    }

    fn visit_export_all(&mut self, export: &ExportAll) {
        self.static_refs
            .push(RawRef::Module(export.src.value.to_string()));
        export.visit_children_with(self);
    }

    fn visit_binding_ident(&mut self, binding: &BindingIdent) {
        if binding.sym.as_ref() == "require" {
            self.require_identifiers.insert(binding.id.to_id());
        }
        binding.visit_children_with(self);
    }

    fn visit_member_expr(&mut self, member: &MemberExpr) {
        if let Some(obj) = member.obj.as_ident() {
            if obj.sym.as_ref() == "goog" {
                self.uses_goog_base = true;
            }
        }
        member.visit_children_with(self);
    }

    fn visit_call_expr(&mut self, expr: &CallExpr) {
        match &expr.callee {
            Callee::Import(_) => match single_str_arg(expr) {
                Some(specifier) => self.dynamic_imports.push(specifier),
                None => self.non_literal_dynamic_imports += 1,
            },
            Callee::Expr(callee) => {
                if let Some(ident) = callee.as_ident() {
                    if ident.sym.as_ref() == "require"
                        && !self.require_identifiers.contains(&ident.to_id())
                    {
                        if let Some(specifier) = single_str_arg(expr) {
                            self.static_refs.push(RawRef::Module(specifier));
                        }
                    }
                } else if let Some(namespace) = goog_require_arg(callee, expr) {
                    self.static_refs.push(RawRef::Namespace(namespace));
                }
            }
            Callee::Super(_) => {}
        }
        expr.visit_children_with(self);
    }
}

/// The call's single argument when it is a string literal.
fn single_str_arg(expr: &CallExpr) -> Option<String> {
    if expr.args.len() != 1 {
        return None;
    }
    let arg = expr.args.first()?;
    if arg.spread.is_some() {
        return None;
    }
    match arg.expr.as_lit() {
        Some(Lit::Str(value)) => Some(value.value.to_string()),
        _ => None,
    }
}

/// The namespace argument of a `goog.require("...")` or
/// `goog.requireType("...")` call.
fn goog_require_arg(callee: &swc_ecma_ast::Expr, expr: &CallExpr) -> Option<String> {
    let member = callee.as_member()?;
    let obj = member.obj.as_ident()?;
    if obj.sym.as_ref() != "goog" {
        return None;
    }
    let prop = match &member.prop {
        MemberProp::Ident(prop) => prop.sym.as_ref(),
        _ => return None,
    };
    if prop != "require" && prop != "requireType" {
        return None;
    }
    single_str_arg(expr)
}
