use std::path::PathBuf;

/// A reference as it appears in source, before namespace mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RawRef {
    /// A module specifier from an import/export/require form.
    Module(String),
    /// A `goog.require`/`goog.requireType` namespace.
    Namespace(String),
}

/// A static dependency after extraction. Namespace references and the
/// legacy base file arrive as concrete paths; everything else is a
/// specifier for the module resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StaticDep {
    Specifier(String),
    Path(PathBuf),
}

/// Extraction result for one file. Sequences preserve source order with
/// first-occurrence dedup.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractedDeps {
    pub static_deps: Vec<StaticDep>,
    pub dynamic_imports: Vec<String>,
    pub uses_goog_base: bool,
}
