use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ahashmap::AHashMap;
use goog_deps::GoogDepsMap;
use module_resolver::{FileSystem, NodeModulesResolver};

use crate::error::Diagnostic;
use crate::walker::DirectDeps;

/// Cooperative cancellation handle. The walker checks it before opening
/// each new file; the file currently being processed runs to completion.
#[derive(Debug, Default, Clone)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Legacy-namespace context threaded through extraction.
#[derive(Debug, Default, Clone)]
pub struct GoogContext {
    /// The legacy runtime base file, prepended to the static deps of any
    /// file that references `goog.*`.
    pub base_path: Option<PathBuf>,
    /// namespace -> providing file, when any deps source was configured.
    pub deps_map: Option<GoogDepsMap>,
}

/// Per-build state: caches, configuration-derived helpers, and collected
/// diagnostics. Built once per calculation and shared by both graph-build
/// passes; nothing here is process-global.
pub struct BuildContext<'a> {
    pub fs: &'a dyn FileSystem,
    pub resolver: NodeModulesResolver<'a>,
    pub goog: GoogContext,
    pub file_deps_cache: AHashMap<PathBuf, DirectDeps>,
    pub diagnostics: Vec<Diagnostic>,
    pub cancel: CancelFlag,
}

impl<'a> BuildContext<'a> {
    pub fn new(
        fs: &'a dyn FileSystem,
        resolver: NodeModulesResolver<'a>,
        goog: GoogContext,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            fs,
            resolver,
            goog,
            file_deps_cache: AHashMap::default(),
            diagnostics: Vec::new(),
            cancel,
        }
    }
}
