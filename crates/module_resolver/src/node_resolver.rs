//! Node-style module resolution over a [`FileSystem`] capability.
//!
//! Based on the classic node-resolve algorithm: relative and absolute
//! specifiers resolve against the referring file's directory, bare
//! specifiers climb `node_modules` folders. Resolved paths preserve symlink
//! components; nothing is canonicalized beyond lexical cleaning.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use abspath::join_abspath;
use ahashmap::AHashMap;
use tracing::trace;

use crate::fs::FileSystem;
use crate::package::PackageJson;

/// Entry fields consulted on a package.json, in preference order.
pub const DEFAULT_ENTRY_FIELDS: &[&str] = &["browser", "module", "main"];

static EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "json"];

const NODE_MODULES: &str = "node_modules";
const PACKAGE: &str = "package.json";

/// A successful resolution. `package_json` is populated for package-root
/// bare specifiers so the package's metadata file can itself be carried as a
/// source of the referring chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub path: PathBuf,
    pub package_json: Option<PathBuf>,
}

#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    #[error("failed to resolve module \"{specifier}\" from {}", from.display())]
    UnresolvedModule { specifier: String, from: PathBuf },
    #[error(transparent)]
    BadBasePath(#[from] abspath::Error),
}

// Per-node_modules-directory memo of bare specifier lookups, so repeated
// imports of the same package don't re-probe the filesystem.
#[derive(Clone, Debug, Eq, PartialEq)]
enum CachedResolution {
    Resolution(PathBuf),
    NoResolution,
}

/// Resolver for one build. Caches are interior so the resolver can be shared
/// immutably; the core pipeline is single-threaded so `RefCell` suffices.
pub struct NodeModulesResolver<'a> {
    fs: &'a dyn FileSystem,
    base_directory: PathBuf,
    entry_fields: Vec<String>,

    // package.json files discovered during resolution, keyed by file path
    pkg_json_cache: RefCell<AHashMap<PathBuf, Option<Rc<PackageJson>>>>,
    // bare specifier lookups, keyed by (directory holding node_modules, specifier)
    node_modules_cache: RefCell<AHashMap<(PathBuf, String), CachedResolution>>,
}

impl<'a> NodeModulesResolver<'a> {
    pub fn new(
        fs: &'a dyn FileSystem,
        base_directory: impl Into<PathBuf>,
        entry_fields: Vec<String>,
    ) -> Self {
        Self {
            fs,
            base_directory: base_directory.into(),
            entry_fields,
            pkg_json_cache: RefCell::new(AHashMap::default()),
            node_modules_cache: RefCell::new(AHashMap::default()),
        }
    }

    pub fn with_default_entry_fields(fs: &'a dyn FileSystem, base_directory: impl Into<PathBuf>) -> Self {
        Self::new(
            fs,
            base_directory,
            DEFAULT_ENTRY_FIELDS.iter().map(|s| s.to_string()).collect(),
        )
    }

    /// Resolve `specifier` as referenced from the file at `from`.
    pub fn resolve(&self, from: &Path, specifier: &str) -> Result<Resolution, ResolveError> {
        trace!("resolve({}, {})", from.display(), specifier);

        let from_dir = from.parent().unwrap_or_else(|| Path::new("/"));

        if specifier.starts_with('.') || Path::new(specifier).is_absolute() {
            let target = join_abspath(from_dir, specifier)?;
            if let Some(path) = self
                .resolve_as_file(&target)
                .or_else(|| self.resolve_as_directory(&target, true))
            {
                return Ok(Resolution {
                    path,
                    package_json: None,
                });
            }
        } else if let Some(path) = self.resolve_node_modules(from_dir, specifier) {
            return Ok(Resolution {
                path,
                package_json: self.package_json_for(specifier),
            });
        }

        Err(ResolveError::UnresolvedModule {
            specifier: specifier.to_string(),
            from: from.to_path_buf(),
        })
    }

    /// Resolve a path as a file. If `path` refers to a file it is returned;
    /// otherwise `path` + each known extension is tried.
    fn resolve_as_file(&self, path: &Path) -> Option<PathBuf> {
        if self.fs.is_file(path) {
            return Some(path.to_path_buf());
        }

        let name = path.file_name()?.to_string_lossy().into_owned();
        let mut ext_path = path.to_path_buf();
        for ext in EXTENSIONS {
            ext_path.set_file_name(format!("{}.{}", name, ext));
            if self.fs.is_file(&ext_path) {
                return Some(ext_path);
            }
        }

        None
    }

    /// Resolve a path as a directory, using the entry field from a
    /// package.json file if it exists, or the index.EXT file if it exists.
    fn resolve_as_directory(&self, path: &Path, allow_package_entry: bool) -> Option<PathBuf> {
        let pkg_path = path.join(PACKAGE);
        if allow_package_entry && self.fs.is_file(&pkg_path) {
            if let Some(main) = self.resolve_package_entry(path, &pkg_path) {
                return Some(main);
            }
        }

        for ext in EXTENSIONS {
            let ext_path = path.join(format!("index.{}", ext));
            if self.fs.is_file(&ext_path) {
                return Some(ext_path);
            }
        }
        None
    }

    /// Resolve using the package.json entry fields, in configured order.
    fn resolve_package_entry(&self, pkg_dir: &Path, pkg_path: &Path) -> Option<PathBuf> {
        let pkg = self.read_package_json(pkg_path)?;
        let entry = pkg.entry_field(&self.entry_fields)?;

        let target = pkg_dir.join(entry);
        self.resolve_as_file(&target)
            .or_else(|| self.resolve_as_directory(&target, false))
    }

    /// Resolve by walking up node_modules folders from `base_dir`.
    fn resolve_node_modules(&self, base_dir: &Path, target: &str) -> Option<PathBuf> {
        let mut dir = Some(base_dir);
        while let Some(current) = dir {
            let key = (current.to_path_buf(), target.to_string());
            let cached = self.node_modules_cache.borrow().get(&key).cloned();
            match cached {
                Some(CachedResolution::Resolution(path)) => return Some(path),
                Some(CachedResolution::NoResolution) => {}
                None => {
                    let candidate = current.join(NODE_MODULES).join(target);
                    let resolved = self
                        .resolve_as_file(&candidate)
                        .or_else(|| self.resolve_as_directory(&candidate, true));
                    match resolved {
                        Some(path) => {
                            self.node_modules_cache
                                .borrow_mut()
                                .insert(key, CachedResolution::Resolution(path.clone()));
                            return Some(path);
                        }
                        None => {
                            self.node_modules_cache
                                .borrow_mut()
                                .insert(key, CachedResolution::NoResolution);
                        }
                    }
                }
            }
            dir = current.parent();
        }

        None
    }

    /// Locate the metadata file of the package a bare specifier names,
    /// anchored at the configured base directory. Only package-root
    /// specifiers (`pkg`, `@scope/pkg`) have one; deep imports don't.
    fn package_json_for(&self, specifier: &str) -> Option<PathBuf> {
        if !is_package_root_specifier(specifier) {
            return None;
        }

        let mut dir = Some(self.base_directory.as_path());
        while let Some(current) = dir {
            let candidate = current.join(NODE_MODULES).join(specifier).join(PACKAGE);
            if self.fs.is_file(&candidate) {
                return Some(candidate);
            }
            dir = current.parent();
        }
        None
    }

    fn read_package_json(&self, pkg_path: &Path) -> Option<Rc<PackageJson>> {
        if let Some(cached) = self.pkg_json_cache.borrow().get(pkg_path) {
            return cached.clone();
        }

        let parsed = match self.fs.read_to_string(pkg_path) {
            Ok(contents) => match PackageJson::parse(&contents) {
                Ok(pkg) => Some(Rc::new(pkg)),
                Err(e) => {
                    trace!("ignoring malformed {}: {}", pkg_path.display(), e);
                    None
                }
            },
            Err(_) => None,
        };

        self.pkg_json_cache
            .borrow_mut()
            .insert(pkg_path.to_path_buf(), parsed.clone());
        parsed
    }
}

/// True for specifiers that name a package root: a single path segment, or
/// exactly two segments where the first is a scope (`@scope/pkg`).
fn is_package_root_specifier(specifier: &str) -> bool {
    let segments: Vec<&str> = specifier.split('/').collect();
    match segments.len() {
        1 => !segments[0].is_empty(),
        2 => segments[0].starts_with('@'),
        _ => false,
    }
}
