use std::fmt::Display;
use std::path::PathBuf;

use module_resolver::ResolveError;

/// Fatal failures. Everything here aborts the build; recoverable findings
/// are [`Diagnostic`]s instead.
#[derive(thiserror::Error, Debug)]
pub enum GraphError {
    #[error("failed to resolve module \"{specifier}\" from {}", from.display())]
    UnresolvedModule { specifier: String, from: PathBuf },

    #[error("unknown closure namespace \"{namespace}\" referenced from {}", file.display())]
    UnknownNamespace { namespace: String, file: PathBuf },

    #[error(transparent)]
    InvalidDepsFile(#[from] goog_deps::DepsFileError),

    #[error("failed to read {}: {source}", file.display())]
    ReadFile {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("at least one entry point is required")]
    NoEntrypoints,

    #[error("unknown parent {} for manual entry point {}", parent.display(), child.display())]
    UnknownManualParent { parent: PathBuf, child: PathBuf },

    #[error("chunk dependency graph contains a cycle through {}", chunk.display())]
    CyclicChunkGraph { chunk: PathBuf },

    #[error("unable to order chunks: no progress after emitting {emitted} of {total}")]
    UnsortableChunks { emitted: usize, total: usize },

    #[error("build cancelled")]
    BuildCancelled,

    #[error(transparent)]
    BadBasePath(#[from] abspath::Error),
}

impl From<ResolveError> for GraphError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::UnresolvedModule { specifier, from } => {
                GraphError::UnresolvedModule { specifier, from }
            }
            ResolveError::BadBasePath(e) => GraphError::BadBasePath(e),
        }
    }
}

/// Non-fatal findings collected during a build. `ChunkEntrypointMissing`
/// still causes the run to report failure after producing output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    FileParseFailure { file: PathBuf, message: String },
    NonLiteralDynamicImport { file: PathBuf },
    ChunkEntrypointMissing {
        chunk: PathBuf,
        referenced_by: Vec<PathBuf>,
    },
}

impl Diagnostic {
    /// Diagnostics that make the whole run exit with an error status even
    /// though output was produced.
    pub fn is_error(&self) -> bool {
        matches!(self, Diagnostic::ChunkEntrypointMissing { .. })
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::FileParseFailure { file, message } => {
                write!(f, "failed to parse {}: {}", file.display(), message)
            }
            Diagnostic::NonLiteralDynamicImport { file } => {
                write!(
                    f,
                    "ignoring dynamic import with non-literal argument in {}",
                    file.display()
                )
            }
            Diagnostic::ChunkEntrypointMissing { chunk, referenced_by } => {
                write!(
                    f,
                    "chunk entry file {} is not among its own sources; referenced synchronously by: {}",
                    chunk.display(),
                    referenced_by
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
        }
    }
}
