use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum DepsFileError {
    #[error("failed to parse closure deps file {}: {message}", file.display())]
    InvalidDepsFile { file: PathBuf, message: String },
    #[error(transparent)]
    BadBasePath(#[from] abspath::Error),
}
