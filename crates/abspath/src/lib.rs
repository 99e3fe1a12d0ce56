use path_clean::PathClean;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Base path is not absolute")]
    BasePathNotAbsolute,
}

/// Join `path` onto `base` and normalize the result without touching the
/// filesystem. Symlink components survive: this cleans `.` and `..`
/// lexically rather than canonicalizing.
pub fn join_abspath(base: impl AsRef<Path>, path: impl AsRef<Path>) -> Result<PathBuf, Error> {
    let base = base.as_ref();
    let path = path.as_ref();
    if !base.is_absolute() {
        return Err(Error::BasePathNotAbsolute);
    }

    let absolute_path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
    .clean();

    Ok(absolute_path)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn joins_relative_onto_base() {
        assert_eq!(
            join_abspath("/repo/src", "./lib/../util.js").unwrap(),
            PathBuf::from("/repo/src/util.js")
        );
    }

    #[test]
    fn passes_through_absolute() {
        assert_eq!(
            join_abspath("/repo", "/other/a.js").unwrap(),
            PathBuf::from("/other/a.js")
        );
    }

    #[test]
    fn rejects_relative_base() {
        assert!(join_abspath("repo", "a.js").is_err());
    }
}
