mod fs;
mod node_resolver;
mod package;

pub use fs::{FileSystem, OsFileSystem};
pub use node_resolver::{
    NodeModulesResolver, Resolution, ResolveError, DEFAULT_ENTRY_FIELDS,
};
pub use package::PackageJson;
