//! Shared aliases for the hash containers used across the workspace.
//!
//! Everything graph-shaped here is keyed by absolute paths, so the maps are
//! hot; ahash is measurably faster than SipHash for these keys. Iteration
//! order of these containers is unspecified -- code that needs a stable
//! order must use `Vec`/`BTreeMap` instead.

pub use ahash::{AHashMap, AHashSet};

pub mod hash_map {
    pub use std::collections::hash_map::Entry;
}
