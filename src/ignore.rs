//! Ignore pattern handling for file discovery.
//! Builds a glob set from the default ignores plus the configured `ignore` list.

use crate::constants::DEFAULT_IGNORE;
use crate::error::{Error, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use log::debug;
use std::path::Path;

/// Compiles a glob pattern where `*` never crosses a path separator.
pub fn glob(pattern: &str) -> Result<globset::Glob> {
    GlobBuilder::new(pattern).literal_separator(true).build().map_err(Error::from)
}

/// Builds the set of patterns whose matches are never discovered.
///
/// # Arguments
/// * `patterns` - Configured ignore globs, matched against paths relative to the project root
///
/// # Returns
/// * `Result<GlobSet>` - The default ignores plus `patterns`
///
/// # Errors
/// * `Error::GlobError` if a pattern does not compile
pub fn build_ignore_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in DEFAULT_IGNORE.iter().copied().chain(patterns.iter().map(String::as_str)) {
        debug!("Ignoring {}", pattern);
        builder.add(glob(pattern)?);
    }
    Ok(builder.build()?)
}

/// Returns true if `relative` or any of its parent directories is ignored.
pub fn is_ignored(set: &GlobSet, relative: &Path) -> bool {
    relative.ancestors().any(|path| !path.as_os_str().is_empty() && set.is_match(path))
}
