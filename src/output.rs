//! Writes compiled artifacts to their destinations.

use crate::compile::artifact::Artifact;
use crate::error::{Error, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Comment pointing a compiled stylesheet or script at its map file.
pub fn sourcemap_comment(destination: &Path) -> String {
    let name = destination
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("\n/*# sourceMappingURL={name}.map */\n")
}

/// Path of the map file written next to `destination`.
pub fn sourcemap_path(destination: &Path) -> PathBuf {
    let mut path = destination.as_os_str().to_owned();
    path.push(".map");
    PathBuf::from(path)
}

fn write_file<P: AsRef<Path>>(content: &[u8], dest_path: P) -> Result<()> {
    let dest_path = dest_path.as_ref();
    if let Some(parent) = dest_path.parent() {
        std::fs::create_dir_all(parent).map_err(Error::IoError)?;
    }
    std::fs::write(dest_path, content).map_err(Error::IoError)
}

/// Writes one artifact, plus its source map when it carries one.
///
/// # Arguments
/// * `artifact` - Compiled file with a resolved destination
///
/// # Returns
/// * `Result<Vec<PathBuf>>` - Every path that was written
///
/// # Errors
/// * `Error::IoError` if a folder cannot be created or a file cannot be written
pub fn write_artifact(artifact: &Artifact) -> Result<Vec<PathBuf>> {
    let destination = &artifact.destination;
    let mut written = Vec::new();

    if artifact.sourcemap.is_empty() {
        write_file(artifact.code.as_bytes(), destination)?;
    } else {
        let mut code = artifact.code.clone();
        code.push_str(&sourcemap_comment(destination));
        write_file(code.as_bytes(), destination)?;

        let map = sourcemap_path(destination);
        write_file(artifact.sourcemap.as_bytes(), &map)?;
        written.push(map);
    }
    debug!("Wrote {}", destination.display());
    written.insert(0, destination.clone());
    Ok(written)
}

/// Writes every artifact and reports how many files were produced.
pub fn write_artifacts(artifacts: &[Artifact]) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for artifact in artifacts {
        written.extend(write_artifact(artifact)?);
    }
    info!("Wrote {} files", written.len());
    Ok(written)
}
