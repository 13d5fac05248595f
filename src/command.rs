//! Lookup of the external programs the pipeline and the server run.

use crate::error::{Error, Result};
use log::debug;
use std::path::PathBuf;

/// Finds `program` on `PATH` before anything is spawned.
///
/// # Arguments
/// * `program` - Name or path of the executable
/// * `hint` - Appended to the error, e.g. where to get the program
///
/// # Errors
/// * `Error::CommandError` if the executable cannot be found
pub fn find_program(program: &str, hint: &str) -> Result<PathBuf> {
    match which::which(program) {
        Ok(path) => {
            debug!("Using {} for {}", path.display(), program);
            Ok(path)
        }
        Err(_) => Err(Error::CommandError {
            command: program.to_string(),
            message: if hint.is_empty() {
                "executable not found on PATH".to_string()
            } else {
                format!("executable not found on PATH, {hint}")
            },
        }),
    }
}
