//! Passthrough processor for files no other processor claims.

use super::artifact::{Code, ProcessorOutput};
use super::classify::ext;
use crate::error::Result;
use log::debug;
use std::fs;
use std::path::Path;

/// Reads `file` verbatim. The sourcemap is always empty.
pub fn none<P: AsRef<Path>>(file: P) -> Result<ProcessorOutput> {
    let file = file.as_ref();
    debug!("Copying file: {}", file.display());
    Ok(ProcessorOutput {
        code: Code::Binary(fs::read(file)?),
        sourcemap: String::new(),
        language: ext(file),
    })
}
