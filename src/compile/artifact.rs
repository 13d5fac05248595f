//! Output records produced by the processors.

use super::classify::Processor;
use serde::{Serialize, Serializer};
use std::path::PathBuf;

/// Compiled contents of a file. Passthrough files stay binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Code {
    Text(String),
    Binary(Vec<u8>),
}

impl Code {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Code::Text(text) => text.as_bytes(),
            Code::Binary(bytes) => bytes,
        }
    }

    /// Returns the text, or `None` for binary contents.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Code::Text(text) => Some(text),
            Code::Binary(_) => None,
        }
    }

    /// Appends `suffix`. Binary contents are extended with its bytes.
    pub fn push_str(&mut self, suffix: &str) {
        match self {
            Code::Text(text) => text.push_str(suffix),
            Code::Binary(bytes) => bytes.extend_from_slice(suffix.as_bytes()),
        }
    }
}

impl From<String> for Code {
    fn from(text: String) -> Self {
        Code::Text(text)
    }
}

impl Serialize for Code {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Code::Text(text) => serializer.serialize_str(text),
            // binary contents are not addressable from templates
            Code::Binary(_) => serializer.serialize_none(),
        }
    }
}

/// What a single processor returns for one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorOutput {
    pub code: Code,
    /// Serialized source map, empty when there is none
    pub sourcemap: String,
    /// Extension of the source dialect
    pub language: String,
}

/// A compiled file plus everything needed to place it in the output tree.
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    /// Absolute source path
    pub source: PathBuf,
    /// Source path with its canonical output extension
    pub path: PathBuf,
    /// `path` relative to the root the file was discovered under
    pub file: PathBuf,
    /// Root of the project being compiled
    pub root: PathBuf,
    /// Where the compiled file is written
    pub destination: PathBuf,
    pub processor: Processor,
    pub language: String,
    pub code: Code,
    pub sourcemap: String,
    pub locale: Option<String>,
}

impl Artifact {
    /// Metadata exposed to templates through the `files` lookup. The source map
    /// is left out.
    pub fn summary(&self) -> serde_json::Value {
        let mut summary = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let Some(fields) = summary.as_object_mut() {
            fields.remove("sourcemap");
        }
        summary
    }
}
