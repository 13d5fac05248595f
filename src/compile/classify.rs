//! Maps source files to the processor that compiles them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Extensions rendered by a template language, including the built-in `html` and `txt`.
pub const TEMPLATE_EXTENSIONS: [&str; 15] = [
    "html", "txt", "htm", "j2", "jinja", "jinja2", "njk", "nunjucks", "twig", "swig", "hbs",
    "handlebars", "mustache", "pug", "jade",
];

/// Stylesheet dialects.
pub const STYLE_EXTENSIONS: [&str; 5] = ["styl", "scss", "sass", "less", "css"];

/// Script sources. `es` and `mjs` are emitted as `js`.
pub const JAVASCRIPT_EXTENSIONS: [&str; 3] = ["js", "es", "mjs"];

/// The processor category of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Processor {
    Template,
    Style,
    Javascript,
    None,
}

impl Processor {
    /// All categories, in classification order.
    pub const ALL: [Processor; 4] =
        [Processor::Template, Processor::Style, Processor::Javascript, Processor::None];

    pub fn as_str(&self) -> &'static str {
        match self {
            Processor::Template => "template",
            Processor::Style => "style",
            Processor::Javascript => "javascript",
            Processor::None => "none",
        }
    }

    /// Extensions registered for this category. `None` matches everything else.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Processor::Template => &TEMPLATE_EXTENSIONS,
            Processor::Style => &STYLE_EXTENSIONS,
            Processor::Javascript => &JAVASCRIPT_EXTENSIONS,
            Processor::None => &[],
        }
    }
}

impl fmt::Display for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the extension of `path` without the leading dot, or an empty string.
pub fn ext<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Classifies `path` by its extension.
pub fn classify<P: AsRef<Path>>(path: P) -> Processor {
    let extension = ext(path);
    Processor::ALL
        .into_iter()
        .find(|processor| processor.extensions().contains(&extension.as_str()))
        .unwrap_or(Processor::None)
}

/// Returns the extension a compiled file is written with.
pub fn canonical_extension<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();
    let extension = ext(path);
    match classify(path) {
        Processor::Template => "html".to_string(),
        Processor::Style => "css".to_string(),
        Processor::Javascript if extension != "js" => "js".to_string(),
        _ => extension,
    }
}

/// Replaces the extension of `path` with its canonical extension.
pub fn rename_ext<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    if path.extension().is_none() {
        return path.to_path_buf();
    }
    path.with_extension(canonical_extension(path))
}

/// Returns true if any segment of `path` starts with `_` or is version-control metadata.
///
/// Ignored files never produce output of their own but stay available as partials
/// and layouts.
pub fn should_ignore<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().components().any(|component| match component {
        Component::Normal(segment) => {
            let segment = segment.to_string_lossy();
            segment.starts_with('_') || segment.starts_with(".git")
        }
        _ => false,
    })
}
