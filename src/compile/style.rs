//! Stylesheet processor.

use super::artifact::{Code, ProcessorOutput};
use super::classify::{ext, rename_ext};
use super::dialect::{dialect_compiler, DialectCommand};
use super::plugin::{style_plugins, CssMinifier, PluginSpec, StylePlugin};
use crate::error::{Error, Result};
use crate::format;
use crate::sourcemap::SourceMap;
use indexmap::IndexMap;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Options for compiling one stylesheet.
#[derive(Clone, Default)]
pub struct StyleConfig {
    /// Project root, searched after the file's own directory
    pub root: PathBuf,
    /// Extra include directories, searched last
    pub include_paths: Vec<PathBuf>,
    pub minify: bool,
    pub pretty: bool,
    pub sourcemaps: bool,
    /// Post-processing plugins resolved by name
    pub plugins: Vec<PluginSpec>,
    /// Ready-made plugins, run after the named ones
    pub extra_plugins: Vec<Arc<dyn StylePlugin>>,
    /// Per-dialect compiler command overrides
    pub dialects: IndexMap<String, DialectCommand>,
}

impl StyleConfig {
    /// Import search order: the file's directory, the project root, then extra directories.
    pub fn include_paths_for(&self, file: &Path) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = Vec::new();
        let candidates = file
            .parent()
            .map(Path::to_path_buf)
            .into_iter()
            .chain(std::iter::once(self.root.clone()))
            .chain(self.include_paths.iter().cloned());
        for path in candidates {
            if !path.as_os_str().is_empty() && !paths.contains(&path) {
                paths.push(path);
            }
        }
        paths
    }

    fn chain(&self) -> Result<Vec<Arc<dyn StylePlugin>>> {
        let registry = style_plugins();
        let mut chain = self
            .plugins
            .iter()
            .map(|spec| registry.resolve(spec))
            .collect::<Result<Vec<_>>>()?;
        chain.extend(self.extra_plugins.iter().cloned());
        if self.minify {
            chain.push(Arc::new(CssMinifier));
        }
        Ok(chain)
    }
}

/// Compiles the stylesheet at `file` to CSS.
pub fn style<P: AsRef<Path>>(file: P, config: &StyleConfig) -> Result<ProcessorOutput> {
    let file = file.as_ref();
    let language = ext(file);
    debug!("Compiling stylesheet: {}", file.display());

    let compiler = dialect_compiler(&language, &config.dialects).ok_or_else(|| {
        Error::compile(file.display(), format!("no stylesheet compiler for '.{language}' files"))
    })?;
    let compiled =
        compiler.compile(file, &config.include_paths_for(file), config.sourcemaps)?;

    let mut warnings = Vec::new();
    let mut css = compiled.code;
    for plugin in config.chain()? {
        css = plugin.process(css, &mut warnings)?;
    }
    for warning in &warnings {
        warn!("{}: {}", file.display(), warning);
    }

    if config.minify {
        css.push('\n');
    } else if config.pretty {
        css = format::beautify_css(&css);
    }

    let sourcemap = if config.sourcemaps {
        let map = match compiled.sourcemap {
            Some(map) => SourceMap { file: file_name(&rename_ext(file)), ..map },
            None => SourceMap::for_source(
                &file_name(&rename_ext(file)),
                &file_name(file),
                &fs::read_to_string(file)?,
            ),
        };
        map.to_json()
    } else {
        String::new()
    };

    Ok(ProcessorOutput { code: Code::Text(css), sourcemap, language })
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default()
}
