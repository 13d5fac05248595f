//! Post-processing plugins for stylesheets and scripts.
//!
//! Plugins are named in configuration and resolved through a [`PluginRegistry`]
//! that maps an identifier to a factory. Ready-made plugin objects can be handed
//! to the compile options directly instead.

use crate::error::{Error, Result};
use crate::format;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, LazyLock};

static CSS_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*[^!].*?\*/\s*").expect("valid regex"));

/// A plugin as written in configuration: `"name"` or `{ "name": "...", "options": {...} }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PluginSpec {
    Name(String),
    Configured {
        name: String,
        #[serde(default)]
        options: serde_json::Value,
    },
}

impl PluginSpec {
    pub fn name(&self) -> &str {
        match self {
            PluginSpec::Name(name) | PluginSpec::Configured { name, .. } => name,
        }
    }

    pub fn options(&self) -> serde_json::Value {
        match self {
            PluginSpec::Name(_) => serde_json::Value::Null,
            PluginSpec::Configured { options, .. } => options.clone(),
        }
    }
}

/// A step of the stylesheet post-processing chain.
pub trait StylePlugin: Send + Sync {
    fn name(&self) -> &str;

    /// Transforms `css`. Non-fatal problems are pushed onto `warnings`.
    fn process(&self, css: String, warnings: &mut Vec<String>) -> Result<String>;
}

/// A bundler plugin. `transform` runs once per module, `render_chunk` on the bundle.
pub trait ScriptPlugin: Send + Sync {
    fn name(&self) -> &str;

    fn transform(&self, code: String, _id: &Path) -> Result<String> {
        Ok(code)
    }

    fn render_chunk(&self, code: String) -> Result<String> {
        Ok(code)
    }
}

type Factory<T> = fn(&serde_json::Value) -> Result<Arc<T>>;

/// Identifier → factory lookup for plugins of type `T`.
pub struct PluginRegistry<T: ?Sized> {
    factories: IndexMap<String, Factory<T>>,
}

impl<T: ?Sized> PluginRegistry<T> {
    pub fn new() -> Self {
        Self { factories: IndexMap::new() }
    }

    pub fn register(&mut self, name: &str, factory: Factory<T>) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Instantiates the plugin `spec` names.
    pub fn resolve(&self, spec: &PluginSpec) -> Result<Arc<T>> {
        let factory = self.factories.get(spec.name()).ok_or_else(|| {
            Error::ConfigError(format!(
                "unknown plugin '{}' (available: {})",
                spec.name(),
                self.factories.keys().cloned().collect::<Vec<_>>().join(", ")
            ))
        })?;
        factory(&spec.options())
    }
}

impl<T: ?Sized> Default for PluginRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry with the built-in stylesheet plugins.
pub fn style_plugins() -> PluginRegistry<dyn StylePlugin> {
    let mut registry: PluginRegistry<dyn StylePlugin> = PluginRegistry::new();
    registry.register("minify", |_| Ok(Arc::new(CssMinifier)));
    registry.register("strip-comments", |_| Ok(Arc::new(StripComments)));
    registry
}

/// Registry with the built-in bundler plugins.
pub fn script_plugins() -> PluginRegistry<dyn ScriptPlugin> {
    let mut registry: PluginRegistry<dyn ScriptPlugin> = PluginRegistry::new();
    registry.register("minify", |_| Ok(Arc::new(JsMinifier)));
    registry.register("replace", |options| Ok(Arc::new(Replace::from_options(options)?)));
    registry
}

/// Minifies the stylesheet. Always appended last when minification is on.
pub struct CssMinifier;

impl StylePlugin for CssMinifier {
    fn name(&self) -> &str {
        "minify"
    }

    fn process(&self, css: String, _warnings: &mut Vec<String>) -> Result<String> {
        Ok(format::minify_css(&css))
    }
}

/// Removes comments, keeping `/*! ... */` license comments.
pub struct StripComments;

impl StylePlugin for StripComments {
    fn name(&self) -> &str {
        "strip-comments"
    }

    fn process(&self, css: String, _warnings: &mut Vec<String>) -> Result<String> {
        Ok(CSS_COMMENT.replace_all(&css, "").into_owned())
    }
}

/// Minifies the generated bundle.
pub struct JsMinifier;

impl ScriptPlugin for JsMinifier {
    fn name(&self) -> &str {
        "minify"
    }

    fn render_chunk(&self, code: String) -> Result<String> {
        Ok(format::minify_js(&code))
    }
}

/// Replaces literal strings in every module.
#[derive(Debug, Default, Deserialize)]
pub struct Replace {
    #[serde(default)]
    pub values: IndexMap<String, String>,
}

impl Replace {
    fn from_options(options: &serde_json::Value) -> Result<Self> {
        if options.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(options.clone())
            .map_err(|e| Error::ConfigError(format!("invalid options for 'replace': {e}")))
    }
}

impl ScriptPlugin for Replace {
    fn name(&self) -> &str {
        "replace"
    }

    fn transform(&self, code: String, _id: &Path) -> Result<String> {
        Ok(self
            .values
            .iter()
            .fold(code, |code, (from, to)| code.replace(from.as_str(), to)))
    }
}
