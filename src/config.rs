//! Configuration handling for project-tools.
//! Loads `.projectrc.{json,yml,yaml}` from the repo root and turns it into the
//! immutable [`CompileOptions`] snapshot the compiler is set up with.

use crate::compile::artifact::Artifact;
use crate::compile::classify::Processor;
use crate::compile::dialect::DialectCommand;
use crate::compile::plugin::{PluginSpec, ScriptPlugin, StylePlugin};
use crate::compile::script::{OutputFormat, ScriptConfig};
use crate::compile::style::StyleConfig;
use crate::compile::template::language::{LanguageSpec, TemplateLanguage};
use crate::compile::template::locale::LocaleRequest;
use crate::compile::template::TemplateConfig;
use crate::constants::{CONFIG_FILES, CONTENT_FILE, DEFAULT_CREATE, DIST_DIR};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Author recorded when a repo is initialised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// What `create` puts into a new project's `app` folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CreateSpec {
    /// Files to create; entries ending in `/` are folders
    Files(Vec<String>),
    /// Folder (relative to the repo root) copied into `app`
    Folder(String),
}

impl Default for CreateSpec {
    fn default() -> Self {
        CreateSpec::Files(DEFAULT_CREATE.iter().map(|file| file.to_string()).collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleOptions {
    /// Extra import directories, relative to the repo root
    pub include_paths: Vec<PathBuf>,
    pub plugins: Vec<PluginSpec>,
    /// Compiler command per dialect extension
    pub dialects: IndexMap<String, DialectCommand>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptOptions {
    pub plugins: Vec<PluginSpec>,
    pub format: OutputFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateOptions {
    /// Extension → `"language"` or `{ "package": ..., "options": ... }`
    pub languages: IndexMap<String, LanguageSpec>,
    pub content_file: String,
    /// Layout view name, overriding the top-level `layout`
    pub layout: Option<String>,
    pub globals: serde_json::Map<String, serde_json::Value>,
}

impl Default for TemplateOptions {
    fn default() -> Self {
        Self {
            languages: IndexMap::new(),
            content_file: CONTENT_FILE.to_string(),
            layout: None,
            globals: serde_json::Map::new(),
        }
    }
}

/// The serving container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerOptions {
    pub image: String,
    pub name: String,
    pub ports: Vec<String>,
    pub env: Vec<String>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            image: "nginx:alpine".to_string(),
            name: "project".to_string(),
            ports: vec!["80:80".to_string()],
            env: Vec::new(),
        }
    }
}

/// Contents of `.projectrc.*`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    pub create: CreateSpec,
    pub minify: bool,
    pub pretty: bool,
    pub sourcemaps: bool,
    pub ignore: Vec<String>,
    pub style: StyleOptions,
    pub javascript: ScriptOptions,
    pub template: TemplateOptions,
    pub fallback_locale: String,
    pub default_build_locales: LocaleRequest,
    /// Layout file relative to the repo root; its first folder is the shared layout root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<PathBuf>,
    pub server: ServerOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: None,
            author: None,
            create: CreateSpec::default(),
            minify: false,
            pretty: true,
            sourcemaps: true,
            ignore: Vec::new(),
            style: StyleOptions::default(),
            javascript: ScriptOptions::default(),
            template: TemplateOptions::default(),
            fallback_locale: "eng".to_string(),
            default_build_locales: LocaleRequest::All,
            layout: None,
            server: ServerOptions::default(),
        }
    }
}

/// Loads settings from the first configuration file found in `root`.
///
/// # Arguments
/// * `root` - Repo root to look in
///
/// # Returns
/// * `Result<Settings>` - Parsed settings, or the defaults when no file exists
///
/// # Errors
/// * `Error::JsonError` / `Error::YamlError` if the file does not parse
pub fn load_settings<P: AsRef<Path>>(root: P) -> Result<Settings> {
    for file in CONFIG_FILES {
        let path = root.as_ref().join(file);
        if !path.exists() {
            continue;
        }
        debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(&path)?;
        let settings = if file.ends_with(".json") {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        return Ok(settings);
    }
    debug!("No configuration file found (tried: {}), using defaults", CONFIG_FILES.join(", "));
    Ok(Settings::default())
}

type RenameFn = dyn Fn(&Artifact, Option<&str>, &str) -> String + Send + Sync;

/// Maps an artifact, its locale and the project name to a destination path.
#[derive(Clone)]
pub struct RenamePolicy(Arc<RenameFn>);

impl RenamePolicy {
    pub fn new<F>(rename: F) -> Self
    where
        F: Fn(&Artifact, Option<&str>, &str) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(rename))
    }

    /// `<project root parent>/dist[/<locale>]/<file>`, with the locale folder
    /// used for templates only. For `projects/<name>/app` this is `projects/<name>/dist`.
    pub fn dist() -> Self {
        Self::new(|artifact, locale, _project| {
            let base = artifact.root.parent().unwrap_or(artifact.root.as_path()).join(DIST_DIR);
            let base = match (artifact.processor, locale) {
                (Processor::Template, Some(locale)) => base.join(locale),
                _ => base,
            };
            base.join(&artifact.file).display().to_string()
        })
    }

    /// Applies the policy, rejecting an empty result.
    pub fn apply(&self, artifact: &Artifact, locale: Option<&str>, project: &str) -> Result<PathBuf> {
        let destination = (self.0)(artifact, locale, project);
        if destination.trim().is_empty() {
            return Err(Error::ConfigError(format!(
                "rename returned an empty destination for {}",
                artifact.source.display()
            )));
        }
        Ok(PathBuf::from(destination))
    }
}

impl Default for RenamePolicy {
    fn default() -> Self {
        Self::dist()
    }
}

impl fmt::Debug for RenamePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RenamePolicy(..)")
    }
}

/// Everything a [`crate::compile::Compiler`] is set up with.
#[derive(Clone)]
pub struct CompileOptions {
    pub ignore: Vec<String>,
    pub minify: bool,
    pub sourcemaps: bool,
    pub pretty: bool,
    pub style: StyleOptions,
    pub javascript: ScriptOptions,
    pub template: TemplateOptions,
    /// Layout file wrapped around every page
    pub layout: Option<PathBuf>,
    /// Shared folder discovered along with the project
    pub layout_root: Option<PathBuf>,
    pub fallback_locale: String,
    /// Overrides the name derived from the project root
    pub project_name: Option<String>,
    pub rename: RenamePolicy,
    pub style_plugins: Vec<Arc<dyn StylePlugin>>,
    pub script_plugins: Vec<Arc<dyn ScriptPlugin>>,
    pub template_languages: IndexMap<String, Arc<dyn TemplateLanguage>>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        let settings = Settings::default();
        Self {
            ignore: settings.ignore,
            minify: settings.minify,
            sourcemaps: settings.sourcemaps,
            pretty: settings.pretty,
            style: settings.style,
            javascript: settings.javascript,
            template: settings.template,
            layout: None,
            layout_root: None,
            fallback_locale: settings.fallback_locale,
            project_name: None,
            rename: RenamePolicy::default(),
            style_plugins: Vec::new(),
            script_plugins: Vec::new(),
            template_languages: IndexMap::new(),
        }
    }
}

impl CompileOptions {
    /// Builds options from settings loaded from `repo_root`.
    pub fn from_settings(settings: &Settings, repo_root: &Path) -> Self {
        let mut options = CompileOptions {
            ignore: settings.ignore.clone(),
            minify: settings.minify,
            sourcemaps: settings.sourcemaps,
            pretty: settings.pretty,
            style: settings.style.clone(),
            javascript: settings.javascript.clone(),
            template: settings.template.clone(),
            fallback_locale: settings.fallback_locale.clone(),
            ..Default::default()
        };
        options.style.include_paths =
            settings.style.include_paths.iter().map(|path| repo_root.join(path)).collect();
        if let Some(layout) = &settings.layout {
            options = options.with_layout(repo_root, layout);
        }
        options
    }

    /// Sets the layout file; its first folder below `repo_root` becomes the layout root.
    pub fn with_layout(mut self, repo_root: &Path, layout: &Path) -> Self {
        let layout = if layout.is_absolute() { layout.to_path_buf() } else { repo_root.join(layout) };
        let folder = layout.strip_prefix(repo_root).ok().and_then(|relative| {
            let mut components = relative.components();
            let first = components.next()?;
            // a layout directly in the repo root has no folder to share
            components.next()?;
            match first {
                Component::Normal(name) => Some(repo_root.join(name)),
                _ => None,
            }
        });
        if folder.is_none() {
            warn!("Layout {} is not inside a folder of the repo root", layout.display());
        }
        self.layout_root = folder;
        self.layout = Some(layout);
        self
    }

    pub fn with_rename<F>(mut self, rename: F) -> Self
    where
        F: Fn(&Artifact, Option<&str>, &str) -> String + Send + Sync + 'static,
    {
        self.rename = RenamePolicy::new(rename);
        self
    }

    pub fn with_style_plugin(mut self, plugin: Arc<dyn StylePlugin>) -> Self {
        self.style_plugins.push(plugin);
        self
    }

    pub fn with_script_plugin(mut self, plugin: Arc<dyn ScriptPlugin>) -> Self {
        self.script_plugins.push(plugin);
        self
    }

    pub fn with_template_language(
        mut self,
        extension: &str,
        language: Arc<dyn TemplateLanguage>,
    ) -> Self {
        self.template_languages.insert(extension.to_string(), language);
        self
    }

    pub fn style_config(&self, root: &Path) -> StyleConfig {
        StyleConfig {
            root: root.to_path_buf(),
            include_paths: self.style.include_paths.clone(),
            minify: self.minify,
            pretty: self.pretty,
            sourcemaps: self.sourcemaps,
            plugins: self.style.plugins.clone(),
            extra_plugins: self.style_plugins.clone(),
            dialects: self.style.dialects.clone(),
        }
    }

    pub fn script_config(&self) -> ScriptConfig {
        ScriptConfig {
            minify: self.minify,
            pretty: self.pretty,
            sourcemaps: self.sourcemaps,
            format: self.javascript.format,
            plugins: self.javascript.plugins.clone(),
            extra_plugins: self.script_plugins.clone(),
        }
    }

    pub fn template_config(&self, root: &Path) -> TemplateConfig {
        let layout = self
            .template
            .layout
            .clone()
            .or_else(|| self.layout.as_ref().map(|layout| layout.display().to_string()));
        TemplateConfig {
            root: root.to_path_buf(),
            layout_root: self.layout_root.clone(),
            layout,
            pretty: self.pretty,
            languages: self.template.languages.clone(),
            extra_languages: self.template_languages.clone(),
            content_file: self.template.content_file.clone(),
            fallback_locale: self.fallback_locale.clone(),
            globals: self.template.globals.clone(),
        }
    }
}
