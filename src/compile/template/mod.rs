//! Template engine.
//!
//! All template files are registered once into a [`Views`] registry. Each
//! render call builds its own localisation context and helper bindings, so
//! calls with different locales never share state.

pub mod language;
pub mod layout;
pub mod locale;
pub mod views;

use self::language::{
    default_language, languages, prepare_indented, Helpers, LanguageSpec, TemplateLanguage,
};
use self::locale::{LocaleBundle, LocaleCatalog, LocaleRequest, Localizer};
use self::views::{View, ViewKind, Views};
use super::classify::{classify, ext, Processor};
use super::plugin::PluginSpec;
use crate::constants::{BODY_MARKER, CONTENT_FILE};
use crate::error::{Error, Result};
use crate::format;
use indexmap::IndexMap;
use log::{debug, warn};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Nested includes deeper than this are treated as a cycle.
const MAX_INCLUDE_DEPTH: usize = 64;

/// Options for the template engine.
#[derive(Clone)]
pub struct TemplateConfig {
    /// Project root; view keys and locale folders are relative to it
    pub root: PathBuf,
    /// Shared layout folder, registered before the project's own files
    pub layout_root: Option<PathBuf>,
    /// Layout every page is wrapped in, looked up like an `include`
    pub layout: Option<String>,
    pub pretty: bool,
    /// Extension → configured language
    pub languages: IndexMap<String, LanguageSpec>,
    /// Ready-made languages by extension; these win over `languages`
    pub extra_languages: IndexMap<String, Arc<dyn TemplateLanguage>>,
    /// File name of locale content manifests
    pub content_file: String,
    pub fallback_locale: String,
    /// Data available to every template
    pub globals: Map<String, Value>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            layout_root: None,
            layout: None,
            pretty: true,
            languages: IndexMap::new(),
            extra_languages: IndexMap::new(),
            content_file: CONTENT_FILE.to_string(),
            fallback_locale: "eng".to_string(),
            globals: Map::new(),
        }
    }
}

/// One rendered variant of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateOutput {
    pub locale: Option<String>,
    pub code: String,
    pub language: String,
}

struct EngineState {
    config: TemplateConfig,
    views: Views,
    languages: IndexMap<String, Arc<dyn TemplateLanguage>>,
    locales: LocaleCatalog,
    layout_indent: Option<usize>,
    setup_bundle: Mutex<Option<Arc<LocaleBundle>>>,
}

/// Renders registered views. Cheap to clone and safe to share across threads.
#[derive(Clone)]
pub struct TemplateEngine {
    state: Arc<EngineState>,
}

impl TemplateEngine {
    /// Registers the template files among `files` and prepares languages and locales.
    pub fn new(files: &[PathBuf], config: TemplateConfig) -> Result<Self> {
        debug!("template: start setup");
        let templates: Vec<&PathBuf> =
            files.iter().filter(|file| classify(file) == Processor::Template).collect();

        let registry = languages();
        let mut engines: IndexMap<String, Arc<dyn TemplateLanguage>> = IndexMap::new();
        for file in &templates {
            let extension = ext(file);
            if engines.contains_key(&extension) || config.languages.contains_key(&extension) {
                continue;
            }
            if let Some(id) = default_language(&extension) {
                engines.insert(extension, registry.resolve(&PluginSpec::Name(id.to_string()))?);
            }
        }
        for (extension, spec) in &config.languages {
            engines.insert(extension.clone(), registry.resolve(&spec.to_plugin_spec())?);
        }
        for (extension, engine) in &config.extra_languages {
            engines.insert(extension.clone(), engine.clone());
        }

        let locales = LocaleCatalog::discover(files, &config.root, &config.content_file)?;

        let mut views = Views::new();
        for file in templates {
            let shared_base = config
                .layout_root
                .as_ref()
                .filter(|layout_root| file.starts_with(layout_root))
                .map(|layout_root| layout_root.parent().unwrap_or(layout_root.as_path()).to_path_buf());
            let view = match shared_base {
                Some(base) => View::new(file, &base, true),
                None => View::new(file, &config.root, false),
            };
            views.register(view);
        }

        let layout_indent = match &config.layout {
            None => None,
            Some(name) => match views.find(name) {
                Some(view) => layout::marker_indent(&view.read()?, BODY_MARKER),
                None => {
                    warn!("Layout '{}' is not registered, pages render without it", name);
                    None
                }
            },
        };

        let setup_bundle = Mutex::new(Some(Arc::new(locales.load()?)));
        debug!(
            "template: end setup ({} views, {} locales)",
            views.len(),
            locales.codes().len()
        );

        Ok(Self {
            state: Arc::new(EngineState {
                config,
                views,
                languages: engines,
                locales,
                layout_indent,
                setup_bundle,
            }),
        })
    }

    /// The authoritative locale set.
    pub fn locales(&self) -> &[String] {
        self.state.locales.codes()
    }

    pub fn views(&self) -> &Views {
        &self.state.views
    }

    /// Expands a request, failing with every undeclared locale named.
    pub fn resolve_locales(&self, request: &LocaleRequest) -> Result<Vec<String>> {
        self.state.locales.resolve(request)
    }

    /// The content bundle computed at setup on the first call, re-read from disk afterwards.
    pub fn locale_bundle(&self) -> Result<Arc<LocaleBundle>> {
        let cached = match self.state.setup_bundle.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match cached {
            Some(bundle) => Ok(bundle),
            None => Ok(Arc::new(self.state.locales.load()?)),
        }
    }

    /// Renders `file`. A `locales` entry in `locals` selects the locales to render.
    pub fn render(&self, file: &Path, locals: Value) -> Result<Vec<TemplateOutput>> {
        let bundle = self.locale_bundle()?;
        self.render_with(file, locals, &bundle)
    }

    /// Like [`TemplateEngine::render`] with an already resolved content bundle.
    pub fn render_with(
        &self,
        file: &Path,
        locals: Value,
        bundle: &Arc<LocaleBundle>,
    ) -> Result<Vec<TemplateOutput>> {
        let mut locals = match locals {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(Error::ConfigError(format!(
                    "template locals must be an object, got {other}"
                )))
            }
        };
        let request = match locals.remove("locales") {
            Some(value) => LocaleRequest::from_value(&value)?,
            None => LocaleRequest::None,
        };
        let mut codes = self.resolve_locales(&request)?;

        if let Some(code) = self.state.locales.folder_locale(file) {
            if request == LocaleRequest::None || codes.contains(&code) {
                codes = vec![code];
            } else {
                debug!("Skipping {}: locale '{}' was not requested", file.display(), code);
                return Ok(Vec::new());
            }
        }

        let view = match self.state.views.get(file) {
            Some(view) => view.clone(),
            None => View::new(file, &self.state.config.root, false),
        };

        let targets: Vec<Option<String>> = if codes.is_empty() {
            vec![None]
        } else {
            codes.into_iter().map(Some).collect()
        };

        targets
            .into_iter()
            .map(|locale| {
                let mut context = self.state.config.globals.clone();
                context.extend(locals.clone());
                context.insert("file".to_string(), Value::String(view.key.clone()));
                context.insert(
                    "locale".to_string(),
                    locale.clone().map(Value::String).unwrap_or(Value::Null),
                );
                let context = Value::Object(context);

                let localizer =
                    Localizer::new(bundle.clone(), locale.clone(), &self.state.config.fallback_locale);
                let scope = RenderScope {
                    state: self.state.clone(),
                    localizer,
                    context: context.clone(),
                    depth: 0,
                };

                let mut code = self.state.render_page(&view, &context, scope)?;
                if self.state.config.pretty {
                    code = format::pretty_html(&code);
                }
                Ok(TemplateOutput { locale, code, language: view.language.clone() })
            })
            .collect()
    }
}

impl EngineState {
    fn language(&self, view: &View) -> Result<Arc<dyn TemplateLanguage>> {
        self.languages.get(&view.language).cloned().ok_or_else(|| {
            Error::ConfigError(format!("no template language registered for '.{}' files", view.language))
        })
    }

    fn render_source(
        &self,
        language: &Arc<dyn TemplateLanguage>,
        view: &View,
        source: &str,
        context: &Value,
        scope: RenderScope,
    ) -> Result<String> {
        let file = view.path.display().to_string();
        let source = if language.indentation_sensitive() {
            prepare_indented(&file, source)?
        } else {
            source.to_string()
        };
        language.render(&view.key, &source, context, Arc::new(scope)).map_err(|e| match e {
            Error::RenderError { message, .. } => Error::render(&file, message),
            other => other,
        })
    }

    fn render_view(&self, view: &View, context: &Value, scope: RenderScope) -> Result<String> {
        let language = self.language(view)?;
        self.render_source(&language, view, &view.read()?, context, scope)
    }

    /// Renders a page, wrapping it in the configured layout when there is one.
    fn render_page(&self, view: &View, context: &Value, scope: RenderScope) -> Result<String> {
        let layout = match (&self.config.layout, self.layout_indent, view.kind) {
            (Some(name), Some(indent), ViewKind::Page) => {
                self.views.find(name).map(|layout| (layout.clone(), indent))
            }
            _ => None,
        };
        let Some((layout, indent)) = layout else {
            return self.render_view(view, context, scope);
        };

        let language = self.language(view)?;
        let layout_source = layout.read()?;
        if layout.language == view.language {
            let composed = layout::compose(&layout_source, &view.read()?, indent);
            return self.render_source(&language, view, &composed, context, scope);
        }

        let body = self.render_view(view, context, scope.clone())?;
        let layout_language = self.language(&layout)?;
        let shell = self.render_source(
            &layout_language,
            &layout,
            &layout::with_placeholder(&layout_source),
            context,
            scope,
        )?;
        match layout::insert_rendered(&shell, &body) {
            Some(code) => Ok(code),
            None => {
                warn!("Layout '{}' dropped the page body, rendering {} alone", layout.key, view.key);
                Ok(body)
            }
        }
    }
}

/// Helper bindings for one render call.
#[derive(Clone)]
struct RenderScope {
    state: Arc<EngineState>,
    localizer: Localizer,
    context: Value,
    depth: usize,
}

impl Helpers for RenderScope {
    fn translate(&self, key: &str, options: &Value) -> Value {
        self.localizer.translate(key, options)
    }

    fn include(&self, file: &str, locals: &Value) -> Result<String> {
        let Some(view) = self.state.views.find(file) else {
            return Ok(format!("<!-- can't find import {file} -->"));
        };
        if self.depth >= MAX_INCLUDE_DEPTH {
            return Err(Error::render(
                &view.key,
                format!("includes nested deeper than {MAX_INCLUDE_DEPTH} levels"),
            ));
        }

        let mut context = match view.context() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for overrides in [&self.context, locals] {
            if let Value::Object(map) = overrides {
                context.extend(map.clone());
            }
        }
        let context = Value::Object(context);

        let child = RenderScope {
            state: self.state.clone(),
            localizer: self.localizer.clone(),
            context: context.clone(),
            depth: self.depth + 1,
        };
        self.state.render_view(view, &context, child)
    }
}
