//! Compile orchestrator.
//!
//! [`Compiler::setup`] discovers a project once and prepares the template
//! engine; [`Compiler::render`] can then be called any number of times with a
//! glob or an explicit list of files, for full builds and incremental rebuilds.

pub mod artifact;
pub mod classify;
pub mod dialect;
pub mod none;
pub mod plugin;
pub mod script;
pub mod style;
pub mod template;

use self::artifact::{Artifact, Code, ProcessorOutput};
use self::classify::{classify, rename_ext, should_ignore, Processor};
use self::template::locale::{merge_into, LocaleRequest};
use self::template::TemplateEngine;
use crate::config::CompileOptions;
use crate::constants::APP_DIR;
use crate::error::{Error, Result};
use crate::ignore::{build_ignore_set, glob, is_ignored};
use cruet::Inflector;
use globset::GlobSet;
use log::debug;
use rayon::prelude::*;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use walkdir::WalkDir;

/// Which files a render call covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// A glob relative to the project root. An existing file or folder of that
    /// name is taken literally.
    Pattern(String),
    /// Already expanded paths, absolute or relative to the project root
    Paths(Vec<PathBuf>),
}

impl Selection {
    /// Every file of the project plus the shared layout root.
    pub fn all() -> Self {
        Selection::Pattern("**/*".to_string())
    }

    fn targets_everything(&self) -> bool {
        matches!(self, Selection::Pattern(pattern) if pattern == "**/*" || pattern == "**")
    }
}

impl From<&str> for Selection {
    fn from(pattern: &str) -> Self {
        Selection::Pattern(pattern.to_string())
    }
}

impl From<Vec<PathBuf>> for Selection {
    fn from(paths: Vec<PathBuf>) -> Self {
        Selection::Paths(paths)
    }
}

/// A file that failed to compile, with the error that stopped it.
#[derive(Debug)]
pub struct FileFailure {
    pub source: PathBuf,
    pub error: Error,
}

/// Everything one render call produced. Files that fail do not stop their
/// siblings; callers decide whether any failure fails the batch.
#[derive(Debug, Default)]
pub struct RenderBatch {
    /// Non-template artifacts first, then template artifacts
    pub artifacts: Vec<Artifact>,
    pub failures: Vec<FileFailure>,
}

impl RenderBatch {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    /// The artifacts, or the first failure.
    pub fn into_result(self) -> Result<Vec<Artifact>> {
        match self.failures.into_iter().next() {
            Some(failure) => Err(failure.error),
            None => Ok(self.artifacts),
        }
    }
}

/// A discovered file and the root its relative path is taken from.
#[derive(Debug, Clone)]
struct Entry {
    path: PathBuf,
    base: PathBuf,
    shared: bool,
}

impl Entry {
    fn relative(&self) -> &Path {
        self.path.strip_prefix(&self.base).unwrap_or(&self.path)
    }
}

/// A project set up for compilation.
pub struct Compiler {
    root: PathBuf,
    project: String,
    options: CompileOptions,
    ignore: GlobSet,
    templates: TemplateEngine,
    /// `files` lookup accumulated over every render call
    files: Mutex<Map<String, Value>>,
}

impl Compiler {
    /// Discovers the project under `root` and registers its templates.
    pub fn setup<P: AsRef<Path>>(root: P, options: CompileOptions) -> Result<Self> {
        debug!("start setup");
        let root = absolute(root.as_ref())?;
        if !root.is_dir() {
            return Err(Error::ProjectError(format!("{} is not a directory", root.display())));
        }
        let ignore = build_ignore_set(&options.ignore)?;

        let mut files = Vec::new();
        if let Some(layout_root) = &options.layout_root {
            files.extend(discover(layout_root, layout_root, true, &ignore)?.into_iter().map(|e| e.path));
        }
        files.extend(discover(&root, &root, false, &ignore)?.into_iter().map(|e| e.path));

        let project = options.project_name.clone().unwrap_or_else(|| project_name(&root));
        let templates = TemplateEngine::new(&files, options.template_config(&root))?;
        debug!("end setup: {} files in '{}'", files.len(), project);

        Ok(Self { root, project, options, ignore, templates, files: Mutex::new(Map::new()) })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// The locales the project declares.
    pub fn locales(&self) -> &[String] {
        self.templates.locales()
    }

    /// Compiles the selected files.
    ///
    /// Non-template files are compiled first and merged into the `files` lookup
    /// kept across calls; templates are rendered afterwards for every requested
    /// locale. Unknown locales and rename results that are not a path fail the
    /// whole call; other errors are reported per file in the batch.
    pub fn render(&self, selection: &Selection, locales: &LocaleRequest) -> Result<RenderBatch> {
        debug!("start render");
        self.templates.resolve_locales(locales)?;

        let (templates, others): (Vec<Entry>, Vec<Entry>) = self
            .select(selection)?
            .into_iter()
            .filter(|entry| !should_ignore(entry.relative()))
            .filter(|entry| !(entry.shared && classify(&entry.path) == Processor::Template))
            .partition(|entry| classify(&entry.path) == Processor::Template);

        let mut batch = RenderBatch::default();

        let results: Vec<(PathBuf, Result<Artifact>)> = others
            .par_iter()
            .map(|entry| (entry.path.clone(), self.process(entry)))
            .collect();
        for (source, result) in results {
            match result {
                Ok(artifact) => batch.artifacts.push(artifact),
                Err(error) if is_fatal(&error) => return Err(error),
                Err(error) => batch.failures.push(FileFailure { source, error }),
            }
        }

        let mut locals = Map::new();
        locals.insert("files".to_string(), self.merge_files(files_lookup(&batch.artifacts)));
        locals.insert("locales".to_string(), locales.to_value());
        let locals = Value::Object(locals);
        let bundle = self.templates.locale_bundle()?;

        let results: Vec<(PathBuf, Result<Vec<Artifact>>)> = templates
            .par_iter()
            .map(|entry| {
                debug!("start file {}", entry.path.display());
                let result = self
                    .templates
                    .render_with(&entry.path, locals.clone(), &bundle)
                    .and_then(|outputs| {
                        outputs
                            .into_iter()
                            .map(|output| {
                                let processed = ProcessorOutput {
                                    code: Code::Text(output.code),
                                    sourcemap: String::new(),
                                    language: output.language,
                                };
                                self.artifact(entry, Processor::Template, processed, output.locale)
                            })
                            .collect::<Result<Vec<_>>>()
                    });
                debug!("end file {}", entry.path.display());
                (entry.path.clone(), result)
            })
            .collect();
        for (source, result) in results {
            match result {
                Ok(artifacts) => batch.artifacts.extend(artifacts),
                Err(error) if is_fatal(&error) => return Err(error),
                Err(error) => batch.failures.push(FileFailure { source, error }),
            }
        }

        debug!(
            "end render: {} artifacts, {} failures",
            batch.artifacts.len(),
            batch.failures.len()
        );
        Ok(batch)
    }

    /// Adds this call's lookup to the one kept from earlier calls, so a call
    /// that only renders templates still sees every compiled file.
    fn merge_files(&self, lookup: Value) -> Value {
        let mut files = match self.files.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Value::Object(lookup) = lookup {
            merge_into(&mut files, lookup);
        }
        Value::Object(files.clone())
    }

    fn process(&self, entry: &Entry) -> Result<Artifact> {
        debug!("start file {}", entry.path.display());
        let processor = classify(&entry.path);
        let output = match processor {
            Processor::Style => style::style(&entry.path, &self.options.style_config(&self.root))?,
            Processor::Javascript => script::script(&entry.path, &self.options.script_config())?,
            _ => none::none(&entry.path)?,
        };
        let artifact = self.artifact(entry, processor, output, None)?;
        debug!("end file {}", entry.path.display());
        Ok(artifact)
    }

    fn artifact(
        &self,
        entry: &Entry,
        processor: Processor,
        output: ProcessorOutput,
        locale: Option<String>,
    ) -> Result<Artifact> {
        let sourcemap = if self.options.sourcemaps { output.sourcemap } else { String::new() };
        let mut artifact = Artifact {
            source: entry.path.clone(),
            path: rename_ext(&entry.path),
            file: rename_ext(entry.relative()),
            root: self.root.clone(),
            destination: PathBuf::new(),
            processor,
            language: output.language,
            code: output.code,
            sourcemap,
            locale,
        };
        artifact.destination =
            self.options.rename.apply(&artifact, artifact.locale.as_deref(), &self.project)?;
        Ok(artifact)
    }

    fn select(&self, selection: &Selection) -> Result<Vec<Entry>> {
        let shared = || -> Result<Vec<Entry>> {
            match &self.options.layout_root {
                Some(layout_root) => discover(layout_root, layout_root, true, &self.ignore),
                None => Ok(Vec::new()),
            }
        };

        match selection {
            Selection::Paths(paths) => {
                let mut entries = Vec::new();
                for path in paths {
                    entries.extend(self.literal(path)?);
                }
                Ok(entries)
            }
            Selection::Pattern(pattern) => {
                let literal = self.root.join(pattern);
                if !pattern.is_empty() && literal.exists() {
                    return self.literal(&literal);
                }

                let mut entries = if selection.targets_everything() { shared()? } else { Vec::new() };
                let matcher = glob(pattern)?.compile_matcher();
                entries.extend(
                    discover(&self.root, &self.root, false, &self.ignore)?
                        .into_iter()
                        .filter(|entry| matcher.is_match(entry.relative())),
                );
                Ok(entries)
            }
        }
    }

    /// Entries for one explicit file or folder, inside the project or the layout root.
    fn literal(&self, path: &Path) -> Result<Vec<Entry>> {
        let path = if path.is_absolute() { path.to_path_buf() } else { self.root.join(path) };
        let (base, shared) = match &self.options.layout_root {
            Some(layout_root) if path.starts_with(layout_root) => (layout_root.clone(), true),
            _ => (self.root.clone(), false),
        };

        if path.is_dir() {
            return discover(&path, &base, shared, &self.ignore);
        }
        if !path.exists() {
            return Err(Error::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )));
        }
        let entry = Entry { path, base, shared };
        if is_ignored(&self.ignore, entry.relative()) {
            return Ok(Vec::new());
        }
        Ok(vec![entry])
    }
}

fn is_fatal(error: &Error) -> bool {
    matches!(
        error,
        Error::ConfigError(_) | Error::UnknownLocales(_) | Error::LocaleFolderError(_)
    )
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// `projects/<name>/app` is named `<name>`; any other root is named after itself.
pub fn project_name(root: &Path) -> String {
    let name = |path: &Path| {
        path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default()
    };
    match root.parent() {
        Some(parent) if name(root) == APP_DIR => name(parent),
        _ => name(root),
    }
}

/// Files under `dir`, sorted by name, with paths relative to `base`.
fn discover(dir: &Path, base: &Path, shared: bool, ignore: &GlobSet) -> Result<Vec<Entry>> {
    let mut entries = Vec::new();
    let walker = WalkDir::new(dir).sort_by_file_name().into_iter().filter_entry(|entry| {
        let relative = entry.path().strip_prefix(base).unwrap_or(entry.path());
        relative.as_os_str().is_empty() || !is_ignored(ignore, relative)
    });
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() {
            entries.push(Entry { path: entry.into_path(), base: base.to_path_buf(), shared });
        }
    }
    Ok(entries)
}

/// Nests artifact summaries under `[extension, ...folders, name]`, snake cased,
/// so `js/index.js` is reachable as `files.js.js.index`.
pub fn files_lookup(artifacts: &[Artifact]) -> Value {
    let mut root = Value::Object(Map::new());
    for artifact in artifacts {
        let mut segments: Vec<String> = artifact
            .file
            .iter()
            .map(|segment| segment.to_string_lossy().into_owned())
            .collect();
        let Some(file_name) = segments.pop() else { continue };
        let (name, extension) = file_name.rsplit_once('.').unwrap_or((file_name.as_str(), ""));
        let mut keys = vec![extension.to_string()];
        keys.extend(segments);
        keys.push(name.to_string());
        let keys: Vec<String> = keys.iter().map(|key| key.to_snake_case()).collect();

        let mut node = &mut root;
        for key in &keys[..keys.len() - 1] {
            if !node.get(key).is_some_and(Value::is_object) {
                node[key.as_str()] = json!({});
            }
            node = &mut node[key.as_str()];
        }
        node[keys[keys.len() - 1].as_str()] = artifact.summary();
    }
    root
}
