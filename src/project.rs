//! Project bookkeeping for a repo of projects.
//!
//! A repo holds `projects/<name>/app` (sources) and `projects/<name>/dist`
//! (compiled output). The active project is kept in the `PROJECT` marker file
//! and is only ever read here; the compile pipeline always receives an
//! explicit project root.

use crate::compile::template::locale::LocaleRequest;
use crate::compile::{Compiler, RenderBatch, Selection};
use crate::config::{load_settings, Author, CompileOptions, CreateSpec, Settings};
use crate::constants::{APP_DIR, CONFIG_FILES, DIST_DIR, PROJECTS_DIR, PROJECT_FILE};
use crate::error::{Error, Result};
use crate::output::write_artifacts;
use log::{debug, error, info};
use std::path::{Path, PathBuf};
use std::process::Command;
use walkdir::WalkDir;

/// A repo of projects and its settings.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    settings: Settings,
}

impl Project {
    /// Opens the repo at `root`, loading its `.projectrc` settings.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let settings = load_settings(&root)?;
        Ok(Self { root, settings })
    }

    pub fn with_settings<P: AsRef<Path>>(root: P, settings: Settings) -> Self {
        Self { root: root.as_ref().to_path_buf(), settings }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.root.join(PROJECTS_DIR)
    }

    /// Source folder of `name`.
    pub fn project_root(&self, name: &str) -> PathBuf {
        self.projects_dir().join(name).join(APP_DIR)
    }

    /// Output folder of `name`.
    pub fn dist_root(&self, name: &str) -> PathBuf {
        self.projects_dir().join(name).join(DIST_DIR)
    }

    /// The project recorded by `use`, if any.
    pub fn current(&self) -> Result<Option<String>> {
        let marker = self.root.join(PROJECT_FILE);
        if !marker.exists() {
            return Ok(None);
        }
        let name = std::fs::read_to_string(marker)?.trim().to_string();
        Ok(if name.is_empty() { None } else { Some(name) })
    }

    /// `name`, or the current project when it is omitted.
    pub fn resolve(&self, name: Option<&str>) -> Result<String> {
        let name = match name {
            Some(name) => name.to_string(),
            None => self.current()?.ok_or_else(|| {
                Error::ProjectError(
                    "no project given and none selected, run `project use <name>` first".to_string(),
                )
            })?,
        };
        if !self.projects_dir().join(&name).is_dir() {
            return Err(Error::ProjectError(format!("project '{name}' does not exist")));
        }
        Ok(name)
    }

    /// Names of the projects, sorted, keeping those that contain `filter`.
    pub fn list(&self, filter: Option<&str>) -> Result<Vec<String>> {
        let dir = self.projects_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if filter.map_or(true, |filter| name.contains(filter)) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Makes `name` the current project.
    pub fn use_project(&self, name: &str) -> Result<()> {
        let name = self.resolve(Some(name))?;
        std::fs::write(self.root.join(PROJECT_FILE), &name)?;
        info!("Now using project '{}'", name);
        Ok(())
    }

    /// Creates `projects/<name>` with an empty `dist` and an `app` seeded from
    /// the `create` setting.
    ///
    /// # Arguments
    /// * `name` - Name of the new project
    ///
    /// # Returns
    /// * `Result<PathBuf>` - The new project's `app` folder
    ///
    /// # Errors
    /// * `Error::ProjectError` if the name is empty or contains a path separator
    /// * `Error::IoError` if the folders cannot be created or copied
    pub fn create(&self, name: &str) -> Result<PathBuf> {
        if name.trim().is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(Error::ProjectError(format!("'{name}' is not a valid project name")));
        }
        std::fs::create_dir_all(self.dist_root(name))?;
        let app = self.project_root(name);

        match &self.settings.create {
            CreateSpec::Files(files) => {
                std::fs::create_dir_all(&app)?;
                for file in files {
                    let path = app.join(file);
                    if file.ends_with('/') {
                        std::fs::create_dir_all(&path)?;
                        continue;
                    }
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    if !path.exists() {
                        std::fs::write(&path, "")?;
                    }
                }
            }
            CreateSpec::Folder(folder) => {
                let source = if Path::new(folder).is_absolute() {
                    PathBuf::from(folder)
                } else {
                    self.root.join(folder)
                };
                copy_dir(&source, &app)?;
            }
        }
        info!("Created project '{}'", name);
        Ok(app)
    }

    /// Compile options for this repo's settings.
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions::from_settings(&self.settings, &self.root)
    }

    /// Sets up a compiler for `name`.
    pub fn compiler(&self, name: &str) -> Result<Compiler> {
        let mut options = self.compile_options();
        options.project_name = Some(name.to_string());
        Compiler::setup(self.project_root(name), options)
    }

    /// Compiles `selection` of project `name` and writes the results.
    ///
    /// Every failed file is logged; the build fails with the first of them
    /// after the successful files were written.
    pub fn build(
        &self,
        name: &str,
        selection: &Selection,
        locales: Option<&LocaleRequest>,
    ) -> Result<Vec<PathBuf>> {
        let compiler = self.compiler(name)?;
        let locales = locales.unwrap_or(&self.settings.default_build_locales);
        let batch = compiler.render(selection, locales)?;
        write_batch(batch)
    }
}

/// Writes a batch, logging every failure and returning the first one.
pub fn write_batch(batch: RenderBatch) -> Result<Vec<PathBuf>> {
    let written = write_artifacts(&batch.artifacts)?;
    for failure in &batch.failures {
        error!("{}: {}", failure.source.display(), failure.error);
    }
    match batch.failures.into_iter().next() {
        Some(failure) => Err(failure.error),
        None => Ok(written),
    }
}

/// Reads the author from `git config`, empty when git is unavailable.
pub fn git_author() -> Author {
    let read = |key: &str| {
        Command::new("git")
            .args(["config", key])
            .output()
            .ok()
            .filter(|output| output.status.success())
            .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
            .unwrap_or_default()
    };
    Author { name: read("user.name"), email: read("user.email") }
}

/// Creates a new repo of projects at `location`.
///
/// # Arguments
/// * `name` - Name recorded in the settings file
/// * `location` - Folder to create, usually named after the repo
/// * `author` - Author recorded in the settings file
///
/// # Returns
/// * `Result<PathBuf>` - The repo root
///
/// # Errors
/// * `Error::ProjectError` if `location` already holds a settings file
pub fn init(name: &str, location: &Path, author: Author) -> Result<PathBuf> {
    if let Some(existing) =
        CONFIG_FILES.iter().map(|file| location.join(file)).find(|path| path.exists())
    {
        return Err(Error::ProjectError(format!(
            "{} already exists, the repo is initialised",
            existing.display()
        )));
    }
    std::fs::create_dir_all(location.join(PROJECTS_DIR))?;

    let settings = Settings { name: Some(name.to_string()), author: Some(author), ..Default::default() };
    let content = serde_json::to_string_pretty(&settings)?;
    std::fs::write(location.join(CONFIG_FILES[0]), content + "\n")?;
    info!("Initialised '{}' in {}", name, location.display());
    Ok(location.to_path_buf())
}

fn copy_dir(source: &Path, target: &Path) -> Result<()> {
    if !source.is_dir() {
        return Err(Error::ProjectError(format!(
            "create folder {} does not exist",
            source.display()
        )));
    }
    for entry in WalkDir::new(source) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let destination = target.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&destination)?;
        } else {
            debug!("Copying {} to {}", entry.path().display(), destination.display());
            std::fs::copy(entry.path(), &destination)?;
        }
    }
    Ok(())
}
