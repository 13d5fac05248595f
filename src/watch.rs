//! Rebuilds a project while its files change.
//!
//! Changes are debounced, then turned into a [`Rebuild`]: layout and locale
//! content changes rebuild everything, other changes recompile only the files
//! that changed.

use crate::compile::template::locale::LocaleRequest;
use crate::compile::{Compiler, Selection};
use crate::error::Result;
use crate::project::{write_batch, Project};
use log::{debug, error, info, warn};
use notify::RecursiveMode;
use notify_debouncer_full::{new_debouncer, DebounceEventResult};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

const DEBOUNCE: Duration = Duration::from_millis(250);

/// What a batch of changes requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rebuild {
    /// Set the project up again and compile every file
    Everything,
    /// Compile only these files
    Files(Vec<PathBuf>),
}

/// Decides how to react to `changed` paths.
///
/// # Arguments
/// * `changed` - Absolute paths reported by the watcher
/// * `project_root` - The project's source folder
/// * `layout_root` - The shared layout folder, if any
///
/// # Returns
/// * `Option<Rebuild>` - `None` when nothing relevant changed
pub fn plan_rebuild(
    changed: &[PathBuf],
    project_root: &Path,
    layout_root: Option<&Path>,
) -> Option<Rebuild> {
    let in_layout = |path: &Path| layout_root.is_some_and(|root| path.starts_with(root));
    let relevant: Vec<&PathBuf> = changed
        .iter()
        .filter(|path| path.starts_with(project_root) || in_layout(path))
        .collect();

    if relevant.iter().any(|path| {
        in_layout(path) || path.extension().is_some_and(|extension| extension == "json")
    }) {
        return Some(Rebuild::Everything);
    }

    let mut files: Vec<PathBuf> =
        relevant.into_iter().filter(|path| path.is_file()).cloned().collect();
    files.sort();
    files.dedup();
    if files.is_empty() {
        None
    } else {
        Some(Rebuild::Files(files))
    }
}

fn rebuild(compiler: &Compiler, selection: &Selection, locales: &LocaleRequest) {
    match compiler.render(selection, locales).and_then(write_batch) {
        Ok(written) => info!("Built {} files", written.len()),
        Err(e) => error!("{}", e),
    }
}

/// Builds project `name`, then rebuilds it on every change until the watcher stops.
///
/// # Errors
/// * `Error::WatchError` if the folders cannot be watched
/// * Setup errors of the initial build
pub fn watch(project: &Project, name: &str, locales: &LocaleRequest) -> Result<()> {
    let mut compiler = project.compiler(name)?;
    rebuild(&compiler, &Selection::all(), locales);

    let project_root = compiler.root().to_path_buf();
    let layout_root = compiler.options().layout_root.clone();

    let (tx, rx) = mpsc::channel::<DebounceEventResult>();
    let mut debouncer = new_debouncer(DEBOUNCE, None, tx)?;
    debouncer.watch(&project_root, RecursiveMode::Recursive)?;
    if let Some(layout_root) = &layout_root {
        debouncer.watch(layout_root, RecursiveMode::Recursive)?;
    }
    info!("Watching {}", project_root.display());

    for result in rx {
        let events = match result {
            Ok(events) => events,
            Err(errors) => {
                for e in errors {
                    warn!("Watch error: {}", e);
                }
                continue;
            }
        };
        let changed: Vec<PathBuf> = events
            .iter()
            .filter(|event| !event.kind.is_access())
            .flat_map(|event| event.paths.iter().cloned())
            .collect();

        match plan_rebuild(&changed, &project_root, layout_root.as_deref()) {
            None => debug!("Ignoring changes to {:?}", changed),
            Some(Rebuild::Everything) => {
                info!("Rebuilding {}", name);
                match project.compiler(name) {
                    Ok(fresh) => {
                        compiler = fresh;
                        rebuild(&compiler, &Selection::all(), locales);
                    }
                    Err(e) => error!("{}", e),
                }
            }
            Some(Rebuild::Files(files)) => {
                info!("Rebuilding {} changed files", files.len());
                rebuild(&compiler, &Selection::Paths(files), locales);
            }
        }
    }
    Ok(())
}
