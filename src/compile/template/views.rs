//! The view registry: every template file, addressable by key.

use crate::compile::classify::{ext, should_ignore};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Partition a view belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Page,
    Partial,
    Layout,
}

impl ViewKind {
    /// Ignored files whose name contains `layout.` are layouts, other ignored
    /// files are partials and everything else is a page.
    pub fn of(relative: &Path) -> Self {
        if !should_ignore(relative) {
            return ViewKind::Page;
        }
        let is_layout = relative
            .file_name()
            .is_some_and(|name| name.to_string_lossy().contains("layout."));
        if is_layout {
            ViewKind::Layout
        } else {
            ViewKind::Partial
        }
    }
}

/// One registered template file. Its source is read on every render so edits
/// made between builds are picked up.
#[derive(Debug, Clone)]
pub struct View {
    /// Path relative to the root the view was registered under, `/` separated
    pub key: String,
    pub path: PathBuf,
    pub kind: ViewKind,
    pub language: String,
    /// Registered from the shared layout root rather than the project
    pub shared: bool,
}

impl View {
    pub fn new(path: &Path, base: &Path, shared: bool) -> Self {
        let relative = path.strip_prefix(base).unwrap_or(path);
        let key = relative
            .iter()
            .map(|segment| segment.to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        Self {
            kind: ViewKind::of(relative),
            language: ext(path),
            key,
            path: path.to_path_buf(),
            shared,
        }
    }

    pub fn read(&self) -> std::io::Result<String> {
        fs::read_to_string(&self.path)
    }

    /// The view's own data, used where the including template leaves keys unset.
    pub fn context(&self) -> Value {
        json!({ "view": { "key": self.key, "language": self.language } })
    }

    fn matches(&self, name: &str) -> bool {
        let name = name.trim_start_matches("./");
        if self.key == name || self.path == Path::new(name) {
            return true;
        }
        let without_ext = self.key.rsplit_once('.').map_or(self.key.as_str(), |(stem, _)| stem);
        if without_ext == name {
            return true;
        }
        if name.contains('/') {
            return false;
        }
        let file_name = self.path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        let stem = self.path.file_stem().map(|n| n.to_string_lossy()).unwrap_or_default();
        file_name == name || stem == name
    }
}

/// Views in registration order. Later registrations win lookups, so project
/// files shadow shared layout-root files with the same name.
#[derive(Debug, Clone, Default)]
pub struct Views {
    views: Vec<View>,
}

impl Views {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, view: View) {
        self.views.retain(|existing| existing.path != view.path);
        self.views.push(view);
    }

    /// Finds a view by key, key without extension, file name or stem.
    pub fn find(&self, name: &str) -> Option<&View> {
        self.views.iter().rev().find(|view| view.matches(name))
    }

    /// Finds the view registered for exactly `path`.
    pub fn get(&self, path: &Path) -> Option<&View> {
        self.views.iter().find(|view| view.path == path)
    }

    pub fn of_kind(&self, kind: ViewKind) -> impl Iterator<Item = &View> {
        self.views.iter().filter(move |view| view.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partitions() {
        assert_eq!(ViewKind::of(Path::new("index.pug")), ViewKind::Page);
        assert_eq!(ViewKind::of(Path::new("_partial.pug")), ViewKind::Partial);
        assert_eq!(ViewKind::of(Path::new("_layout.pug")), ViewKind::Layout);
        assert_eq!(ViewKind::of(Path::new("_includes/header.html")), ViewKind::Partial);
    }

    #[test]
    fn test_later_registration_wins() {
        let mut views = Views::new();
        views.register(View::new(Path::new("/repo/layouts/_header.html"), Path::new("/repo"), true));
        views.register(View::new(Path::new("/repo/p/app/_header.html"), Path::new("/repo/p/app"), false));

        let found = views.find("_header").unwrap();
        assert!(!found.shared);
        assert_eq!(views.find("layouts/_header.html").unwrap().key, "layouts/_header.html");
        assert!(views.find("missing").is_none());
    }
}
