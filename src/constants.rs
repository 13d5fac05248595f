//! Common constants used throughout project-tools.

/// Supported configuration file names, in lookup order
pub const CONFIG_FILES: [&str; 3] = [".projectrc.json", ".projectrc.yml", ".projectrc.yaml"];

/// Marker file holding the name of the active project
pub const PROJECT_FILE: &str = "PROJECT";

/// Folder (inside the repo root) that contains every project
pub const PROJECTS_DIR: &str = "projects";

/// Source folder of a project
pub const APP_DIR: &str = "app";

/// Output folder of a project
pub const DIST_DIR: &str = "dist";

/// Directories that are never discovered
pub const DEFAULT_IGNORE: [&str; 1] = ["**/node_modules/**"];

/// Locale content manifest file name
pub const CONTENT_FILE: &str = "_content.json";

/// Path segment introducing the `locales/<code>/` folder convention
pub const LOCALES_DIR: &str = "locales";

/// Translation namespace used when a manifest is not namespaced
pub const DEFAULT_NAMESPACE: &str = "translation";

/// Marker inside a layout where the page body is inserted
pub const BODY_MARKER: &str = "{% body %}";

/// Default files created for a new project
pub const DEFAULT_CREATE: [&str; 3] = ["index.scss", "index.js", "index.pug"];
