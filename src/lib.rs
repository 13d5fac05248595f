//! project-tools manages a repo of web projects and compiles their assets.
//! Stylesheets, scripts and localized templates under `projects/<name>/app`
//! are compiled into `projects/<name>/dist`.

/// Command-line interface module for the `project` binary
pub mod cli;

/// Lookup of external programs
pub mod command;

/// Asset compile pipeline
/// - classify: file → processor
/// - style, script, none: per-file processors
/// - template: views, locales and layouts
pub mod compile;

/// Configuration handling
/// Supports JSON and YAML formats (.projectrc.json, .projectrc.yml, .projectrc.yaml)
pub mod config;

pub mod constants;

/// Error types and handling for project-tools
pub mod error;

/// Pretty printing and minification of compiled output
pub mod format;

/// File ignore patterns used during discovery
pub mod ignore;

pub mod logger;

/// Writing artifacts and their source maps
pub mod output;

/// Repo and project bookkeeping
pub mod project;

/// User input and interaction handling
pub mod prompt;

/// Serving container lifecycle
pub mod server;

pub mod sourcemap;

/// Debounced rebuilds on file changes
pub mod watch;
