//! Error handling for project-tools.
//! Defines the error type and result alias used throughout the application.

use std::io;
use thiserror::Error;

/// Errors that can occur while managing projects or compiling their assets.
#[derive(Error, Debug)]
pub enum Error {
    /// Represents errors that occur during file system operations
    #[error("IO error: {0}.")]
    IoError(#[from] io::Error),

    /// Invalid options, rename policies, or unresolvable configuration
    #[error("Configuration error: {0}.")]
    ConfigError(String),

    /// One or more requested locales are not part of the project's locale set
    #[error("Cannot build locale(s) {}: no content is declared for them.", .0.join(", "))]
    UnknownLocales(Vec<String>),

    /// A file was placed directly inside a `locales` folder
    #[error("Locale error: '{0}' must be inside a `locales/<code>/` folder, not directly in `locales/`.")]
    LocaleFolderError(String),

    /// A dialect compiler, the bundler or a template pre-check rejected a file
    #[error("Failed to compile '{file}': {message}.")]
    CompileError { file: String, message: String },

    /// A template engine failed to render a view
    #[error("Failed to render '{file}': {message}.")]
    RenderError { file: String, message: String },

    /// An external command exited unsuccessfully or could not be started
    #[error("Command '{command}' failed: {message}.")]
    CommandError { command: String, message: String },

    /// Project bookkeeping errors (missing project, invalid names)
    #[error("Project error: {0}.")]
    ProjectError(String),

    #[error("JSON error: {0}.")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}.")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Glob error: {0}.")]
    GlobError(#[from] globset::Error),

    #[error("Watch error: {0}.")]
    WatchError(#[from] notify::Error),

    #[error("Prompt error: {0}.")]
    PromptError(#[from] dialoguer::Error),
}

impl Error {
    /// Builds a compile error for `file`.
    pub fn compile(file: impl std::fmt::Display, message: impl Into<String>) -> Self {
        Error::CompileError { file: file.to_string(), message: message.into() }
    }

    /// Builds a render error for `file`, keeping only a plain message.
    pub fn render(file: impl std::fmt::Display, message: impl std::fmt::Display) -> Self {
        Error::RenderError { file: file.to_string(), message: message.to_string() }
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::IoError(err.into())
    }
}

/// Convenience type alias for Results with [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Default error handler that prints the error and exits the program.
///
/// # Behavior
/// Prints the error message to stderr and exits with status code 1
pub fn default_error_handler(err: Error) {
    eprintln!("{}", err);
    std::process::exit(1);
}
