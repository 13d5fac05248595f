use std::io;

use project_tools::error::Error;

#[test]
fn test_error_conversion() {
    let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
    let err: Error = io_err.into();
    assert!(matches!(err, Error::IoError(_)));

    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err: Error = json_err.into();
    assert!(matches!(err, Error::JsonError(_)));
}

#[test]
fn test_error_display() {
    let err = Error::ConfigError("invalid config".to_string());
    assert_eq!(err.to_string(), "Configuration error: invalid config.");

    let err = Error::UnknownLocales(vec!["deu".to_string(), "spa".to_string()]);
    assert_eq!(
        err.to_string(),
        "Cannot build locale(s) deu, spa: no content is declared for them."
    );

    let err = Error::compile("js/index.js", "cannot resolve 'lodash'");
    assert_eq!(err.to_string(), "Failed to compile 'js/index.js': cannot resolve 'lodash'.");

    let err = Error::render("index.html", "unknown filter");
    assert_eq!(err.to_string(), "Failed to render 'index.html': unknown filter.");

    let err = Error::CommandError { command: "docker ps".to_string(), message: "denied".to_string() };
    assert_eq!(err.to_string(), "Command 'docker ps' failed: denied.");
}
