use project_tools::error::Error;
use project_tools::ignore::{build_ignore_set, glob, is_ignored};
use std::path::Path;

#[test]
fn test_default_ignores() {
    let set = build_ignore_set(&[]).unwrap();
    assert!(is_ignored(&set, Path::new("node_modules/pkg/index.js")));
    assert!(is_ignored(&set, Path::new("js/node_modules/pkg/index.js")));
    assert!(!is_ignored(&set, Path::new("js/index.js")));
}

#[test]
fn test_configured_ignores() {
    let set = build_ignore_set(&["drafts".to_string(), "*.psd".to_string()]).unwrap();

    // a folder match hides everything below it
    assert!(is_ignored(&set, Path::new("drafts/index.html")));
    assert!(is_ignored(&set, Path::new("logo.psd")));
    // `*` does not cross folders
    assert!(!is_ignored(&set, Path::new("img/logo.psd")));
    assert!(!is_ignored(&set, Path::new("index.html")));
}

#[test]
fn test_invalid_pattern() {
    assert!(matches!(glob("a/[b"), Err(Error::GlobError(_))));
    assert!(matches!(build_ignore_set(&["{a".to_string()]), Err(Error::GlobError(_))));
}
