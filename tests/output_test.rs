use project_tools::compile::artifact::{Artifact, Code};
use project_tools::compile::classify::Processor;
use project_tools::output::{sourcemap_comment, sourcemap_path, write_artifact};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn artifact(destination: PathBuf, code: Code, sourcemap: &str) -> Artifact {
    Artifact {
        source: PathBuf::from("/app/index.js"),
        path: PathBuf::from("/app/index.js"),
        file: PathBuf::from("index.js"),
        root: PathBuf::from("/app"),
        destination,
        processor: Processor::Javascript,
        language: "js".to_string(),
        code,
        sourcemap: sourcemap.to_string(),
        locale: None,
    }
}

#[test]
fn test_sourcemap_naming() {
    let destination = Path::new("/dist/js/index.js");
    assert_eq!(sourcemap_path(destination), PathBuf::from("/dist/js/index.js.map"));
    assert_eq!(sourcemap_comment(destination), "\n/*# sourceMappingURL=index.js.map */\n");
}

#[test]
fn test_write_with_sourcemap() {
    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("dist/js/index.js");
    let artifact = artifact(destination.clone(), Code::Text("run();\n".to_string()), "{}");

    let written = write_artifact(&artifact).unwrap();
    assert_eq!(written, vec![destination.clone(), sourcemap_path(&destination)]);
    assert_eq!(
        fs::read_to_string(&destination).unwrap(),
        "run();\n\n/*# sourceMappingURL=index.js.map */\n"
    );
    assert_eq!(fs::read_to_string(sourcemap_path(&destination)).unwrap(), "{}");
}

#[test]
fn test_write_binary() {
    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("img/logo.png");
    let artifact = artifact(destination.clone(), Code::Binary(vec![0, 159, 146, 150]), "");

    assert_eq!(write_artifact(&artifact).unwrap(), vec![destination.clone()]);
    assert_eq!(fs::read(&destination).unwrap(), vec![0, 159, 146, 150]);
}
