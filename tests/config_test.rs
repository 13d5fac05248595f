use project_tools::compile::artifact::{Artifact, Code};
use project_tools::compile::classify::Processor;
use project_tools::compile::plugin::PluginSpec;
use project_tools::compile::script::OutputFormat;
use project_tools::compile::template::locale::LocaleRequest;
use project_tools::config::{load_settings, CompileOptions, CreateSpec, RenamePolicy, Settings};
use project_tools::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn artifact(root: &str, file: &str, processor: Processor) -> Artifact {
    let root = PathBuf::from(root);
    Artifact {
        source: root.join(file),
        path: root.join(file),
        file: PathBuf::from(file),
        root,
        destination: PathBuf::new(),
        processor,
        language: "html".to_string(),
        code: Code::Text(String::new()),
        sourcemap: String::new(),
        locale: None,
    }
}

#[test_log::test]
fn test_defaults_without_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let settings = load_settings(temp_dir.path()).unwrap();

    assert_eq!(settings, Settings::default());
    assert!(settings.pretty);
    assert!(settings.sourcemaps);
    assert!(!settings.minify);
    assert_eq!(settings.fallback_locale, "eng");
    assert_eq!(settings.default_build_locales, LocaleRequest::All);
    assert_eq!(settings.server.image, "nginx:alpine");
    assert_eq!(
        settings.create,
        CreateSpec::Files(vec!["index.scss".into(), "index.js".into(), "index.pug".into()])
    );
}

#[test]
fn test_json_config() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join(".projectrc.json"),
        r#"{
            "minify": true,
            "ignore": ["drafts/**"],
            "create": "templates/project",
            "javascript": { "format": "esm", "plugins": ["replace"] },
            "default_build_locales": "eng,fra",
            "server": { "ports": ["8080:80"] }
        }"#,
    )
    .unwrap();

    let settings = load_settings(temp_dir.path()).unwrap();
    assert!(settings.minify);
    assert!(settings.pretty);
    assert_eq!(settings.ignore, vec!["drafts/**"]);
    assert_eq!(settings.create, CreateSpec::Folder("templates/project".to_string()));
    assert_eq!(settings.javascript.format, OutputFormat::Esm);
    assert_eq!(settings.javascript.plugins, vec![PluginSpec::Name("replace".to_string())]);
    assert_eq!(
        settings.default_build_locales,
        LocaleRequest::List(vec!["eng".to_string(), "fra".to_string()])
    );
    assert_eq!(settings.server.ports, vec!["8080:80"]);
    assert_eq!(settings.server.name, "project");
}

#[test]
fn test_yaml_config() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join(".projectrc.yml"),
        "name: shop\nsourcemaps: false\nlayout: layouts/_layout.pug\nfallback_locale: fra\n",
    )
    .unwrap();

    let settings = load_settings(temp_dir.path()).unwrap();
    assert_eq!(settings.name.as_deref(), Some("shop"));
    assert!(!settings.sourcemaps);
    assert_eq!(settings.layout, Some(PathBuf::from("layouts/_layout.pug")));
    assert_eq!(settings.fallback_locale, "fra");
}

#[test]
fn test_json_wins_over_yaml() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join(".projectrc.json"), r#"{ "name": "json" }"#).unwrap();
    fs::write(temp_dir.path().join(".projectrc.yaml"), "name: yaml\n").unwrap();

    let settings = load_settings(temp_dir.path()).unwrap();
    assert_eq!(settings.name.as_deref(), Some("json"));
}

#[test]
fn test_invalid_config() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join(".projectrc.json"), "{ minify: }").unwrap();
    assert!(matches!(load_settings(temp_dir.path()), Err(Error::JsonError(_))));

    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join(".projectrc.yaml"), "minify: [").unwrap();
    assert!(matches!(load_settings(temp_dir.path()), Err(Error::YamlError(_))));
}

#[test]
fn test_options_from_settings() {
    let repo = Path::new("/repo");
    let mut settings = Settings {
        minify: true,
        layout: Some(PathBuf::from("layouts/_layout.html")),
        ..Default::default()
    };
    settings.style.include_paths = vec![PathBuf::from("shared/styles")];

    let options = CompileOptions::from_settings(&settings, repo);
    assert!(options.minify);
    assert_eq!(options.style.include_paths, vec![PathBuf::from("/repo/shared/styles")]);
    assert_eq!(options.layout, Some(PathBuf::from("/repo/layouts/_layout.html")));
    assert_eq!(options.layout_root, Some(PathBuf::from("/repo/layouts")));

    let template = options.template_config(Path::new("/repo/projects/site/app"));
    assert_eq!(template.layout.as_deref(), Some("/repo/layouts/_layout.html"));
    assert_eq!(template.content_file, "_content.json");
}

#[test]
fn test_layout_in_repo_root_has_no_shared_folder() {
    let options = CompileOptions::default().with_layout(Path::new("/repo"), Path::new("_layout.html"));
    assert_eq!(options.layout, Some(PathBuf::from("/repo/_layout.html")));
    assert_eq!(options.layout_root, None);
}

#[test]
fn test_dist_rename_policy() {
    let policy = RenamePolicy::dist();
    let page = artifact("/repo/projects/site/app", "about/index.html", Processor::Template);
    let script = artifact("/repo/projects/site/app", "js/index.js", Processor::Javascript);

    assert_eq!(
        policy.apply(&page, Some("fra"), "site").unwrap(),
        PathBuf::from("/repo/projects/site/dist/fra/about/index.html")
    );
    assert_eq!(
        policy.apply(&page, None, "site").unwrap(),
        PathBuf::from("/repo/projects/site/dist/about/index.html")
    );
    assert_eq!(
        policy.apply(&script, Some("fra"), "site").unwrap(),
        PathBuf::from("/repo/projects/site/dist/js/index.js")
    );
}

#[test]
fn test_custom_rename_policy() {
    let policy = RenamePolicy::new(|artifact, locale, project| {
        format!("/out/{}/{}/{}", project, locale.unwrap_or("-"), artifact.file.display())
    });
    let page = artifact("/repo/projects/site/app", "index.html", Processor::Template);

    assert_eq!(
        policy.apply(&page, Some("eng"), "site").unwrap(),
        PathBuf::from("/out/site/eng/index.html")
    );

    let empty = RenamePolicy::new(|_, _, _| "  ".to_string());
    assert!(matches!(empty.apply(&page, None, "site"), Err(Error::ConfigError(_))));
}
