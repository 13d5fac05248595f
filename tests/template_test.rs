use project_tools::compile::template::language::{Helpers, LanguageSpec, TemplateLanguage};
use project_tools::compile::template::locale::LocaleRequest;
use project_tools::compile::template::{TemplateConfig, TemplateEngine};
use project_tools::error::{Error, Result};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

const CONTENT: &str = r#"{ "eng": { "title": "Hello" }, "fra": { "title": "Bonjour" } }"#;

struct Fixture {
    _dir: TempDir,
    root: PathBuf,
    files: Vec<PathBuf>,
}

impl Fixture {
    fn new(files: &[(&str, &str)]) -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_path_buf();
        let files = files
            .iter()
            .map(|(file, content)| {
                let path = root.join(file);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(&path, content).unwrap();
                path
            })
            .collect();
        Self { _dir: dir, root, files }
    }

    fn config(&self) -> TemplateConfig {
        TemplateConfig { root: self.root.clone(), ..Default::default() }
    }

    fn engine(&self) -> TemplateEngine {
        TemplateEngine::new(&self.files, self.config()).unwrap()
    }

    fn path(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }
}

fn codes(outputs: &[project_tools::compile::template::TemplateOutput]) -> Vec<(Option<&str>, &str)> {
    outputs.iter().map(|output| (output.locale.as_deref(), output.code.as_str())).collect()
}

#[test]
fn test_renders_every_requested_locale() {
    let fixture = Fixture::new(&[
        ("_content.json", CONTENT),
        ("index.html", "<h1>{{ t(\"title\") }}</h1>"),
    ]);
    let engine = fixture.engine();
    assert_eq!(engine.locales(), ["eng".to_string(), "fra".to_string()]);

    let outputs = engine.render(&fixture.path("index.html"), json!({ "locales": "all" })).unwrap();
    assert_eq!(
        codes(&outputs),
        vec![(Some("eng"), "<h1>Hello</h1>\n"), (Some("fra"), "<h1>Bonjour</h1>\n")]
    );
    assert_eq!(outputs[0].language, "html");
}

#[test]
fn test_no_locale_uses_fallback() {
    let fixture = Fixture::new(&[
        ("_content.json", CONTENT),
        ("index.html", "<h1>{{ translate(\"title\") }}</h1>"),
    ]);

    let outputs = fixture.engine().render(&fixture.path("index.html"), Value::Null).unwrap();
    assert_eq!(codes(&outputs), vec![(None, "<h1>Hello</h1>\n")]);
}

#[test]
fn test_unknown_locale_names_every_offender() {
    let fixture = Fixture::new(&[("_content.json", CONTENT), ("index.html", "x")]);

    let err = fixture
        .engine()
        .render(&fixture.path("index.html"), json!({ "locales": ["deu", "eng", "spa"] }))
        .unwrap_err();
    match err {
        Error::UnknownLocales(codes) => assert_eq!(codes, vec!["deu", "spa"]),
        other => panic!("expected unknown locales, got {other}"),
    }
}

#[test]
fn test_include_partial_and_missing_include() {
    let fixture = Fixture::new(&[
        ("_content.json", r#"{ "eng": { "translation": { "home": "Home" }, "nav": { "about": "About" } } }"#),
        ("_partials/nav.html", "<nav>{{ t(\"home\") }} {{ t(\"nav:about\") }} {{ label }}</nav>"),
        (
            "index.html",
            "{{ include(\"nav\", { \"label\": \"x\" }) }}\n{{ include(\"missing\") }}",
        ),
    ]);

    let outputs = fixture
        .engine()
        .render(&fixture.path("index.html"), json!({ "locales": "eng" }))
        .unwrap();
    assert_eq!(
        outputs[0].code,
        "<nav>Home About x</nav>\n<!-- can't find import missing -->\n"
    );
}

#[test]
fn test_include_cycle_is_render_error() {
    let fixture = Fixture::new(&[
        ("_a.html", "{{ include(\"_b\") }}"),
        ("_b.html", "{{ include(\"_a\") }}"),
        ("index.html", "{{ include(\"_a\") }}"),
    ]);

    let engine = fixture.engine();
    let file = fixture.path("index.html");

    // every nesting level is a full render, so give it room
    let result = std::thread::Builder::new()
        .stack_size(64 * 1024 * 1024)
        .spawn(move || engine.render(&file, Value::Null))
        .unwrap()
        .join()
        .unwrap();
    assert!(matches!(result, Err(Error::RenderError { .. })));
}

#[test]
fn test_layout_in_same_language() {
    let fixture = Fixture::new(&[
        ("_content.json", CONTENT),
        ("_layout.html", "<html>\n  <body>\n    {% body %}\n  </body>\n</html>\n"),
        ("index.html", "<p>{{ t(\"title\") }}</p>\n<p>two</p>\n"),
        ("_partial.html", "<p>partial</p>"),
    ]);
    let config = TemplateConfig { layout: Some("_layout.html".to_string()), ..fixture.config() };
    let engine = TemplateEngine::new(&fixture.files, config).unwrap();

    let outputs = engine.render(&fixture.path("index.html"), json!({ "locales": "fra" })).unwrap();
    assert_eq!(
        outputs[0].code,
        "<html>\n  <body>\n    <p>Bonjour</p>\n    <p>two</p>\n  </body>\n</html>\n"
    );

    let partial = engine.render(&fixture.path("_partial.html"), Value::Null).unwrap();
    assert_eq!(partial[0].code, "<p>partial</p>\n");
}

#[test]
fn test_layout_in_other_language() {
    let fixture = Fixture::new(&[
        ("_content.json", CONTENT),
        ("_layout.hbs", "<main>\n  {% body %}\n</main>\n"),
        ("index.html", "<p>{{ t(\"title\") }}</p>\n<p>two</p>"),
    ]);
    let config = TemplateConfig { layout: Some("_layout".to_string()), ..fixture.config() };
    let engine = TemplateEngine::new(&fixture.files, config).unwrap();

    let outputs = engine.render(&fixture.path("index.html"), Value::Null).unwrap();
    assert_eq!(outputs[0].code, "<main>\n  <p>Hello</p>\n  <p>two</p>\n</main>\n");
}

#[test]
fn test_handlebars_helpers() {
    let fixture = Fixture::new(&[
        ("_content.json", r#"{ "eng": { "greeting": "Hi {{name}}" } }"#),
        ("_card.hbs", "<div>{{title}}</div>"),
        ("index.hbs", "<p>{{t \"greeting\" name=\"Ann\"}}</p>\n{{include \"_card\" this}}"),
    ]);

    let outputs = fixture
        .engine()
        .render(&fixture.path("index.hbs"), json!({ "locales": "all", "title": "Card" }))
        .unwrap();
    assert_eq!(codes(&outputs), vec![(Some("eng"), "<p>Hi Ann</p>\n<div>Card</div>\n")]);
    assert_eq!(outputs[0].language, "hbs");
}

#[test]
fn test_globals_and_locals() {
    let fixture = Fixture::new(&[("index.html", "{{ site }} {{ file }} {{ page }}")]);
    let mut globals = serde_json::Map::new();
    globals.insert("site".to_string(), json!("Example"));
    let config = TemplateConfig { globals, ..fixture.config() };
    let engine = TemplateEngine::new(&fixture.files, config).unwrap();

    let outputs = engine.render(&fixture.path("index.html"), json!({ "page": 2 })).unwrap();
    assert_eq!(outputs[0].code, "Example index.html 2\n");
}

#[test]
fn test_folder_locales() {
    let fixture = Fixture::new(&[
        ("_content.json", r#"{ "eng": { "title": "Hello" } }"#),
        ("locales/fra/_home.json", r#"{ "title": "Accueil" }"#),
        ("locales/fra/index.html", "<h1>{{ t(\"home:title\") }}</h1>"),
    ]);
    let engine = fixture.engine();
    assert_eq!(engine.locales(), ["eng".to_string(), "fra".to_string()]);
    let file = fixture.path("locales/fra/index.html");

    let outputs = engine.render(&file, json!({ "locales": "all" })).unwrap();
    assert_eq!(codes(&outputs), vec![(Some("fra"), "<h1>Accueil</h1>\n")]);

    let outputs = engine.render(&file, json!({ "locales": "eng" })).unwrap();
    assert!(outputs.is_empty());

    let outputs = engine.render(&file, Value::Null).unwrap();
    assert_eq!(outputs[0].locale.as_deref(), Some("fra"));
}

#[test]
fn test_file_directly_in_locales_folder() {
    let fixture = Fixture::new(&[("locales/home.json", "{}"), ("index.html", "x")]);

    let result = TemplateEngine::new(&fixture.files, fixture.config());
    assert!(matches!(result, Err(Error::LocaleFolderError(_))));
}

#[test]
fn test_content_changes_are_picked_up() {
    let fixture = Fixture::new(&[
        ("_content.json", CONTENT),
        ("index.html", "{{ t(\"title\") }}"),
    ]);
    let engine = fixture.engine();
    let file = fixture.path("index.html");
    let request = json!({ "locales": "eng" });

    assert_eq!(engine.render(&file, request.clone()).unwrap()[0].code, "Hello\n");
    fs::write(fixture.path("_content.json"), r#"{ "eng": { "title": "Hi" } }"#).unwrap();
    fs::write(&file, "<b>{{ t(\"title\") }}</b>").unwrap();
    assert_eq!(engine.render(&file, request).unwrap()[0].code, "<b>Hi</b>\n");
}

#[test]
fn test_concurrent_renders_keep_their_locale() {
    let fixture = Fixture::new(&[
        ("_content.json", CONTENT),
        ("index.html", "{{ t(\"title\") }}"),
    ]);
    let engine = fixture.engine();
    let file = fixture.path("index.html");
    assert_eq!(engine.resolve_locales(&LocaleRequest::All).unwrap().len(), 2);

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let (engine, file) = (&engine, &file);
                scope.spawn(move || {
                    let (locale, expected) = if i % 2 == 0 { ("eng", "Hello\n") } else { ("fra", "Bonjour\n") };
                    let outputs = engine.render(file, json!({ "locales": locale })).unwrap();
                    assert_eq!(outputs[0].code, expected);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    });
}

/// Returns the prepared source untouched, standing in for an indentation-sensitive engine.
struct Echo;

impl TemplateLanguage for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    fn indentation_sensitive(&self) -> bool {
        true
    }

    fn render(&self, _: &str, source: &str, _: &Value, _: Arc<dyn Helpers>) -> Result<String> {
        Ok(source.to_string())
    }
}

fn echo_engine(fixture: &Fixture) -> TemplateEngine {
    let mut config = fixture.config();
    config.extra_languages.insert("pug".to_string(), Arc::new(Echo));
    TemplateEngine::new(&fixture.files, config).unwrap()
}

#[test]
fn test_indented_source_is_tidied() {
    let fixture = Fixture::new(&[(
        "index.pug",
        "div\n    <p>hi</p>\n  <style>\n  a { color: red; }\n  </style>\n",
    )]);

    let outputs = echo_engine(&fixture).render(&fixture.path("index.pug"), Value::Null).unwrap();
    assert_eq!(outputs[0].code, "div\n<p>hi</p>\n<style>a{color:red}</style>\n");
}

#[test]
fn test_multiline_inline_script_is_rejected() {
    let fixture = Fixture::new(&[(
        "index.pug",
        "div\n  <script>\n    var a = 1;\n    var b = 2;\n  </script>\n",
    )]);

    match echo_engine(&fixture).render(&fixture.path("index.pug"), Value::Null) {
        Err(Error::CompileError { message, .. }) => {
            assert!(message.contains("Inline JS with multiple lines"))
        }
        other => panic!("expected a compile error, got {other:?}"),
    }
}

#[test]
#[ignore = "requires the pug command"]
fn test_pug() {
    let fixture = Fixture::new(&[("index.pug", "h1= title\n")]);

    let outputs = fixture
        .engine()
        .render(&fixture.path("index.pug"), json!({ "title": "Hello" }))
        .unwrap();
    assert_eq!(outputs[0].code, "<h1>Hello</h1>\n");
}

fn command_language(command: &str, args: &[&str]) -> LanguageSpec {
    serde_json::from_value(json!({
        "package": "pug",
        "options": { "command": command, "args": args }
    }))
    .unwrap()
}

#[test]
fn test_command_language_reads_large_context_from_file() {
    let fixture = Fixture::new(&[("index.pug", "h1= title\n")]);
    let mut config = fixture.config();
    config.languages.insert(
        "pug".to_string(),
        command_language("sh", &["-c", "cat > /dev/null; cat \"$3\""]),
    );
    let engine = TemplateEngine::new(&fixture.files, config).unwrap();

    let big = "x".repeat(200_000);
    let outputs = engine
        .render(&fixture.path("index.pug"), json!({ "title": "Hello", "big": big }))
        .unwrap();
    assert!(outputs[0].code.contains(r#""title":"Hello""#));
    assert!(outputs[0].code.contains(&big));
}

#[test]
fn test_missing_command_language() {
    let fixture = Fixture::new(&[("index.pug", "h1= title\n")]);
    let mut config = fixture.config();
    config
        .languages
        .insert("pug".to_string(), command_language("project-tools-missing-pug", &[]));
    let engine = TemplateEngine::new(&fixture.files, config).unwrap();

    match engine.render(&fixture.path("index.pug"), json!({ "title": "Hello" })) {
        Err(Error::CommandError { command, .. }) => assert_eq!(command, "project-tools-missing-pug"),
        other => panic!("expected a command error, got {other:?}"),
    }
}

#[test]
fn test_views_are_registered() {
    let fixture = Fixture::new(&[
        ("_layout.html", "{% body %}"),
        ("_partials/nav.html", ""),
        ("index.html", ""),
        ("css/index.css", ""),
    ]);
    let engine = fixture.engine();

    assert_eq!(engine.views().len(), 3);
    assert!(engine.views().get(Path::new(&fixture.path("css/index.css"))).is_none());
    assert_eq!(engine.views().find("nav").unwrap().key, "_partials/nav.html");
}
