use project_tools::compile::template::locale::{LocaleCatalog, LocaleRequest, Localizer};
use project_tools::error::Error;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

fn catalog(files: &[(&str, &str)]) -> (TempDir, LocaleCatalog) {
    let dir = TempDir::new().unwrap();
    let paths: Vec<PathBuf> = files
        .iter()
        .map(|(file, content)| {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            path
        })
        .collect();
    let catalog = LocaleCatalog::discover(&paths, dir.path(), "_content.json").unwrap();
    (dir, catalog)
}

#[test]
fn test_request_from_config_values() {
    let request: LocaleRequest = serde_json::from_value(json!("all")).unwrap();
    assert_eq!(request, LocaleRequest::All);
    let request: LocaleRequest = serde_json::from_value(json!("eng,fra")).unwrap();
    assert_eq!(request, LocaleRequest::List(vec!["eng".to_string(), "fra".to_string()]));
    let request: LocaleRequest = serde_json::from_value(json!(["spa"])).unwrap();
    assert_eq!(request, LocaleRequest::List(vec!["spa".to_string()]));
    assert!(serde_json::from_value::<LocaleRequest>(json!(3)).is_err());
    assert_eq!(LocaleRequest::All.to_value(), json!("all"));
}

#[test]
fn test_resolve_keeps_declared_order() {
    let (_dir, catalog) = catalog(&[
        ("_content.json", r#"{ "eng": {}, "fra": {} }"#),
        ("pages/_content.json", r#"{ "spa": {}, "eng": {} }"#),
    ]);

    assert_eq!(catalog.codes(), ["eng", "fra", "spa"]);
    assert_eq!(
        catalog.resolve(&LocaleRequest::parse("spa,eng")).unwrap(),
        vec!["eng".to_string(), "spa".to_string()]
    );
    assert!(catalog.resolve(&LocaleRequest::None).unwrap().is_empty());
    assert!(matches!(
        catalog.resolve(&LocaleRequest::parse("deu")),
        Err(Error::UnknownLocales(_))
    ));
}

#[test]
fn test_unknown_locales_message() {
    let err = Error::UnknownLocales(vec!["deu".to_string(), "spa".to_string()]);
    assert!(err.to_string().contains("deu, spa"));
}

#[test]
fn test_manifests_are_merged() {
    let (_dir, catalog) = catalog(&[
        ("_content.json", r#"{ "eng": { "nav": { "home": "Home" } } }"#),
        ("about/_content.json", r#"{ "eng": { "nav": { "about": "About" } } }"#),
        ("locales/eng/_buttons.json", r#"{ "ok": "OK" }"#),
    ]);

    let bundle = catalog.load().unwrap();
    assert_eq!(
        Value::Object(bundle["eng"].clone()),
        json!({
            "translation": { "nav": { "home": "Home", "about": "About" } },
            "buttons": { "ok": "OK" }
        })
    );
    assert!(catalog.uses_folders());
}

#[test]
fn test_localizer() {
    let (_dir, catalog) = catalog(&[(
        "_content.json",
        r#"{ "eng": { "title": "Hello {{name}}", "meta": { "tags": ["a", "b"] } }, "fra": { "title": "Bonjour {{name}}" } }"#,
    )]);
    let bundle = Arc::new(catalog.load().unwrap());

    let fra = Localizer::new(bundle.clone(), Some("fra".to_string()), "eng");
    assert_eq!(fra.locale(), Some("fra"));
    assert_eq!(fra.translate("title", &json!({ "name": "Ann" })), json!("Bonjour Ann"));
    assert_eq!(fra.translate("meta.tags", &Value::Null), json!(["a", "b"]));
    assert_eq!(fra.translate("translation:meta.tags.1", &Value::Null), json!("b"));
    assert_eq!(fra.translate("nope", &json!({ "defaultValue": "Default" })), json!("Default"));
    assert_eq!(fra.translate("nope", &Value::Null), json!("nope"));

    let none = Localizer::new(bundle, None, "eng");
    assert_eq!(none.translate("title", &json!({ "name": "Ann" })), json!("Hello Ann"));
}
