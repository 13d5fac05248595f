//! Locale discovery, content bundles and per-render translation lookups.

use crate::constants::{DEFAULT_NAMESPACE, LOCALES_DIR};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use log::debug;
use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, LazyLock};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{-?\s*([\w.$]+)\s*\}\}").expect("valid regex"));

/// Locale → namespace → translations.
pub type LocaleBundle = IndexMap<String, Map<String, Value>>;

/// Which locales a render call should produce.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LocaleRequest {
    /// Every locale the project declares
    All,
    /// Exactly these locales, emitted in the project's declared order
    List(Vec<String>),
    /// Render once without a locale
    #[default]
    None,
}

impl LocaleRequest {
    /// Parses `all`, a comma separated list, or an empty string.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" => LocaleRequest::None,
            "all" => LocaleRequest::All,
            list => LocaleRequest::List(
                list.split(',')
                    .map(str::trim)
                    .filter(|code| !code.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
        }
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(LocaleRequest::None),
            Value::String(text) => Ok(Self::parse(text)),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        Error::ConfigError(format!("locale names must be strings, got {item}"))
                    })
                })
                .collect::<Result<Vec<_>>>()
                .map(LocaleRequest::List),
            other => Err(Error::ConfigError(format!("invalid locale selection: {other}"))),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            LocaleRequest::All => Value::String("all".to_string()),
            LocaleRequest::List(codes) => {
                Value::Array(codes.iter().cloned().map(Value::String).collect())
            }
            LocaleRequest::None => Value::Null,
        }
    }
}

impl Serialize for LocaleRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LocaleRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(D::Error::custom)
    }
}

/// The locales a project declares and where their content lives.
#[derive(Debug, Clone, Default)]
pub struct LocaleCatalog {
    root: PathBuf,
    codes: Vec<String>,
    folder_codes: Vec<String>,
    manifests: Vec<PathBuf>,
    folder_files: Vec<(String, PathBuf)>,
}

impl LocaleCatalog {
    /// Scans `files` for content manifests named `content_file` and for the
    /// `locales/<code>/` folder convention under `root`.
    pub fn discover(files: &[PathBuf], root: &Path, content_file: &str) -> Result<Self> {
        let mut catalog = LocaleCatalog { root: root.to_path_buf(), ..Default::default() };

        for file in files {
            if file.file_name().is_some_and(|name| name == content_file) {
                for code in read_manifest(file)?.keys() {
                    push_unique(&mut catalog.codes, code);
                }
                catalog.manifests.push(file.clone());
            }

            if let Some(code) = folder_code(file, root)? {
                push_unique(&mut catalog.folder_codes, &code);
                if file.extension().is_some_and(|ext| ext == "json") {
                    catalog.folder_files.push((code, file.clone()));
                }
            }
        }

        for code in catalog.folder_codes.clone() {
            push_unique(&mut catalog.codes, &code);
        }
        debug!("Locales: {:?}", catalog.codes);
        Ok(catalog)
    }

    /// The authoritative locale set: manifest locales first, then folder locales.
    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn uses_folders(&self) -> bool {
        !self.folder_codes.is_empty()
    }

    /// The code of the `locales/<code>/` folder `path` sits in, if any.
    pub fn folder_locale(&self, path: &Path) -> Option<String> {
        if !self.uses_folders() {
            return None;
        }
        folder_code(path, &self.root).ok().flatten()
    }

    /// Expands `request` against the declared locales, in declared order.
    pub fn resolve(&self, request: &LocaleRequest) -> Result<Vec<String>> {
        match request {
            LocaleRequest::None => Ok(Vec::new()),
            LocaleRequest::All => Ok(self.codes.clone()),
            LocaleRequest::List(requested) => {
                let unknown: Vec<String> = requested
                    .iter()
                    .filter(|code| !self.codes.contains(code))
                    .cloned()
                    .collect();
                if !unknown.is_empty() {
                    return Err(Error::UnknownLocales(unknown));
                }
                Ok(self.codes.iter().filter(|code| requested.contains(code)).cloned().collect())
            }
        }
    }

    /// Reads every content source from disk.
    pub fn load(&self) -> Result<LocaleBundle> {
        let mut bundle = LocaleBundle::new();

        for manifest in &self.manifests {
            for (code, content) in read_manifest(manifest)? {
                let content = match content {
                    Value::Object(map) if map.contains_key(DEFAULT_NAMESPACE) => map,
                    other => {
                        let mut wrapped = Map::new();
                        wrapped.insert(DEFAULT_NAMESPACE.to_string(), other);
                        wrapped
                    }
                };
                merge_into(bundle.entry(code).or_default(), content);
            }
        }

        for (code, file) in &self.folder_files {
            let namespace = file
                .file_stem()
                .map(|stem| stem.to_string_lossy().trim_start_matches('_').to_string())
                .unwrap_or_default();
            let content: Value = serde_json::from_str(&fs::read_to_string(file)?)?;
            let mut namespaced = Map::new();
            namespaced.insert(namespace, content);
            merge_into(bundle.entry(code.clone()).or_default(), namespaced);
        }

        Ok(bundle)
    }
}

fn push_unique(codes: &mut Vec<String>, code: &str) {
    if !codes.iter().any(|existing| existing == code) {
        codes.push(code.to_string());
    }
}

fn read_manifest(file: &Path) -> Result<Map<String, Value>> {
    match serde_json::from_str(&fs::read_to_string(file)?)? {
        Value::Object(map) => Ok(map),
        _ => Err(Error::ConfigError(format!(
            "{} must hold an object keyed by locale",
            file.display()
        ))),
    }
}

/// Returns the `<code>` of a `.../locales/<code>/...` path relative to `root`.
fn folder_code(file: &Path, root: &Path) -> Result<Option<String>> {
    let Ok(relative) = file.strip_prefix(root) else {
        return Ok(None);
    };
    let segments: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    let Some(position) = segments.iter().position(|segment| segment == LOCALES_DIR) else {
        return Ok(None);
    };
    match segments.len() - position {
        1 => Ok(None),
        2 => Err(Error::LocaleFolderError(relative.display().to_string())),
        _ => Ok(Some(segments[position + 1].clone())),
    }
}

/// Deep-merges `source` into `target`; objects merge key by key, anything else replaces.
pub(crate) fn merge_into(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, value) in source {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => merge_into(existing, incoming),
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

/// Translation lookups for one render call.
#[derive(Debug, Clone)]
pub struct Localizer {
    bundle: Arc<LocaleBundle>,
    locale: Option<String>,
    fallback: String,
}

impl Localizer {
    pub fn new(bundle: Arc<LocaleBundle>, locale: Option<String>, fallback: &str) -> Self {
        Self { bundle, locale, fallback: fallback.to_string() }
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    /// Resolves `namespace:dotted.key`, falling back to the fallback locale and
    /// then to `defaultValue` or the key itself.
    pub fn translate(&self, key: &str, options: &Value) -> Value {
        let (namespace, path) = match key.split_once(':') {
            Some((namespace, path)) if !namespace.is_empty() && !namespace.contains(' ') => {
                (namespace, path)
            }
            _ => (DEFAULT_NAMESPACE, key),
        };
        let namespace = options.get("ns").and_then(Value::as_str).unwrap_or(namespace);

        let locales = self.locale.iter().chain(std::iter::once(&self.fallback));
        let found = locales
            .filter_map(|locale| self.bundle.get(locale)?.get(namespace))
            .find_map(|content| lookup(content, path));

        match found {
            Some(Value::String(text)) => Value::String(interpolate(text, options)),
            Some(other) => other.clone(),
            None => match options.get("defaultValue") {
                Some(Value::String(text)) => Value::String(interpolate(text, options)),
                Some(other) => other.clone(),
                None => Value::String(key.to_string()),
            },
        }
    }
}

fn lookup<'a>(content: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(content, |value, segment| match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|index| items.get(index)),
        _ => None,
    })
}

/// Replaces `{{name}}` placeholders with values from `options`, unescaped.
fn interpolate(text: &str, options: &Value) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &regex::Captures| match lookup(options, &caps[1]) {
            Some(Value::String(value)) => value.clone(),
            Some(Value::Null) | None => caps[0].to_string(),
            Some(other) => other.to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn localizer(locale: &str) -> Localizer {
        let mut bundle = LocaleBundle::new();
        bundle.insert(
            "eng".to_string(),
            json!({"translation": {"hello": "Hello {{name}}", "list": [1, 2]}, "nav": {"home": "Home"}})
                .as_object()
                .cloned()
                .unwrap(),
        );
        bundle.insert(
            "fra".to_string(),
            json!({"translation": {"hello": "Bonjour {{name}}"}}).as_object().cloned().unwrap(),
        );
        Localizer::new(Arc::new(bundle), Some(locale.to_string()), "eng")
    }

    #[test]
    fn test_translate_with_fallback() {
        let fra = localizer("fra");
        assert_eq!(fra.translate("hello", &json!({"name": "<b>"})), json!("Bonjour <b>"));
        assert_eq!(fra.translate("nav:home", &Value::Null), json!("Home"));
        assert_eq!(fra.translate("list", &Value::Null), json!([1, 2]));
        assert_eq!(fra.translate("missing.key", &Value::Null), json!("missing.key"));
        assert_eq!(
            fra.translate("missing", &json!({"defaultValue": "Hi {{name}}", "name": "x"})),
            json!("Hi x")
        );
    }

    #[test]
    fn test_parse_request() {
        assert_eq!(LocaleRequest::parse("all"), LocaleRequest::All);
        assert_eq!(LocaleRequest::parse(""), LocaleRequest::None);
        assert_eq!(
            LocaleRequest::parse("eng, fra"),
            LocaleRequest::List(vec!["eng".to_string(), "fra".to_string()])
        );
    }

    #[test]
    fn test_folder_code() {
        let root = Path::new("/p");
        assert_eq!(folder_code(Path::new("/p/locales/fra/a.pug"), root).unwrap(), Some("fra".to_string()));
        assert_eq!(folder_code(Path::new("/p/pages/a.pug"), root).unwrap(), None);
        assert!(folder_code(Path::new("/p/locales/a.json"), root).is_err());
    }
}
