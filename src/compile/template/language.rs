//! Template languages and the helpers they expose to templates.

use crate::command::find_program;
use crate::compile::plugin::{PluginRegistry, PluginSpec};
use crate::error::{Error, Result};
use handlebars::{
    Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext, RenderError,
};
use log::{debug, warn};
use minijinja::{Environment, ErrorKind};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::{Arc, LazyLock};

static INLINE_SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<script(?:\s+[^>]*)?>(.*?)</script(?:\s+[^>]*)?>").expect("valid regex")
});
static INLINE_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)(<style(?:\s+[^>]*)?>)(.*?)(</style(?:\s+[^>]*)?>)").expect("valid regex")
});
static LAST_SEMICOLON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r";(\s*)\}").expect("valid regex"));
static STYLE_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*([{}:;,]|!important)\s*").expect("valid regex"));

/// Functions every template can call: `t`/`translate` and `include`.
pub trait Helpers: Send + Sync {
    /// Looks up a translation. Strings come back interpolated, objects verbatim.
    fn translate(&self, key: &str, options: &Value) -> Value;

    /// Renders another registered view inside the current render.
    fn include(&self, file: &str, locals: &Value) -> Result<String>;
}

/// A template language: renders one source string against a JSON context.
pub trait TemplateLanguage: Send + Sync {
    fn name(&self) -> &str;

    /// Whitespace is significant, so sources are tidied before rendering.
    fn indentation_sensitive(&self) -> bool {
        false
    }

    fn render(
        &self,
        name: &str,
        source: &str,
        context: &Value,
        helpers: Arc<dyn Helpers>,
    ) -> Result<String>;
}

/// How a language is configured: `"minijinja"` or `{ "package": "pug", "options": {...} }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LanguageSpec {
    Id(String),
    Package {
        package: String,
        #[serde(default)]
        options: Value,
    },
}

impl LanguageSpec {
    pub fn to_plugin_spec(&self) -> PluginSpec {
        match self {
            LanguageSpec::Id(id) => PluginSpec::Name(id.clone()),
            LanguageSpec::Package { package, options } => {
                PluginSpec::Configured { name: package.clone(), options: options.clone() }
            }
        }
    }
}

/// Language identifier used for an extension nobody configured.
pub fn default_language(extension: &str) -> Option<&'static str> {
    match extension {
        "html" | "htm" | "txt" | "j2" | "jinja" | "jinja2" | "njk" | "nunjucks" | "twig"
        | "swig" => Some("minijinja"),
        "hbs" | "handlebars" | "mustache" => Some("handlebars"),
        "pug" | "jade" => Some("pug"),
        _ => None,
    }
}

/// Registry with the built-in template languages.
pub fn languages() -> PluginRegistry<dyn TemplateLanguage> {
    let mut registry: PluginRegistry<dyn TemplateLanguage> = PluginRegistry::new();
    registry.register("minijinja", |options| Ok(Arc::new(MiniJinjaLanguage::new(options)?)));
    registry.register("handlebars", |options| Ok(Arc::new(HandlebarsLanguage::new(options)?)));
    registry.register("pug", |options| Ok(Arc::new(CommandLanguage::pug(options)?)));
    registry
}

fn parse_options<T: for<'de> Deserialize<'de> + Default>(name: &str, options: &Value) -> Result<T> {
    if options.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(options.clone())
        .map_err(|e| Error::ConfigError(format!("invalid options for '{name}': {e}")))
}

#[derive(Debug, Default, Deserialize)]
struct MiniJinjaOptions {
    #[serde(default)]
    trim_blocks: bool,
    #[serde(default)]
    lstrip_blocks: bool,
    #[serde(default)]
    keep_trailing_newline: bool,
}

/// Jinja-style templates (`html`, `txt`, `njk`, `twig`, ...).
pub struct MiniJinjaLanguage {
    env: Environment<'static>,
}

impl MiniJinjaLanguage {
    pub fn new(options: &Value) -> Result<Self> {
        let options: MiniJinjaOptions = parse_options("minijinja", options)?;
        let mut env = Environment::new();
        env.set_trim_blocks(options.trim_blocks);
        env.set_lstrip_blocks(options.lstrip_blocks);
        env.set_keep_trailing_newline(options.keep_trailing_newline);
        Ok(Self { env })
    }
}

fn to_json(value: Option<minijinja::Value>) -> std::result::Result<Value, minijinja::Error> {
    match value {
        None => Ok(Value::Null),
        Some(value) => serde_json::to_value(&value)
            .map_err(|e| minijinja::Error::new(ErrorKind::InvalidOperation, e.to_string())),
    }
}

fn to_minijinja(value: Value) -> minijinja::Value {
    match value {
        Value::String(text) => minijinja::Value::from_safe_string(text),
        other => minijinja::Value::from_serialize(&other),
    }
}

impl TemplateLanguage for MiniJinjaLanguage {
    fn name(&self) -> &str {
        "minijinja"
    }

    fn render(
        &self,
        name: &str,
        source: &str,
        context: &Value,
        helpers: Arc<dyn Helpers>,
    ) -> Result<String> {
        let mut env = self.env.clone();
        for alias in ["t", "translate"] {
            let helpers = helpers.clone();
            env.add_function(
                alias,
                move |key: String, options: Option<minijinja::Value>| {
                    Ok::<_, minijinja::Error>(to_minijinja(helpers.translate(&key, &to_json(options)?)))
                },
            );
        }
        let include = helpers.clone();
        env.add_function("include", move |file: String, locals: Option<minijinja::Value>| {
            include
                .include(&file, &to_json(locals)?)
                .map(minijinja::Value::from_safe_string)
                .map_err(|e| minijinja::Error::new(ErrorKind::InvalidOperation, e.to_string()))
        });

        env.add_template_owned(name.to_string(), source.to_string())
            .map_err(|e| Error::render(name, e))?;
        let template = env.get_template(name).map_err(|e| Error::render(name, e))?;
        template.render(context).map_err(|e| Error::render(name, e))
    }
}

#[derive(Debug, Default, Deserialize)]
struct HandlebarsOptions {
    #[serde(default)]
    strict: bool,
}

/// Handlebars and mustache templates.
pub struct HandlebarsLanguage {
    strict: bool,
}

impl HandlebarsLanguage {
    pub fn new(options: &Value) -> Result<Self> {
        let options: HandlebarsOptions = parse_options("handlebars", options)?;
        Ok(Self { strict: options.strict })
    }
}

struct TranslateHelper(Arc<dyn Helpers>);

impl HelperDef for TranslateHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let key = h
            .param(0)
            .and_then(|param| param.value().as_str())
            .ok_or_else(|| RenderError::new("translation key is required"))?;
        let mut options = h.param(1).map(|param| param.value().clone()).unwrap_or(Value::Null);
        if !h.hash().is_empty() {
            let mut merged = options.as_object().cloned().unwrap_or_default();
            for (name, value) in h.hash() {
                merged.insert(name.to_string(), value.value().clone());
            }
            options = Value::Object(merged);
        }

        match self.0.translate(key, &options) {
            Value::String(text) => out.write(&text)?,
            other => out.write(&other.to_string())?,
        }
        Ok(())
    }
}

struct IncludeHelper(Arc<dyn Helpers>);

impl HelperDef for IncludeHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let file = h
            .param(0)
            .and_then(|param| param.value().as_str())
            .ok_or_else(|| RenderError::new("include needs a file name"))?;
        let locals = h.param(1).map(|param| param.value().clone()).unwrap_or(Value::Null);
        let content =
            self.0.include(file, &locals).map_err(|e| RenderError::new(e.to_string()))?;
        out.write(&content)?;
        Ok(())
    }
}

impl TemplateLanguage for HandlebarsLanguage {
    fn name(&self) -> &str {
        "handlebars"
    }

    fn render(
        &self,
        name: &str,
        source: &str,
        context: &Value,
        helpers: Arc<dyn Helpers>,
    ) -> Result<String> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(self.strict);
        registry.register_helper("t", Box::new(TranslateHelper(helpers.clone())));
        registry.register_helper("translate", Box::new(TranslateHelper(helpers.clone())));
        registry.register_helper("include", Box::new(IncludeHelper(helpers)));
        registry.render_template(source, context).map_err(|e| Error::render(name, e))
    }
}

#[derive(Debug, Deserialize)]
struct CommandOptions {
    #[serde(default = "default_pug")]
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    pretty: bool,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self { command: default_pug(), args: Vec::new(), pretty: false }
    }
}

fn default_pug() -> String {
    "pug".to_string()
}

/// A language rendered by an external command: the source goes to stdin, the
/// context is written to a JSON file passed with `--obj` and the HTML is read
/// from stdout.
///
/// Functions cannot cross the process boundary, so `t` and `include` are not
/// available to these templates.
pub struct CommandLanguage {
    name: String,
    command: String,
    args: Vec<String>,
    indentation_sensitive: bool,
}

impl CommandLanguage {
    pub fn pug(options: &Value) -> Result<Self> {
        let options: CommandOptions = parse_options("pug", options)?;
        let mut args = options.args;
        if options.pretty {
            args.push("--pretty".to_string());
        }
        Ok(Self { name: "pug".to_string(), command: options.command, args, indentation_sensitive: true })
    }
}

impl TemplateLanguage for CommandLanguage {
    fn name(&self) -> &str {
        &self.name
    }

    fn indentation_sensitive(&self) -> bool {
        self.indentation_sensitive
    }

    fn render(
        &self,
        name: &str,
        source: &str,
        context: &Value,
        _helpers: Arc<dyn Helpers>,
    ) -> Result<String> {
        let program = find_program(&self.command, "")?;

        // removed when dropped, after the command has exited
        let mut locals = tempfile::Builder::new()
            .prefix("project-tools-")
            .suffix(".json")
            .tempfile()?;
        locals.write_all(context.to_string().as_bytes())?;
        locals.flush()?;

        let mut cmd = Command::new(program);
        cmd.args(&self.args)
            .arg("--path")
            .arg(name)
            .arg("--obj")
            .arg(locals.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        debug!("Running {} for {}", self.command, name);

        let mut child = cmd.spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(source.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        drop(locals);

        if !output.status.success() {
            return Err(Error::render(name, String::from_utf8_lossy(&output.stderr).trim()));
        }
        if !output.stderr.is_empty() {
            warn!("{}: {}", self.command, String::from_utf8_lossy(&output.stderr).trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Prepares a source for an indentation-sensitive language.
///
/// Inline scripts may hold a single line only. Inline style blocks are folded
/// onto one line and lines starting with `<` lose their indentation.
pub fn prepare_indented(file: &str, source: &str) -> Result<String> {
    for caps in INLINE_SCRIPT.captures_iter(source) {
        let extra_lines = caps[1].split('\n').skip(1).filter(|line| !line.trim().is_empty()).count();
        if extra_lines > 0 {
            return Err(Error::compile(
                file,
                "Inline JS with multiple lines is not supported with `pug`, and `jade` files",
            ));
        }
    }

    let folded = INLINE_STYLE.replace_all(source, |caps: &regex::Captures| {
        let content = LAST_SEMICOLON.replace_all(&caps[2], "$1}");
        let content = STYLE_SPACE.replace_all(&content, "$1");
        format!("{}{}{}\n", &caps[1], content.trim(), &caps[3])
    });

    Ok(folded
        .split('\n')
        .map(|line| if line.trim_start().starts_with('<') { line.trim() } else { line })
        .collect::<Vec<_>>()
        .join("\n"))
}
