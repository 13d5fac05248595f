//! Script processor: bundles an entry module and its relative imports into one chunk.
//!
//! Modules are hoisted into a single scope in dependency order. Imports become
//! plain `var` bindings, default exports become `<module>_default` variables and
//! namespace imports become frozen objects. Only relative specifiers are bundled.
//! A top-level name declared by more than one module keeps its name in the first
//! module and becomes `name$1`, `name$2`, ... in the later ones.

use super::artifact::{Code, ProcessorOutput};
use super::classify::{ext, rename_ext};
use super::plugin::{script_plugins, JsMinifier, PluginSpec, ScriptPlugin};
use crate::error::{Error, Result};
use crate::format;
use crate::sourcemap::SourceMapBuilder;
use cruet::Inflector;
use indexmap::IndexMap;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

static IMPORT_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s+([\w$\s{},*]+?)\s+from\s*['"]([^'"]+)['"][ \t]*;?"#)
        .expect("valid regex")
});
static IMPORT_BARE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s*['"]([^'"]+)['"][ \t]*;?"#).expect("valid regex")
});
static EXPORT_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)^[ \t]*export\s+(\*(?:\s+as\s+[\w$]+)?|\{[^}]*\})\s*from\s*['"]([^'"]+)['"][ \t]*;?"#,
    )
    .expect("valid regex")
});
static EXPORT_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*export\s*\{([^}]*)\}[ \t]*;?").expect("valid regex")
});
static EXPORT_DEFAULT_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^([ \t]*)export\s+default\s+((?:async\s+)?function\*?|class)\s+([\w$]+)")
        .expect("valid regex")
});
static EXPORT_DEFAULT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([ \t]*)export\s+default\s+").expect("valid regex"));
static EXPORT_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^([ \t]*)export\s+((?:async\s+)?function\*?|class|var|let|const)\s+([\w$]+)")
        .expect("valid regex")
});
static TOP_LEVEL_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(?:(?:async\s+)?function\s*\*?\s*|class\s+|(?:var|let|const)\s+)([A-Za-z_$][\w$]*)")
        .expect("valid regex")
});
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][\w$]*$").expect("valid regex"));

const RESOLVE_EXTENSIONS: [&str; 3] = ["js", "es", "mjs"];

/// Shape of the generated chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Self-invoking strict-mode function without exports
    #[default]
    Iife,
    /// Plain module that keeps the entry's exports
    Esm,
}

/// Options for bundling one entry file.
#[derive(Clone, Default)]
pub struct ScriptConfig {
    pub minify: bool,
    pub pretty: bool,
    pub sourcemaps: bool,
    pub format: OutputFormat,
    /// Bundler plugins resolved by name
    pub plugins: Vec<PluginSpec>,
    /// Ready-made plugins, run after the named ones
    pub extra_plugins: Vec<Arc<dyn ScriptPlugin>>,
}

impl ScriptConfig {
    fn chain(&self) -> Result<Vec<Arc<dyn ScriptPlugin>>> {
        let registry = script_plugins();
        let mut chain = self
            .plugins
            .iter()
            .map(|spec| registry.resolve(spec))
            .collect::<Result<Vec<_>>>()?;
        chain.extend(self.extra_plugins.iter().cloned());
        if self.minify {
            chain.push(Arc::new(JsMinifier));
        }
        Ok(chain)
    }
}

/// Bundles the module graph rooted at `file`.
pub fn script<P: AsRef<Path>>(file: P, config: &ScriptConfig) -> Result<ProcessorOutput> {
    let file = file.as_ref();
    debug!("Bundling script: {}", file.display());

    let plugins = config.chain()?;
    let bundle = Bundle::load(file, &plugins)?;
    let lines = bundle.render(config.format)?;

    let mut code = lines.iter().map(|(line, _)| line.as_str()).collect::<Vec<_>>().join("\n");
    code.push('\n');
    for plugin in &plugins {
        code = plugin.render_chunk(code)?;
    }
    if config.minify {
        code.push('\n');
    } else if config.pretty {
        code = format::beautify_js(&code);
    }

    let sourcemap = if config.sourcemaps {
        let mut builder = SourceMapBuilder::new();
        for module in &bundle.modules {
            builder.add_source(&module.id, &module.source);
        }
        // minified output no longer lines up with the sources
        if !config.minify {
            for (_, origin) in &lines {
                match origin {
                    Some((source, line)) => builder.push_mapped(*source, *line),
                    None => builder.push_unmapped(),
                }
            }
        }
        let name = rename_ext(file);
        let name = name.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        builder.build(&name).to_json()
    } else {
        String::new()
    };

    Ok(ProcessorOutput { code: Code::Text(code), sourcemap, language: ext(file) })
}

#[derive(Debug)]
enum Binding {
    Named { imported: String, local: String },
    Namespace(String),
}

#[derive(Debug)]
enum ReExport {
    Named { exported: String, imported: String, from: String },
    Namespace { exported: String, from: String },
    Star { from: String },
}

#[derive(Debug)]
struct Module {
    path: PathBuf,
    id: String,
    /// Source after plugin transforms
    source: String,
    /// Source with export syntax rewritten; imports are linked later
    code: String,
    specifiers: Vec<String>,
    resolved: HashMap<String, usize>,
    deps: Vec<usize>,
    exports: IndexMap<String, String>,
    reexports: Vec<ReExport>,
    /// Names declared at the top level of `code`
    declarations: Vec<String>,
}

struct Bundle {
    modules: Vec<Module>,
    /// Per module: top-level name → name in the bundle
    renames: Vec<HashMap<String, String>>,
}

type Line = (String, Option<(usize, usize)>);

impl Bundle {
    fn load(entry: &Path, plugins: &[Arc<dyn ScriptPlugin>]) -> Result<Self> {
        let entry = entry
            .canonicalize()
            .map_err(|e| Error::compile(entry.display(), format!("cannot read entry: {e}")))?;
        let base = entry.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut modules = Vec::new();
        let mut index: HashMap<PathBuf, usize> = HashMap::new();
        let mut default_names: Vec<String> = Vec::new();
        let mut queue = VecDeque::new();

        modules.push(Module::load(&entry, &base, plugins, &mut default_names)?);
        index.insert(entry, 0);
        queue.push_back(0);

        while let Some(current) = queue.pop_front() {
            let importer = modules[current].path.clone();
            for specifier in modules[current].specifiers.clone() {
                let path = resolve(&importer, &specifier)?;
                let dep = match index.get(&path) {
                    Some(dep) => *dep,
                    None => {
                        modules.push(Module::load(&path, &base, plugins, &mut default_names)?);
                        let dep = modules.len() - 1;
                        index.insert(path, dep);
                        queue.push_back(dep);
                        dep
                    }
                };
                let module = &mut modules[current];
                module.resolved.insert(specifier, dep);
                if !module.deps.contains(&dep) {
                    module.deps.push(dep);
                }
            }
        }

        let mut bundle = Self { renames: vec![HashMap::new(); modules.len()], modules };
        bundle.deconflict();
        Ok(bundle)
    }

    /// Renames top-level names that an earlier module in bundle order already took.
    fn deconflict(&mut self) {
        let declared: HashSet<String> =
            self.modules.iter().flat_map(|m| m.declarations.iter().cloned()).collect();
        let mut used: HashSet<String> = HashSet::new();

        for module in self.order() {
            let mut names = self.modules[module].declarations.clone();
            names.extend(self.import_locals(module));

            let mut renames = HashMap::new();
            for name in names {
                if renames.contains_key(&name) {
                    continue;
                }
                if used.contains(&name) {
                    let fresh = fresh_name(&name, &used, &declared);
                    debug!("Renaming '{}' to '{}' in {}", name, fresh, self.modules[module].id);
                    used.insert(fresh.clone());
                    renames.insert(name, fresh);
                } else {
                    used.insert(name);
                }
            }
            self.renames[module] = renames;
        }
    }

    /// Locals that imports of `module` declare, leaving out those that are the
    /// exporting module's own variable.
    fn import_locals(&self, module: usize) -> Vec<String> {
        let m = &self.modules[module];
        let mut locals = Vec::new();
        for caps in IMPORT_FROM.captures_iter(&m.code) {
            let Some(&dep) = m.resolved.get(&caps[2]) else { continue };
            for binding in parse_clause(&caps[1]) {
                match binding {
                    Binding::Named { imported, local } => {
                        let expr = self.resolve_export(dep, &imported, &mut Vec::new());
                        if expr.as_deref() != Some(local.as_str()) {
                            locals.push(local);
                        }
                    }
                    Binding::Namespace(local) => locals.push(local),
                }
            }
        }
        locals
    }

    /// The bundle name of `module`'s top-level `name`.
    fn local_name(&self, module: usize, name: &str) -> String {
        self.renames[module].get(name).cloned().unwrap_or_else(|| name.to_string())
    }

    /// Dependencies first. A module already on the path is not revisited.
    fn order(&self) -> Vec<usize> {
        fn visit(modules: &[Module], current: usize, seen: &mut [bool], order: &mut Vec<usize>) {
            if seen[current] {
                return;
            }
            seen[current] = true;
            for &dep in &modules[current].deps {
                visit(modules, dep, seen, order);
            }
            order.push(current);
        }

        let mut seen = vec![false; self.modules.len()];
        let mut order = Vec::with_capacity(self.modules.len());
        visit(&self.modules, 0, &mut seen, &mut order);
        order
    }

    fn resolve_export(&self, module: usize, name: &str, stack: &mut Vec<usize>) -> Option<String> {
        if stack.contains(&module) {
            return None;
        }
        stack.push(module);
        let m = &self.modules[module];

        let found = m.exports.get(name).map(|local| self.local_name(module, local)).or_else(|| {
            m.reexports.iter().find_map(|reexport| match reexport {
                ReExport::Named { exported, imported, from } if exported == name => {
                    let dep = *m.resolved.get(from)?;
                    self.resolve_export(dep, imported, stack)
                }
                ReExport::Namespace { exported, from } if exported == name => {
                    let dep = *m.resolved.get(from)?;
                    Some(self.namespace_object(dep, stack))
                }
                ReExport::Star { from } if name != "default" => {
                    let dep = *m.resolved.get(from)?;
                    self.resolve_export(dep, name, stack)
                }
                _ => None,
            })
        });

        stack.pop();
        found
    }

    fn export_names(&self, module: usize, stack: &mut Vec<usize>) -> IndexMap<String, String> {
        let mut names = IndexMap::new();
        if stack.contains(&module) {
            return names;
        }
        let m = &self.modules[module];
        for (name, local) in &m.exports {
            names.insert(name.clone(), self.local_name(module, local));
        }

        stack.push(module);
        for reexport in &m.reexports {
            match reexport {
                ReExport::Named { exported, imported, from } => {
                    let Some(&dep) = m.resolved.get(from) else { continue };
                    if let Some(expr) = self.resolve_export(dep, imported, stack) {
                        names.entry(exported.clone()).or_insert(expr);
                    }
                }
                ReExport::Namespace { exported, from } => {
                    let Some(&dep) = m.resolved.get(from) else { continue };
                    let expr = self.namespace_object(dep, stack);
                    names.entry(exported.clone()).or_insert(expr);
                }
                ReExport::Star { from } => {
                    let Some(&dep) = m.resolved.get(from) else { continue };
                    for (name, expr) in self.export_names(dep, stack) {
                        if name != "default" {
                            names.entry(name).or_insert(expr);
                        }
                    }
                }
            }
        }
        stack.pop();
        names
    }

    fn namespace_object(&self, module: usize, stack: &mut Vec<usize>) -> String {
        let members = self
            .export_names(module, stack)
            .into_iter()
            .map(|(name, expr)| format!("{name}: {expr}"))
            .collect::<Vec<_>>();
        if members.is_empty() {
            "Object.freeze({})".to_string()
        } else {
            format!("Object.freeze({{ {} }})", members.join(", "))
        }
    }

    /// Replaces import statements with bindings to the exporting module's variables.
    fn link(&self, module: usize) -> Result<String> {
        let m = &self.modules[module];
        let mut out = String::with_capacity(m.code.len());
        let mut last = 0;

        for caps in IMPORT_FROM.captures_iter(&m.code) {
            let Some(whole) = caps.get(0) else { continue };
            out.push_str(&rename_identifiers(&m.code[last..whole.start()], &self.renames[module]));

            let dep = *m.resolved.get(&caps[2]).ok_or_else(|| {
                Error::compile(&m.id, format!("could not resolve '{}'", &caps[2]))
            })?;
            let mut declarations = Vec::new();
            for binding in parse_clause(&caps[1]) {
                match binding {
                    Binding::Named { imported, local } => {
                        let expr =
                            self.resolve_export(dep, &imported, &mut Vec::new()).ok_or_else(|| {
                                Error::compile(
                                    &m.id,
                                    format!(
                                        "'{imported}' is not exported by {}",
                                        self.modules[dep].id
                                    ),
                                )
                            })?;
                        let local = self.local_name(module, &local);
                        if expr != local {
                            declarations.push(format!("{local} = {expr}"));
                        }
                    }
                    Binding::Namespace(local) => {
                        let local = self.local_name(module, &local);
                        declarations
                            .push(format!("{local} = {}", self.namespace_object(dep, &mut Vec::new())));
                    }
                }
            }
            if !declarations.is_empty() {
                out.push_str(&format!("var {};", declarations.join(", ")));
            }
            out.push_str(&"\n".repeat(whole.as_str().matches('\n').count()));
            last = whole.end();
        }
        out.push_str(&rename_identifiers(&m.code[last..], &self.renames[module]));
        Ok(out)
    }

    /// Generated lines, each tagged with the (source, line) it came from.
    fn render(&self, format: OutputFormat) -> Result<Vec<Line>> {
        let indent = match format {
            OutputFormat::Iife => "  ",
            OutputFormat::Esm => "",
        };

        let mut body: Vec<Line> = Vec::new();
        for module in self.order() {
            let code = self.link(module)?;
            let mut lines: Vec<(usize, &str)> = code
                .split('\n')
                .map(|line| line.trim_end_matches('\r'))
                .enumerate()
                .collect();
            while lines.first().is_some_and(|(_, line)| line.trim().is_empty()) {
                lines.remove(0);
            }
            while lines.last().is_some_and(|(_, line)| line.trim().is_empty()) {
                lines.pop();
            }
            if lines.is_empty() {
                continue;
            }
            if !body.is_empty() {
                body.push((String::new(), None));
            }
            for (number, line) in lines {
                let text = if line.trim().is_empty() {
                    String::new()
                } else {
                    format!("{indent}{line}")
                };
                body.push((text, Some((module, number))));
            }
        }

        let mut out: Vec<Line> = Vec::new();
        match format {
            OutputFormat::Iife => {
                out.push(("(function () {".to_string(), None));
                out.push(("  'use strict';".to_string(), None));
                out.push((String::new(), None));
                if body.is_empty() {
                    body.push((String::new(), None));
                }
                out.extend(body);
                out.push((String::new(), None));
                out.push(("}());".to_string(), None));
            }
            OutputFormat::Esm => {
                out.extend(body);
                let exports = self.export_names(0, &mut Vec::new());
                if !exports.is_empty() {
                    let mut specifiers = Vec::new();
                    for (name, expr) in exports {
                        if expr == name {
                            specifiers.push(name);
                        } else if IDENTIFIER.is_match(&expr) {
                            specifiers.push(format!("{expr} as {name}"));
                        } else {
                            let local = format!("{name}_namespace");
                            out.push((format!("var {local} = {expr};"), None));
                            specifiers.push(format!("{local} as {name}"));
                        }
                    }
                    out.push((String::new(), None));
                    out.push((format!("export {{ {} }};", specifiers.join(", ")), None));
                }
            }
        }
        Ok(out)
    }
}

impl Module {
    fn load(
        path: &Path,
        base: &Path,
        plugins: &[Arc<dyn ScriptPlugin>],
        default_names: &mut Vec<String>,
    ) -> Result<Self> {
        let id = path
            .strip_prefix(base)
            .map(|relative| relative.display().to_string())
            .unwrap_or_else(|_| path.display().to_string());

        let mut source = fs::read_to_string(path)?;
        for plugin in plugins {
            source = plugin.transform(source, path)?;
        }

        let mut found: Vec<(usize, String)> = Vec::new();
        for regex in [&*IMPORT_FROM, &*EXPORT_FROM] {
            for caps in regex.captures_iter(&source) {
                found.push((caps.get(0).map_or(0, |m| m.start()), caps[2].to_string()));
            }
        }
        for caps in IMPORT_BARE.captures_iter(&source) {
            found.push((caps.get(0).map_or(0, |m| m.start()), caps[1].to_string()));
        }
        found.sort_by_key(|(position, _)| *position);
        let mut specifiers: Vec<String> = Vec::new();
        for (_, specifier) in found {
            if !specifiers.contains(&specifier) {
                specifiers.push(specifier);
            }
        }

        let mut exports = IndexMap::new();
        let mut reexports = Vec::new();

        let code = replace(&source, &EXPORT_FROM, |caps| {
            let clause = caps[1].trim();
            let from = caps[2].to_string();
            if clause == "*" {
                reexports.push(ReExport::Star { from });
            } else if let Some(name) = clause.strip_prefix('*') {
                let exported = name.trim().trim_start_matches("as").trim().to_string();
                reexports.push(ReExport::Namespace { exported, from });
            } else {
                for (imported, exported) in parse_list(clause.trim_matches(|c| c == '{' || c == '}')) {
                    reexports.push(ReExport::Named { exported, imported, from: from.clone() });
                }
            }
            String::new()
        });
        let code = replace(&code, &IMPORT_BARE, |_| String::new());
        let code = replace(&code, &EXPORT_LIST, |caps| {
            for (local, exported) in parse_list(&caps[1]) {
                exports.insert(exported, local);
            }
            String::new()
        });
        let code = replace(&code, &EXPORT_DEFAULT_DECL, |caps| {
            exports.insert("default".to_string(), caps[3].to_string());
            format!("{}{} {}", &caps[1], &caps[2], &caps[3])
        });
        let default_local = default_name(path, default_names);
        let mut uses_default_local = false;
        let code = replace(&code, &EXPORT_DEFAULT, |caps| {
            uses_default_local = true;
            exports.insert("default".to_string(), default_local.clone());
            format!("{}var {} = ", &caps[1], default_local)
        });
        if uses_default_local {
            default_names.push(default_local);
        }
        let code = replace(&code, &EXPORT_DECL, |caps| {
            exports.insert(caps[3].to_string(), caps[3].to_string());
            format!("{}{} {}", &caps[1], &caps[2], &caps[3])
        });
        let mut declarations: Vec<String> = Vec::new();
        for caps in TOP_LEVEL_DECL.captures_iter(&code) {
            if !declarations.iter().any(|name| name == &caps[1]) {
                declarations.push(caps[1].to_string());
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            id,
            source,
            code,
            specifiers,
            resolved: HashMap::new(),
            deps: Vec::new(),
            exports,
            reexports,
            declarations,
        })
    }
}

/// Replaces every match of `regex`, keeping the number of lines unchanged.
fn replace<F>(code: &str, regex: &Regex, mut replacement: F) -> String
where
    F: FnMut(&regex::Captures) -> String,
{
    let mut out = String::with_capacity(code.len());
    let mut last = 0;
    for caps in regex.captures_iter(code) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&code[last..whole.start()]);
        out.push_str(&replacement(&caps));
        out.push_str(&"\n".repeat(whole.as_str().matches('\n').count()));
        last = whole.end();
    }
    out.push_str(&code[last..]);
    out
}

/// Parses `a, b as c` into `(a, c)` pairs.
fn parse_list(list: &str) -> Vec<(String, String)> {
    list.split(',')
        .filter_map(|item| {
            let parts: Vec<&str> = item.split_whitespace().collect();
            match parts.as_slice() {
                [name] => Some((name.to_string(), name.to_string())),
                [name, "as", alias] => Some((name.to_string(), alias.to_string())),
                _ => None,
            }
        })
        .collect()
}

fn parse_clause(clause: &str) -> Vec<Binding> {
    let (head, named) = match (clause.find('{'), clause.rfind('}')) {
        (Some(start), Some(end)) if start < end => (
            format!("{}{}", &clause[..start], &clause[end + 1..]),
            Some(&clause[start + 1..end]),
        ),
        _ => (clause.to_string(), None),
    };

    let mut bindings = Vec::new();
    for part in head.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        match part.strip_prefix('*') {
            Some(namespace) => {
                let local = namespace.trim().trim_start_matches("as").trim();
                bindings.push(Binding::Namespace(local.to_string()));
            }
            None => bindings.push(Binding::Named {
                imported: "default".to_string(),
                local: part.to_string(),
            }),
        }
    }
    if let Some(named) = named {
        for (imported, local) in parse_list(named) {
            bindings.push(Binding::Named { imported, local });
        }
    }
    bindings
}

fn default_name(path: &Path, taken: &[String]) -> String {
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let mut name: String = stem
        .to_snake_case()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect();
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    let base = format!("{name}_default");
    let mut candidate = base.clone();
    let mut counter = 1;
    while taken.contains(&candidate) {
        candidate = format!("{base}${counter}");
        counter += 1;
    }
    candidate
}

fn fresh_name(name: &str, used: &HashSet<String>, declared: &HashSet<String>) -> String {
    let mut counter = 1;
    loop {
        let candidate = format!("{name}${counter}");
        if !used.contains(&candidate) && !declared.contains(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

fn is_identifier_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$' || byte >= 0x80
}

/// Index just past the string literal opened at `start`.
fn string_end(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            byte if byte == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Scans template literal text from `start`. Returns the index past the closing
/// backtick, or past `${` together with `true` when an expression starts.
fn template_end(bytes: &[u8], start: usize) -> (usize, bool) {
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => return (i + 1, false),
            b'$' if bytes.get(i + 1) == Some(&b'{') => return (i + 2, true),
            _ => i += 1,
        }
    }
    (bytes.len(), false)
}

/// Whether the identifier at `start..end` is a property name rather than a variable.
fn is_property(code: &str, start: usize, end: usize) -> bool {
    let before = code[..start].trim_end();
    if before.ends_with('.') && !before.ends_with("...") {
        return true;
    }
    let after = code[end..].trim_start();
    after.starts_with(':')
        && !after.starts_with("::")
        && (before.ends_with('{') || before.ends_with(','))
}

/// Rewrites variable references listed in `renames`, leaving strings, comments
/// and property names alone.
fn rename_identifiers(code: &str, renames: &HashMap<String, String>) -> String {
    if renames.is_empty() {
        return code.to_string();
    }
    let bytes = code.as_bytes();
    let mut out = String::with_capacity(code.len());
    let mut i = 0;
    let mut depth = 0usize;
    // brace depth at which each open template expression closes
    let mut templates: Vec<usize> = Vec::new();

    while i < bytes.len() {
        let byte = bytes[i];
        let next = bytes.get(i + 1).copied();
        let end = match byte {
            b'/' if next == Some(b'/') => code[i..].find('\n').map_or(bytes.len(), |n| i + n),
            b'/' if next == Some(b'*') => code[i + 2..].find("*/").map_or(bytes.len(), |n| i + n + 4),
            b'\'' | b'"' => string_end(bytes, i),
            b'`' => {
                let (end, opens) = template_end(bytes, i + 1);
                if opens {
                    depth += 1;
                    templates.push(depth);
                }
                end
            }
            b'{' => {
                depth += 1;
                i + 1
            }
            b'}' if templates.last() == Some(&depth) => {
                templates.pop();
                depth -= 1;
                let (end, opens) = template_end(bytes, i + 1);
                if opens {
                    depth += 1;
                    templates.push(depth);
                }
                end
            }
            b'}' => {
                depth = depth.saturating_sub(1);
                i + 1
            }
            b'0'..=b'9' => {
                let mut end = i + 1;
                while end < bytes.len() && (is_identifier_byte(bytes[end]) || bytes[end] == b'.') {
                    end += 1;
                }
                end
            }
            byte if is_identifier_byte(byte) => {
                let mut end = i + 1;
                while end < bytes.len() && is_identifier_byte(bytes[end]) {
                    end += 1;
                }
                let word = &code[i..end];
                match renames.get(word) {
                    Some(renamed) if !is_property(code, i, end) => out.push_str(renamed),
                    _ => out.push_str(word),
                }
                i = end;
                continue;
            }
            _ => i + code[i..].chars().next().map_or(1, char::len_utf8),
        };
        out.push_str(&code[i..end]);
        i = end;
    }
    out
}

fn resolve(importer: &Path, specifier: &str) -> Result<PathBuf> {
    let relative = specifier.starts_with("./") || specifier.starts_with("../");
    if !relative && !specifier.starts_with('/') {
        return Err(Error::compile(
            importer.display(),
            format!("cannot bundle bare module specifier '{specifier}', only relative imports are supported"),
        ));
    }

    let dir = importer.parent().unwrap_or_else(|| Path::new(""));
    let target = dir.join(specifier);
    let mut candidates = vec![target.clone()];
    for extension in RESOLVE_EXTENSIONS {
        let mut with_extension = target.clone().into_os_string();
        with_extension.push(".");
        with_extension.push(extension);
        candidates.push(PathBuf::from(with_extension));
    }
    candidates.push(target.join("index.js"));

    candidates
        .into_iter()
        .find(|candidate| candidate.is_file())
        .and_then(|candidate| candidate.canonicalize().ok())
        .ok_or_else(|| {
            Error::compile(importer.display(), format!("could not resolve import '{specifier}'"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clause() {
        let bindings = parse_clause("main, { a, b as c }");
        assert_eq!(bindings.len(), 3);
        assert!(matches!(&bindings[0], Binding::Named { imported, local } if imported == "default" && local == "main"));
        assert!(matches!(&bindings[2], Binding::Named { imported, local } if imported == "b" && local == "c"));
        assert!(matches!(&parse_clause("* as ns")[0], Binding::Namespace(local) if local == "ns"));
    }

    #[test]
    fn test_default_name_is_unique() {
        let taken = vec!["index_default".to_string()];
        assert_eq!(default_name(Path::new("a/index.js"), &taken), "index_default$1");
        assert_eq!(default_name(Path::new("my-module.js"), &[]), "my_module_default");
    }

    #[test]
    fn test_rename_identifiers() {
        let renames = HashMap::from([("x".to_string(), "x$1".to_string())]);
        let code = "const x = { x: 1 };\nlog(x, o.x, 'x', `${x} x`, ...x); // x\n";
        assert_eq!(
            rename_identifiers(code, &renames),
            "const x$1 = { x: 1 };\nlog(x$1, o.x, 'x', `${x$1} x`, ...x$1); // x\n"
        );
    }

    #[test]
    fn test_replace_keeps_line_count() {
        let code = "import {\n  a\n} from './a';\nrun();";
        let out = replace(code, &IMPORT_FROM, |_| "var x;".to_string());
        assert_eq!(out, "var x;\n\n\nrun();");
    }
}
