//! Per-dialect stylesheet compilers.
//!
//! Plain CSS is read from disk; preprocessor dialects are compiled by their
//! reference command line tools. When source maps are requested the tools
//! embed them inline and the map is cut out of the CSS again.

use crate::command::find_program;
use crate::error::{Error, Result};
use crate::sourcemap::{SourceMap, SourceMapBuilder};
use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Raw CSS produced by a dialect compiler.
#[derive(Debug, Clone)]
pub struct CompiledStyle {
    pub code: String,
    pub sourcemap: Option<SourceMap>,
}

/// Compiles one stylesheet of a given dialect to CSS.
pub trait DialectCompiler: Send + Sync {
    /// `include_paths` is searched in order when resolving imports.
    fn compile(
        &self,
        file: &Path,
        include_paths: &[PathBuf],
        sourcemaps: bool,
    ) -> Result<CompiledStyle>;
}

/// `css` files need no compilation.
pub struct PlainCss;

impl DialectCompiler for PlainCss {
    fn compile(
        &self,
        file: &Path,
        _include_paths: &[PathBuf],
        sourcemaps: bool,
    ) -> Result<CompiledStyle> {
        let code = fs::read_to_string(file)?;
        let sourcemap = sourcemaps.then(|| {
            let name = file_name(file);
            let mut builder = SourceMapBuilder::new();
            let source = builder.add_source(&name, &code);
            for line in 0..code.lines().count() {
                builder.push_mapped(source, line);
            }
            builder.build(&name)
        });
        Ok(CompiledStyle { code, sourcemap })
    }
}

/// How to invoke an external dialect compiler. The source file is passed last
/// and the compiled CSS is read from stdout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialectCommand {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra arguments making the tool embed an inline source map
    #[serde(default)]
    pub sourcemap_args: Vec<String>,
    /// Flag used to pass include directories. A trailing `=` glues flag and value.
    #[serde(default)]
    pub include_flag: String,
    /// Pass every include directory in one flag, joined with the platform separator.
    #[serde(default)]
    pub join_includes: bool,
}

impl DialectCommand {
    /// Reference compiler invocation for a dialect extension.
    pub fn defaults(dialect: &str) -> Option<Self> {
        let command = match dialect {
            "scss" | "sass" => DialectCommand {
                command: "sass".to_string(),
                args: vec!["--style=expanded".to_string()],
                sourcemap_args: vec![
                    "--embed-source-map".to_string(),
                    "--embed-sources".to_string(),
                ],
                include_flag: "--load-path=".to_string(),
                join_includes: false,
            },
            "less" => DialectCommand {
                command: "lessc".to_string(),
                args: vec![],
                sourcemap_args: vec![
                    "--source-map-inline".to_string(),
                    "--source-map-include-source".to_string(),
                ],
                include_flag: "--include-path=".to_string(),
                join_includes: true,
            },
            "styl" => DialectCommand {
                command: "stylus".to_string(),
                args: vec!["--print".to_string(), "--include-css".to_string()],
                sourcemap_args: vec!["--sourcemap-inline".to_string()],
                include_flag: "--include".to_string(),
                join_includes: false,
            },
            _ => return None,
        };
        Some(command)
    }

    fn include_args(&self, include_paths: &[PathBuf]) -> Result<Vec<String>> {
        if self.include_flag.is_empty() || include_paths.is_empty() {
            return Ok(Vec::new());
        }
        let values: Vec<String> = if self.join_includes {
            let joined = std::env::join_paths(include_paths).map_err(|e| {
                Error::ConfigError(format!("invalid include path for '{}': {e}", self.command))
            })?;
            vec![joined.to_string_lossy().into_owned()]
        } else {
            include_paths.iter().map(|p| p.display().to_string()).collect()
        };

        Ok(values
            .into_iter()
            .flat_map(|value| {
                if self.include_flag.ends_with('=') {
                    vec![format!("{}{}", self.include_flag, value)]
                } else {
                    vec![self.include_flag.clone(), value]
                }
            })
            .collect())
    }
}

impl DialectCompiler for DialectCommand {
    fn compile(
        &self,
        file: &Path,
        include_paths: &[PathBuf],
        sourcemaps: bool,
    ) -> Result<CompiledStyle> {
        let program = find_program(&self.command, "")?;
        let mut cmd = Command::new(program);
        cmd.args(&self.args);
        if sourcemaps {
            cmd.args(&self.sourcemap_args);
        }
        cmd.args(self.include_args(include_paths)?).arg(file);
        if let Some(parent) = file.parent() {
            cmd.current_dir(parent);
        }
        debug!("Running {:?}", cmd);

        let output = cmd.output()?;

        if !output.status.success() {
            return Err(Error::compile(
                file.display(),
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        if !output.stderr.is_empty() {
            warn!("{}: {}", self.command, String::from_utf8_lossy(&output.stderr).trim());
        }

        let code = String::from_utf8_lossy(&output.stdout).into_owned();
        if !sourcemaps {
            return Ok(CompiledStyle { code, sourcemap: None });
        }
        let (code, sourcemap) = split_inline_sourcemap(&code);
        if sourcemap.is_none() {
            warn!("{}: no inline source map in the output of {}", file.display(), self.command);
        }
        Ok(CompiledStyle { code, sourcemap })
    }
}

/// Cuts a trailing `/*# sourceMappingURL=data:... */` comment out of `css`
/// and decodes the map it carries. `css` is returned unchanged when there is
/// no inline map.
pub fn split_inline_sourcemap(css: &str) -> (String, Option<SourceMap>) {
    let Some(start) = css.rfind("/*# sourceMappingURL=") else {
        return (css.to_string(), None);
    };
    let url_start = start + "/*# sourceMappingURL=".len();
    let Some(url_len) = css[url_start..].find("*/") else {
        return (css.to_string(), None);
    };
    let Some(map) = SourceMap::from_data_url(css[url_start..url_start + url_len].trim()) else {
        return (css.to_string(), None);
    };

    let mut code = css[..start].trim_end().to_string();
    code.push_str(&css[url_start + url_len + 2..]);
    let code = format!("{}\n", code.trim_end());
    (code, Some(map))
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Picks the compiler for a dialect, preferring configured commands.
pub fn dialect_compiler(
    dialect: &str,
    overrides: &IndexMap<String, DialectCommand>,
) -> Option<Box<dyn DialectCompiler>> {
    if let Some(command) = overrides.get(dialect) {
        return Some(Box::new(command.clone()));
    }
    match dialect {
        "css" => Some(Box::new(PlainCss)),
        _ => DialectCommand::defaults(dialect)
            .map(|command| Box::new(command) as Box<dyn DialectCompiler>),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_include_args_glued() {
        let sass = DialectCommand::defaults("scss").unwrap();
        let args = sass.include_args(&[PathBuf::from("a"), PathBuf::from("b")]).unwrap();
        assert_eq!(args, vec!["--load-path=a", "--load-path=b"]);
    }

    #[test]
    fn test_include_args_separate() {
        let stylus = DialectCommand::defaults("styl").unwrap();
        let args = stylus.include_args(&[PathBuf::from("a")]).unwrap();
        assert_eq!(args, vec!["--include", "a"]);
    }

    #[test]
    fn test_split_inline_sourcemap() {
        let json = r#"{"version":3,"sources":["index.scss"],"names":[],"mappings":"AAAA;EACE"}"#;
        let css = format!(
            "a {{\n  color: red;\n}}\n\n/*# sourceMappingURL=data:application/json;charset=utf-8,{} */\n",
            urlencoding::encode(json)
        );

        let (code, map) = split_inline_sourcemap(&css);
        assert_eq!(code, "a {\n  color: red;\n}\n");
        let map = map.unwrap();
        assert_eq!(map.sources, vec!["index.scss"]);
        assert_eq!(map.mappings, "AAAA;EACE");
    }

    #[test]
    fn test_split_without_inline_sourcemap() {
        let css = "a {\n  color: red;\n}\n/*# sourceMappingURL=index.css.map */\n";
        let (code, map) = split_inline_sourcemap(css);
        assert_eq!(code, css);
        assert!(map.is_none());
    }

    #[test]
    fn test_sourcemap_args_only_when_requested() {
        let sass = DialectCommand::defaults("scss").unwrap();
        assert!(!sass.args.iter().any(|arg| arg.contains("source-map")));
        assert!(sass.sourcemap_args.contains(&"--embed-source-map".to_string()));
    }

    #[test]
    fn test_missing_compiler() {
        let command = DialectCommand {
            command: "project-tools-missing-compiler".to_string(),
            args: vec![],
            sourcemap_args: vec![],
            include_flag: String::new(),
            join_includes: false,
        };
        let result = command.compile(Path::new("index.scss"), &[], false);
        assert!(matches!(
            result,
            Err(Error::CommandError { ref command, .. }) if command == "project-tools-missing-compiler"
        ));
    }

    #[test]
    fn test_unknown_dialect() {
        assert!(dialect_compiler("txt", &IndexMap::new()).is_none());
    }
}
