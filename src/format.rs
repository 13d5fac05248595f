//! Pretty-printing and minification of generated CSS, JavaScript and HTML.

use regex::Regex;
use std::sync::LazyLock;

const INDENT: &str = "  ";

static ANON_FUNCTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bfunction \(").expect("valid regex"));
static IMPORTANT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*!\s*important").expect("valid regex"));

/// Re-emits `css` with one declaration per line.
///
/// Blocks are indented by two spaces, selector lists are split one selector per
/// line and top-level rules are separated by a blank line. Strings and comments
/// are kept verbatim.
pub fn beautify_css(css: &str) -> String {
    let mut out = String::new();
    let mut buffer = String::new();
    let mut depth = 0usize;
    let mut parens = 0usize;
    let mut quote: Option<char> = None;
    let mut after_rule = false;
    let mut chars = css.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            buffer.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    buffer.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => {
                quote = Some(c);
                buffer.push(c);
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut comment = String::from("/*");
                while let Some(next) = chars.next() {
                    comment.push(next);
                    if next == '*' && chars.peek() == Some(&'/') {
                        chars.next();
                        comment.push('/');
                        break;
                    }
                }
                if buffer.trim().is_empty() {
                    if depth == 0 && after_rule {
                        out.push('\n');
                        after_rule = false;
                    }
                    push_line(&mut out, depth, &comment);
                } else {
                    buffer.push_str(&comment);
                }
            }
            '(' => {
                parens += 1;
                buffer.push(c);
            }
            ')' => {
                parens = parens.saturating_sub(1);
                buffer.push(c);
            }
            '{' if parens == 0 => {
                if depth == 0 && after_rule {
                    out.push('\n');
                }
                after_rule = false;
                let selector = format_selector(&buffer, depth);
                push_line(&mut out, depth, &format!("{selector} {{"));
                buffer.clear();
                depth += 1;
            }
            ';' if parens == 0 => {
                let declaration = format_declaration(&buffer);
                if !declaration.is_empty() {
                    if depth == 0 && after_rule {
                        out.push('\n');
                        after_rule = false;
                    }
                    push_line(&mut out, depth, &format!("{declaration};"));
                }
                buffer.clear();
            }
            '}' => {
                let declaration = format_declaration(&buffer);
                if !declaration.is_empty() {
                    push_line(&mut out, depth, &format!("{declaration};"));
                }
                buffer.clear();
                depth = depth.saturating_sub(1);
                push_line(&mut out, depth, "}");
                if depth == 0 {
                    after_rule = true;
                }
            }
            _ => buffer.push(c),
        }
    }

    let rest = collapse_whitespace(&buffer);
    if !rest.is_empty() {
        push_line(&mut out, depth, &rest);
    }
    out
}

fn push_line(out: &mut String, depth: usize, line: &str) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    out.push_str(line);
    out.push('\n');
}

fn format_selector(raw: &str, depth: usize) -> String {
    let selector = collapse_whitespace(raw);
    if selector.starts_with('@') {
        return selector;
    }
    let separator = format!(",\n{}", INDENT.repeat(depth));
    split_top_level(&selector, ',')
        .iter()
        .map(|part| part.trim())
        .collect::<Vec<_>>()
        .join(&separator)
}

fn format_declaration(raw: &str) -> String {
    let declaration = collapse_whitespace(raw);
    if declaration.is_empty() || declaration.starts_with('@') {
        return declaration;
    }
    let declaration = match declaration.split_once(':') {
        Some((property, value)) => format!("{}: {}", property.trim(), value.trim()),
        None => declaration,
    };
    IMPORTANT.replace_all(&declaration, " !important").into_owned()
}

/// Collapses whitespace runs outside of quoted strings into one space.
fn collapse_whitespace(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut quote: Option<char> = None;
    let mut pending_space = false;

    for c in raw.trim().chars() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        if c == '"' || c == '\'' {
            quote = Some(c);
        }
        out.push(c);
    }
    out
}

fn split_top_level(raw: &str, separator: char) -> Vec<String> {
    let mut parts = vec![String::new()];
    let mut parens = 0usize;
    let mut quote: Option<char> = None;

    for c in raw.chars() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '[') => parens += 1,
            (None, ')' | ']') => parens = parens.saturating_sub(1),
            (None, _) if c == separator && parens == 0 => {
                parts.push(String::new());
                continue;
            }
            _ => {}
        }
        if let Some(last) = parts.last_mut() {
            last.push(c);
        }
    }
    parts
}

/// Normalises generated JavaScript: trailing whitespace is removed, anonymous
/// functions are written `function()` and the output ends with one newline.
pub fn beautify_js(js: &str) -> String {
    let code = ANON_FUNCTION.replace_all(js, "function(");
    let mut out = code
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    let trimmed = out.trim_end_matches('\n').len();
    out.truncate(trimmed);
    out.push('\n');
    out
}

/// Tidies rendered HTML: blank lines and trailing whitespace are dropped and the
/// document ends with a single newline.
pub fn pretty_html(html: &str) -> String {
    let mut out = html
        .trim_start()
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    out.push('\n');
    out
}

fn minify_cfg() -> minify_html::Cfg {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_comments = false;
    cfg.minify_css = true;
    cfg.minify_js = true;
    cfg
}

fn minify_in_tag(code: &str, tag: &str) -> String {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let wrapped = format!("{open}{code}{close}");
    let minified = minify_html::minify(wrapped.as_bytes(), &minify_cfg());
    let minified = String::from_utf8_lossy(&minified);
    minified
        .trim()
        .strip_prefix(open.as_str())
        .and_then(|inner| inner.strip_suffix(close.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| code.trim().to_string())
}

/// Minifies a stylesheet.
pub fn minify_css(css: &str) -> String {
    minify_in_tag(css, "style")
}

/// Minifies a script.
pub fn minify_js(js: &str) -> String {
    minify_in_tag(js, "script")
}
