//! Layout composition: inserting a page body at the layout's body marker.

use crate::constants::BODY_MARKER;

/// Stands in for the body while a layout in another language is rendered.
pub const BODY_PLACEHOLDER: &str = "<!--project-tools:body-->";

/// Leading whitespace of the line holding `marker`.
pub fn marker_indent(source: &str, marker: &str) -> Option<usize> {
    source.lines().find(|line| line.contains(marker)).map(|line| {
        line.chars().take_while(|c| c.is_whitespace()).count()
    })
}

/// Indents every line but the first by `indent` spaces. The first line loses
/// its own indentation because it already sits at the marker's column.
pub fn reindent(body: &str, indent: usize) -> String {
    let padding = " ".repeat(indent);
    body.trim_end_matches('\n')
        .split('\n')
        .enumerate()
        .map(|(index, line)| {
            if index == 0 {
                line.trim_start().to_string()
            } else if line.trim().is_empty() {
                String::new()
            } else {
                format!("{padding}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Inserts raw page source into a layout source of the same language.
pub fn compose(layout: &str, page: &str, indent: usize) -> String {
    layout.replacen(BODY_MARKER, &reindent(page, indent), 1)
}

/// The layout source with its marker swapped for [`BODY_PLACEHOLDER`].
pub fn with_placeholder(layout: &str) -> String {
    layout.replacen(BODY_MARKER, BODY_PLACEHOLDER, 1)
}

/// Inserts a rendered body into a rendered layout, or `None` when the layout
/// engine dropped the placeholder.
pub fn insert_rendered(shell: &str, body: &str) -> Option<String> {
    let indent = marker_indent(shell, BODY_PLACEHOLDER)?;
    Some(shell.replacen(BODY_PLACEHOLDER, &reindent(body, indent), 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reindent() {
        assert_eq!(reindent("  <p>a</p>\n<ul>\n\n  <li>b</li>\n</ul>\n", 4), "<p>a</p>\n    <ul>\n\n      <li>b</li>\n    </ul>");
    }

    #[test]
    fn test_insert_rendered() {
        let shell = "<body>\n  <!--project-tools:body-->\n</body>\n";
        assert_eq!(
            insert_rendered(shell, "<p>a</p>\n<p>b</p>\n").unwrap(),
            "<body>\n  <p>a</p>\n  <p>b</p>\n</body>\n"
        );
        assert!(insert_rendered("<body></body>", "x").is_none());
    }
}
