//! Source map (revision 3) model and a line-granular builder.

use serde::{Deserialize, Serialize};

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// A serialisable revision 3 source map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u8,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file: String,
    pub sources: Vec<String>,
    #[serde(default)]
    pub sources_content: Vec<String>,
    #[serde(default)]
    pub names: Vec<String>,
    pub mappings: String,
}

impl SourceMap {
    /// A map that records the original source but carries no mappings.
    pub fn for_source(file: &str, source: &str, content: &str) -> Self {
        Self {
            version: 3,
            file: file.to_string(),
            sources: vec![source.to_string()],
            sources_content: vec![content.to_string()],
            names: Vec::new(),
            mappings: String::new(),
        }
    }

    /// Reads the map from an inline `data:application/json` URL, as embedded
    /// by compilers in a `sourceMappingURL` comment. Base64 and percent
    /// encoded payloads are both accepted.
    pub fn from_data_url(url: &str) -> Option<Self> {
        let (meta, payload) = url.strip_prefix("data:")?.split_once(',')?;
        let mut params = meta.split(';');
        if params.next()? != "application/json" {
            return None;
        }
        let json = if params.any(|param| param == "base64") {
            String::from_utf8(decode_base64(payload)?).ok()?
        } else {
            urlencoding::decode(payload).ok()?.into_owned()
        };
        serde_json::from_str(&json).ok()
    }

    pub fn to_json(&self) -> String {
        // a struct of strings always serialises
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Builds line-to-line mappings for generated code assembled from several sources.
#[derive(Debug, Default)]
pub struct SourceMapBuilder {
    sources: Vec<String>,
    contents: Vec<String>,
    lines: Vec<Option<(usize, usize)>>,
}

impl SourceMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a source and returns its index.
    pub fn add_source(&mut self, name: &str, content: &str) -> usize {
        self.sources.push(name.to_string());
        self.contents.push(content.to_string());
        self.sources.len() - 1
    }

    /// Appends a generated line that has no original.
    pub fn push_unmapped(&mut self) {
        self.lines.push(None);
    }

    /// Appends a generated line that came from `line` (zero based) of `source`.
    pub fn push_mapped(&mut self, source: usize, line: usize) {
        self.lines.push(Some((source, line)));
    }

    /// Number of generated lines recorded so far.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn build(self, file: &str) -> SourceMap {
        let mut mappings = String::new();
        let (mut prev_source, mut prev_line) = (0i64, 0i64);

        for (index, line) in self.lines.iter().enumerate() {
            if index > 0 {
                mappings.push(';');
            }
            if let Some((source, original)) = line {
                let (source, original) = (*source as i64, *original as i64);
                encode_vlq(&mut mappings, 0);
                encode_vlq(&mut mappings, source - prev_source);
                encode_vlq(&mut mappings, original - prev_line);
                encode_vlq(&mut mappings, 0);
                prev_source = source;
                prev_line = original;
            }
        }

        SourceMap {
            version: 3,
            file: file.to_string(),
            sources: self.sources,
            sources_content: self.contents,
            names: Vec::new(),
            mappings,
        }
    }
}

fn encode_vlq(out: &mut String, value: i64) {
    let mut vlq = if value < 0 { ((-value) << 1) | 1 } else { value << 1 };
    loop {
        let mut digit = (vlq & 0b11111) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b100000;
        }
        out.push(BASE64[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}

fn decode_base64(input: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len() * 3 / 4);
    let (mut buffer, mut bits) = (0u32, 0u32);
    for byte in input.bytes().filter(|b| !b.is_ascii_whitespace()) {
        if byte == b'=' {
            break;
        }
        let value = BASE64.iter().position(|&c| c == byte)? as u32;
        buffer = (buffer << 6) | value;
        bits += 6;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
            buffer &= (1 << bits) - 1;
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vlq(value: i64) -> String {
        let mut out = String::new();
        encode_vlq(&mut out, value);
        out
    }

    #[test]
    fn test_encode_vlq() {
        assert_eq!(vlq(0), "A");
        assert_eq!(vlq(1), "C");
        assert_eq!(vlq(-1), "D");
        assert_eq!(vlq(16), "gB");
        assert_eq!(vlq(123), "2H");
    }

    #[test]
    fn test_decode_base64() {
        assert_eq!(decode_base64("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(decode_base64("aGk").unwrap(), b"hi");
        assert!(decode_base64("a*b").is_none());
    }

    #[test]
    fn test_from_data_url() {
        let json = r#"{"version":3,"sources":["a.scss"],"mappings":"AAAA"}"#;
        let base64 = "eyJ2ZXJzaW9uIjozLCJzb3VyY2VzIjpbImEuc2NzcyJdLCJtYXBwaW5ncyI6IkFBQUEifQ==";
        let map = SourceMap::from_data_url(&format!("data:application/json;base64,{base64}"))
            .unwrap();
        assert_eq!(map.sources, vec!["a.scss"]);
        assert_eq!(map.mappings, "AAAA");

        let encoded = urlencoding::encode(json);
        let map =
            SourceMap::from_data_url(&format!("data:application/json;charset=utf-8,{encoded}"))
                .unwrap();
        assert_eq!(map.mappings, "AAAA");

        assert!(SourceMap::from_data_url("data:text/plain,x").is_none());
    }

    #[test]
    fn test_build_line_mappings() {
        let mut builder = SourceMapBuilder::new();
        let a = builder.add_source("a.js", "one\ntwo");
        builder.push_unmapped();
        builder.push_mapped(a, 0);
        builder.push_mapped(a, 1);
        let map = builder.build("bundle.js");

        assert_eq!(map.mappings, ";AAAA;AACA");
        assert_eq!(map.sources, vec!["a.js"]);
        assert!(map.to_json().contains("\"sourcesContent\":[\"one\\ntwo\"]"));
    }
}
