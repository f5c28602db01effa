//! Inline `mod name { ... }` tracking.
//!
//! Declarations inside an inline module belong to that module, not to the
//! file's module. Braces inside comments, strings and char literals are
//! ignored when matching block boundaries.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::ops::Range;

static MOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bmod[ \t\r\n]+([A-Za-z_][A-Za-z0-9_]*)[ \t\r\n]*\{")
        .expect("inline module pattern is valid")
});

/// Body of an inline module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineModule {
    pub name: String,
    /// Byte range between the braces.
    pub body: Range<usize>,
}

/// Inline modules of a file, outermost first.
pub fn inline_modules(content: &str) -> Vec<InlineModule> {
    let openers: HashMap<usize, &str> = MOD_RE
        .captures_iter(content)
        .filter_map(|cap| Some((cap.get(0)?.end() - 1, cap.get(1)?.as_str())))
        .collect();

    let mut stack: Vec<(usize, Option<&str>)> = Vec::new();
    let mut modules = Vec::new();

    for (offset, brace) in code_braces(content) {
        if brace == b'{' {
            stack.push((offset, openers.get(&offset).copied()));
        } else if let Some((start, Some(name))) = stack.pop() {
            modules.push(InlineModule {
                name: name.to_string(),
                body: start + 1..offset,
            });
        }
    }

    modules.sort_by_key(|m| m.body.start);
    modules
}

/// Module path of the item at `offset`, given the file's module.
pub fn module_at(file_module: &str, modules: &[InlineModule], offset: usize) -> String {
    let mut segments: Vec<&str> = Vec::new();
    if !file_module.is_empty() {
        segments.push(file_module);
    }
    segments.extend(
        modules
            .iter()
            .filter(|m| m.body.contains(&offset))
            .map(|m| m.name.as_str()),
    );
    segments.join("::")
}

/// Offsets of `{` and `}` outside comments and literals.
fn code_braces(content: &str) -> Vec<(usize, u8)> {
    let bytes = content.as_bytes();
    let mut braces = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                i += 1;
            }
            b'r' if raw_string_hashes(bytes, i).is_some() => {
                let hashes = raw_string_hashes(bytes, i).unwrap_or(0);
                i += hashes + 2;
                while i < bytes.len() && !closes_raw_string(bytes, i, hashes) {
                    i += 1;
                }
                i += hashes;
            }
            b'"' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'\'' if bytes.get(i + 1) == Some(&b'\\') => {
                i += 3;
                while i < bytes.len() && bytes[i] != b'\'' {
                    i += 1;
                }
            }
            b'\'' if bytes.get(i + 2) == Some(&b'\'') => i += 2,
            b @ (b'{' | b'}') => braces.push((i, b)),
            _ => {}
        }
        i += 1;
    }

    braces
}

/// Number of `#`s if a raw string literal starts at `i`.
fn raw_string_hashes(bytes: &[u8], i: usize) -> Option<usize> {
    if i > 0 && (bytes[i - 1].is_ascii_alphanumeric() || bytes[i - 1] == b'_') {
        return None;
    }
    let hashes = bytes[i + 1..].iter().take_while(|&&b| b == b'#').count();
    (bytes.get(i + 1 + hashes) == Some(&b'"')).then_some(hashes)
}

fn closes_raw_string(bytes: &[u8], i: usize, hashes: usize) -> bool {
    bytes[i] == b'"' && bytes[i + 1..].iter().take(hashes).filter(|&&b| b == b'#').count() == hashes
}
