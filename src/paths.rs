// Archive path helpers. Keys are forward-slash separated and never carry a
// leading "./" once canonical.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SCHEME_RE: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").unwrap();
    static ref NON_WORD_RE: Regex = Regex::new(r"[\s\W]+").unwrap();
}

pub fn directory_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..i],
        None => "",
    }
}

pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[i + 1..],
        None => path,
    }
}

/// Canonical archive key for `reference` as written inside `document_path`.
///
/// Only a leading "./" is stripped when the document sits at the archive
/// root; ".." segments are folded only when there is a directory to fold
/// against. Query strings and fragments are kept.
pub fn resolve(document_path: &str, reference: &str) -> String {
    let normalized = reference.strip_prefix("./").unwrap_or(reference);
    let dir = directory_of(document_path);
    if dir.is_empty() {
        return normalized.to_string();
    }

    let combined = format!("{dir}/{normalized}");
    let mut clean: Vec<&str> = Vec::new();
    for part in combined.split('/') {
        match part {
            "." => {}
            ".." => {
                // popping past the archive root is dropped silently
                clean.pop();
            }
            _ => clean.push(part),
        }
    }
    clean.join("/")
}

pub fn strip_query_and_fragment(reference: &str) -> &str {
    match reference.find(|c: char| c == '?' || c == '#') {
        Some(i) => &reference[..i],
        None => reference,
    }
}

/// References that point outside the archive or are already preview handles.
pub fn is_passthrough_reference(reference: &str) -> bool {
    reference.starts_with("//") || SCHEME_RE.is_match(reference)
}

/// Download-safe file name: whitespace and non-word characters removed.
pub fn sanitize_file_name(name: &str) -> String {
    NON_WORD_RE.replace_all(name, "").into_owned()
}
