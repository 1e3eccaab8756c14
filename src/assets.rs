use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::archive::Archive;
use crate::config::EditorConfig;
use crate::paths::{
    directory_of, file_name, is_passthrough_reference, resolve, strip_query_and_fragment,
};

/// How references are matched against the registered archive paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMode {
    /// Exact canonical key from [`resolve`]; used on upload.
    Canonical,
    /// Several aliases per image and a fallback candidate search; used when a
    /// session is restored.
    Aliased,
}

/// Archive image path -> preview handle (`data:` URI). Handles only ever
/// live in the in-memory DOM and are never written back to the archive.
#[derive(Debug, Clone)]
pub struct AssetIndex {
    mode: LookupMode,
    handles: HashMap<String, String>,
}

impl AssetIndex {
    pub fn empty() -> Self {
        Self {
            mode: LookupMode::Canonical,
            handles: HashMap::new(),
        }
    }

    pub fn build(archive: &Archive, config: &EditorConfig) -> Self {
        Self::build_with(archive, config, LookupMode::Canonical)
    }

    pub fn build_aliased(archive: &Archive, config: &EditorConfig) -> Self {
        Self::build_with(archive, config, LookupMode::Aliased)
    }

    fn build_with(archive: &Archive, config: &EditorConfig, mode: LookupMode) -> Self {
        let mut handles = HashMap::new();
        if config.preview_assets {
            for path in archive.paths().filter(|p| config.is_image_path(p)) {
                let Some(bytes) = archive.get(path) else {
                    continue;
                };
                let handle = preview_handle(path, bytes);
                match mode {
                    LookupMode::Canonical => {
                        handles.insert(path.to_string(), handle);
                    }
                    LookupMode::Aliased => {
                        for alias in aliases_for(path) {
                            // first registration wins when two images share a bare name
                            handles.entry(alias).or_insert_with(|| handle.clone());
                        }
                    }
                }
            }
        }
        tracing::debug!(images = handles.len(), ?mode, "asset index built");
        Self { mode, handles }
    }

    pub fn mode(&self) -> LookupMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.handles.get(key).map(String::as_str)
    }

    /// Preview handle for `reference` as written inside `document_path`.
    pub fn lookup(&self, document_path: &str, reference: &str) -> Option<&str> {
        match self.mode {
            LookupMode::Canonical => self.get(&resolve(document_path, reference)),
            LookupMode::Aliased => self.lookup_aliased(document_path, reference),
        }
    }

    fn lookup_aliased(&self, document_path: &str, reference: &str) -> Option<&str> {
        if is_passthrough_reference(reference) {
            return None;
        }
        let clean = strip_query_and_fragment(reference);
        let stripped = clean.strip_prefix("./").unwrap_or(clean);
        let mut candidates = vec![clean.to_string(), stripped.to_string()];
        if !directory_of(document_path).is_empty() {
            candidates.push(resolve(document_path, clean));
        }
        candidates.push(file_name(clean).to_string());

        candidates.iter().find_map(|c| self.get(c))
    }
}

fn aliases_for(path: &str) -> Vec<String> {
    let bare = path.trim_start_matches('/');
    let name = file_name(bare);
    vec![
        path.to_string(),
        format!("/{bare}"),
        bare.to_string(),
        name.to_string(),
        format!("./{name}"),
    ]
}

pub fn mime_from_path(path: &str) -> &'static str {
    let ext = path
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

pub fn preview_handle(path: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_from_path(path), BASE64.encode(bytes))
}
