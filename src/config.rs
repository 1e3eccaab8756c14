use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const DEFAULT_CONFIG_FILE: &str = ".zip-html-editor.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// File name offered for the packed archive.
    pub download_name: String,
    /// Suffixes that mark an archive entry as an editable HTML document.
    pub html_extensions: Vec<String>,
    /// Extensions (without dot, any case) of entries that get preview handles.
    pub image_extensions: Vec<String>,
    /// Swap image references for inline preview handles while editing.
    pub preview_assets: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            download_name: "updated.zip".to_string(),
            html_extensions: vec![".html".to_string()],
            image_extensions: ["png", "jpg", "jpeg", "gif", "svg", "webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            preview_assets: true,
        }
    }
}

impl EditorConfig {
    pub fn is_html_path(&self, path: &str) -> bool {
        self.html_extensions.iter().any(|ext| path.ends_with(ext.as_str()))
    }

    pub fn is_image_path(&self, path: &str) -> bool {
        let Some((_, ext)) = path.rsplit_once('.') else {
            return false;
        };
        self.image_extensions
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext))
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

/// Missing files yield the defaults; unknown keys are ignored, absent keys default.
pub fn load_config(path: &Path) -> Result<EditorConfig> {
    if !path.exists() {
        return Ok(EditorConfig::default());
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.download_name, "updated.zip");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"downloadName":"site.zip","previewAssets":false}"#).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.download_name, "site.zip");
        assert!(!config.preview_assets);
        assert_eq!(config.html_extensions, vec![".html".to_string()]);
    }

    #[test]
    fn classifies_paths() {
        let config = EditorConfig::default();
        assert!(config.is_html_path("pages/index.html"));
        assert!(!config.is_html_path("pages/index.htm"));
        assert!(config.is_image_path("img/LOGO.PNG"));
        assert!(config.is_image_path("a/b.webp"));
        assert!(!config.is_image_path("img/logo.png.txt"));
        assert!(!config.is_image_path("README"));
    }
}
