use std::fmt;

use markup5ever_rcdom::RcDom;
use serde::{Deserialize, Serialize};

use crate::archive::Archive;
use crate::assets::AssetIndex;
use crate::dom::{
    attr_get, attr_set, elements_by_tag, find_body, node_at, parse_html, serialize_children,
    serialize_document, text_set, NodePath,
};
use crate::error::{EditorError, Result};
use crate::text_nodes::{index_text_nodes, IndexedText, TextNodeRecord};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(String);

impl TabId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An `<img>` whose `src` was recorded before any preview substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ImageBinding {
    path: NodePath,
    original_src: String,
}

/// One editable instance of an archive HTML document (a tab).
pub struct WorkingDocument {
    id: TabId,
    name: String,
    path: String,
    dom: RcDom,
    texts: Vec<IndexedText>,
    images: Vec<ImageBinding>,
    preview: String,
}

impl fmt::Debug for WorkingDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkingDocument")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("path", &self.path)
            .field("texts", &self.texts.len())
            .field("images", &self.images.len())
            .finish()
    }
}

/// Parses `raw_html`, swaps image references for preview handles and indexes
/// the body text.
pub fn materialize(
    id: TabId,
    name: &str,
    raw_html: &str,
    archive_path: &str,
    assets: &AssetIndex,
) -> Result<WorkingDocument> {
    if name.trim().is_empty() {
        return Err(EditorError::EmptyTabName);
    }

    let dom = parse_html(raw_html);
    let mut images = Vec::new();
    for (path, img) in elements_by_tag(&dom, "img") {
        let Some(src) = attr_get(&img, "src").filter(|s| !s.is_empty()) else {
            continue;
        };
        images.push(ImageBinding {
            path,
            original_src: src,
        });
    }

    let texts = index_text_nodes(&dom);
    let mut doc = WorkingDocument {
        id,
        name: name.to_string(),
        path: archive_path.to_string(),
        dom,
        texts,
        images,
        preview: String::new(),
    };
    doc.apply_previews(assets);
    tracing::info!(
        path = archive_path,
        texts = doc.texts.len(),
        images = doc.images.len(),
        "document materialized"
    );
    Ok(doc)
}

impl WorkingDocument {
    pub fn id(&self) -> &TabId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Archive path this tab was materialized from.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn preview(&self) -> &str {
        &self.preview
    }

    pub fn text_nodes(&self) -> impl Iterator<Item = &TextNodeRecord> {
        self.texts.iter().map(|t| &t.record)
    }

    pub fn text_node(&self, index: usize) -> Option<&TextNodeRecord> {
        self.find(index).map(|i| &self.texts[i].record)
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    fn find(&self, index: usize) -> Option<usize> {
        // indexes are 1-based positions, so the slot is known up front
        let slot = index.checked_sub(1)?;
        match self.texts.get(slot) {
            Some(t) if t.record.index == index => Some(slot),
            _ => self.texts.iter().position(|t| t.record.index == index),
        }
    }

    /// Sets text node `index` to `new_text` and refreshes the preview.
    /// Returns false, leaving everything untouched, when there is no such index.
    pub fn apply_edit(&mut self, index: usize, new_text: &str) -> bool {
        let Some(slot) = self.find(index) else {
            tracing::debug!(index, "edit ignored: no such text node");
            return false;
        };
        let entry = &mut self.texts[slot];
        entry.record.updated = new_text.to_string();
        write_text(&self.dom, entry);
        self.refresh_preview();
        true
    }

    /// Batch form of [`apply_edit`](Self::apply_edit) that serializes the
    /// preview once. Returns how many indexes matched.
    pub fn apply_edits<'a, I>(&mut self, edits: I) -> usize
    where
        I: IntoIterator<Item = (usize, &'a str)>,
    {
        let mut applied = 0;
        for (index, text) in edits {
            let Some(slot) = self.find(index) else {
                tracing::debug!(index, "edit ignored: no such text node");
                continue;
            };
            let entry = &mut self.texts[slot];
            entry.record.updated = text.to_string();
            write_text(&self.dom, entry);
            applied += 1;
        }
        if applied > 0 {
            self.refresh_preview();
        }
        applied
    }

    /// Writes the document into `archive` under `archive_path` with every
    /// original image reference restored, then re-applies the previews.
    pub fn export_to_archive(
        &mut self,
        archive: &mut Archive,
        archive_path: &str,
        assets: &AssetIndex,
    ) -> String {
        for entry in &self.texts {
            write_text(&self.dom, entry);
        }
        for image in &self.images {
            self.set_src(image, &image.original_src);
        }

        let html = serialize_document(&self.dom);
        archive.set(archive_path, html.clone().into_bytes());
        tracing::info!(path = archive_path, bytes = html.len(), "document exported");

        self.apply_previews(assets);
        html
    }

    fn apply_previews(&mut self, assets: &AssetIndex) {
        for image in &self.images {
            match assets.lookup(&self.path, &image.original_src) {
                Some(handle) => self.set_src(image, handle),
                None => {
                    tracing::debug!(src = %image.original_src, "no preview for image reference")
                }
            }
        }
        self.refresh_preview();
    }

    fn set_src(&self, image: &ImageBinding, value: &str) {
        let updated = node_at(&self.dom, &image.path)
            .map(|img| attr_set(&img, "src", value))
            .unwrap_or(false);
        if !updated {
            tracing::warn!(src = %image.original_src, "image element no longer addressable");
        }
    }

    fn refresh_preview(&mut self) {
        self.preview = find_body(&self.dom)
            .map(|(_, body)| serialize_children(&body))
            .unwrap_or_default();
    }
}

fn write_text(dom: &RcDom, entry: &IndexedText) {
    let written = node_at(dom, &entry.path)
        .map(|node| text_set(&node, &entry.record.updated))
        .unwrap_or(false);
    if !written {
        tracing::warn!(index = entry.record.index, "stale text node reference skipped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;

    const INDEX_HTML: &str = r#"<!DOCTYPE html><html><head><title>T</title></head><body>
<h1>Welcome</h1>
<img src="./img/logo.png" alt="logo">
<p>Hello <em>there</em></p>
</body></html>"#;

    fn fixture() -> (Archive, AssetIndex) {
        let mut archive = Archive::new();
        archive.set("index.html", INDEX_HTML.as_bytes().to_vec());
        archive.set("img/logo.png", vec![137, 80, 78, 71]);
        let assets = AssetIndex::build(&archive, &EditorConfig::default());
        (archive, assets)
    }

    fn open(archive: &Archive, assets: &AssetIndex, path: &str) -> WorkingDocument {
        let html = archive.get_text(path).unwrap();
        materialize(TabId::new("t1"), "Main", &html, path, assets).unwrap()
    }

    #[test]
    fn substitutes_preview_handle_for_resolved_image() {
        let (archive, assets) = fixture();
        let doc = open(&archive, &assets, "index.html");
        assert!(doc.preview().contains("src=\"data:image/png;base64,"));
        assert!(!doc.preview().contains("./img/logo.png"));
    }

    #[test]
    fn unresolved_images_keep_their_reference() {
        let (_, assets) = fixture();
        let html = r#"<p>x</p><img src="missing.png"><img>"#;
        let doc = materialize(TabId::new("t"), "n", html, "index.html", &assets).unwrap();
        assert!(doc.preview().contains(r#"src="missing.png""#));
    }

    #[test]
    fn export_restores_literal_reference() {
        let (mut archive, assets) = fixture();
        let mut doc = open(&archive, &assets, "index.html");
        let html = doc.export_to_archive(&mut archive, "index.html", &assets);

        assert!(html.contains(r#"src="./img/logo.png""#));
        assert!(!html.contains("data:image"));
        assert_eq!(archive.get_text("index.html").unwrap(), html);
        // the live tab keeps rendering the preview after export
        assert!(doc.preview().contains("data:image/png;base64,"));
    }

    #[test]
    fn editing_one_node_leaves_neighbours_alone() {
        let html = "<body><span>Hello</span><span>World</span></body>";
        let mut doc =
            materialize(TabId::new("t"), "n", html, "a.html", &AssetIndex::empty()).unwrap();
        assert_eq!(doc.text_node(1).unwrap().original, "Hello");
        assert_eq!(doc.text_node(2).unwrap().original, "World");

        assert!(doc.apply_edit(2, "Earth"));
        assert_eq!(doc.preview(), "<span>Hello</span><span>Earth</span>");
        assert_eq!(doc.text_node(1).unwrap().updated, "Hello");
        assert_eq!(doc.text_node(2).unwrap().original, "World");
        assert_eq!(doc.text_node(2).unwrap().updated, "Earth");
    }

    #[test]
    fn edits_to_unknown_indexes_are_ignored() {
        let mut doc =
            materialize(TabId::new("t"), "n", "<p>a</p>", "a.html", &AssetIndex::empty()).unwrap();
        let before = doc.preview().to_string();
        assert!(!doc.apply_edit(0, "x"));
        assert!(!doc.apply_edit(7, "x"));
        assert_eq!(doc.preview(), before);
    }

    #[test]
    fn edits_are_escaped_in_markup() {
        let mut doc =
            materialize(TabId::new("t"), "n", "<p>a</p>", "a.html", &AssetIndex::empty()).unwrap();
        doc.apply_edit(1, "<b>&</b>");
        assert_eq!(doc.preview(), "<p>&lt;b&gt;&amp;&lt;/b&gt;</p>");
    }

    #[test]
    fn batch_edits_count_matches() {
        let html = "<p>a</p><p>b</p><p>c</p>";
        let mut doc =
            materialize(TabId::new("t"), "n", html, "a.html", &AssetIndex::empty()).unwrap();
        let applied = doc.apply_edits([(1, "x"), (3, "z"), (9, "nope")]);
        assert_eq!(applied, 2);
        assert_eq!(doc.preview(), "<p>x</p><p>b</p><p>z</p>");
    }

    #[test]
    fn blank_names_are_rejected() {
        let err = materialize(TabId::new("t"), "  ", "<p>a</p>", "a.html", &AssetIndex::empty());
        assert!(matches!(err, Err(EditorError::EmptyTabName)));
    }

    #[test]
    fn export_keeps_template_contents() {
        let (mut archive, assets) = fixture();
        let html = "<body><template><p>inert</p></template><p>live</p></body>";
        let mut doc = materialize(TabId::new("t"), "n", html, "tpl.html", &assets).unwrap();
        assert_eq!(doc.len(), 1);
        doc.apply_edit(1, "alive");

        let out = doc.export_to_archive(&mut archive, "tpl.html", &assets);
        assert!(out.contains("<template><p>inert</p></template><p>alive</p>"));
    }

    #[test]
    fn detached_nodes_are_skipped_on_edit_and_export() {
        let (mut archive, assets) = fixture();
        let html = r#"<body><p>keep</p><img src="./img/logo.png"><p>gone</p></body>"#;
        let mut doc = materialize(TabId::new("t"), "n", html, "index.html", &assets).unwrap();
        let (_, body) = find_body(&doc.dom).unwrap();
        body.children.borrow_mut().truncate(1);

        // the record is still known, but its node no longer exists
        assert!(doc.apply_edit(2, "ghost"));
        assert!(doc.apply_edit(1, "kept"));
        assert_eq!(doc.preview(), "<p>kept</p>");

        let out = doc.export_to_archive(&mut archive, "index.html", &assets);
        assert!(out.contains("<body><p>kept</p></body>"));
        assert!(!out.contains("ghost"));
        assert_eq!(doc.text_node(2).unwrap().updated, "ghost");
    }

    #[test]
    fn export_then_rematerialize_round_trips_text() {
        let (mut archive, assets) = fixture();
        let mut doc = open(&archive, &assets, "index.html");
        doc.apply_edit(1, "Bienvenue");
        doc.apply_edit(3, "there & back");
        doc.export_to_archive(&mut archive, "index.html", &assets);

        let again = open(&archive, &assets, "index.html");
        assert_eq!(again.len(), doc.len());
        for (before, after) in doc.text_nodes().zip(again.text_nodes()) {
            assert_eq!(before.index, after.index);
            assert_eq!(before.updated, after.original);
        }
    }
}
