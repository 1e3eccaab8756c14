use crate::archive::Archive;
use crate::assets::AssetIndex;
use crate::config::EditorConfig;
use crate::document::{materialize, TabId, WorkingDocument};
use crate::error::{EditorError, Result};

/// Everything that belongs to one loaded archive: the archive itself, its
/// preview handles, the selection and the open tabs.
///
/// Tabs are independent copies. Exporting a tab overwrites its archive entry
/// without looking at other tabs opened on the same path; the last export wins.
#[derive(Debug)]
pub struct Session {
    config: EditorConfig,
    archive: Archive,
    assets: AssetIndex,
    html_paths: Vec<String>,
    selected_path: Option<String>,
    active_tab: Option<TabId>,
    tabs: Vec<WorkingDocument>,
    next_tab: u64,
}

impl Session {
    pub fn load(zip_bytes: &[u8], config: &EditorConfig) -> Result<Self> {
        let archive = Archive::from_zip_bytes(zip_bytes)?;
        let assets = AssetIndex::build(&archive, config);
        Ok(Self::with_assets(archive, assets, config))
    }

    pub(crate) fn with_assets(archive: Archive, assets: AssetIndex, config: &EditorConfig) -> Self {
        let html_paths = archive
            .paths()
            .filter(|p| config.is_html_path(p))
            .map(str::to_string)
            .collect();
        Self {
            config: config.clone(),
            archive,
            assets,
            html_paths,
            selected_path: None,
            active_tab: None,
            tabs: Vec::new(),
            next_tab: 1,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    pub fn assets(&self) -> &AssetIndex {
        &self.assets
    }

    pub fn html_paths(&self) -> &[String] {
        &self.html_paths
    }

    pub fn selected_path(&self) -> Option<&str> {
        self.selected_path.as_deref()
    }

    pub fn active_tab_id(&self) -> Option<&TabId> {
        self.active_tab.as_ref()
    }

    pub fn tabs(&self) -> &[WorkingDocument] {
        &self.tabs
    }

    pub fn tab(&self, id: &TabId) -> Result<&WorkingDocument> {
        self.tabs
            .iter()
            .find(|t| t.id() == id)
            .ok_or_else(|| EditorError::UnknownTab(id.to_string()))
    }

    fn tab_mut(&mut self, id: &TabId) -> Result<&mut WorkingDocument> {
        self.tabs
            .iter_mut()
            .find(|t| t.id() == id)
            .ok_or_else(|| EditorError::UnknownTab(id.to_string()))
    }

    pub fn active_tab(&self) -> Result<&WorkingDocument> {
        let id = self.active_tab.as_ref().ok_or(EditorError::NoActiveTab)?;
        self.tab(id)
    }

    /// Selects one of the archive's HTML documents for the next tab.
    pub fn select(&mut self, path: &str) -> Result<()> {
        if !self.html_paths.iter().any(|p| p == path) {
            return Err(if self.archive.contains(path) {
                EditorError::NotHtml(path.to_string())
            } else {
                EditorError::MissingEntry(path.to_string())
            });
        }
        self.selected_path = Some(path.to_string());
        Ok(())
    }

    pub(crate) fn set_selected_path(&mut self, path: Option<String>) {
        self.selected_path = path;
    }

    /// Opens a new tab on the selected document and makes it active.
    pub fn open_tab(&mut self, name: &str) -> Result<TabId> {
        let path = self
            .selected_path
            .clone()
            .ok_or(EditorError::NoDocumentSelected)?;
        let html = self
            .archive
            .get_text(&path)
            .ok_or_else(|| EditorError::MissingEntry(path.clone()))?;
        let id = self.next_tab_id();
        let doc = materialize(id.clone(), name, &html, &path, &self.assets)?;
        self.push_tab(doc);
        Ok(id)
    }

    pub(crate) fn push_tab(&mut self, doc: WorkingDocument) {
        self.active_tab = Some(doc.id().clone());
        self.tabs.push(doc);
    }

    pub fn activate_tab(&mut self, id: &TabId) -> Result<()> {
        self.tab(id)?;
        self.active_tab = Some(id.clone());
        Ok(())
    }

    pub(crate) fn set_active_tab(&mut self, id: Option<TabId>) {
        self.active_tab = id;
    }

    /// Drops a tab without exporting it. If it was active, the last remaining
    /// tab becomes active.
    pub fn close_tab(&mut self, id: &TabId) -> Result<WorkingDocument> {
        let pos = self
            .tabs
            .iter()
            .position(|t| t.id() == id)
            .ok_or_else(|| EditorError::UnknownTab(id.to_string()))?;
        let doc = self.tabs.remove(pos);
        if self.active_tab.as_ref() == Some(id) {
            self.active_tab = self.tabs.last().map(|t| t.id().clone());
        }
        Ok(doc)
    }

    pub fn apply_edit(&mut self, id: &TabId, index: usize, text: &str) -> Result<bool> {
        Ok(self.tab_mut(id)?.apply_edit(index, text))
    }

    /// Writes the tab back into the archive under the path it was opened from.
    pub fn export_tab(&mut self, id: &TabId) -> Result<String> {
        let tab = self
            .tabs
            .iter_mut()
            .find(|t| t.id() == id)
            .ok_or_else(|| EditorError::UnknownTab(id.to_string()))?;
        let path = tab.path().to_string();
        Ok(tab.export_to_archive(&mut self.archive, &path, &self.assets))
    }

    pub fn pack(&self) -> Result<Vec<u8>> {
        self.archive.pack()
    }

    pub(crate) fn next_tab_id(&mut self) -> TabId {
        loop {
            let id = TabId::new(format!("tab-{}", self.next_tab));
            self.next_tab += 1;
            if !self.tabs.iter().any(|t| t.id() == &id) {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::zip_from_entries;

    fn session() -> Session {
        let bytes = zip_from_entries(&[
            ("index.html", "<body><p>Hello</p><p>World</p></body>"),
            ("about/team.html", "<body><p>Team</p></body>"),
            ("img/logo.png", "\u{89}PNG"),
            ("style.css", "p{}"),
        ]);
        Session::load(&bytes, &EditorConfig::default()).unwrap()
    }

    #[test]
    fn lists_html_documents_in_archive_order() {
        let s = session();
        assert_eq!(s.html_paths(), ["index.html", "about/team.html"]);
        assert_eq!(s.assets().len(), 1);
    }

    #[test]
    fn opening_a_tab_requires_a_selection() {
        let mut s = session();
        assert!(matches!(s.open_tab("x"), Err(EditorError::NoDocumentSelected)));
        assert!(matches!(s.select("nope.html"), Err(EditorError::MissingEntry(_))));
        assert!(matches!(s.select("img/logo.png"), Err(EditorError::NotHtml(_))));
        assert!(matches!(s.select("style.css"), Err(EditorError::NotHtml(_))));
        assert!(s.selected_path().is_none());
        assert!(s.tabs().is_empty());
    }

    #[test]
    fn tabs_on_the_same_path_are_independent() {
        let mut s = session();
        s.select("index.html").unwrap();
        let a = s.open_tab("A").unwrap();
        let b = s.open_tab("B").unwrap();
        assert_ne!(a, b);
        assert_eq!(s.active_tab_id(), Some(&b));

        s.apply_edit(&a, 1, "Bonjour").unwrap();
        assert!(s.tab(&a).unwrap().preview().contains("Bonjour"));
        assert!(s.tab(&b).unwrap().preview().contains("Hello"));
    }

    #[test]
    fn last_export_wins() {
        let mut s = session();
        s.select("index.html").unwrap();
        let a = s.open_tab("A").unwrap();
        let b = s.open_tab("B").unwrap();
        s.apply_edit(&a, 1, "From A").unwrap();
        s.apply_edit(&b, 2, "From B").unwrap();

        s.export_tab(&a).unwrap();
        s.export_tab(&b).unwrap();
        let html = s.archive().get_text("index.html").unwrap();
        assert!(html.contains("From B"));
        assert!(!html.contains("From A"));
        assert!(html.contains("Hello"));
    }

    #[test]
    fn closing_the_active_tab_falls_back_to_the_last_one() {
        let mut s = session();
        s.select("about/team.html").unwrap();
        let a = s.open_tab("A").unwrap();
        let b = s.open_tab("B").unwrap();
        s.close_tab(&b).unwrap();
        assert_eq!(s.active_tab_id(), Some(&a));
        s.close_tab(&a).unwrap();
        assert!(s.active_tab_id().is_none());
        assert!(matches!(s.active_tab(), Err(EditorError::NoActiveTab)));
        assert!(matches!(s.close_tab(&a), Err(EditorError::UnknownTab(_))));
    }
}
