use crate::config::EditorConfig;
use crate::document::TabId;
use crate::error::{EditorError, Result};
use crate::paths::sanitize_file_name;
use crate::session::Session;
use crate::session_file::{export_session, import_session};

pub const SAVED_MESSAGE: &str = "Saved inside ZIP (not downloaded yet)";

/// User-level editing actions on top of an optional [`Session`].
///
/// Every action either completes or leaves the state as it was; a failed
/// upload or import never replaces the current session.
#[derive(Debug, Default)]
pub struct Editor {
    config: EditorConfig,
    session: Option<Session>,
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn session(&self) -> Result<&Session> {
        self.session.as_ref().ok_or(EditorError::NoArchive)
    }

    fn session_mut(&mut self) -> Result<&mut Session> {
        self.session.as_mut().ok_or(EditorError::NoArchive)
    }

    pub fn upload(&mut self, zip_bytes: &[u8]) -> Result<()> {
        let session = Session::load(zip_bytes, &self.config)?;
        self.session = Some(session);
        Ok(())
    }

    pub fn html_files(&self) -> Result<&[String]> {
        Ok(self.session()?.html_paths())
    }

    pub fn select_file(&mut self, path: &str) -> Result<()> {
        self.session_mut()?.select(path)
    }

    pub fn open_tab(&mut self, name: &str) -> Result<TabId> {
        self.session_mut()?.open_tab(name)
    }

    pub fn activate_tab(&mut self, id: &TabId) -> Result<()> {
        self.session_mut()?.activate_tab(id)
    }

    pub fn close_tab(&mut self, id: &TabId) -> Result<()> {
        self.session_mut()?.close_tab(id).map(|_| ())
    }

    fn active_id(&self) -> Result<TabId> {
        self.session()?
            .active_tab_id()
            .cloned()
            .ok_or(EditorError::NoActiveTab)
    }

    /// Edits text node `index` of the active tab.
    pub fn update_text(&mut self, index: usize, text: &str) -> Result<bool> {
        let id = self.active_id()?;
        self.session_mut()?.apply_edit(&id, index, text)
    }

    pub fn preview(&self) -> Result<&str> {
        Ok(self.session()?.active_tab()?.preview())
    }

    /// Exports the active tab into the archive without packing it.
    pub fn save(&mut self) -> Result<&'static str> {
        let id = self.active_id()?;
        self.session_mut()?.export_tab(&id)?;
        Ok(SAVED_MESSAGE)
    }

    /// Exports every open tab in tab order, so for tabs sharing a path the
    /// later tab's text ends up in the archive.
    pub fn save_all(&mut self) -> Result<usize> {
        let session = self.session_mut()?;
        let ids: Vec<TabId> = session.tabs().iter().map(|t| t.id().clone()).collect();
        for id in &ids {
            session.export_tab(id)?;
        }
        Ok(ids.len())
    }

    /// Packs the archive as it currently is, without saving any tab.
    pub fn pack(&self) -> Result<(String, Vec<u8>)> {
        let bytes = self.session()?.pack()?;
        Ok((self.config.download_name.clone(), bytes))
    }

    /// Saves the active tab and packs the archive. Returns the file name to
    /// offer together with the archive bytes.
    pub fn download(&mut self) -> Result<(String, Vec<u8>)> {
        self.save()?;
        self.pack()
    }

    pub fn export_session(&self) -> Result<(String, Vec<u8>)> {
        let session = self.session()?;
        let stem = session
            .active_tab()
            .map(|tab| sanitize_file_name(tab.name()))
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "session".to_string());
        Ok((format!("{stem}.session.zip"), export_session(session)?))
    }

    pub fn import_session(&mut self, bytes: &[u8]) -> Result<()> {
        let session = import_session(bytes, &self.config)?;
        self.session = Some(session);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{zip_from_entries, Archive};

    fn upload_bytes() -> Vec<u8> {
        zip_from_entries(&[
            ("index.html", r#"<html><body><p>Hello</p><img src="./img/logo.png"></body></html>"#),
            ("img/logo.png", "PNG"),
        ])
    }

    #[test]
    fn actions_need_an_archive() {
        let mut editor = Editor::default();
        assert!(matches!(editor.html_files(), Err(EditorError::NoArchive)));
        assert!(matches!(editor.select_file("index.html"), Err(EditorError::NoArchive)));
        assert!(matches!(editor.save(), Err(EditorError::NoArchive)));
        assert!(matches!(editor.export_session(), Err(EditorError::NoArchive)));
    }

    #[test]
    fn actions_need_an_active_tab() {
        let mut editor = Editor::default();
        editor.upload(&upload_bytes()).unwrap();
        assert!(matches!(editor.update_text(1, "x"), Err(EditorError::NoActiveTab)));
        assert!(matches!(editor.save(), Err(EditorError::NoActiveTab)));
        assert!(matches!(editor.open_tab("x"), Err(EditorError::NoDocumentSelected)));
    }

    #[test]
    fn edit_save_download() {
        let mut editor = Editor::default();
        editor.upload(&upload_bytes()).unwrap();
        assert_eq!(editor.html_files().unwrap(), ["index.html"]);
        editor.select_file("index.html").unwrap();
        editor.open_tab("Home").unwrap();
        assert!(editor.update_text(1, "Howdy").unwrap());
        assert!(editor.preview().unwrap().contains("Howdy"));

        assert_eq!(editor.save().unwrap(), SAVED_MESSAGE);
        let (name, bytes) = editor.download().unwrap();
        assert_eq!(name, "updated.zip");

        let out = Archive::from_zip_bytes(&bytes).unwrap();
        let html = out.get_text("index.html").unwrap();
        assert!(html.contains("<p>Howdy</p>"));
        assert!(html.contains(r#"src="./img/logo.png""#));
        assert_eq!(out.get("img/logo.png"), Some(&b"PNG"[..]));
    }

    #[test]
    fn failed_import_keeps_current_session() {
        let mut editor = Editor::default();
        editor.upload(&upload_bytes()).unwrap();
        editor.select_file("index.html").unwrap();
        editor.open_tab("Home").unwrap();

        assert!(editor.import_session(b"garbage").is_err());
        assert_eq!(editor.session().unwrap().tabs().len(), 1);
    }

    #[test]
    fn session_file_name_follows_active_tab() {
        let mut editor = Editor::default();
        editor.upload(&upload_bytes()).unwrap();
        let (name, _) = editor.export_session().unwrap();
        assert_eq!(name, "session.session.zip");

        editor.select_file("index.html").unwrap();
        editor.open_tab("Landing page v2").unwrap();
        let (name, bytes) = editor.export_session().unwrap();
        assert_eq!(name, "Landingpagev2.session.zip");

        let mut other = Editor::default();
        other.import_session(&bytes).unwrap();
        assert_eq!(other.session().unwrap().active_tab().unwrap().name(), "Landing page v2");
    }
}
