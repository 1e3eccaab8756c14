// Session save/restore. A session file is a ZIP holding the packed archive
// and a JSON record of the selection and every tab's text edits.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::archive::Archive;
use crate::assets::AssetIndex;
use crate::config::EditorConfig;
use crate::document::{materialize, TabId};
use crate::error::{EditorError, Result};
use crate::session::Session;
use crate::text_nodes::TextNodeRecord;

pub const ARCHIVE_ENTRY: &str = "archive.zip";
pub const METADATA_ENTRY: &str = "session.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    pub selected_path: Option<String>,
    pub active_tab_id: Option<TabId>,
    #[serde(default)]
    pub html_paths: Vec<String>,
    #[serde(default)]
    pub tabs: Vec<SavedTab>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedTab {
    pub id: TabId,
    pub name: String,
    /// Older session files carry no path; those tabs belong to `selectedPath`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub text_nodes: Vec<TextNodeRecord>,
}

pub fn session_metadata(session: &Session) -> SessionMetadata {
    SessionMetadata {
        selected_path: session.selected_path().map(str::to_string),
        active_tab_id: session.active_tab_id().cloned(),
        html_paths: session.html_paths().to_vec(),
        tabs: session
            .tabs()
            .iter()
            .map(|tab| SavedTab {
                id: tab.id().clone(),
                name: tab.name().to_string(),
                path: Some(tab.path().to_string()),
                text_nodes: tab.text_nodes().cloned().collect(),
            })
            .collect(),
    }
}

pub fn export_session(session: &Session) -> Result<Vec<u8>> {
    let metadata = serde_json::to_vec_pretty(&session_metadata(session))?;
    let mut container = Archive::new();
    container.set(ARCHIVE_ENTRY, session.pack()?);
    container.set(METADATA_ENTRY, metadata);
    tracing::info!(tabs = session.tabs().len(), "session exported");
    container.pack()
}

/// Rebuilds a session from [`export_session`] output.
///
/// Text nodes are re-identified purely by index: the document is indexed
/// afresh and every saved `updated` value is spliced onto the node holding
/// the same index. Tabs whose document is gone from the archive are skipped.
pub fn import_session(bytes: &[u8], config: &EditorConfig) -> Result<Session> {
    let container = Archive::from_zip_bytes(bytes)
        .map_err(|e| EditorError::MalformedSession(format!("not a session file: {e}")))?;
    let archive_bytes = container
        .get(ARCHIVE_ENTRY)
        .ok_or_else(|| EditorError::MalformedSession(format!("missing {ARCHIVE_ENTRY}")))?;
    let metadata_bytes = container
        .get(METADATA_ENTRY)
        .ok_or_else(|| EditorError::MalformedSession(format!("missing {METADATA_ENTRY}")))?;
    let metadata: SessionMetadata = serde_json::from_slice(metadata_bytes)
        .map_err(|e| EditorError::MalformedSession(format!("bad {METADATA_ENTRY}: {e}")))?;
    let archive = Archive::from_zip_bytes(archive_bytes)
        .map_err(|e| EditorError::MalformedSession(format!("bad {ARCHIVE_ENTRY}: {e}")))?;

    let assets = AssetIndex::build_aliased(&archive, config);
    let mut session = Session::with_assets(archive, assets, config);

    let selected = metadata
        .selected_path
        .filter(|p| session.html_paths().contains(p));
    session.set_selected_path(selected.clone());

    // a generated id must not take over an id that a later saved tab uses
    let saved_ids: HashSet<TabId> = metadata.tabs.iter().map(|t| t.id.clone()).collect();

    for saved in metadata.tabs {
        let Some(path) = saved.path.clone().or_else(|| selected.clone()) else {
            tracing::warn!(tab = %saved.id, "skipping tab without a document path");
            continue;
        };
        let html = session
            .html_paths()
            .contains(&path)
            .then(|| session.archive().get_text(&path))
            .flatten();
        let Some(html) = html else {
            tracing::warn!(tab = %saved.id, path = %path, "skipping tab: document not in archive");
            continue;
        };

        let id = if session.tabs().iter().any(|t| t.id() == &saved.id) {
            let mut fresh = session.next_tab_id();
            while saved_ids.contains(&fresh) {
                fresh = session.next_tab_id();
            }
            fresh
        } else {
            saved.id.clone()
        };
        let mut doc = match materialize(id, &saved.name, &html, &path, session.assets()) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(tab = %saved.id, "skipping tab: {e}");
                continue;
            }
        };

        let edits: HashMap<usize, &str> = saved
            .text_nodes
            .iter()
            .map(|t| (t.index, t.updated.as_str()))
            .collect();
        let fresh: Vec<usize> = doc.text_nodes().map(|t| t.index).collect();
        let applied = doc.apply_edits(
            fresh
                .into_iter()
                .filter_map(|index| edits.get(&index).map(|text| (index, *text))),
        );
        tracing::debug!(tab = %doc.id(), applied, saved = edits.len(), "tab restored");
        session.push_tab(doc);
    }

    let active = metadata
        .active_tab_id
        .filter(|id| session.tabs().iter().any(|t| t.id() == id))
        .or_else(|| session.tabs().first().map(|t| t.id().clone()));
    session.set_active_tab(active);

    tracing::info!(tabs = session.tabs().len(), "session imported");
    Ok(session)
}
