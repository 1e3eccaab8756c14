//! Edit the visible text of HTML documents inside a ZIP archive.
//!
//! An archive is loaded into a [`Session`]; documents are opened as tabs
//! ([`WorkingDocument`]) whose non-blank text nodes are numbered in document
//! order. Edits address nodes by that number, exports write the document back
//! with its original image references, and the whole state can be saved to a
//! session file and restored later.

pub mod archive;
pub mod assets;
pub mod config;
pub mod document;
pub mod dom;
pub mod editor;
pub mod error;
pub mod paths;
pub mod session;
pub mod session_file;
pub mod text_nodes;

pub use archive::Archive;
pub use assets::AssetIndex;
pub use config::EditorConfig;
pub use document::{materialize, TabId, WorkingDocument};
pub use editor::Editor;
pub use error::{EditorError, Result};
pub use paths::resolve;
pub use session::Session;
pub use session_file::{export_session, import_session};
pub use text_nodes::{index_text_nodes, TextNodeRecord};
