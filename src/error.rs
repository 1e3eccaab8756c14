use thiserror::Error;

pub type Result<T> = std::result::Result<T, EditorError>;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("no archive loaded")]
    NoArchive,

    #[error("no HTML document selected")]
    NoDocumentSelected,

    #[error("no active tab")]
    NoActiveTab,

    #[error("unknown tab: {0}")]
    UnknownTab(String),

    #[error("tab name must not be empty")]
    EmptyTabName,

    #[error("archive has no entry named {0}")]
    MissingEntry(String),

    #[error("{0} is not an HTML document")]
    NotHtml(String),

    #[error("malformed session file: {0}")]
    MalformedSession(String),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
