use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::Result;

/// Ordered path -> bytes store backed by a ZIP container.
///
/// Entries keep the order they had in the source archive; keys written with
/// [`Archive::set`] replace in place or are appended at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Archive {
    entries: Vec<(String, Vec<u8>)>,
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_zip_bytes(bytes: &[u8]) -> Result<Self> {
        let mut zip = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let mut file = zip.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::new();
            file.read_to_end(&mut data)?;
            entries.push((name, data));
        }
        tracing::info!(entries = entries.len(), "archive loaded");
        Ok(Self { entries })
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(name, _)| name == path)
            .map(|(_, data)| data.as_slice())
    }

    /// Lossy UTF-8 view of an entry, the way HTML documents are read for editing.
    pub fn get_text(&self, path: &str) -> Option<String> {
        self.get(path)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn set(&mut self, path: &str, data: Vec<u8>) {
        match self.entries.iter_mut().find(|(name, _)| name == path) {
            Some((_, slot)) => *slot = data,
            None => self.entries.push((path.to_string(), data)),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.iter().any(|(name, _)| name == path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pack(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, data) in &self.entries {
            zip.start_file(name.as_str(), opts)?;
            zip.write_all(data)?;
        }
        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }
}

#[cfg(test)]
pub(crate) fn zip_from_entries(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = SimpleFileOptions::default();
    for (name, data) in entries {
        zip.start_file(*name, opts).unwrap();
        zip.write_all(data.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}
