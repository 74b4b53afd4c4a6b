use ropey::Rope;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, trace};

use tower_lsp::lsp_types::{Position, TextDocumentContentChangeEvent, Url};

use crate::engine::ModuleName;

pub use crate::lsp::models::{ManagedDocument, VersionedChanges};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("document {0} is not open")]
    NotOpen(ModuleName),
    #[error("version {version} of {uri} is not newer than {current}")]
    OutdatedVersion { uri: Url, version: i32, current: i32 },
}

/// Converts an LSP position (UTF-16 code units) to a char index in the Rope.
/// Positions past the end of a line or of the document are clamped.
fn position_to_char_index(position: &Position, text: &Rope) -> usize {
    let line = position.line as usize;
    if line >= text.len_lines() {
        return text.len_chars();
    }

    let line_start = text.line_to_char(line);
    let slice = text.line(line);
    let mut line_len = slice.len_chars();
    while line_len > 0 && matches!(slice.char(line_len - 1), '\n' | '\r') {
        line_len -= 1;
    }

    let max_utf16 = slice.char_to_utf16_cu(line_len);
    let utf16 = (position.character as usize).min(max_utf16);
    line_start + slice.utf16_cu_to_char(utf16)
}

impl ManagedDocument {
    pub fn new(uri: Url, language_id: impl Into<String>, version: i32, text: &str) -> Self {
        Self {
            uri,
            language_id: language_id.into(),
            version,
            text: Rope::from_str(text),
        }
    }

    /// Returns the current text of the document as a string.
    pub fn text(&self) -> String {
        self.text.to_string()
    }

    /// Applies a list of content changes in order. Ranged changes splice the
    /// rope, unranged ones replace the whole text. A version that is not
    /// strictly newer leaves the document untouched.
    pub fn apply(&mut self, changes: VersionedChanges) -> Result<(), DocumentError> {
        if changes.version <= self.version {
            return Err(DocumentError::OutdatedVersion {
                uri: self.uri.clone(),
                version: changes.version,
                current: self.version,
            });
        }

        for change in &changes.changes {
            self.apply_change(change);
        }
        trace!(
            "Applied {} change(s) to {} at version {}",
            changes.changes.len(),
            self.uri,
            changes.version
        );
        self.version = changes.version;
        Ok(())
    }

    fn apply_change(&mut self, change: &TextDocumentContentChangeEvent) {
        match change.range {
            Some(range) => {
                let start = position_to_char_index(&range.start, &self.text);
                let end = position_to_char_index(&range.end, &self.text).max(start);
                self.text.remove(start..end);
                self.text.insert(start, &change.text);
            }
            None => self.text = Rope::from_str(&change.text),
        }
    }
}

/// Open documents of one workspace, keyed by module name.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: FxHashMap<ModuleName, ManagedDocument>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or replaces the document for `name`.
    pub fn open(&mut self, name: ModuleName, document: ManagedDocument) {
        debug!("Opened {} (version {})", name, document.version);
        self.documents.insert(name, document);
    }

    pub fn update(&mut self, name: &ModuleName, changes: VersionedChanges) -> Result<(), DocumentError> {
        let document = self
            .documents
            .get_mut(name)
            .ok_or_else(|| DocumentError::NotOpen(name.clone()))?;
        document.apply(changes)
    }

    pub fn close(&mut self, name: &ModuleName) -> Option<ManagedDocument> {
        self.documents.remove(name)
    }

    pub fn get(&self, name: &ModuleName) -> Option<&ManagedDocument> {
        self.documents.get(name)
    }

    pub fn contains(&self, name: &ModuleName) -> bool {
        self.documents.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
