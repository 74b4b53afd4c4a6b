use ropey::Rope;

use tower_lsp::lsp_types::{TextDocumentContentChangeEvent, Url};

/// Changes associated with a specific version of the document.
#[derive(Debug, Clone)]
pub struct VersionedChanges {
    pub version: i32,
    pub changes: Vec<TextDocumentContentChangeEvent>,
}

/// A text document the client has opened. The client owns the content; the
/// server only mirrors it until the document is closed.
#[derive(Debug, Clone)]
pub struct ManagedDocument {
    pub uri: Url,
    pub language_id: String,
    pub version: i32,
    pub text: Rope,
}
