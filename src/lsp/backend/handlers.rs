//! LSP protocol handler implementations
//!
//! This module contains the `tower_lsp::LanguageServer` implementation for the
//! Luau backend:
//! - Lifecycle handlers (initialize, initialized, shutdown)
//! - Document lifecycle (did_open, did_change, did_close)
//! - Workspace events (configuration, watched sourcemaps, folders)
//! - Queries (diagnostic, hover, completion, signature help, definition,
//!   type definition, document link), each routed to the workspace owning
//!   the document

use tower_lsp::jsonrpc::Result as LspResult;
use tower_lsp::lsp_types::request::{GotoTypeDefinitionParams, GotoTypeDefinitionResponse};
use tower_lsp::lsp_types::{
    CompletionOptions, CompletionParams, CompletionResponse, DiagnosticOptions, DiagnosticServerCapabilities,
    DidChangeConfigurationParams, DidChangeTextDocumentParams, DidChangeWatchedFilesParams,
    DidChangeWatchedFilesRegistrationOptions, DidChangeWorkspaceFoldersParams, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, DocumentDiagnosticParams, DocumentDiagnosticReportResult, DocumentLink,
    DocumentLinkOptions, DocumentLinkParams, FileSystemWatcher, GlobPattern, GotoDefinitionParams,
    GotoDefinitionResponse, Hover, HoverParams, HoverProviderCapability, InitializeParams, InitializeResult,
    InitializedParams, MessageType, OneOf, Registration, ServerCapabilities, ServerInfo, SignatureHelp,
    SignatureHelpOptions, SignatureHelpParams, TextDocumentSyncCapability, TextDocumentSyncKind,
    TypeDefinitionProviderCapability, Url, WorkspaceFoldersServerCapabilities, WorkspaceServerCapabilities,
};
use tower_lsp::LanguageServer;
use tracing::{debug, info, warn};

use crate::config::ClientConfiguration;
use crate::engine::AnalysisEngine;
use crate::lsp::models::VersionedChanges;
use crate::lsp::sourcemap::SOURCEMAP_FILE_NAME;

use super::state::{LuauBackend, PendingMessage};

const DEFINITIONS_MISSING_MESSAGE: &str =
    "Definitions file was not provided by the client. Extended types will not be provided";

/// Capabilities advertised in the initialize response.
pub(super) fn server_capabilities() -> ServerCapabilities {
    let triggers = |characters: &[&str]| -> Option<Vec<String>> {
        Some(characters.iter().map(|c| c.to_string()).collect())
    };
    ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::INCREMENTAL)),
        hover_provider: Some(HoverProviderCapability::Simple(true)),
        completion_provider: Some(CompletionOptions {
            trigger_characters: triggers(&[".", ":", "'", "\"", "/"]),
            resolve_provider: Some(false),
            ..Default::default()
        }),
        signature_help_provider: Some(SignatureHelpOptions {
            trigger_characters: triggers(&["(", ","]),
            retrigger_characters: None,
            work_done_progress_options: Default::default(),
        }),
        definition_provider: Some(OneOf::Left(true)),
        type_definition_provider: Some(TypeDefinitionProviderCapability::Simple(true)),
        document_link_provider: Some(DocumentLinkOptions {
            resolve_provider: Some(false),
            work_done_progress_options: Default::default(),
        }),
        diagnostic_provider: Some(DiagnosticServerCapabilities::Options(DiagnosticOptions {
            identifier: Some("luau".to_string()),
            inter_file_dependencies: true,
            workspace_diagnostics: false,
            work_done_progress_options: Default::default(),
        })),
        workspace: Some(WorkspaceServerCapabilities {
            workspace_folders: Some(WorkspaceFoldersServerCapabilities {
                supported: Some(true),
                change_notifications: Some(OneOf::Left(true)),
            }),
            file_operations: None,
        }),
        ..Default::default()
    }
}

/// Display name of a folder given only by its URI.
fn folder_name(uri: &Url) -> String {
    uri.path_segments()
        .and_then(|segments| segments.filter(|segment| !segment.is_empty()).last())
        .map(str::to_string)
        .unwrap_or_else(|| uri.to_string())
}

fn is_sourcemap(uri: &Url) -> bool {
    uri.path_segments()
        .and_then(|mut segments| segments.next_back())
        .is_some_and(|file_name| file_name == SOURCEMAP_FILE_NAME)
}

impl<E: AnalysisEngine + 'static> LuauBackend<E> {
    async fn register_sourcemap_watcher(&self) {
        let options = DidChangeWatchedFilesRegistrationOptions {
            watchers: vec![FileSystemWatcher {
                glob_pattern: GlobPattern::String(format!("**/{}", SOURCEMAP_FILE_NAME)),
                kind: None,
            }],
        };
        let register_options = match serde_json::to_value(options) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to encode watcher registration: {}", e);
                return;
            }
        };
        let registration = Registration {
            id: "luau-lsp/sourcemap".to_string(),
            method: "workspace/didChangeWatchedFiles".to_string(),
            register_options: Some(register_options),
        };
        if let Err(e) = self.client.register_capability(vec![registration]).await {
            warn!("Client refused sourcemap watcher registration: {}", e);
        }
    }
}

#[tower_lsp::async_trait]
impl<E: AnalysisEngine + 'static> LanguageServer for LuauBackend<E> {
    async fn initialize(&self, params: InitializeParams) -> LspResult<InitializeResult> {
        info!("Received initialize from {:?}", params.client_info.as_ref().map(|info| &info.name));

        let configuration = match params.initialization_options.as_ref() {
            Some(options) => ClientConfiguration::from_settings(options).unwrap_or_else(|e| {
                warn!("Ignoring initialization options: {}", e);
                ClientConfiguration::default()
            }),
            None => ClientConfiguration::default(),
        };

        #[allow(deprecated)]
        let folders: Vec<(String, Url)> = match (params.workspace_folders, params.root_uri) {
            (Some(folders), _) if !folders.is_empty() => {
                folders.into_iter().map(|folder| (folder.name, folder.uri)).collect()
            }
            (_, Some(root_uri)) => vec![(folder_name(&root_uri), root_uri)],
            _ => Vec::new(),
        };

        let mut state = self.state.lock().await;
        state.set_configuration(configuration);
        for (name, uri) in folders {
            let workspace = self.create_workspace(&name, uri);
            state.add_workspace(workspace);
        }
        if self.definitions_files.is_empty() {
            warn!("{}", DEFINITIONS_MISSING_MESSAGE);
            state.pending_messages.push(PendingMessage {
                ty: MessageType::ERROR,
                message: DEFINITIONS_MISSING_MESSAGE.to_string(),
            });
        }
        info!("Initialized {} workspace folder(s)", state.workspaces.len());

        Ok(InitializeResult {
            capabilities: server_capabilities(),
            server_info: Some(ServerInfo {
                name: "luau-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        info!("Client initialized");
        self.register_sourcemap_watcher().await;
        self.flush_messages().await;
    }

    async fn shutdown(&self) -> LspResult<()> {
        info!("Received shutdown request");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let document = params.text_document;
        debug!("textDocument/didOpen: {} (version {})", document.uri, document.version);
        let mut state = self.state.lock().await;
        state
            .workspace_for(&document.uri)
            .open_document(&document.uri, &document.language_id, document.version, &document.text);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        debug!("textDocument/didChange: {} (version {})", uri, params.text_document.version);
        let changes = VersionedChanges {
            version: params.text_document.version,
            changes: params.content_changes,
        };
        let mut state = self.state.lock().await;
        // Rejected updates are logged by the workspace and leave it untouched.
        let _ = state.workspace_for(&uri).update_document(&uri, changes);
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        debug!("textDocument/didClose: {}", uri);
        let mut state = self.state.lock().await;
        if !state.workspace_for(&uri).close_document(&uri) {
            warn!("Closed unknown document {}", uri);
        }
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        match ClientConfiguration::from_settings(&params.settings) {
            Ok(configuration) => {
                info!("Applying client configuration");
                self.state.lock().await.set_configuration(configuration);
            }
            Err(e) => warn!("Ignoring configuration change: {}", e),
        }
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        let mut reloaded = false;
        {
            let mut state = self.state.lock().await;
            for change in params.changes.iter().filter(|change| is_sourcemap(&change.uri)) {
                let Some(index) = state.workspace_index_for(&change.uri) else {
                    debug!("Sourcemap {} is outside every workspace", change.uri);
                    continue;
                };
                info!("Reloading sourcemap {}", change.uri);
                reloaded = true;
                if state.workspaces[index].update_sourcemap().is_err() {
                    let name = state.workspaces[index].name.clone();
                    state.report_sourcemap_failure(&name);
                }
            }
        }
        self.flush_messages().await;

        if reloaded {
            if let Err(e) = self.client.workspace_diagnostic_refresh().await {
                debug!("Client does not support diagnostic refresh: {}", e);
            }
        }
    }

    async fn did_change_workspace_folders(&self, params: DidChangeWorkspaceFoldersParams) {
        {
            let mut state = self.state.lock().await;
            for folder in params.event.removed {
                if state.remove_workspace(&folder.uri).is_none() {
                    warn!("Removed unknown workspace folder {}", folder.uri);
                }
            }
            for folder in params.event.added {
                let workspace = self.create_workspace(&folder.name, folder.uri);
                state.add_workspace(workspace);
            }
        }
        self.flush_messages().await;
    }

    async fn diagnostic(&self, params: DocumentDiagnosticParams) -> LspResult<DocumentDiagnosticReportResult> {
        let uri = params.text_document.uri;
        debug!("textDocument/diagnostic: {}", uri);
        let mut state = self.state.lock().await;
        let diagnostics = state.workspace_for(&uri).document_diagnostics(&uri);
        Ok(DocumentDiagnosticReportResult::Report(diagnostics.into_report()))
    }

    async fn hover(&self, params: HoverParams) -> LspResult<Option<Hover>> {
        let position = params.text_document_position_params;
        let uri = position.text_document.uri;
        debug!("textDocument/hover: {} at {:?}", uri, position.position);
        let mut state = self.state.lock().await;
        Ok(state.workspace_for(&uri).hover(&uri, position.position))
    }

    async fn completion(&self, params: CompletionParams) -> LspResult<Option<CompletionResponse>> {
        let position = params.text_document_position;
        let uri = position.text_document.uri;
        debug!("textDocument/completion: {} at {:?}", uri, position.position);
        let mut state = self.state.lock().await;
        Ok(state
            .workspace_for(&uri)
            .completion(&uri, position.position)
            .map(CompletionResponse::Array))
    }

    async fn signature_help(&self, params: SignatureHelpParams) -> LspResult<Option<SignatureHelp>> {
        let position = params.text_document_position_params;
        let uri = position.text_document.uri;
        debug!("textDocument/signatureHelp: {} at {:?}", uri, position.position);
        let mut state = self.state.lock().await;
        Ok(state.workspace_for(&uri).signature_help(&uri, position.position))
    }

    async fn goto_definition(&self, params: GotoDefinitionParams) -> LspResult<Option<GotoDefinitionResponse>> {
        let position = params.text_document_position_params;
        let uri = position.text_document.uri;
        debug!("textDocument/definition: {} at {:?}", uri, position.position);
        let mut state = self.state.lock().await;
        Ok(state
            .workspace_for(&uri)
            .goto_definition(&uri, position.position)
            .map(GotoDefinitionResponse::Scalar))
    }

    async fn goto_type_definition(
        &self,
        params: GotoTypeDefinitionParams,
    ) -> LspResult<Option<GotoTypeDefinitionResponse>> {
        let position = params.text_document_position_params;
        let uri = position.text_document.uri;
        debug!("textDocument/typeDefinition: {} at {:?}", uri, position.position);
        let mut state = self.state.lock().await;
        Ok(state
            .workspace_for(&uri)
            .goto_type_definition(&uri, position.position)
            .map(GotoTypeDefinitionResponse::Scalar))
    }

    async fn document_link(&self, params: DocumentLinkParams) -> LspResult<Option<Vec<DocumentLink>>> {
        let uri = params.text_document.uri;
        debug!("textDocument/documentLink: {}", uri);
        let mut state = self.state.lock().await;
        Ok(Some(state.workspace_for(&uri).document_links(&uri)))
    }
}
