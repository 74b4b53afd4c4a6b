//! Backend state management
//!
//! This module defines the LuauBackend struct and the server state it guards:
//! one workspace per workspace folder plus the null workspace for files that
//! belong to no folder.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use tokio::sync::Mutex;
use tower_lsp::lsp_types::{MessageType, Url};
use tower_lsp::Client;
use tracing::{info, warn};

use crate::config::ClientConfiguration;
use crate::engine::{AnalysisEngine, EngineContext, EngineFactory};
use crate::lsp::documentation::DocumentationProvider;
use crate::lsp::workspace::{Workspace, NULL_WORKSPACE_NAME};

/// A window message waiting for the client to finish initializing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMessage {
    pub ty: MessageType,
    pub message: String,
}

/// Everything a request may touch. Requests are handled one at a time under
/// the backend's mutex.
pub struct ServerState<E> {
    pub workspaces: Vec<Workspace<E>>,
    pub null_workspace: Workspace<E>,
    pub configuration: ClientConfiguration,
    /// Workspaces whose sourcemap failure was already shown to the user.
    pub(super) sourcemap_warnings_shown: FxHashSet<String>,
    pub(super) pending_messages: Vec<PendingMessage>,
}

impl<E> fmt::Debug for ServerState<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerState")
            .field("workspaces", &self.workspaces)
            .field("configuration", &self.configuration)
            .finish()
    }
}

impl<E: AnalysisEngine> ServerState<E> {
    pub fn new(null_workspace: Workspace<E>) -> Self {
        Self {
            workspaces: Vec::new(),
            null_workspace,
            configuration: ClientConfiguration::default(),
            sourcemap_warnings_shown: FxHashSet::default(),
            pending_messages: Vec::new(),
        }
    }

    /// Index of the workspace folder containing `uri`; the deepest root wins
    /// when folders are nested.
    pub fn workspace_index_for(&self, uri: &Url) -> Option<usize> {
        self.workspaces
            .iter()
            .enumerate()
            .filter(|(_, workspace)| workspace.is_in_workspace(uri))
            .max_by_key(|(_, workspace)| workspace.root().components().count())
            .map(|(index, _)| index)
    }

    /// The workspace serving `uri`, falling back to the null workspace.
    pub fn workspace_for(&mut self, uri: &Url) -> &mut Workspace<E> {
        match self.workspace_index_for(uri) {
            Some(index) => &mut self.workspaces[index],
            None => &mut self.null_workspace,
        }
    }

    pub fn remove_workspace(&mut self, root_uri: &Url) -> Option<Workspace<E>> {
        let index = self
            .workspaces
            .iter()
            .position(|workspace| workspace.root_uri.as_ref() == Some(root_uri))?;
        info!("Removing workspace {}", self.workspaces[index].name);
        Some(self.workspaces.remove(index))
    }

    /// Queues the sourcemap failure message of a workspace unless it was
    /// already shown once.
    pub(super) fn report_sourcemap_failure(&mut self, workspace_name: &str) {
        if !self.sourcemap_warnings_shown.insert(workspace_name.to_string()) {
            return;
        }
        self.pending_messages.push(PendingMessage {
            ty: MessageType::WARNING,
            message: format!(
                "Failed to load sourcemap.json for workspace '{}'. Instance information will not be available",
                workspace_name
            ),
        });
    }

    pub(super) fn take_pending_messages(&mut self) -> Vec<PendingMessage> {
        std::mem::take(&mut self.pending_messages)
    }

    /// Creates, configures and sets up a workspace folder.
    pub(super) fn add_workspace(&mut self, mut workspace: Workspace<E>) {
        workspace.set_configuration(self.configuration.clone());
        if workspace.setup().is_err() {
            self.report_sourcemap_failure(&workspace.name);
        }
        info!("Added workspace {} at {}", workspace.name, workspace.root().display());
        self.workspaces.push(workspace);
    }

    /// Applies client settings to every workspace.
    pub fn set_configuration(&mut self, configuration: ClientConfiguration) {
        for workspace in self.workspaces.iter_mut().chain(std::iter::once(&mut self.null_workspace)) {
            workspace.set_configuration(configuration.clone());
        }
        self.configuration = configuration;
    }
}

/// The Luau language server backend, routing requests to workspaces.
pub struct LuauBackend<E> {
    pub(super) client: Client,
    pub(super) state: Arc<Mutex<ServerState<E>>>,
    pub(super) factory: Arc<dyn EngineFactory<E>>,
    pub(super) documentation: Arc<dyn DocumentationProvider>,
    pub(super) definitions_files: Vec<PathBuf>,
}

// Manual Debug implementation since the engine factory doesn't implement Debug
impl<E> fmt::Debug for LuauBackend<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LuauBackend")
            .field("definitions_files", &self.definitions_files)
            .finish()
    }
}

impl<E: AnalysisEngine + 'static> LuauBackend<E> {
    pub fn new(
        client: Client,
        factory: Arc<dyn EngineFactory<E>>,
        documentation: Arc<dyn DocumentationProvider>,
        definitions_files: Vec<PathBuf>,
    ) -> Self {
        let context = EngineContext {
            workspace_name: NULL_WORKSPACE_NAME.to_string(),
            root: PathBuf::new(),
            definitions_files: definitions_files.clone(),
        };
        let null_workspace = Workspace::null(factory.create(&context), Arc::clone(&documentation));
        Self {
            client,
            state: Arc::new(Mutex::new(ServerState::new(null_workspace))),
            factory,
            documentation,
            definitions_files,
        }
    }

    /// A new workspace for a folder, with its own engine instance.
    pub(super) fn create_workspace(&self, name: &str, root_uri: Url) -> Workspace<E> {
        let root = root_uri.to_file_path().unwrap_or_else(|_| {
            warn!("Workspace folder {} is not a file URI", root_uri);
            PathBuf::new()
        });
        let context = EngineContext {
            workspace_name: name.to_string(),
            root,
            definitions_files: self.definitions_files.clone(),
        };
        Workspace::new(name, root_uri, self.factory.create(&context), Arc::clone(&self.documentation))
    }

    /// Shows queued window messages.
    pub(super) async fn flush_messages(&self) {
        let messages = self.state.lock().await.take_pending_messages();
        for message in messages {
            self.client.show_message(message.ty, message.message).await;
        }
    }
}
