//! Luau language server backend
//!
//! The backend owns every workspace behind a single async mutex and answers
//! LSP requests by routing them to the workspace containing the document.
//!
//! # Modules
//!
//! - **state**: `LuauBackend` and the `ServerState` it guards (workspace
//!   routing, queued window messages)
//! - **handlers**: the `tower_lsp::LanguageServer` implementation

use std::sync::Arc;

use tower_lsp::{LspService, Server};
use tracing::{info, warn};

use crate::config::ServerArgs;
use crate::engine::{AnalysisEngine, EngineFactory};
use crate::logging;
use crate::lsp::documentation::{DocumentationDatabase, DocumentationProvider};

mod handlers;
mod state;

pub use state::{LuauBackend, PendingMessage, ServerState};

/// Runs the language server over stdin/stdout until the client exits.
///
/// `factory` builds one analysis engine per workspace folder.
pub async fn serve_stdio<E: AnalysisEngine + 'static>(
    args: ServerArgs,
    factory: impl EngineFactory<E> + 'static,
) -> anyhow::Result<()> {
    // Keep the guard alive so buffered session logs are flushed on exit.
    let _guard = logging::init_logger(args.no_color, args.log_level.as_deref(), !args.no_file_logging)?;
    info!("Starting luau-lsp {}", env!("CARGO_PKG_VERSION"));

    let documentation: Arc<dyn DocumentationProvider> = match &args.docs {
        Some(path) => match DocumentationDatabase::load(path) {
            Ok(database) => {
                info!("Loaded {} documentation entries from {}", database.len(), path.display());
                Arc::new(database)
            }
            Err(e) => {
                warn!("Failed to load documentation database {}: {}", path.display(), e);
                Arc::new(DocumentationDatabase::default())
            }
        },
        None => Arc::new(DocumentationDatabase::default()),
    };
    for path in &args.definitions {
        info!("Using definitions file {}", path.display());
    }

    let factory: Arc<dyn EngineFactory<E>> = Arc::new(factory);
    let definitions = args.definitions;
    let (service, socket) =
        LspService::new(move |client| LuauBackend::new(client, factory, documentation, definitions));

    Server::new(tokio::io::stdin(), tokio::io::stdout(), socket)
        .serve(service)
        .await;
    info!("Language server exited");
    Ok(())
}
