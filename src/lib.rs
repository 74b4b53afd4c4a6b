//! Workspace analysis and query layer of a Luau language server.
//!
//! The crate keeps open documents, resolves module names through a Rojo
//! style `sourcemap.json`, caches analysis results with dependency-aware
//! invalidation and answers position queries (hover, signature help,
//! definitions, document links, completion) on top of an external
//! [`engine::AnalysisEngine`]. The same workspace backs the batch
//! `analyze` command.

use std::process::ExitCode;

pub mod analyze;
pub mod config;
pub mod engine;
pub mod logging;
pub mod lsp;

#[cfg(test)]
pub(crate) mod test_support;

pub use lsp::backend::serve_stdio;

use config::{Command, ServerArgs};
use engine::{AnalysisEngine, EngineFactory};

/// Entry point of a binary embedding an engine: batch analysis for the
/// `analyze` subcommand, the language server otherwise.
pub async fn run<E: AnalysisEngine + 'static>(
    args: ServerArgs,
    factory: impl EngineFactory<E> + 'static,
) -> anyhow::Result<ExitCode> {
    if let Some(Command::Analyze(analyze_args)) = &args.command {
        let level = args.log_level.as_deref().unwrap_or("warn");
        let _guard = logging::init_logger(args.no_color, Some(level), false)?;
        return analyze::run(analyze_args, &factory);
    }
    serve_stdio(args, factory).await?;
    Ok(ExitCode::SUCCESS)
}
