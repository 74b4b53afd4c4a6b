//! Batch analysis: type check and lint files from the command line
//!
//! ```text
//! luau-lsp analyze [--formatter F] [--sourcemap PATH] [--ignore GLOB]... FILES...
//!       ↓
//! expand directories to *.lua / *.luau files
//!       ↓
//! Workspace::analyze_document() per file
//!       ├─→ type errors of every reached module (ignored files dropped)
//!       └─→ lints of the file itself
//!       ↓
//! one report line per problem, failure exit status when any is an error
//! ```
//!
//! Each problem is reported once, even when several files require the
//! module that owns it.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use glob::Pattern;
use rustc_hash::FxHashSet;
use tower_lsp::lsp_types::Url;
use tracing::{debug, info, warn};

use crate::config::{AnalyzeArgs, ClientConfiguration, ReportFormat};
use crate::engine::{AnalysisEngine, EngineContext, EngineFactory, LintWarning, Location, TypeErrorKind};
use crate::lsp::documentation::DocumentationDatabase;
use crate::lsp::file_resolver::module_name_from_path;
use crate::lsp::workspace::Workspace;

const ANALYZE_WORKSPACE_NAME: &str = "analyze";
const LUAU_EXTENSIONS: [&str; 2] = ["lua", "luau"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// File path relative to the analysis root.
    pub path: String,
    pub location: Location,
    /// `TypeError`, `SyntaxError` or the lint rule name.
    pub category: String,
    pub message: String,
    pub severity: Severity,
}

impl Report {
    fn lint(path: &str, lint: &LintWarning, severity: Severity) -> Self {
        Self {
            path: path.to_string(),
            location: lint.location,
            category: lint.name.clone(),
            message: lint.text.clone(),
            severity,
        }
    }

    /// Renders the report as one line. Columns are 1-based; GNU and plain end
    /// columns are inclusive.
    pub fn render(&self, format: ReportFormat) -> String {
        let Location { begin, end } = self.location;
        match format {
            ReportFormat::Default => format!(
                "{}({},{}): {}: {}",
                self.path,
                begin.line + 1,
                begin.column + 1,
                self.category,
                self.message
            ),
            ReportFormat::Plain => {
                // luacheck has no multi-line ranges.
                let end_column = if begin.line == end.line { end.column } else { 100 };
                format!(
                    "{}:{}:{}-{}: (W0) {}: {}",
                    self.path,
                    begin.line + 1,
                    begin.column + 1,
                    end_column,
                    self.category,
                    self.message
                )
            }
            ReportFormat::Gnu => format!(
                "{}:{}.{}-{}.{}: {}: {}",
                self.path,
                begin.line + 1,
                begin.column + 1,
                end.line + 1,
                end.column,
                self.category,
                self.message
            ),
        }
    }
}

fn is_luau_file(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| LUAU_EXTENSIONS.contains(&extension))
}

/// Resolves `files` against `root` and replaces directories by the Luau files
/// below them, in path order.
pub fn expand_files(root: &Path, files: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut expanded = Vec::new();
    for file in files {
        let path = root.join(file);
        if !path.is_dir() {
            expanded.push(path);
            continue;
        }

        let pattern = format!("{}/**/*", Pattern::escape(&path.to_string_lossy()));
        let mut found: Vec<PathBuf> = glob::glob(&pattern)
            .with_context(|| format!("Invalid search pattern for {}", path.display()))?
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!("Skipping unreadable path: {}", e);
                    None
                }
            })
            .filter(|path| path.is_file() && is_luau_file(path))
            .collect();
        found.sort();
        debug!("Found {} file(s) in {}", found.len(), path.display());
        expanded.extend(found);
    }
    Ok(expanded)
}

/// Analyzes `args.files` relative to `root` and collects every problem.
pub fn analyze_files<E: AnalysisEngine>(
    args: &AnalyzeArgs,
    root: &Path,
    factory: &dyn EngineFactory<E>,
) -> anyhow::Result<Vec<Report>> {
    let root_uri = Url::from_directory_path(root).map_err(|()| anyhow!("{} is not an absolute path", root.display()))?;
    let context = EngineContext {
        workspace_name: ANALYZE_WORKSPACE_NAME.to_string(),
        root: root.to_path_buf(),
        definitions_files: args.definitions.clone(),
    };
    let mut workspace = Workspace::new(
        ANALYZE_WORKSPACE_NAME,
        root_uri,
        factory.create(&context),
        Arc::new(DocumentationDatabase::default()),
    );
    if let Some(sourcemap) = &args.sourcemap {
        let path = root.join(sourcemap);
        workspace
            .load_sourcemap(&path)
            .with_context(|| format!("Failed to load sourcemap {}", path.display()))?;
    }
    workspace.set_configuration(ClientConfiguration {
        ignore_globs: args.ignore.clone(),
        ..Default::default()
    });

    let mut reports = Vec::new();
    let mut reported = FxHashSet::default();
    for path in expand_files(root, &args.files)? {
        let uri = Url::from_file_path(&path).map_err(|()| anyhow!("{} is not an absolute path", path.display()))?;
        let display_path = workspace.display_path(&module_name_from_path(&path));
        let Some((errors, lints)) = workspace.analyze_document(&uri) else {
            reports.push(Report {
                path: display_path,
                location: Location::default(),
                category: "Error".to_string(),
                message: "Failed to read source".to_string(),
                severity: Severity::Error,
            });
            continue;
        };

        for error in errors {
            if !reported.insert((error.module_name.clone(), error.location, error.message.clone())) {
                continue;
            }
            let category = match error.kind {
                TypeErrorKind::Syntax => "SyntaxError",
                TypeErrorKind::Type => "TypeError",
            };
            reports.push(Report {
                path: workspace.display_path(&error.module_name),
                location: error.location,
                category: category.to_string(),
                message: error.message,
                severity: Severity::Error,
            });
        }
        if workspace.is_ignored_file(&path) {
            continue;
        }
        reports.extend(lints.errors.iter().map(|lint| Report::lint(&display_path, lint, Severity::Error)));
        reports.extend(lints.warnings.iter().map(|lint| Report::lint(&display_path, lint, Severity::Warning)));
    }
    Ok(reports)
}

/// Runs the `analyze` subcommand in the current directory. Plain reports go
/// to stdout like luacheck, the other formats to stderr.
pub fn run<E: AnalysisEngine>(args: &AnalyzeArgs, factory: &dyn EngineFactory<E>) -> anyhow::Result<ExitCode> {
    let root = std::env::current_dir().context("Failed to read the current directory")?;
    let reports = analyze_files(args, &root, factory)?;

    let mut out: Box<dyn Write> = match args.formatter {
        ReportFormat::Plain => Box::new(io::stdout().lock()),
        ReportFormat::Default | ReportFormat::Gnu => Box::new(io::stderr().lock()),
    };
    for report in &reports {
        writeln!(out, "{}", report.render(args.formatter))?;
    }
    out.flush()?;

    let failed = reports.iter().any(|report| report.severity == Severity::Error);
    info!("Analyzed with {} problem(s)", reports.len());
    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}
