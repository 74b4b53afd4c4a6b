//! Diagnostic aggregation across the require graph
//!
//! A check of one module reports errors owned by every module it reaches.
//! Errors owned by the queried module become the primary items; errors owned
//! by its dependencies are attributed to their own files as related
//! documents, unless the dependency file matches an ignore glob.

use std::collections::{BTreeMap, HashMap};

use tower_lsp::lsp_types::{
    Diagnostic, DiagnosticSeverity, DocumentDiagnosticReport, DocumentDiagnosticReportKind,
    FullDocumentDiagnosticReport, NumberOrString, Position as LspPosition, Range,
    RelatedFullDocumentDiagnosticReport, Url,
};
use tracing::{debug, trace};

use crate::config::{DiagnosticsConfiguration, IgnoreGlobs};
use crate::engine::{AnalysisEngine, LintWarning, ModuleName, TypeError, TypeErrorKind};
use crate::lsp::features::node_finder::location_to_range;
use crate::lsp::file_resolver::WorkspaceFileResolver;

use super::cache::AnalysisCache;

/// Value of `Diagnostic::source` for everything reported here.
pub const DIAGNOSTIC_SOURCE: &str = "Luau";

const UNRESOLVED_SOURCE_CODE: &str = "000";
const UNRESOLVED_SOURCE_MESSAGE: &str = "Failed to resolve source module for this file";

/// Diagnostics for one document plus those of the files it depends on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentDiagnostics {
    pub items: Vec<Diagnostic>,
    pub related: BTreeMap<Url, Vec<Diagnostic>>,
}

impl DocumentDiagnostics {
    fn unresolved_source() -> Self {
        let origin = LspPosition::new(0, 0);
        Self {
            items: vec![Diagnostic {
                range: Range::new(origin, origin),
                severity: Some(DiagnosticSeverity::ERROR),
                code: Some(NumberOrString::String(UNRESOLVED_SOURCE_CODE.to_string())),
                source: Some(DIAGNOSTIC_SOURCE.to_string()),
                message: UNRESOLVED_SOURCE_MESSAGE.to_string(),
                ..Default::default()
            }],
            related: BTreeMap::new(),
        }
    }

    pub fn into_report(self) -> DocumentDiagnosticReport {
        let related_documents = (!self.related.is_empty()).then(|| {
            self.related
                .into_iter()
                .map(|(uri, items)| {
                    let report = FullDocumentDiagnosticReport { result_id: None, items };
                    (uri, DocumentDiagnosticReportKind::Full(report))
                })
                .collect::<HashMap<_, _>>()
        });
        DocumentDiagnosticReport::Full(RelatedFullDocumentDiagnosticReport {
            related_documents,
            full_document_diagnostic_report: FullDocumentDiagnosticReport {
                result_id: None,
                items: self.items,
            },
        })
    }
}

pub fn type_error_to_diagnostic(error: &TypeError) -> Diagnostic {
    let prefix = match error.kind {
        TypeErrorKind::Syntax => "SyntaxError",
        TypeErrorKind::Type => "TypeError",
    };
    Diagnostic {
        range: location_to_range(error.location),
        severity: Some(DiagnosticSeverity::ERROR),
        code: Some(NumberOrString::Number(error.code as i32)),
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message: format!("{}: {}", prefix, error.message),
        ..Default::default()
    }
}

pub fn lint_to_diagnostic(lint: &LintWarning, severity: DiagnosticSeverity) -> Diagnostic {
    Diagnostic {
        range: location_to_range(lint.location),
        severity: Some(severity),
        code: Some(NumberOrString::Number(lint.code as i32)),
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message: format!("{}: {}", lint.name, lint.text),
        ..Default::default()
    }
}

/// File URI an error owned by `owner` is reported under, or `None` when the
/// owner has no file or the file is ignored.
fn related_uri(owner: &ModuleName, files: &WorkspaceFileResolver, ignore_globs: &IgnoreGlobs) -> Option<Url> {
    let path = files.resolve_to_real_path(owner)?;
    if ignore_globs.is_ignored(&files.relative_path(&path)) {
        trace!("Skipping diagnostics of ignored file {}", path.display());
        return None;
    }
    Url::from_file_path(&path).ok()
}

/// Checks `name` if needed and shapes the result: primary items for the
/// module itself (type errors then lints), related items per dependency file.
pub fn document_diagnostics<E: AnalysisEngine>(
    name: &ModuleName,
    cache: &mut AnalysisCache<E>,
    files: &WorkspaceFileResolver,
    ignore_globs: &IgnoreGlobs,
    config: &DiagnosticsConfiguration,
) -> DocumentDiagnostics {
    cache.ensure_fresh(name, files);
    if cache.engine().source_module(name).is_none() {
        debug!("No source module for {}", name);
        return DocumentDiagnostics::unresolved_source();
    }

    let mut diagnostics = DocumentDiagnostics::default();
    let errors = cache
        .check_result(name)
        .map(|result| result.errors.clone())
        .unwrap_or_default();
    for error in &errors {
        let diagnostic = type_error_to_diagnostic(error);
        if &error.module_name == name {
            diagnostics.items.push(diagnostic);
            continue;
        }
        if !config.include_dependents {
            continue;
        }
        let Some(uri) = related_uri(&error.module_name, files, ignore_globs) else {
            continue;
        };
        let bucket = diagnostics.related.entry(uri).or_default();
        if !bucket.contains(&diagnostic) {
            bucket.push(diagnostic);
        }
    }

    let lints = cache.lint(name, files);
    diagnostics.items.extend(
        lints
            .errors
            .iter()
            .map(|lint| lint_to_diagnostic(lint, DiagnosticSeverity::ERROR))
            .chain(
                lints
                    .warnings
                    .iter()
                    .map(|lint| lint_to_diagnostic(lint, DiagnosticSeverity::WARNING)),
            ),
    );

    debug!(
        "{} diagnostic(s) for {}, {} related file(s)",
        diagnostics.items.len(),
        name,
        diagnostics.related.len()
    );
    diagnostics
}
