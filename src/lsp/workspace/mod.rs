//! One workspace folder: documents, sourcemap, analysis cache and engine
//!
//! # Module Naming
//!
//! Documents are stored under their real module name (the normalized file
//! path). The engine is queried under the module's virtual name when the
//! sourcemap has an instance for the file, since that is the name `require`
//! resolution produces, and under the real name otherwise. Edits mark both
//! names dirty.
//!
//! # Query Flow
//!
//! ```text
//! textDocument/* request
//!       ↓
//! Workspace::<query>()
//!       ├─→ analysis_name(uri)
//!       ├─→ AnalysisCache::ensure_fresh()   (re-check only when stale)
//!       └─→ features::<query>(source module, module, position)
//! ```

pub mod cache;
pub mod dependency_graph;
pub mod diagnostics;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tower_lsp::lsp_types::{
    CompletionItem, DocumentLink, Hover, Location as LspLocation, Position as LspPosition, SignatureHelp, Url,
};
use tracing::{debug, info, warn};

use crate::config::{ClientConfiguration, IgnoreGlobs};
use crate::engine::{AnalysisEngine, LintResult, Location, Module, ModuleName, SourceModule, TypeError};
use crate::lsp::document::DocumentError;
use crate::lsp::documentation::DocumentationProvider;
use crate::lsp::features::{self, node_finder};
use crate::lsp::file_resolver::{module_name_from_uri, normalize_path, WorkspaceFileResolver};
use crate::lsp::models::{ManagedDocument, VersionedChanges};
use crate::lsp::sourcemap::{InstanceTree, SourcemapError, SOURCEMAP_FILE_NAME};

use cache::{AnalysisCache, DirtyReason};
use diagnostics::DocumentDiagnostics;

/// Name of the workspace serving files outside every workspace folder.
pub const NULL_WORKSPACE_NAME: &str = "$NULL_WORKSPACE";

pub struct Workspace<E> {
    pub name: String,
    pub root_uri: Option<Url>,
    files: WorkspaceFileResolver,
    cache: AnalysisCache<E>,
    configuration: ClientConfiguration,
    ignore_globs: IgnoreGlobs,
    documentation: Arc<dyn DocumentationProvider>,
}

impl<E> fmt::Debug for Workspace<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("name", &self.name)
            .field("root", &self.files.root)
            .field("documents", &self.files.documents.len())
            .finish()
    }
}

impl<E: AnalysisEngine> Workspace<E> {
    pub fn new(
        name: impl Into<String>,
        root_uri: Url,
        engine: E,
        documentation: Arc<dyn DocumentationProvider>,
    ) -> Self {
        let name = name.into();
        let root = root_uri.to_file_path().unwrap_or_else(|_| {
            warn!("Workspace {} has a non-file root {}", name, root_uri);
            PathBuf::new()
        });
        Self::with_root(name, Some(root_uri), root, engine, documentation)
    }

    /// The workspace for files that belong to no workspace folder.
    pub fn null(engine: E, documentation: Arc<dyn DocumentationProvider>) -> Self {
        Self::with_root(NULL_WORKSPACE_NAME.to_string(), None, PathBuf::new(), engine, documentation)
    }

    fn with_root(
        name: String,
        root_uri: Option<Url>,
        root: PathBuf,
        engine: E,
        documentation: Arc<dyn DocumentationProvider>,
    ) -> Self {
        Self {
            name,
            root_uri,
            files: WorkspaceFileResolver::new(root),
            cache: AnalysisCache::new(engine),
            configuration: ClientConfiguration::default(),
            ignore_globs: IgnoreGlobs::default(),
            documentation,
        }
    }

    pub fn is_null_workspace(&self) -> bool {
        self.name == NULL_WORKSPACE_NAME
    }

    pub fn root(&self) -> &Path {
        &self.files.root
    }

    pub fn files(&self) -> &WorkspaceFileResolver {
        &self.files
    }

    pub fn cache(&self) -> &AnalysisCache<E> {
        &self.cache
    }

    pub fn configuration(&self) -> &ClientConfiguration {
        &self.configuration
    }

    /// Whether `uri` is a file below this workspace's root folder.
    pub fn is_in_workspace(&self, uri: &Url) -> bool {
        if self.is_null_workspace() || self.root().as_os_str().is_empty() {
            return false;
        }
        uri.to_file_path()
            .is_ok_and(|path| Path::new(&normalize_path(&path)).starts_with(self.root()))
    }

    /// Loads the sourcemap of a workspace folder. The null workspace has no
    /// folder and stays in pass-through mode.
    pub fn setup(&mut self) -> Result<(), SourcemapError> {
        info!("Setting up workspace {}", self.name);
        if self.is_null_workspace() {
            return Ok(());
        }
        self.update_sourcemap()
    }

    /// Re-reads `sourcemap.json` and invalidates every module. On failure the
    /// resolver falls back to pass-through mode.
    pub fn update_sourcemap(&mut self) -> Result<(), SourcemapError> {
        let path = self.root().join(SOURCEMAP_FILE_NAME);
        self.load_sourcemap(&path)
    }

    /// Like [`Self::update_sourcemap`] with a sourcemap at an arbitrary path.
    pub fn load_sourcemap(&mut self, path: &Path) -> Result<(), SourcemapError> {
        let loaded = match InstanceTree::load_file(path) {
            Ok(tree) => {
                info!("Loaded sourcemap for {} with {} instances", self.name, tree.len());
                self.files.set_sourcemap(Some(tree));
                Ok(())
            }
            Err(e) => {
                warn!("Failed to load sourcemap for {}: {}", self.name, e);
                self.files.set_sourcemap(None);
                Err(e)
            }
        };
        self.cache.invalidate_all();
        loaded
    }

    pub fn set_configuration(&mut self, configuration: ClientConfiguration) {
        debug!("Updating configuration of {}", self.name);
        self.ignore_globs = IgnoreGlobs::new(&configuration.ignore_globs);
        self.configuration = configuration;
    }

    /// Whether a file matches one of the configured ignore globs.
    pub fn is_ignored_file(&self, path: &Path) -> bool {
        self.ignore_globs.is_ignored(&self.files.relative_path(path))
    }

    /// Checks `uri` for batch reporting: every error the check reaches, minus
    /// those owned by ignored files, plus the document's own lints. `None`
    /// when the source cannot be read.
    pub fn analyze_document(&mut self, uri: &Url) -> Option<(Vec<TypeError>, LintResult)> {
        let name = self.analysis_name(uri);
        self.cache.ensure_fresh(&name, &self.files);
        self.cache.engine().source_module(&name)?;

        let errors = self
            .cache
            .check_result(&name)
            .map(|result| {
                result
                    .errors
                    .iter()
                    .filter(|error| !self.is_ignored_module(&error.module_name))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let lints = self.cache.lint(&name, &self.files);
        Some((errors, lints))
    }

    fn is_ignored_module(&self, name: &ModuleName) -> bool {
        self.files
            .resolve_to_real_path(name)
            .is_some_and(|path| self.is_ignored_file(&path))
    }

    /// Root-relative file path of a module, or its name when it has no file.
    pub fn display_path(&self, name: &ModuleName) -> String {
        match self.files.resolve_to_real_path(name) {
            Some(path) => self.files.relative_path(&path),
            None => name.to_string(),
        }
    }

    /// Name the engine knows the document at `uri` by.
    pub fn analysis_name(&self, uri: &Url) -> ModuleName {
        let name = module_name_from_uri(uri);
        self.files
            .resolve_to_virtual_path(&name)
            .unwrap_or(name)
    }

    fn mark_dirty(&mut self, name: &ModuleName, reason: DirtyReason) {
        self.cache.mark_dirty(name, reason);
        if let Some(alias) = self.files.resolve_to_virtual_path(name) {
            if &alias != name {
                self.cache.mark_dirty(&alias, reason);
            }
        }
    }

    pub fn open_document(&mut self, uri: &Url, language_id: &str, version: i32, text: &str) {
        let name = module_name_from_uri(uri);
        debug!("Opening {} as {}", uri, name);
        self.files
            .documents
            .open(name.clone(), ManagedDocument::new(uri.clone(), language_id, version, text));
        self.mark_dirty(&name, DirtyReason::DidOpen);
    }

    /// Applies versioned edits. Unknown documents and outdated versions are
    /// logged and leave all state untouched.
    pub fn update_document(&mut self, uri: &Url, changes: VersionedChanges) -> Result<(), DocumentError> {
        let name = module_name_from_uri(uri);
        if let Err(e) = self.files.documents.update(&name, changes) {
            warn!("Ignoring change to {}: {}", uri, e);
            return Err(e);
        }
        self.mark_dirty(&name, DirtyReason::DidChange);
        Ok(())
    }

    /// Drops the document; the file on disk takes over from the next check.
    pub fn close_document(&mut self, uri: &Url) -> bool {
        let name = module_name_from_uri(uri);
        debug!("Closing {}", uri);
        self.files.documents.close(&name).is_some()
    }

    /// Checks the module if it is stale and hands out its fresh analysis.
    fn fresh(&mut self, uri: &Url) -> Option<(&SourceModule, &Module)> {
        let name = self.analysis_name(uri);
        self.cache.ensure_fresh(&name, &self.files);
        let engine = self.cache.engine();
        engine.source_module(&name).zip(engine.module(&name))
    }

    pub fn document_diagnostics(&mut self, uri: &Url) -> DocumentDiagnostics {
        let name = self.analysis_name(uri);
        diagnostics::document_diagnostics(
            &name,
            &mut self.cache,
            &self.files,
            &self.ignore_globs,
            &self.configuration.diagnostics,
        )
    }

    pub fn hover(&mut self, uri: &Url, position: LspPosition) -> Option<Hover> {
        let documentation = Arc::clone(&self.documentation);
        let (source, module) = self.fresh(uri)?;
        features::hover(source, module, node_finder::lsp_to_engine_position(position), documentation.as_ref())
    }

    pub fn signature_help(&mut self, uri: &Url, position: LspPosition) -> Option<SignatureHelp> {
        let documentation = Arc::clone(&self.documentation);
        let (source, module) = self.fresh(uri)?;
        features::signature_help(source, module, node_finder::lsp_to_engine_position(position), documentation.as_ref())
    }

    fn to_lsp_location(uri: &Url, location: Location) -> LspLocation {
        LspLocation {
            uri: uri.clone(),
            range: node_finder::location_to_range(location),
        }
    }

    pub fn goto_definition(&mut self, uri: &Url, position: LspPosition) -> Option<LspLocation> {
        let (source, module) = self.fresh(uri)?;
        let location = features::goto_definition(source, module, node_finder::lsp_to_engine_position(position))?;
        Some(Self::to_lsp_location(uri, location))
    }

    pub fn goto_type_definition(&mut self, uri: &Url, position: LspPosition) -> Option<LspLocation> {
        let (source, module) = self.fresh(uri)?;
        let location = features::goto_type_definition(source, module, node_finder::lsp_to_engine_position(position))?;
        Some(Self::to_lsp_location(uri, location))
    }

    pub fn document_links(&mut self, uri: &Url) -> Vec<DocumentLink> {
        let name = self.analysis_name(uri);
        self.cache.ensure_fresh(&name, &self.files);
        match self.cache.engine().source_module(&name) {
            Some(source) => features::document_links(&name, source, &self.files),
            None => Vec::new(),
        }
    }

    /// Completion items at a position, or `None` when completion is disabled.
    pub fn completion(&mut self, uri: &Url, position: LspPosition) -> Option<Vec<CompletionItem>> {
        if !self.configuration.completion.enabled {
            return None;
        }
        let name = self.analysis_name(uri);
        self.cache.ensure_fresh(&name, &self.files);
        let result = self
            .cache
            .autocomplete(&name, node_finder::lsp_to_engine_position(position), &self.files);
        debug!("{} completion entries at {:?}", result.entries.len(), position);
        let types = self.cache.engine().module(&name).map(|module| &module.types);
        Some(features::completion_items(result, types, self.documentation.as_ref()))
    }
}
