//! Instance tree reconstructed from a Rojo `sourcemap.json`
//!
//! The tree describes the logical runtime hierarchy of a project, which may
//! differ from the on-disk directory layout. Nodes live in an arena and are
//! addressed by [`InstanceId`]; two lookup tables map virtual paths and
//! root-relative script paths back to nodes.

use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::engine::{ModuleName, SourceCodeType};
use crate::lsp::file_resolver::normalize_path;

pub const SOURCEMAP_FILE_NAME: &str = "sourcemap.json";

/// Virtual root of a tree whose root instance is a `DataModel`.
pub const DATA_MODEL_ROOT: &str = "game";
/// Virtual root of any other tree (e.g. a library project).
pub const PROJECT_ROOT: &str = "ProjectRoot";

#[derive(Debug, Error)]
pub enum SourcemapError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed sourcemap: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One entry of `sourcemap.json` as written by Rojo.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SourcemapEntry {
    name: String,
    class_name: String,
    #[serde(default)]
    file_paths: Vec<String>,
    #[serde(default)]
    children: Vec<SourcemapEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(u32);

#[derive(Debug, Clone, PartialEq)]
pub struct InstanceNode {
    pub name: String,
    pub class_name: String,
    /// Root-relative file paths, normalized with forward slashes.
    pub file_paths: Vec<String>,
    /// Children in manifest order, names unique among siblings.
    pub children: Vec<InstanceId>,
    pub virtual_path: ModuleName,
}

impl InstanceNode {
    /// The Luau file backing this instance, if any.
    pub fn script_file_path(&self) -> Option<&str> {
        self.file_paths
            .iter()
            .map(String::as_str)
            .find(|path| path.ends_with(".lua") || path.ends_with(".luau"))
    }

    pub fn source_code_type(&self) -> Option<SourceCodeType> {
        match self.class_name.as_str() {
            "Script" => Some(SourceCodeType::Script),
            "LocalScript" => Some(SourceCodeType::Local),
            "ModuleScript" => Some(SourceCodeType::Module),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InstanceTree {
    nodes: Vec<InstanceNode>,
    by_virtual_path: FxHashMap<ModuleName, InstanceId>,
    by_script_path: FxHashMap<String, InstanceId>,
}

impl InstanceTree {
    pub fn load_file(path: &Path) -> Result<Self, SourcemapError> {
        let contents = fs::read_to_string(path).map_err(|source| SourcemapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let tree = Self::from_json(&contents)?;
        debug!("Loaded {} instances from {}", tree.nodes.len(), path.display());
        Ok(tree)
    }

    pub fn from_json(contents: &str) -> Result<Self, SourcemapError> {
        let entry: SourcemapEntry = serde_json::from_str(contents)?;
        let mut tree = InstanceTree {
            nodes: Vec::new(),
            by_virtual_path: FxHashMap::default(),
            by_script_path: FxHashMap::default(),
        };
        let root_path = if entry.class_name == "DataModel" {
            DATA_MODEL_ROOT
        } else {
            PROJECT_ROOT
        };
        tree.insert(entry, ModuleName::from(root_path));
        Ok(tree)
    }

    fn insert(&mut self, entry: SourcemapEntry, virtual_path: ModuleName) -> InstanceId {
        let id = InstanceId(self.nodes.len() as u32);
        let file_paths = entry
            .file_paths
            .iter()
            .map(|path| normalize_path(Path::new(&path.replace('\\', "/"))))
            .collect();
        self.nodes.push(InstanceNode {
            name: entry.name,
            class_name: entry.class_name,
            file_paths,
            children: Vec::new(),
            virtual_path: virtual_path.clone(),
        });
        self.by_virtual_path.insert(virtual_path.clone(), id);
        if let Some(script) = self.nodes[id.0 as usize].script_file_path() {
            self.by_script_path.insert(script.to_string(), id);
        }

        let mut children = Vec::with_capacity(entry.children.len());
        for child in entry.children {
            let child_path = ModuleName::new(format!("{}/{}", virtual_path, child.name));
            if self.by_virtual_path.contains_key(&child_path) {
                warn!("Duplicate instance {} in sourcemap, keeping the first", child_path);
                continue;
            }
            children.push(self.insert(child, child_path));
        }
        self.nodes[id.0 as usize].children = children;
        id
    }

    pub fn root(&self) -> &InstanceNode {
        &self.nodes[0]
    }

    pub fn node(&self, id: InstanceId) -> &InstanceNode {
        &self.nodes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn find_by_virtual_path(&self, path: &str) -> Option<&InstanceNode> {
        self.by_virtual_path
            .get(&ModuleName::from(path))
            .map(|id| self.node(*id))
    }

    /// Looks up the instance backed by a root-relative script path.
    pub fn find_by_script_path(&self, relative_path: &str) -> Option<&InstanceNode> {
        self.by_script_path.get(relative_path).map(|id| self.node(*id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &InstanceNode> {
        self.nodes.iter()
    }
}
