//! Documentation database for symbols of loaded definitions
//!
//! The database is a JSON object keyed by documentation symbol, e.g.
//! `@roblox/globaltype/Part.Anchored`, as shipped alongside definition files.

use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Wraps `code` in a fenced markdown block.
pub fn code_block(language: &str, code: &str) -> String {
    format!("```{}\n{}\n```", language, code)
}

/// Provider trait for documentation lookups
pub trait DocumentationProvider: Send + Sync {
    /// Markdown for a documentation symbol, or `None` if it is unknown.
    fn print_documentation(&self, symbol: &str) -> Option<String>;
}

#[derive(Debug, Error)]
pub enum DocumentationError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed documentation database: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DocumentationEntry {
    #[serde(default)]
    pub documentation: String,
    #[serde(default)]
    pub learn_more_link: Option<String>,
    #[serde(default)]
    pub code_sample: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentationDatabase {
    entries: FxHashMap<String, DocumentationEntry>,
}

impl DocumentationDatabase {
    pub fn load(path: &Path) -> Result<Self, DocumentationError> {
        let contents = fs::read_to_string(path).map_err(|source| DocumentationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let database = Self::from_json(&contents)?;
        debug!("Loaded {} documentation entries from {}", database.len(), path.display());
        Ok(database)
    }

    pub fn from_json(contents: &str) -> Result<Self, DocumentationError> {
        Ok(Self {
            entries: serde_json::from_str(contents)?,
        })
    }

    pub fn get(&self, symbol: &str) -> Option<&DocumentationEntry> {
        self.entries.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DocumentationProvider for DocumentationDatabase {
    fn print_documentation(&self, symbol: &str) -> Option<String> {
        let entry = self.get(symbol)?;
        let mut markdown = entry.documentation.clone();
        if let Some(link) = &entry.learn_more_link {
            markdown.push_str(&format!("\n\n[Learn More]({})", link));
        }
        if let Some(sample) = &entry.code_sample {
            markdown.push_str("\n\n");
            markdown.push_str(&code_block("lua", sample));
        }
        Some(markdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const DOCS: &str = indoc! {r#"
        {
          "@roblox/globaltype/Part": {
            "documentation": "A physical brick in the world.",
            "learn_more_link": "https://create.roblox.com/docs/reference/engine/classes/Part"
          },
          "@roblox/global/print": {
            "documentation": "Prints all provided values to the output.",
            "code_sample": "print(\"hello\")",
            "params": [{ "name": "...", "documentation": "values" }]
          }
        }
    "#};

    #[test]
    fn test_print_documentation() {
        let database = DocumentationDatabase::from_json(DOCS).unwrap();
        assert_eq!(database.len(), 2);

        assert_eq!(
            database.print_documentation("@roblox/globaltype/Part").as_deref(),
            Some(
                "A physical brick in the world.\n\n\
                 [Learn More](https://create.roblox.com/docs/reference/engine/classes/Part)"
            )
        );
        assert_eq!(
            database.print_documentation("@roblox/global/print").as_deref(),
            Some("Prints all provided values to the output.\n\n```lua\nprint(\"hello\")\n```")
        );
        assert!(database.print_documentation("@roblox/global/warn").is_none());
    }

    #[test]
    fn test_malformed_database() {
        assert!(matches!(
            DocumentationDatabase::from_json("[]"),
            Err(DocumentationError::Parse(_))
        ));
    }
}
