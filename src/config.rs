//! Command line arguments and client-provided settings

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use glob::Pattern;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// Settings section clients send under `workspace/configuration`.
pub const CONFIGURATION_SECTION: &str = "luau-lsp";

#[derive(Debug, Clone, Parser, PartialEq)]
#[command(name = "luau-lsp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Language server for Luau workspaces")]
pub struct ServerArgs {
    /// Log level for stderr output, overrides RUST_LOG
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Disable ANSI colors in stderr output
    #[arg(long)]
    pub no_color: bool,

    /// Do not write a session log to the cache directory
    #[arg(long)]
    pub no_file_logging: bool,

    /// A path to a Luau definitions file to load into the global namespace
    #[arg(long = "definitions", value_name = "PATH")]
    pub definitions: Vec<PathBuf>,

    /// A path to a Luau documentation database for loaded definitions
    #[arg(long = "docs", visible_alias = "documentation", value_name = "PATH")]
    pub docs: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand, PartialEq)]
pub enum Command {
    /// Start the language server over stdio (the default)
    Lsp,

    /// Type check and lint files, reporting problems in a compiler-like format
    Analyze(AnalyzeArgs),
}

#[derive(Debug, Clone, Default, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// `file(line,col): Kind: message`
    #[default]
    Default,
    /// luacheck style, `file:line:col-endcol: (W0) Kind: message`
    Plain,
    /// `file:line.col-endline.endcol: Kind: message`
    Gnu,
}

#[derive(Debug, Clone, Default, Args, PartialEq)]
pub struct AnalyzeArgs {
    /// Output format of reported problems
    #[arg(long, value_enum, default_value_t)]
    pub formatter: ReportFormat,

    /// A path to a Rojo-style instance sourcemap to understand the DataModel
    #[arg(long, value_name = "PATH")]
    pub sourcemap: Option<PathBuf>,

    /// A path to a Luau definitions file to load into the global namespace
    #[arg(long = "definitions", value_name = "PATH")]
    pub definitions: Vec<PathBuf>,

    /// A file glob pattern for ignoring error outputs
    #[arg(long = "ignore", value_name = "GLOB")]
    pub ignore: Vec<String>,

    /// Files to perform analysis on; directories are searched for Luau files
    #[arg(value_name = "FILES")]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid luau-lsp settings: {0}")]
    Invalid(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiagnosticsConfiguration {
    /// Report errors of required modules under their own files.
    pub include_dependents: bool,
}

impl Default for DiagnosticsConfiguration {
    fn default() -> Self {
        Self { include_dependents: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompletionConfiguration {
    pub enabled: bool,
}

impl Default for CompletionConfiguration {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfiguration {
    /// Globs, relative to the workspace root, whose files never receive
    /// diagnostics from other modules.
    pub ignore_globs: Vec<String>,
    pub diagnostics: DiagnosticsConfiguration,
    pub completion: CompletionConfiguration,
}

impl ClientConfiguration {
    /// Reads settings either wrapped in a `luau-lsp` section or bare.
    /// `null` yields the defaults.
    pub fn from_settings(settings: &Value) -> Result<Self, ConfigError> {
        let section = settings.get(CONFIGURATION_SECTION).unwrap_or(settings);
        if section.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(section.clone())?)
    }
}

/// Compiled ignore globs. Patterns are matched against forward-slash paths
/// relative to the workspace root.
#[derive(Debug, Clone, Default)]
pub struct IgnoreGlobs {
    patterns: Vec<Pattern>,
}

impl IgnoreGlobs {
    /// Compiles `globs`, skipping malformed patterns with a warning.
    pub fn new(globs: &[String]) -> Self {
        let patterns = globs
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!("Ignoring malformed glob {:?}: {}", glob, e);
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn is_ignored(&self, relative_path: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(relative_path))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_when_settings_missing() {
        let config = ClientConfiguration::from_settings(&Value::Null).unwrap();
        assert_eq!(config, ClientConfiguration::default());
        assert!(config.diagnostics.include_dependents);
        assert!(config.completion.enabled);
    }

    #[test]
    fn test_reads_wrapped_and_bare_sections() {
        let wrapped = json!({ "luau-lsp": { "ignoreGlobs": ["vendor/**"], "completion": { "enabled": false } } });
        let config = ClientConfiguration::from_settings(&wrapped).unwrap();
        assert_eq!(config.ignore_globs, vec!["vendor/**".to_string()]);
        assert!(!config.completion.enabled);
        assert!(config.diagnostics.include_dependents);

        let bare = json!({ "diagnostics": { "includeDependents": false } });
        let config = ClientConfiguration::from_settings(&bare).unwrap();
        assert!(!config.diagnostics.include_dependents);
    }

    #[test]
    fn test_invalid_settings_are_an_error() {
        let invalid = json!({ "luau-lsp": { "ignoreGlobs": "vendor/**" } });
        assert!(ClientConfiguration::from_settings(&invalid).is_err());
    }

    #[test]
    fn test_ignore_globs_match_relative_paths() {
        let globs = IgnoreGlobs::new(&["vendor/**".to_string(), "[".to_string()]);
        assert!(globs.is_ignored("vendor/lib/module.luau"));
        assert!(!globs.is_ignored("src/module.luau"));
        assert!(!globs.is_empty(), "valid patterns survive a malformed sibling");

        let sibling = IgnoreGlobs::new(&["../shared/**".to_string()]);
        assert!(sibling.is_ignored("../shared/x.luau"));
        assert!(!sibling.is_ignored("shared/x.luau"));
    }

    #[test]
    fn test_server_args() {
        let args = ServerArgs::try_parse_from([
            "luau-lsp",
            "--definitions",
            "globalTypes.d.lua",
            "--documentation",
            "api-docs.json",
            "--no-file-logging",
        ])
        .unwrap();
        assert_eq!(args.definitions, vec![PathBuf::from("globalTypes.d.lua")]);
        assert_eq!(args.docs, Some(PathBuf::from("api-docs.json")));
        assert!(args.no_file_logging);
        assert!(args.log_level.is_none());
        assert!(args.command.is_none());
    }

    #[test]
    fn test_analyze_args() {
        let args = ServerArgs::try_parse_from([
            "luau-lsp",
            "analyze",
            "--formatter=gnu",
            "--sourcemap",
            "sourcemap.json",
            "--ignore",
            "Packages/**",
            "--ignore",
            "**/_Index/**",
            "src",
            "tests/init.luau",
        ])
        .unwrap();
        let Some(Command::Analyze(analyze)) = args.command else {
            panic!("expected the analyze subcommand");
        };
        assert_eq!(analyze.formatter, ReportFormat::Gnu);
        assert_eq!(analyze.sourcemap, Some(PathBuf::from("sourcemap.json")));
        assert_eq!(analyze.ignore, vec!["Packages/**".to_string(), "**/_Index/**".to_string()]);
        assert_eq!(analyze.files, vec![PathBuf::from("src"), PathBuf::from("tests/init.luau")]);

        let args = ServerArgs::try_parse_from(["luau-lsp", "analyze", "main.luau"]).unwrap();
        assert!(matches!(args.command, Some(Command::Analyze(AnalyzeArgs { formatter: ReportFormat::Default, .. }))));
        assert!(ServerArgs::try_parse_from(["luau-lsp", "analyze", "--formatter", "json"]).is_err());
        assert_eq!(
            ServerArgs::try_parse_from(["luau-lsp", "lsp"]).unwrap().command,
            Some(Command::Lsp)
        );
    }
}
