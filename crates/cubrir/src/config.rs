//! Session configuration and engine preconditions.
//!
//! All knobs are read once at session start and passed in explicitly; the
//! plugin holds no global mutable state. The engine checks live here too:
//! coverage measured without the engine's debug instrumentation would be
//! silently wrong, so a failed precondition disables the whole plugin with
//! a diagnostic naming the cause instead of producing bogus numbers.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::result::{CubrirError, CubrirResult};
use crate::source::SourceEncoding;

/// Extensions treated as template files by default.
pub const DEFAULT_TEMPLATE_EXTENSIONS: &[&str] = &["html", "htm", "txt"];

/// Session-wide plugin configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Encoding used to decode template files
    pub encoding: SourceEncoding,
    /// Extensions of files to scan as templates even if never rendered
    pub template_extensions: Vec<String>,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            encoding: SourceEncoding::default(),
            template_extensions: DEFAULT_TEMPLATE_EXTENSIONS
                .iter()
                .map(|ext| (*ext).to_string())
                .collect(),
        }
    }
}

impl PluginConfig {
    /// Whether `path` carries one of the configured template extensions.
    ///
    /// Used by the host's file discovery to decide what to scan; the
    /// extractor itself accepts any file handed to it regardless of
    /// extension.
    #[must_use]
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.template_extensions.iter().any(|e| e == ext))
    }
}

/// Template engine backends a host may configure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineBackend {
    /// The supported Django-style engine
    Django,
    /// Jinja2, configurable in the same hosts but not traceable here
    Jinja2,
    /// Anything else
    Other(String),
}

impl fmt::Display for EngineBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Django => f.write_str("django"),
            Self::Jinja2 => f.write_str("jinja2"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// The engine facts the plugin checks once at session start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Which backend the host configured
    pub backend: EngineBackend,
    /// The engine's debug flag; `None` when the host configured the
    /// engine with no options block at all
    pub debug: Option<bool>,
}

impl EngineConfig {
    /// Check the session preconditions, in order: supported backend,
    /// options block present, template debugging enabled. The first failed
    /// check is the reported cause.
    pub fn ensure_supported(&self) -> CubrirResult<()> {
        if self.backend != EngineBackend::Django {
            return Err(CubrirError::UnsupportedEngine {
                backend: self.backend.to_string(),
            });
        }
        match self.debug {
            None => Err(CubrirError::MissingDebugOptions),
            Some(false) => Err(CubrirError::TemplateDebugDisabled),
            Some(true) => Ok(()),
        }
    }
}
