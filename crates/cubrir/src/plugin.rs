//! Session entry point tying extraction and location together.

use std::path::Path;
use std::sync::Arc;

use crate::config::{EngineConfig, PluginConfig};
use crate::extractor::{ExecutableLines, StatementExtractor};
use crate::locator::{Activation, ExecutionLocator, LineSpan};
use crate::result::CubrirResult;
use crate::source::LineMapCache;

/// Line coverage core for template rendering, one instance per
/// measurement session.
///
/// The host calls [`statements`](Self::statements) once per template file
/// for the coverage denominator, and
/// [`locate_source`](Self::locate_source) /
/// [`line_range`](Self::line_range) once per render activation for the
/// numerator; missing = executable − hit stays entirely on the host side.
/// Construction checks the engine preconditions and refuses to build a
/// plugin that could only report misleading numbers.
#[derive(Debug)]
pub struct TemplateCoveragePlugin {
    config: PluginConfig,
    extractor: StatementExtractor,
    locator: ExecutionLocator,
}

impl TemplateCoveragePlugin {
    /// Create a plugin for one measurement session.
    ///
    /// Fails with one of the configuration errors when the engine is not
    /// the supported one or template debugging is off; the host must
    /// surface that diagnostic and run without this plugin.
    pub fn new(config: PluginConfig, engine: &EngineConfig) -> CubrirResult<Self> {
        engine.ensure_supported()?;
        let maps = Arc::new(LineMapCache::new(config.encoding));
        Ok(Self {
            extractor: StatementExtractor::new(config.encoding),
            locator: ExecutionLocator::new(maps),
            config,
        })
    }

    /// The session configuration.
    #[must_use]
    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Executable lines of the template at `path`.
    pub fn statements(&self, path: &Path) -> CubrirResult<ExecutableLines> {
        self.extractor.statements(path)
    }

    /// File attribution for one render activation.
    #[must_use]
    pub fn locate_source<'a>(&self, activation: &'a dyn Activation) -> Option<&'a Path> {
        self.locator.locate_source(activation)
    }

    /// Line attribution for one render activation.
    pub fn line_range(&self, activation: &dyn Activation) -> CubrirResult<Option<LineSpan>> {
        self.locator.line_range(activation)
    }

    /// Diagnostic key/value dump for host support tooling.
    #[must_use]
    pub fn sys_info(&self) -> Vec<(String, String)> {
        vec![
            ("encoding".to_string(), self.config.encoding.to_string()),
            (
                "template_extensions".to_string(),
                self.config.template_extensions.join(", "),
            ),
        ]
    }
}
