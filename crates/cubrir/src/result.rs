//! Result and error types for Cubrir.

use std::path::PathBuf;

use thiserror::Error;

use crate::source::SourceEncoding;

/// Result type for Cubrir operations
pub type CubrirResult<T> = Result<T, CubrirError>;

/// Errors that can occur in Cubrir
///
/// Attribution misses are not errors: the locator answers `None` for
/// activations it cannot map (string-built templates, container nodes,
/// missing source data). The variants here split into per-file failures
/// ([`SourceDecode`](CubrirError::SourceDecode), [`Io`](CubrirError::Io)),
/// which the host may skip or flag per its own policy, and session
/// preconditions (the engine variants), which disable the plugin outright.
#[derive(Debug, Error)]
pub enum CubrirError {
    /// Template source bytes do not match the configured encoding
    #[error("{}: template source is not valid {encoding}", path.display())]
    SourceDecode {
        /// File that failed to decode
        path: PathBuf,
        /// Encoding the session is configured to read templates with
        encoding: SourceEncoding,
    },

    /// The configured template engine is not the supported one
    #[error("Can't run with non-Django engine: {backend}")]
    UnsupportedEngine {
        /// Backend named in the engine configuration
        backend: String,
    },

    /// The engine configuration carries no options block at all
    #[error("Template engine has no options; template debugging must be enabled in settings.")]
    MissingDebugOptions,

    /// Template debugging is disabled in the engine configuration
    #[error("Template debugging must be enabled in settings.")]
    TemplateDebugDisabled,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
