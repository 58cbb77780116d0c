//! Cubrir: Line Coverage Core for Template Rendering
//!
//! Cubrir (Spanish: "to cover") computes line-level code coverage for
//! Django-style template files, as the core of a plugin to a general-purpose
//! coverage host. The host owns measurement sessions, hit recording, and
//! report rendering; the template engine owns parsing and rendering. Cubrir
//! owns the reconciliation between them:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     CUBRIR ARCHITECTURE                          │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  template text ─► Lexer ─► StatementExtractor ─► executable set  │
//! │                                                   (denominator)  │
//! │  render event ─► Activation ─► ExecutionLocator ─► file + lines  │
//! │                  (adapter)           │             (numerator)   │
//! │                                 LineMapCache                     │
//! │                              (offset ─► line no.)                │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Coordinate spaces
//!
//! Three coordinate spaces meet here: raw character offsets recorded by the
//! engine's parser, 1-based line numbers as reports expect, and the runtime
//! activation records that tie a render operation back to a template file.
//! [`LineMap`] translates offsets to lines; [`StatementExtractor`] decides
//! which lines could ever run; [`ExecutionLocator`] decides which file and
//! lines one render activation maps to.
//!
//! # Example
//!
//! ```
//! use cubrir::{EngineBackend, EngineConfig, PluginConfig, TemplateCoveragePlugin};
//!
//! let engine = EngineConfig {
//!     backend: EngineBackend::Django,
//!     debug: Some(true),
//! };
//! let plugin = TemplateCoveragePlugin::new(PluginConfig::default(), &engine)?;
//! # let _ = plugin;
//! # Ok::<(), cubrir::CubrirError>(())
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod config;
mod extractor;
mod lexer;
mod locator;
mod plugin;
mod result;
mod source;

pub use config::{EngineBackend, EngineConfig, PluginConfig, DEFAULT_TEMPLATE_EXTENSIONS};
pub use extractor::{ExecutableLines, StatementExtractor};
pub use lexer::{Lexer, Token, TokenKind};
pub use locator::{
    Activation, ExecutionLocator, LineSpan, NodeKind, NodeOrigin, SourceSpan, TemplateNode,
    TranslateToken,
};
pub use plugin::TemplateCoveragePlugin;
pub use result::{CubrirError, CubrirResult};
pub use source::{read_template_source, LineMap, LineMapCache, SourceEncoding};
