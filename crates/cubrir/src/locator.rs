//! Dynamic execution location: mapping a render activation to file lines.
//!
//! Once per observed render activation the host asks two questions: which
//! physical template file is being rendered (not necessarily the file whose
//! code is executing, since many node types share one render path), and
//! which line range the activation is responsible for. Both answers come
//! from data the engine recorded at parse time, reached through the
//! [`Activation`] adapter so that engine versions with different attribute
//! layouts stay out of the coverage logic.
//!
//! Every call is located independently; the only shared state is the
//! per-file [`LineMapCache`](crate::LineMapCache).

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::result::CubrirResult;
use crate::source::LineMapCache;

/// Render-node shape, as far as attribution cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Literal text node
    Text,
    /// Variable output node
    Variable,
    /// Ordinary block-tag node
    Tag,
    /// Structural wrapper holding other nodes, with no span of its own
    Container,
    /// Raw-passthrough region
    Verbatim,
    /// Pluralized translation block
    BlockTranslate,
}

/// Half-open character-offset interval recorded at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    /// Offset of the first character
    pub start: usize,
    /// Offset one past the last character
    pub end: usize,
}

impl SourceSpan {
    /// Create a span.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Inclusive 1-based line range attributed to one activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpan {
    /// First line of the range
    pub start: u32,
    /// Last line of the range
    pub end: u32,
}

/// One runtime render activation, as exposed by an engine adapter.
///
/// Engine versions expose origin and span data through different attribute
/// layouts; an adapter implements this trait for its activation record,
/// chosen once at session start, and answers `None` wherever the data is
/// missing. Every accessor is a probe: absence is an expected attribution
/// miss, never an error.
pub trait Activation {
    /// The node shape being rendered.
    fn kind(&self) -> NodeKind;

    /// Name of the template the node was parsed from. Synthetic names
    /// (starting with `<`) mark templates built from in-memory strings.
    fn origin_name(&self) -> Option<&str>;

    /// The node's recorded source offset interval.
    fn span(&self) -> Option<SourceSpan>;

    /// Literal content of a text node.
    fn text(&self) -> Option<&str> {
        None
    }

    /// Raw body of a verbatim node (everything after the opening tag).
    fn verbatim_body(&self) -> Option<&str> {
        None
    }

    /// End offset of the last token of the populated translation variant,
    /// plural preferred.
    fn translate_end(&self) -> Option<usize> {
        None
    }
}

/// Origin of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeOrigin {
    /// Template name: a filesystem path, or a `<...>` placeholder for
    /// templates built from in-memory strings
    pub name: String,
}

impl NodeOrigin {
    /// Origin named by a template path.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One token of a translation block; only its span matters here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateToken {
    /// The token's recorded source interval
    pub span: SourceSpan,
}

/// Reference activation record for the supported engine contract.
///
/// Hosts embedding the supported engine version hand these to the locator
/// directly; other engine contracts implement [`Activation`] themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateNode {
    /// Literal text node
    Text {
        /// Owning template
        origin: NodeOrigin,
        /// Recorded source interval
        span: SourceSpan,
        /// The literal content
        content: String,
    },
    /// Variable output node
    Variable {
        /// Owning template
        origin: NodeOrigin,
        /// Recorded source interval
        span: SourceSpan,
    },
    /// Ordinary block-tag node
    Tag {
        /// Owning template
        origin: NodeOrigin,
        /// Recorded source interval
        span: SourceSpan,
    },
    /// Raw-passthrough node; the recorded span only covers the opening tag
    Verbatim {
        /// Owning template
        origin: NodeOrigin,
        /// Recorded source interval
        span: SourceSpan,
        /// Literal body between the opening and closing tags
        body: String,
    },
    /// Pluralized translation node with singular/plural token runs
    BlockTranslate {
        /// Owning template
        origin: NodeOrigin,
        /// Recorded source interval
        span: SourceSpan,
        /// Tokens of the singular variant
        singular: Vec<TranslateToken>,
        /// Tokens of the plural variant, empty when absent
        plural: Vec<TranslateToken>,
    },
    /// Node-list or whole-template wrapper with no span of its own
    Container,
}

impl TemplateNode {
    fn origin(&self) -> Option<&NodeOrigin> {
        match self {
            Self::Container => None,
            Self::Text { origin, .. }
            | Self::Variable { origin, .. }
            | Self::Tag { origin, .. }
            | Self::Verbatim { origin, .. }
            | Self::BlockTranslate { origin, .. } => Some(origin),
        }
    }
}

impl Activation for TemplateNode {
    fn kind(&self) -> NodeKind {
        match self {
            Self::Text { .. } => NodeKind::Text,
            Self::Variable { .. } => NodeKind::Variable,
            Self::Tag { .. } => NodeKind::Tag,
            Self::Verbatim { .. } => NodeKind::Verbatim,
            Self::BlockTranslate { .. } => NodeKind::BlockTranslate,
            Self::Container => NodeKind::Container,
        }
    }

    fn origin_name(&self) -> Option<&str> {
        self.origin().map(|origin| origin.name.as_str())
    }

    fn span(&self) -> Option<SourceSpan> {
        match self {
            Self::Container => None,
            Self::Text { span, .. }
            | Self::Variable { span, .. }
            | Self::Tag { span, .. }
            | Self::Verbatim { span, .. }
            | Self::BlockTranslate { span, .. } => Some(*span),
        }
    }

    fn text(&self) -> Option<&str> {
        match self {
            Self::Text { content, .. } => Some(content),
            _ => None,
        }
    }

    fn verbatim_body(&self) -> Option<&str> {
        match self {
            Self::Verbatim { body, .. } => Some(body),
            _ => None,
        }
    }

    fn translate_end(&self) -> Option<usize> {
        match self {
            Self::BlockTranslate {
                singular, plural, ..
            } => {
                let tokens = if plural.is_empty() { singular } else { plural };
                tokens.last().map(|token| token.span.end)
            }
            _ => None,
        }
    }
}

/// Dynamic interceptor attributing render activations to file lines.
#[derive(Debug)]
pub struct ExecutionLocator {
    maps: Arc<LineMapCache>,
}

impl ExecutionLocator {
    /// Create a locator sharing `maps` with the rest of the session.
    #[must_use]
    pub fn new(maps: Arc<LineMapCache>) -> Self {
        Self { maps }
    }

    /// The physical template file this activation renders, if any.
    ///
    /// Templates built from in-memory strings carry a synthetic `<...>`
    /// name and cannot be reported per file; they yield `None`, as do
    /// activations with no reachable origin at all.
    #[must_use]
    pub fn locate_source<'a>(&self, activation: &'a dyn Activation) -> Option<&'a Path> {
        let name = activation.origin_name()?;
        if name.starts_with('<') {
            debug!(name, "skipping string-built template");
            return None;
        }
        Some(Path::new(name))
    }

    /// The inclusive line range this activation is responsible for.
    ///
    /// `Ok(None)` is an attribution miss: a container node, a missing span,
    /// or offsets that fall outside the template's text. A range is only
    /// meaningful as a matched pair, so one failed endpoint lookup misses
    /// the whole range. `Err` is reserved for source read and decode
    /// failures while building the line map.
    pub fn line_range(&self, activation: &dyn Activation) -> CubrirResult<Option<LineSpan>> {
        if activation.kind() == NodeKind::Container {
            return Ok(None);
        }
        let Some(path) = self.locate_source(activation) else {
            return Ok(None);
        };
        let Some(span) = activation.span() else {
            return Ok(None);
        };
        let (start, end) = adjust_span(activation, span);
        let map = self.maps.line_map(path)?;
        // The end offset is exclusive; the last character sits one before it.
        let start_line = map.line_for_offset(start);
        let end_line = end
            .checked_sub(1)
            .and_then(|offset| map.line_for_offset(offset));
        match (start_line, end_line) {
            (Some(first), Some(last)) => Ok(Some(LineSpan { start: first, end: last })),
            _ => {
                debug!(path = %path.display(), start, end, "offsets outside template text");
                Ok(None)
            }
        }
    }
}

/// Per-kind span corrections applied before offset-to-line mapping.
fn adjust_span(activation: &dyn Activation, span: SourceSpan) -> (usize, usize) {
    let SourceSpan { mut start, mut end } = span;
    match activation.kind() {
        NodeKind::Text => {
            // Mirror extraction: a text node opening with a blank line is
            // tag formatting, not content, on both sides.
            if let Some(first) = activation.text().and_then(|t| t.split_inclusive('\n').next()) {
                if !first.is_empty() && first.trim().is_empty() {
                    start += first.len();
                }
            }
        }
        NodeKind::Verbatim => {
            // The recorded end only covers the opening tag; pull the whole
            // raw body into this activation's span.
            if let Some(body) = activation.verbatim_body() {
                end += body.len();
            }
        }
        NodeKind::BlockTranslate => {
            // The span must cover the full construct no matter which
            // grammatical number ends up rendered.
            if let Some(last_end) = activation.translate_end() {
                end = last_end;
            }
        }
        _ => {}
    }
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    use crate::result::CubrirError;
    use crate::source::SourceEncoding;

    /// Write `text` to a temp template and return a locator plus its path.
    fn locator_for(text: &str) -> (ExecutionLocator, PathBuf, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, text).unwrap();
        let locator = ExecutionLocator::new(Arc::new(LineMapCache::new(SourceEncoding::Utf8)));
        (locator, path, dir)
    }

    fn origin(path: &Path) -> NodeOrigin {
        NodeOrigin::new(path.to_str().unwrap())
    }

    mod locate_source_tests {
        use super::*;

        #[test]
        fn test_file_backed_template_is_located() {
            let locator = ExecutionLocator::new(Arc::new(LineMapCache::new(SourceEncoding::Utf8)));
            let node = TemplateNode::Tag {
                origin: NodeOrigin::new("templates/page.html"),
                span: SourceSpan::new(0, 10),
            };
            assert_eq!(
                locator.locate_source(&node),
                Some(Path::new("templates/page.html"))
            );
        }

        #[test]
        fn test_string_built_template_is_skipped() {
            let locator = ExecutionLocator::new(Arc::new(LineMapCache::new(SourceEncoding::Utf8)));
            let node = TemplateNode::Tag {
                origin: NodeOrigin::new("<unknown source>"),
                span: SourceSpan::new(0, 10),
            };
            assert_eq!(locator.locate_source(&node), None);
        }

        #[test]
        fn test_container_has_no_source() {
            let locator = ExecutionLocator::new(Arc::new(LineMapCache::new(SourceEncoding::Utf8)));
            assert_eq!(locator.locate_source(&TemplateNode::Container), None);
        }
    }

    mod line_range_tests {
        use super::*;

        #[test]
        fn test_tag_node_maps_to_its_lines() {
            let (locator, path, _dir) = locator_for("{% if x %}\nHello\n{% endif %}\n");
            let node = TemplateNode::Tag {
                origin: origin(&path),
                span: SourceSpan::new(0, 10),
            };
            let range = locator.line_range(&node).unwrap();
            assert_eq!(range, Some(LineSpan { start: 1, end: 1 }));
        }

        #[test]
        fn test_container_never_has_a_range() {
            let (locator, _path, _dir) = locator_for("Hello\n");
            assert_eq!(locator.line_range(&TemplateNode::Container).unwrap(), None);
        }

        #[test]
        fn test_missing_span_is_a_miss() {
            struct Spanless;
            impl Activation for Spanless {
                fn kind(&self) -> NodeKind {
                    NodeKind::Tag
                }
                fn origin_name(&self) -> Option<&str> {
                    Some("page.html")
                }
                fn span(&self) -> Option<SourceSpan> {
                    None
                }
            }
            let locator = ExecutionLocator::new(Arc::new(LineMapCache::new(SourceEncoding::Utf8)));
            assert_eq!(locator.line_range(&Spanless).unwrap(), None);
        }

        #[test]
        fn test_string_built_template_is_a_miss() {
            let (locator, _path, _dir) = locator_for("Hello\n");
            let node = TemplateNode::Variable {
                origin: NodeOrigin::new("<template string>"),
                span: SourceSpan::new(0, 5),
            };
            assert_eq!(locator.line_range(&node).unwrap(), None);
        }

        #[test]
        fn test_offsets_past_the_end_miss_as_a_pair() {
            let (locator, path, _dir) = locator_for("Hello\n");
            // Start is valid, end is past the end of the text; a half-valid
            // range must not be reported.
            let node = TemplateNode::Tag {
                origin: origin(&path),
                span: SourceSpan::new(0, 40),
            };
            assert_eq!(locator.line_range(&node).unwrap(), None);
        }

        #[test]
        fn test_decode_failure_is_an_error_not_a_miss() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("bad.html");
            std::fs::write(&path, [0xc3, 0x28]).unwrap();
            let locator =
                ExecutionLocator::new(Arc::new(LineMapCache::new(SourceEncoding::Utf8)));
            let node = TemplateNode::Tag {
                origin: NodeOrigin::new(path.to_str().unwrap()),
                span: SourceSpan::new(0, 2),
            };
            let err = locator.line_range(&node).unwrap_err();
            assert!(matches!(err, CubrirError::SourceDecode { .. }));
        }
    }

    mod text_node_tests {
        use super::*;

        #[test]
        fn test_leading_blank_line_is_excluded() {
            let text = "{% if x %}\nHello\n{% endif %}\n";
            let (locator, path, _dir) = locator_for(text);
            // The text node spans "\nHello\n" right after the opening tag.
            let node = TemplateNode::Text {
                origin: origin(&path),
                span: SourceSpan::new(10, 17),
                content: "\nHello\n".to_string(),
            };
            let range = locator.line_range(&node).unwrap();
            assert_eq!(range, Some(LineSpan { start: 2, end: 2 }));
        }

        #[test]
        fn test_text_without_leading_blank_keeps_its_start() {
            let (locator, path, _dir) = locator_for("Hello\nWorld\n");
            let node = TemplateNode::Text {
                origin: origin(&path),
                span: SourceSpan::new(0, 12),
                content: "Hello\nWorld\n".to_string(),
            };
            let range = locator.line_range(&node).unwrap();
            assert_eq!(range, Some(LineSpan { start: 1, end: 2 }));
        }
    }

    mod verbatim_node_tests {
        use super::*;

        #[test]
        fn test_body_extends_the_recorded_span() {
            let text = "x\n{% verbatim %}\na\nb\n{% endverbatim %}\n";
            let (locator, path, _dir) = locator_for(text);
            // The engine records only the opening tag, offsets 2..16; the
            // body "\na\nb\n" runs to the closing tag on line 5.
            let node = TemplateNode::Verbatim {
                origin: origin(&path),
                span: SourceSpan::new(2, 16),
                body: "\na\nb\n".to_string(),
            };
            let range = locator.line_range(&node).unwrap();
            assert_eq!(range, Some(LineSpan { start: 2, end: 4 }));
        }

        #[test]
        fn test_without_extension_only_the_tag_line_would_count() {
            let text = "x\n{% verbatim %}\na\nb\n{% endverbatim %}\n";
            let (locator, path, _dir) = locator_for(text);
            let node = TemplateNode::Tag {
                origin: origin(&path),
                span: SourceSpan::new(2, 16),
            };
            let range = locator.line_range(&node).unwrap();
            assert_eq!(range, Some(LineSpan { start: 2, end: 2 }));
        }
    }

    mod block_translate_tests {
        use super::*;

        #[test]
        fn test_singular_variant_bounds_the_span() {
            let text = "{% blocktrans %}\none cat\n{% endblocktrans %}\n";
            let (locator, path, _dir) = locator_for(text);
            let node = TemplateNode::BlockTranslate {
                origin: origin(&path),
                span: SourceSpan::new(0, 16),
                singular: vec![TranslateToken {
                    span: SourceSpan::new(16, 25),
                }],
                plural: Vec::new(),
            };
            let range = locator.line_range(&node).unwrap();
            assert_eq!(range, Some(LineSpan { start: 1, end: 2 }));
        }

        #[test]
        fn test_plural_variant_wins_when_present() {
            let text = "{% blocktrans %}\none cat\n{% plural %}\nmany cats\n{% endblocktrans %}\n";
            let (locator, path, _dir) = locator_for(text);
            let node = TemplateNode::BlockTranslate {
                origin: origin(&path),
                span: SourceSpan::new(0, 16),
                singular: vec![TranslateToken {
                    span: SourceSpan::new(16, 25),
                }],
                plural: vec![TranslateToken {
                    span: SourceSpan::new(38, 48),
                }],
            };
            let range = locator.line_range(&node).unwrap();
            assert_eq!(range, Some(LineSpan { start: 1, end: 4 }));
        }
    }
}
