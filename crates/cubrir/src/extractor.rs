//! Static statement extraction: which template lines are executable.
//!
//! The extractor walks one template's token stream and produces the set of
//! line numbers that could ever be hit, the denominator of line coverage.
//! It keeps no state between files and has no runtime dependency; calling
//! it twice on unchanged text yields identical sets.
//!
//! Unrecognized tag spellings deliberately fall through to "record as
//! executable". Over-counting an unknown construct shows up as a missed
//! line a human can investigate; silently dropping it would hide coverage.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::trace;

use crate::lexer::{Lexer, Token, TokenKind};
use crate::result::CubrirResult;
use crate::source::{read_template_source, SourceEncoding};

/// Set of 1-based line numbers counted as executable for one file.
pub type ExecutableLines = BTreeSet<u32>;

/// Flags tracked while walking one template's token stream.
///
/// `extends` and `in_block` implement inheritance suppression: once a
/// template extends a parent, only `{% block %}` bodies are independently
/// executable, because everything outside them is replaced by the parent's
/// rendering. `in_comment` blanks out `{% comment %}` regions entirely,
/// even when their bodies contain tag-like text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ParserState {
    in_comment: bool,
    extends: bool,
    in_block: bool,
}

impl ParserState {
    /// Whether non-tag content at this point is unreachable at render time.
    fn suppressed(self) -> bool {
        self.extends && !self.in_block
    }

    /// Transition on a block tag, deciding whether its line is executable.
    fn observe_tag(&mut self, content: &str) -> bool {
        if content == "endcomment" {
            self.in_comment = false;
            return false;
        }
        if self.in_comment {
            return false;
        }
        if content.starts_with("endblock") {
            self.in_block = false;
        } else if content.starts_with("block") {
            self.in_block = true;
            if self.extends {
                // The opening tag itself is replaced by the parent's
                // rendering; only the body runs independently.
                return false;
            }
        }
        if self.suppressed() {
            return false;
        }
        if content == "comment" {
            // The opening tag runs; the body it hides does not.
            self.in_comment = true;
            return true;
        }
        if content.starts_with("end") {
            return false;
        }
        if content == "else" || content == "empty" {
            // Structural separators; the branch they introduce is covered
            // by the lines inside it.
            return false;
        }
        if content.starts_with("elif") {
            // The engine's runtime keeps no per-clause record for elif, so
            // an elif line can never be matched to an execution event.
            // Known approximation, kept as is.
            return false;
        }
        if content.starts_with("extends") {
            self.extends = true;
            return false;
        }
        true
    }
}

/// Static analyzer deciding which template lines count as statements.
#[derive(Debug, Clone, Copy)]
pub struct StatementExtractor {
    encoding: SourceEncoding,
}

impl StatementExtractor {
    /// Create an extractor reading files with `encoding`.
    #[must_use]
    pub fn new(encoding: SourceEncoding) -> Self {
        Self { encoding }
    }

    /// Executable lines of the template at `path`.
    ///
    /// Fails with [`crate::CubrirError::SourceDecode`] when the file's
    /// bytes are invalid in the configured encoding. Extraction never
    /// partially succeeds: either the whole file tokenizes and a complete
    /// set comes back, or the error propagates and the caller skips or
    /// flags the file.
    pub fn statements(&self, path: &Path) -> CubrirResult<ExecutableLines> {
        let text = read_template_source(path, self.encoding)?;
        Ok(self.statements_in_text(&text))
    }

    /// Executable lines of already-decoded template text.
    #[must_use]
    pub fn statements_in_text(&self, text: &str) -> ExecutableLines {
        self.statements_from_tokens(Lexer::new(text).tokenize())
    }

    /// Executable lines from a caller-supplied token stream.
    ///
    /// This is the seam for hosts that already hold the engine's tokens;
    /// [`statements`](Self::statements) and
    /// [`statements_in_text`](Self::statements_in_text) feed it from the
    /// built-in lexer.
    pub fn statements_from_tokens<I>(&self, tokens: I) -> ExecutableLines
    where
        I: IntoIterator<Item = Token>,
    {
        let mut state = ParserState::default();
        let mut lines = ExecutableLines::new();
        for token in tokens {
            trace!(kind = ?token.kind, line = token.line, content = %token.content, "token");
            match token.kind {
                TokenKind::Block => {
                    if state.observe_tag(&token.content) {
                        lines.insert(token.line);
                    }
                }
                TokenKind::Variable => {
                    if state.in_comment || state.suppressed() {
                        continue;
                    }
                    lines.insert(token.line);
                }
                TokenKind::Text => {
                    if state.in_comment || state.suppressed() {
                        continue;
                    }
                    record_text_span(&mut lines, &token);
                }
            }
        }
        lines
    }
}

/// Record every line a text token spans.
///
/// A text node opening with a whitespace-only first line is a formatting
/// artifact of the tag before it, not executable content, so that leading
/// blank line is dropped from the span. The locator applies the same rule
/// to text nodes at render time; the two sides must agree or a line would
/// be executable-but-never-executed (or the reverse) by construction.
fn record_text_span(lines: &mut ExecutableLines, token: &Token) {
    let mut parts = token.content.split_inclusive('\n');
    let Some(first) = parts.next() else {
        return;
    };
    let mut line = token.line;
    let mut count = 1 + parts.count() as u32;
    if first.trim().is_empty() && !first.is_empty() {
        line += 1;
        count -= 1;
    }
    for l in line..line + count {
        lines.insert(l);
    }
}
