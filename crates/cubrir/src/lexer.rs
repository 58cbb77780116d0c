//! Lexical analysis for Django-syntax template text.
//!
//! Splits raw template text into the flat token stream the statement
//! extractor walks: literal text, `{{ variable }}` output, and
//! `{% tag %}` tokens. `{# comment #}` bits are consumed without emitting
//! a token, so commented lines are never executable, and a
//! `{% verbatim %}` region suppresses tag interpretation until its
//! matching end tag.
//!
//! Tag delimiters never span lines; a brace pair left open at a line end
//! is literal text, which matches the engine this grammar models.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Lexical class of one template token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Literal text between tags
    Text,
    /// Variable output: `{{ expr }}`
    Variable,
    /// Block tag: `{% name args %}`
    Block,
}

/// One lexical unit of a template.
///
/// `content` is the raw text for [`TokenKind::Text`] tokens and the
/// trimmed interior (`if foo`, `endblock`, `user.name`) for tag and
/// variable tokens. `line` is the 1-based line the token begins on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Lexical class
    pub kind: TokenKind,
    /// Payload: literal text, a variable expression, or a tag body
    pub content: String,
    /// 1-based line where the token begins
    pub line: u32,
}

impl Token {
    /// Create a token.
    #[must_use]
    pub fn new(kind: TokenKind, content: impl Into<String>, line: u32) -> Self {
        Self {
            kind,
            content: content.into(),
            line,
        }
    }
}

const BLOCK_TAG_START: &str = "{%";
const VARIABLE_TAG_START: &str = "{{";

fn tag_re() -> &'static Regex {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    TAG_RE.get_or_init(|| {
        Regex::new(r"\{%.*?%\}|\{\{.*?\}\}|\{#.*?#\}").expect("tag pattern compiles")
    })
}

/// Tokenizer for one template's full text.
///
/// Produces the token sequence exactly once per analysis; tokenizing is a
/// pure function of the text, so a fresh lexer is cheap to build.
#[derive(Debug)]
pub struct Lexer<'a> {
    text: &'a str,
    /// End tag that closes the current verbatim region, if inside one.
    verbatim: Option<String>,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over `text`.
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            verbatim: None,
        }
    }

    /// Tokenize the whole text into an ordered token stream.
    #[must_use]
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut line: u32 = 1;
        let mut last = 0;
        for m in tag_re().find_iter(self.text) {
            if m.start() > last {
                let bit = &self.text[last..m.start()];
                tokens.push(Token::new(TokenKind::Text, bit, line));
                line += newline_count(bit);
            }
            let bit = m.as_str();
            if let Some(token) = self.tag_token(bit, line) {
                tokens.push(token);
            }
            line += newline_count(bit);
            last = m.end();
        }
        if last < self.text.len() {
            tokens.push(Token::new(TokenKind::Text, &self.text[last..], line));
        }
        tokens
    }

    /// Classify one delimited bit, tracking verbatim state.
    fn tag_token(&mut self, bit: &str, line: u32) -> Option<Token> {
        let inner = bit[2..bit.len() - 2].trim();
        if bit.starts_with(BLOCK_TAG_START) {
            if let Some(end_tag) = &self.verbatim {
                if inner != end_tag {
                    return Some(Token::new(TokenKind::Text, bit, line));
                }
                self.verbatim = None;
                return Some(Token::new(TokenKind::Block, inner, line));
            }
            if inner == "verbatim" || inner.starts_with("verbatim ") {
                self.verbatim = Some(format!("end{inner}"));
            }
            return Some(Token::new(TokenKind::Block, inner, line));
        }
        if self.verbatim.is_some() {
            // Inside a verbatim region every bit is literal text.
            return Some(Token::new(TokenKind::Text, bit, line));
        }
        if bit.starts_with(VARIABLE_TAG_START) {
            return Some(Token::new(TokenKind::Variable, inner, line));
        }
        // {# comment #}: consumed, nothing emitted.
        None
    }
}

fn newline_count(text: &str) -> u32 {
    text.bytes().filter(|&b| b == b'\n').count() as u32
}
