//! Stylesheet lexical events and a small tokenizer.
//!
//! The tokenizer splits a stylesheet into a flat stream of events:
//! selectors, block delimiters, declarations, at-rules, comments and
//! whitespace runs. Event text holds the raw source slice, so a stream
//! serialized with [`write_events`] reproduces untouched input (the one
//! normalization is that declarations always gain a trailing `;`).
//!
//! This is a lexical split, not a grammar check: anything structurally
//! balanced tokenizes, and only unbalanced blocks, unterminated comments
//! or strings, and trailing junk are rejected.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::CssConfig;

/// Kind tag for one lexical event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Rule prelude, including at-rule preludes that open a block
    Selector,
    /// `{`
    BlockStart,
    /// `}`
    BlockEnd,
    /// `property: value`, without the trailing `;`
    Declaration,
    /// Block-less at-rule such as `@import`, without the trailing `;`
    AtRule,
    /// `/* ... */` including the delimiters
    Comment,
    /// A run of whitespace between other events
    Whitespace,
}

/// One lexical event carrying its raw source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub text: String,
}

impl Event {
    pub fn new(kind: EventKind, text: impl Into<String>) -> Self {
        Self { kind, text: text.into() }
    }

    pub fn declaration(text: impl Into<String>) -> Self {
        Self::new(EventKind::Declaration, text)
    }
}

/// Error type for stylesheet reading and tokenization failures
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CssError {
    /// Stylesheet could not be read
    #[error("cannot read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// `/*` without a matching `*/`
    #[error("line {line}: unterminated comment")]
    UnterminatedComment { line: usize },
    /// Quoted string without a closing quote
    #[error("line {line}: unterminated string")]
    UnterminatedString { line: usize },
    /// `}` with no open block
    #[error("line {line}: unexpected '}}'")]
    UnexpectedClose { line: usize },
    /// Block still open at end of input
    #[error("line {line}: unclosed block")]
    UnclosedBlock { line: usize },
    /// Trailing content at end of input that belongs to no rule
    #[error("line {line}: unexpected end of stylesheet")]
    UnexpectedEof { line: usize },
}

/// Split a declaration into trimmed property and value.
///
/// Returns `None` when the text carries no `:` separator.
pub fn split_declaration(decl: &str) -> Option<(&str, &str)> {
    let (prop, val) = decl.split_once(':')?;
    Some((prop.trim(), val.trim()))
}

/// Serialize an event stream back into stylesheet text.
pub fn write_events(events: &[Event]) -> String {
    let mut out = String::new();
    for ev in events {
        out.push_str(&ev.text);
        if matches!(ev.kind, EventKind::Declaration | EventKind::AtRule) {
            out.push(';');
        }
    }
    out
}

/// A parsed stylesheet plus its per-file configuration context.
#[derive(Debug, Clone)]
pub struct CssFile {
    pub path: PathBuf,
    pub events: Vec<Event>,
    pub conf: CssConfig,
}

impl CssFile {
    /// Read and tokenize a stylesheet, deriving its configuration from
    /// `base` plus any comment annotations, rooted at the file's directory.
    pub fn parse(path: &Path, base: &CssConfig) -> Result<Self, CssError> {
        let src = fs::read_to_string(path)
            .map_err(|e| CssError::Io { path: path.to_path_buf(), source: e })?;
        let events = parse_stylesheet(&src)?;
        let root = path.parent().unwrap_or_else(|| Path::new(""));
        let conf = CssConfig::derive(base, &events, root);
        Ok(Self { path: path.to_path_buf(), events, conf })
    }
}

/// What ended a raw scan.
enum Terminator {
    Semicolon,
    BlockOpen,
    BlockClose,
    Eof,
}

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0, line: 1 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        if c == '\n' {
            self.line += 1;
        }
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Consume a `/* ... */` comment, `pos` sitting on the `/*`.
    fn consume_comment(&mut self) -> Result<(), CssError> {
        let start_line = self.line;
        self.bump();
        self.bump();
        while !self.rest().starts_with("*/") {
            if self.bump().is_none() {
                return Err(CssError::UnterminatedComment { line: start_line });
            }
        }
        self.bump();
        self.bump();
        Ok(())
    }

    /// Consume a quoted string, `pos` sitting on the opening quote.
    fn consume_string(&mut self) -> Result<(), CssError> {
        let start_line = self.line;
        let quote = self.bump().unwrap_or('"');
        loop {
            match self.bump() {
                Some('\\') => {
                    self.bump();
                }
                Some(c) if c == quote => return Ok(()),
                Some('\n') | None => {
                    return Err(CssError::UnterminatedString { line: start_line })
                }
                Some(_) => {}
            }
        }
    }

    /// Scan raw rule text up to the next structural delimiter. Quoted
    /// strings and embedded comments are swallowed into the raw slice.
    fn scan_raw(&mut self) -> Result<(&'a str, Terminator), CssError> {
        let start = self.pos;
        loop {
            match self.peek() {
                None => return Ok((&self.src[start..self.pos], Terminator::Eof)),
                Some(';') => {
                    let end = self.pos;
                    self.bump();
                    return Ok((&self.src[start..end], Terminator::Semicolon));
                }
                Some('{') => return Ok((&self.src[start..self.pos], Terminator::BlockOpen)),
                Some('}') => return Ok((&self.src[start..self.pos], Terminator::BlockClose)),
                Some('"') | Some('\'') => self.consume_string()?,
                Some(_) if self.rest().starts_with("/*") => self.consume_comment()?,
                Some(_) => {
                    self.bump();
                }
            }
        }
    }
}

/// Tokenize a stylesheet into a flat event stream.
pub fn parse_stylesheet(src: &str) -> Result<Vec<Event>, CssError> {
    let mut sc = Scanner::new(src);
    let mut events = Vec::new();
    let mut depth = 0usize;

    while let Some(c) = sc.peek() {
        if c.is_whitespace() {
            let start = sc.pos;
            while sc.peek().is_some_and(|c| c.is_whitespace()) {
                sc.bump();
            }
            events.push(Event::new(EventKind::Whitespace, &sc.src[start..sc.pos]));
        } else if sc.rest().starts_with("/*") {
            let start = sc.pos;
            sc.consume_comment()?;
            events.push(Event::new(EventKind::Comment, &sc.src[start..sc.pos]));
        } else if c == '}' {
            if depth == 0 {
                return Err(CssError::UnexpectedClose { line: sc.line });
            }
            depth -= 1;
            sc.bump();
            events.push(Event::new(EventKind::BlockEnd, "}"));
        } else {
            let (raw, term) = sc.scan_raw()?;
            match term {
                Terminator::BlockOpen => {
                    events.push(Event::new(EventKind::Selector, raw));
                    sc.bump();
                    depth += 1;
                    events.push(Event::new(EventKind::BlockStart, "{"));
                }
                Terminator::Semicolon => {
                    let kind = if raw.trim_start().starts_with('@') {
                        EventKind::AtRule
                    } else {
                        EventKind::Declaration
                    };
                    events.push(Event::new(kind, raw));
                }
                Terminator::BlockClose => {
                    if !raw.trim().is_empty() {
                        events.push(Event::declaration(raw));
                    }
                }
                Terminator::Eof => {
                    if !raw.trim().is_empty() && depth == 0 {
                        return Err(CssError::UnexpectedEof { line: sc.line });
                    }
                    if !raw.trim().is_empty() {
                        events.push(Event::declaration(raw));
                    }
                }
            }
        }
    }

    if depth > 0 {
        return Err(CssError::UnclosedBlock { line: sc.line });
    }
    Ok(events)
}
