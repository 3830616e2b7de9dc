//! # Error text decoding
//!
//! Errors reach us as human-readable text. Two shapes are understood:
//!
//! ```text
//! <source_file>:<line>: <message>
//! <level>. <name> - <source>:<currentline>      (repeated, one per line)
//! ```
//!
//! The first line is decoded atomically: either the whole triple comes out
//! or nothing does. Everything after the first line is read as a traceback
//! until the first line that does not fit the entry grammar. Decoding never
//! fails; malformed input only means fewer structured fields.

use crate::types::{ParsedError, TracebackEntry};

/// Tag prepended by the host to relayed error text.
pub const ERROR_TAG: &str = "[ERROR] ";

/// Structured view of one error message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedMessage
{
    /// Location triple from the first line.
    pub parsed: Option<ParsedError>,
    /// Traceback entries from the following lines, in input order.
    pub traceback: Vec<TracebackEntry>,
}

/// Decoder configured with the tag to strip from relayed messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorParser
{
    tag: String,
}

impl Default for ErrorParser
{
    fn default() -> Self
    {
        Self::new(ERROR_TAG)
    }
}

impl ErrorParser
{
    /// Create a parser that strips `tag` from the front of messages.
    pub fn new(tag: impl Into<String>) -> Self
    {
        Self { tag: tag.into() }
    }

    /// Remove the tag once, if the message starts with it.
    pub fn strip_tag<'a>(&self, message: &'a str) -> &'a str
    {
        message.strip_prefix(self.tag.as_str()).unwrap_or(message)
    }

    /// Decode the first line and the traceback that follows it.
    ///
    /// The tag is not stripped here; callers that receive tagged text call
    /// [`ErrorParser::strip_tag`] first.
    pub fn decode(&self, message: &str) -> DecodedMessage
    {
        let (parsed, rest) = parse_error_line(message);
        DecodedMessage {
            parsed,
            traceback: parse_traceback(rest),
        }
    }
}

/// Decode `<source_file>:<line>: <message>` from the first line of `text`.
///
/// Returns the triple (or `None`) and the text after the first line break.
///
/// ```rust
/// use luaerror_core::parser::parse_error_line;
///
/// let (parsed, rest) = parse_error_line("script:12: attempt to index nil");
/// let parsed = parsed.unwrap();
/// assert_eq!(parsed.source_file, "script");
/// assert_eq!(parsed.line, 12);
/// assert_eq!(parsed.message, "attempt to index nil");
/// assert!(rest.is_empty());
/// ```
pub fn parse_error_line(text: &str) -> (Option<ParsedError>, &str)
{
    match text.split_once('\n') {
        Some((first, rest)) => (parse_location(first.strip_suffix('\r').unwrap_or(first), true), rest),
        None => (parse_location(text, false), ""),
    }
}

fn parse_location(line: &str, terminated: bool) -> Option<ParsedError>
{
    let (source_file, tail) = line.split_once(':')?;
    let (line_number, tail) = split_integer(tail.trim_start())?;
    let message = tail.strip_prefix(": ")?;

    // An unterminated message must have at least one character.
    if message.is_empty() && !terminated {
        return None;
    }

    Some(ParsedError {
        source_file: source_file.to_string(),
        line: line_number,
        message: message.to_string(),
    })
}

/// Decode traceback entries, one per line, stopping at the first line that
/// does not match `<level>. <name> - <source>:<currentline>`.
///
/// Blank lines between entries are skipped.
pub fn parse_traceback(text: &str) -> Vec<TracebackEntry>
{
    let mut entries = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_traceback_entry(line) {
            Some(entry) => entries.push(entry),
            None => break,
        }
    }
    entries
}

fn parse_traceback_entry(line: &str) -> Option<TracebackEntry>
{
    let (level, tail) = split_integer(line)?;
    let tail = tail.strip_prefix(". ")?;
    let (name, tail) = tail.split_once(' ')?;
    if name.is_empty() {
        return None;
    }
    let tail = tail.strip_prefix("- ")?;
    let (source, currentline) = tail.rsplit_once(':')?;
    let (currentline, trailing) = split_integer(currentline)?;
    if !trailing.is_empty() {
        return None;
    }

    Some(TracebackEntry {
        level,
        name: name.to_string(),
        source: source.to_string(),
        currentline,
    })
}

/// Split a leading optionally-signed decimal integer off `text`.
fn split_integer(text: &str) -> Option<(i64, &str)>
{
    let sign_len = usize::from(text.starts_with(['-', '+']));
    let digits = text[sign_len..].bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let (number, rest) = text.split_at(sign_len + digits);
    number.parse().ok().map(|value| (value, rest))
}
