//! Error event types handed to subscribers.

use std::fmt;

use super::{StackFrame, TracebackEntry};

/// Where an intercepted error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorOrigin
{
    /// Raised while running script code.
    Runtime,
    /// Raised while loading or compiling a chunk.
    CompileTime,
}

impl fmt::Display for ErrorOrigin
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            ErrorOrigin::Runtime => f.write_str("runtime"),
            ErrorOrigin::CompileTime => f.write_str("compile-time"),
        }
    }
}

/// The `<source_file>:<line>: <message>` triple decoded from an error.
///
/// Either all three fields exist or the whole value is absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedError
{
    /// Source file named by the error.
    pub source_file: String,
    /// Line in `source_file`.
    pub line: i64,
    /// Error message without the location prefix.
    pub message: String,
}

/// Integer actor reference of the entity an error is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubjectId(pub i64);

impl From<i64> for SubjectId
{
    fn from(value: i64) -> Self
    {
        SubjectId(value)
    }
}

/// Content package that owns a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributionRecord
{
    /// Package title.
    pub title: String,
    /// Numeric package identifier.
    pub id: u64,
}

/// Stack attached to an event.
///
/// Local errors carry frames captured through introspection. Relayed errors
/// only carry what the remote side printed into the message.
#[derive(Debug, Clone, PartialEq)]
pub enum StackTrace
{
    /// Frames captured innermost-first.
    Frames(Vec<StackFrame>),
    /// Entries parsed out of the message text.
    Traceback(Vec<TracebackEntry>),
}

impl StackTrace
{
    /// Number of frames or traceback entries.
    pub fn len(&self) -> usize
    {
        match self {
            StackTrace::Frames(frames) => frames.len(),
            StackTrace::Traceback(entries) => entries.len(),
        }
    }

    /// `true` when there are no frames or entries.
    pub fn is_empty(&self) -> bool
    {
        self.len() == 0
    }
}

/// One intercepted error, built at interception time and consumed by the
/// dispatcher within the same call.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorEvent
{
    /// Message exactly as delivered to subscribers.
    pub raw_message: String,
    /// Decoded location triple, if the message followed the grammar.
    pub parsed: Option<ParsedError>,
    /// Runtime or compile-time.
    pub origin: ErrorOrigin,
    /// Captured or parsed stack.
    pub stack: StackTrace,
    /// Entity the error is about, when known.
    pub subject: Option<SubjectId>,
    /// Owning content package of `parsed.source_file`.
    pub attribution: Option<AttributionRecord>,
}

/// Result of one dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchOutcome
{
    /// Nobody is listening (or the payload could not be built).
    NoSubscribers,
    /// A subscriber voted to skip the host's default handling.
    Suppressed,
    /// Subscribers ran and did not suppress.
    Proceed,
}

impl DispatchOutcome
{
    /// Whether the host's default handling must still run.
    pub const fn runs_default(self) -> bool
    {
        !matches!(self, DispatchOutcome::Suppressed)
    }
}
