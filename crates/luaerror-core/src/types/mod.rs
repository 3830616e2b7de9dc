//! # Types
//!
//! Plain data shared by the hooks, the capture code, the parser and the
//! dispatcher. Nothing in here talks to the host.

pub mod address;
pub mod event;
pub mod stack;
pub mod value;

// Re-export all public types
pub use address::Address;
pub use event::{AttributionRecord, DispatchOutcome, ErrorEvent, ErrorOrigin, ParsedError, StackTrace, SubjectId};
pub use stack::{FunctionInfo, NamedSlot, SlotMap, StackFrame, TracebackEntry};
pub use value::ScriptValue;
