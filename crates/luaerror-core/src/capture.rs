//! # Stack capture
//!
//! Builds a snapshot of the running script's call stack from the runtime's
//! debug interface. Every query in [`Introspection`] is indexed and returns
//! `None` as its end-of-list sentinel, exactly like the runtime's own
//! `getstack` / `getlocal` / `getupvalue` family.

use tracing::trace;

use crate::types::{FunctionInfo, NamedSlot, ScriptValue, SlotMap, StackFrame};

/// Slot returned by the runtime for one local or upvalue index.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSlot
{
    /// Name as reported; may be empty or a placeholder.
    pub name: String,
    /// Value of the slot.
    pub value: ScriptValue,
}

impl RawSlot
{
    /// Create a slot.
    pub fn new(name: impl Into<String>, value: ScriptValue) -> Self
    {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// The runtime's stack introspection surface.
///
/// `level` is 0-based (0 = the innermost active function), slot indices are
/// 1-based, mirroring the runtime's debug API.
pub trait Introspection
{
    /// Debug record of the function active at `level`, or `None` past the
    /// outermost frame.
    fn frame(&self, level: usize) -> Option<FunctionInfo>;

    /// Local number `index` of the frame at `level`, or `None` past the last.
    fn local(&self, level: usize, index: usize) -> Option<RawSlot>;

    /// Upvalue number `index` of the function at `level`, or `None` past the last.
    fn upvalue(&self, level: usize, index: usize) -> Option<RawSlot>;
}

/// Locals whose name starts with `(` are runtime temporaries (`(*temporary)`,
/// `(for index)`, ...).
fn is_placeholder_local(name: &str) -> bool
{
    name.is_empty() || name.starts_with('(')
}

/// Upvalues of native functions have empty names.
fn is_placeholder_upvalue(name: &str) -> bool
{
    name.is_empty()
}

/// Capture every frame of the current stack, innermost first.
pub fn capture_stack<I: Introspection + ?Sized>(runtime: &I) -> Vec<StackFrame>
{
    let mut frames = Vec::new();
    let mut level = 0;
    while let Some(function) = runtime.frame(level) {
        let upvalues = collect_slots(|index| runtime.upvalue(level, index), is_placeholder_upvalue);
        let locals = collect_slots(|index| runtime.local(level, index), is_placeholder_local);
        level += 1;
        frames.push(StackFrame {
            level,
            function,
            locals,
            upvalues,
        });
    }
    trace!(frames = frames.len(), "captured script stack");
    frames
}

/// Enumerate slots from index 1 until the runtime reports the end, keeping
/// named ones. Returns `None` when no slot survives the filter.
fn collect_slots<F, P>(mut slot_at: F, is_placeholder: P) -> Option<SlotMap>
where
    F: FnMut(usize) -> Option<RawSlot>,
    P: Fn(&str) -> bool,
{
    let mut slots = SlotMap::new();
    let mut index = 1;
    while let Some(slot) = slot_at(index) {
        if !is_placeholder(&slot.name) {
            slots.push(NamedSlot {
                name: slot.name,
                value: slot.value,
            });
        }
        index += 1;
    }
    (!slots.is_empty()).then_some(slots)
}
