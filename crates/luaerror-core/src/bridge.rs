//! Hand-off slot between the runtime error reporter and error delivery.
//!
//! When a script raises at runtime the host first calls its error reporter
//! (where the failing stack is still live) and only later delivers the
//! message through its callback object (where the stack is gone). The
//! reporter hook [`BridgeSlot::set`]s a [`RuntimeErrorContext`]; the delivery
//! hook [`BridgeSlot::take`]s it.
//!
//! Call-order precondition: while runtime capture is enabled, the reporter
//! fires strictly before delivery of the same error, on the same thread.
//! `take` clears the slot, so a context is consumed by at most one delivery
//! and never leaks into a later, unrelated error.

use std::sync::{Mutex, PoisonError};

use tracing::trace;

use crate::types::StackFrame;

/// State captured by the reporter for one runtime error.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeErrorContext
{
    /// Message the reporter was called with (empty when it had none).
    pub message: String,
    /// Stack captured while the failing frames were still active.
    pub stack: Vec<StackFrame>,
}

/// Single request-scoped slot holding at most one pending context.
#[derive(Debug, Default)]
pub struct BridgeSlot
{
    pending: Mutex<Option<RuntimeErrorContext>>,
}

impl BridgeSlot
{
    /// Create an empty slot.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Record the context for the error currently being reported.
    ///
    /// A context left over from an earlier error that was never delivered is
    /// replaced.
    pub fn set(&self, context: RuntimeErrorContext)
    {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if pending.is_some() {
            trace!("replacing undelivered runtime error context");
        }
        *pending = Some(context);
    }

    /// Remove and return the pending context.
    pub fn take(&self) -> Option<RuntimeErrorContext>
    {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    /// Drop any pending context.
    pub fn clear(&self)
    {
        drop(self.take());
    }

    /// Whether a context is waiting for delivery.
    pub fn is_pending(&self) -> bool
    {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }
}
