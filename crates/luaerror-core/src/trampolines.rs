//! # Trampolines
//!
//! The code that runs in place of each intercepted host function. Each one
//! does its work and then runs the host's original behaviour through a
//! closure, unless a subscriber suppressed it. Any internal problem (no
//! subscribers, no registry, payload that cannot be built) falls back to the
//! original; an error is never dropped.
//!
//! | intercepted                  | replacement                          | event            |
//! |------------------------------|--------------------------------------|------------------|
//! | runtime error reporter       | [`RuntimeErrorReporter::on_report`]  | (none, bridges)  |
//! | callback object `lua_error`  | [`CapturingDelegate`]                | `LuaError`       |
//! | client error handler         | [`ClientErrorRelay::on_client_error`]| `ClientLuaError` |

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::attribution::AttributionResolver;
use crate::bridge::{BridgeSlot, RuntimeErrorContext};
use crate::capture::{capture_stack, Introspection};
use crate::dispatch::EventDispatcher;
use crate::hooks::{CaptureSwitch, ErrorDelegate, SwitchSet};
use crate::parser::{parse_error_line, ErrorParser};
use crate::types::{AttributionRecord, ErrorEvent, ErrorOrigin, ParsedError, StackTrace, SubjectId};

fn attribute(attribution: Option<&AttributionResolver>, parsed: Option<&ParsedError>) -> Option<AttributionRecord>
{
    attribution?.attribute(&parsed?.source_file)
}

/// Replacement for the runtime error reporter.
///
/// Runs while the failing frames are still on the stack, so this is where
/// runtime errors get their stack.
pub struct RuntimeErrorReporter
{
    bridge: Arc<BridgeSlot>,
    runtime: Arc<dyn Introspection>,
}

impl RuntimeErrorReporter
{
    /// Reporter recording into `bridge` using `runtime` to walk the stack.
    pub fn new(bridge: Arc<BridgeSlot>, runtime: Arc<dyn Introspection>) -> Self
    {
        Self { bridge, runtime }
    }

    /// Capture the stack, record it for delivery, then run `original`.
    pub fn on_report<R, F>(&self, message: Option<&str>, original: F) -> R
    where
        F: FnOnce() -> R,
    {
        let stack = capture_stack(self.runtime.as_ref());
        trace!(frames = stack.len(), "runtime error reported");
        self.bridge.set(RuntimeErrorContext {
            message: message.unwrap_or_default().to_string(),
            stack,
        });
        original()
    }
}

impl fmt::Debug for RuntimeErrorReporter
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("RuntimeErrorReporter")
            .field("bridge", &self.bridge)
            .finish_non_exhaustive()
    }
}

/// Wrapper installed in place of the host's callback object.
///
/// Everything is forwarded to the wrapped object; `lua_error` is first
/// turned into an event.
pub struct CapturingDelegate
{
    inner: Arc<dyn ErrorDelegate>,
    switches: Arc<SwitchSet>,
    bridge: Arc<BridgeSlot>,
    runtime: Arc<dyn Introspection>,
    dispatcher: EventDispatcher,
    attribution: Option<AttributionResolver>,
    event_name: String,
    filter_by_switch: bool,
}

impl CapturingDelegate
{
    /// Wrap `inner`.
    ///
    /// `switches` must be the set the wrapper's substitution records into.
    pub fn new(
        inner: Arc<dyn ErrorDelegate>,
        switches: Arc<SwitchSet>,
        bridge: Arc<BridgeSlot>,
        runtime: Arc<dyn Introspection>,
        dispatcher: EventDispatcher,
        attribution: Option<AttributionResolver>,
        event_name: impl Into<String>,
    ) -> Self
    {
        Self {
            inner,
            switches,
            bridge,
            runtime,
            dispatcher,
            attribution,
            event_name: event_name.into(),
            filter_by_switch: false,
        }
    }

    /// Only dispatch errors whose capture switch is on.
    ///
    /// Off by default: once the wrapper is installed every delivery is
    /// dispatched, whichever switch installed it.
    #[must_use]
    pub fn filter_by_switch(mut self, enabled: bool) -> Self
    {
        self.filter_by_switch = enabled;
        self
    }

    /// Event built for a delivered error, or `None` when switch filtering is
    /// on and the error's class is switched off.
    ///
    /// A runtime error is described by the text and stack the reporter
    /// recorded. `delivered` is used for compile-time errors and for reports
    /// that carried no text.
    fn build_event(&self, delivered: &str, context: Option<RuntimeErrorContext>) -> Option<ErrorEvent>
    {
        let origin = if context.is_some() {
            ErrorOrigin::Runtime
        } else {
            ErrorOrigin::CompileTime
        };
        let switch = match origin {
            ErrorOrigin::Runtime => CaptureSwitch::Runtime,
            ErrorOrigin::CompileTime => CaptureSwitch::Compile,
        };
        if self.filter_by_switch && !self.switches.is_on(switch) {
            return None;
        }

        // Compile errors never pass through the reporter; the loader's stack
        // is still live here.
        let (raw_message, frames) = match context {
            Some(context) if context.message.is_empty() => (delivered.to_string(), context.stack),
            Some(context) => (context.message, context.stack),
            None => (delivered.to_string(), capture_stack(self.runtime.as_ref())),
        };
        let (parsed, _) = parse_error_line(&raw_message);
        let attribution = attribute(self.attribution.as_ref(), parsed.as_ref());
        Some(ErrorEvent {
            raw_message,
            parsed,
            origin,
            stack: StackTrace::Frames(frames),
            subject: None,
            attribution,
        })
    }
}

impl ErrorDelegate for CapturingDelegate
{
    fn lua_error(&self, message: &str)
    {
        // Taken unconditionally so it never outlives this error.
        let context = self.bridge.take();
        if !self.dispatcher.has_subscribers(&self.event_name) {
            self.inner.lua_error(message);
            return;
        }
        let Some(event) = self.build_event(message, context) else {
            self.inner.lua_error(message);
            return;
        };
        debug!(origin = %event.origin, "dispatching {}", self.event_name);
        self.dispatcher
            .dispatch_or_else(&self.event_name, &event, || self.inner.lua_error(message));
    }

    fn error_print(&self, message: &str, print: bool)
    {
        self.inner.error_print(message, print);
    }

    fn msg(&self, message: &str)
    {
        self.inner.msg(message);
    }
}

impl fmt::Debug for CapturingDelegate
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("CapturingDelegate")
            .field("event_name", &self.event_name)
            .field("switches", &self.switches)
            .field("filter_by_switch", &self.filter_by_switch)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

/// Replacement for the server's handler of errors reported by clients.
#[derive(Debug, Clone)]
pub struct ClientErrorRelay
{
    dispatcher: EventDispatcher,
    parser: ErrorParser,
    attribution: Option<AttributionResolver>,
    event_name: String,
}

impl ClientErrorRelay
{
    /// Relay dispatching `event_name`.
    pub fn new(
        dispatcher: EventDispatcher,
        parser: ErrorParser,
        attribution: Option<AttributionResolver>,
        event_name: impl Into<String>,
    ) -> Self
    {
        Self {
            dispatcher,
            parser,
            attribution,
            event_name: event_name.into(),
        }
    }

    /// Event for an error text sent by the client `subject`.
    pub fn build_event(&self, subject: SubjectId, error: &str) -> ErrorEvent
    {
        let cleaned = self.parser.strip_tag(error.trim());
        let decoded = self.parser.decode(cleaned);
        let attribution = attribute(self.attribution.as_ref(), decoded.parsed.as_ref());
        ErrorEvent {
            raw_message: cleaned.to_string(),
            parsed: decoded.parsed,
            origin: ErrorOrigin::Runtime,
            stack: StackTrace::Traceback(decoded.traceback),
            subject: Some(subject),
            attribution,
        }
    }

    /// Dispatch the relayed error, then run `original` unless suppressed.
    ///
    /// `subject` is `None` when the host could not say which client sent the
    /// error; the original then runs without a dispatch. Returns `original`'s
    /// result when it ran.
    pub fn on_client_error<R, F>(&self, subject: impl Into<Option<SubjectId>>, error: &str, original: F) -> Option<R>
    where
        F: FnOnce() -> R,
    {
        if !self.dispatcher.has_subscribers(&self.event_name) {
            return Some(original());
        }
        let Some(subject) = subject.into() else {
            warn!("[{}] unable to resolve the reporting client", self.event_name);
            return Some(original());
        };
        let event = self.build_event(subject, error);
        debug!(subject = subject.0, "dispatching {}", self.event_name);
        self.dispatcher.dispatch_or_else(&self.event_name, &event, original)
    }
}
