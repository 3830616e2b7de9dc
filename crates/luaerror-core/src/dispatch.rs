//! # Event dispatch
//!
//! Hands an [`ErrorEvent`] to the script-side subscribers and turns their
//! answer into a [`DispatchOutcome`].
//!
//! ## Payload order
//!
//! Subscribers receive positional arguments in this order, always nine of
//! them, with absent values passed as [`PayloadArg::Absent`]:
//!
//! 1. event name
//! 2. subject identity, or for local errors `true` when raised at runtime
//!    and `false` when raised while compiling
//! 3. raw message
//! 4. source file, 5. line, 6. message (all present or all absent)
//! 7. stack (captured frames or parsed traceback)
//! 8. package title, 9. package id (decimal string)
//!
//! ## Failure policy
//!
//! Only a literal `true` from the subscriber chain suppresses the host's own
//! handling. A missing registry, an empty subscriber list and a payload that
//! cannot be built all yield [`DispatchOutcome::NoSubscribers`]; a subscriber
//! that raises yields [`DispatchOutcome::Proceed`]. Either way the default
//! handling runs.

use std::borrow::Cow;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{HookError, Result};
use crate::types::{DispatchOutcome, ErrorEvent, ErrorOrigin, ScriptValue, StackTrace, SubjectId};

/// Number of positional arguments passed to subscribers.
pub const PAYLOAD_ARITY: usize = 9;

/// One positional argument of the subscriber payload.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadArg<'a>
{
    /// `nil` on the script side.
    Absent,
    /// String argument.
    Text(Cow<'a, str>),
    /// Integer argument.
    Integer(i64),
    /// Boolean argument.
    Boolean(bool),
    /// Value resolved by the host (the subject entity).
    Value(ScriptValue),
    /// Stack table.
    Stack(&'a StackTrace),
}

/// Host-maintained table of subscriber callables.
pub trait SubscriberHost
{
    /// Number of callables registered for `event`, or `None` when the table
    /// or the entry is missing or not callable.
    fn subscriber_count(&self, event: &str) -> Option<usize>;

    /// Turn an actor reference into the script-side entity value.
    ///
    /// # Errors
    ///
    /// Returns an error when the host cannot produce the value (for example
    /// the global entity constructor is missing).
    fn resolve_subject(&self, subject: SubjectId) -> Result<ScriptValue>;

    /// Run the subscriber chain with `args` and return its single result.
    ///
    /// # Errors
    ///
    /// Returns an error when a subscriber raised.
    fn call_subscribers(&self, args: &[PayloadArg<'_>]) -> Result<Option<ScriptValue>>;

    /// Print a non-fatal diagnostic to the host console.
    fn notice(&self, message: &str);
}

/// Positional payload built from one event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventPayload<'a>
{
    args: Vec<PayloadArg<'a>>,
}

impl<'a> EventPayload<'a>
{
    /// Build the payload for `event_name`, resolving the subject through `host`.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::PayloadAssembly`] when the subject cannot be resolved.
    pub fn assemble(host: &dyn SubscriberHost, event_name: &'a str, event: &'a ErrorEvent) -> Result<Self>
    {
        let subject = match event.subject {
            Some(subject) => PayloadArg::Value(
                host.resolve_subject(subject)
                    .map_err(|err| HookError::PayloadAssembly(err.to_string()))?,
            ),
            None => PayloadArg::Boolean(event.origin == ErrorOrigin::Runtime),
        };

        let mut args = Vec::with_capacity(PAYLOAD_ARITY);
        args.push(PayloadArg::Text(Cow::Borrowed(event_name)));
        args.push(subject);
        args.push(PayloadArg::Text(Cow::Borrowed(event.raw_message.as_str())));
        match &event.parsed {
            Some(parsed) => {
                args.push(PayloadArg::Text(Cow::Borrowed(parsed.source_file.as_str())));
                args.push(PayloadArg::Integer(parsed.line));
                args.push(PayloadArg::Text(Cow::Borrowed(parsed.message.as_str())));
            }
            None => args.extend([PayloadArg::Absent, PayloadArg::Absent, PayloadArg::Absent]),
        }
        args.push(PayloadArg::Stack(&event.stack));
        match &event.attribution {
            Some(record) => {
                args.push(PayloadArg::Text(Cow::Borrowed(record.title.as_str())));
                args.push(PayloadArg::Text(Cow::Owned(record.id.to_string())));
            }
            None => args.extend([PayloadArg::Absent, PayloadArg::Absent]),
        }

        Ok(Self { args })
    }

    /// Arguments in subscriber order.
    pub fn args(&self) -> &[PayloadArg<'a>]
    {
        &self.args
    }
}

/// Notifies subscribers and interprets their verdict.
#[derive(Clone, Default)]
pub struct EventDispatcher
{
    host: Option<Arc<dyn SubscriberHost>>,
}

impl EventDispatcher
{
    /// Dispatcher backed by the host's subscriber table.
    pub fn new(host: Arc<dyn SubscriberHost>) -> Self
    {
        Self { host: Some(host) }
    }

    /// Dispatcher with no subscriber table; every dispatch is a no-op.
    pub fn detached() -> Self
    {
        Self { host: None }
    }

    /// Whether anything is listening for `event_name`.
    ///
    /// Trampolines call this before doing any capture or parsing work.
    pub fn has_subscribers(&self, event_name: &str) -> bool
    {
        self.host
            .as_ref()
            .and_then(|host| host.subscriber_count(event_name))
            .is_some_and(|count| count > 0)
    }

    /// Deliver `event` to the subscribers of `event_name`.
    pub fn dispatch(&self, event_name: &str, event: &ErrorEvent) -> DispatchOutcome
    {
        let Some(host) = self.host.as_deref() else {
            return DispatchOutcome::NoSubscribers;
        };
        if !host.subscriber_count(event_name).is_some_and(|count| count > 0) {
            return DispatchOutcome::NoSubscribers;
        }

        let payload = match EventPayload::assemble(host, event_name, event) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(event = event_name, "{err}");
                host.notice(&format!("[{event_name}] {err}\n"));
                return DispatchOutcome::NoSubscribers;
            }
        };

        match host.call_subscribers(payload.args()) {
            Ok(Some(verdict)) if verdict.is_literal_true() => {
                debug!(event = event_name, "subscriber suppressed default handling");
                DispatchOutcome::Suppressed
            }
            Ok(_) => DispatchOutcome::Proceed,
            Err(err) => {
                warn!(event = event_name, "{err}");
                DispatchOutcome::Proceed
            }
        }
    }

    /// Deliver `event` and run `default` unless a subscriber suppressed it.
    ///
    /// Returns `default`'s result when it ran.
    pub fn dispatch_or_else<R, F>(&self, event_name: &str, event: &ErrorEvent, default: F) -> Option<R>
    where
        F: FnOnce() -> R,
    {
        self.dispatch(event_name, event).runs_default().then(default)
    }
}

impl std::fmt::Debug for EventDispatcher
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("EventDispatcher")
            .field("attached", &self.host.is_some())
            .finish()
    }
}
