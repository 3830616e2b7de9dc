//! Common module for library exports

pub use crate::attribution::{AttributionResolver, ContentRegistry};
pub use crate::capture::{Introspection, RawSlot};
pub use crate::config::HookConfig;
pub use crate::dispatch::{EventDispatcher, PayloadArg, SubscriberHost};
pub use crate::error::{HookError, Result};
pub use crate::hooks::{CaptureSwitch, DelegateHost, ErrorDelegate, Interceptor};
pub use crate::lifecycle::{ErrorHooks, HostBindings, ToggleOutcome};
pub use crate::symbols::{Signature, SymbolResolver};
pub use crate::types::{
    Address, AttributionRecord, DispatchOutcome, ErrorEvent, ErrorOrigin, FunctionInfo, ScriptValue, StackTrace,
    SubjectId,
};
