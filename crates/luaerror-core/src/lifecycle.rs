//! # Lifecycle
//!
//! [`ErrorHooks`] is what the embedder holds between module load and unload.
//! [`ErrorHooks::initialize`] checks every host capability first and only
//! then creates anything, so a failed setup leaves the host untouched.
//! [`ErrorHooks::deinitialize`] (also run on drop) reverses every
//! installation regardless of which switches are recorded as on.

use std::sync::Arc;

use tracing::{debug, info};

use crate::attribution::{AttributionResolver, ContentRegistry};
use crate::bridge::BridgeSlot;
use crate::capture::Introspection;
use crate::config::HookConfig;
use crate::dispatch::{EventDispatcher, SubscriberHost};
use crate::error::{HookError, Result};
use crate::hooks::{
    CaptureSwitch, DelegateHost, HookController, HookTable, Interceptor, RelayTarget, SharedSubstitution, SwitchSet,
};
use crate::parser::ErrorParser;
use crate::symbols::SymbolResolver;
use crate::trampolines::{CapturingDelegate, ClientErrorRelay, RuntimeErrorReporter};
use crate::types::{Address, SubjectId};

/// Host capabilities handed over at load time.
pub struct HostBindings
{
    /// Machine-code interception primitive.
    pub interceptor: Arc<dyn Interceptor>,
    /// Signature scanner for the relay target.
    pub resolver: Arc<dyn SymbolResolver>,
    /// Owner of the error callback object.
    pub delegates: Arc<dyn DelegateHost>,
    /// Stack introspection of the script runtime.
    pub runtime: Arc<dyn Introspection>,
    /// Subscriber table; `None` makes every dispatch a no-op.
    pub subscribers: Option<Arc<dyn SubscriberHost>>,
    /// Content-package registry.
    pub registry: Option<Arc<dyn ContentRegistry>>,
    /// Address of the runtime error reporter.
    pub reporter: Option<Address>,
    /// Entry point replacing the reporter.
    pub reporter_replacement: Address,
    /// Entry point replacing the client error handler.
    pub relay_replacement: Address,
}

impl std::fmt::Debug for HostBindings
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("HostBindings")
            .field("subscribers", &self.subscribers.is_some())
            .field("registry", &self.registry.is_some())
            .field("reporter", &self.reporter)
            .field("reporter_replacement", &self.reporter_replacement)
            .field("relay_replacement", &self.relay_replacement)
            .finish_non_exhaustive()
    }
}

/// Result of a toggle as seen by scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome
{
    /// The toggle went through.
    Done(bool),
    /// Installation failed for the given reason.
    Failed(String),
}

impl ToggleOutcome
{
    /// `(value, nil)` on success and `(nil, reason)` on failure.
    pub fn into_pair(self) -> (Option<bool>, Option<String>)
    {
        match self {
            ToggleOutcome::Done(value) => (Some(value), None),
            ToggleOutcome::Failed(reason) => (None, Some(reason)),
        }
    }
}

impl From<Result<bool>> for ToggleOutcome
{
    fn from(result: Result<bool>) -> Self
    {
        match result {
            Ok(value) => ToggleOutcome::Done(value),
            Err(err) => ToggleOutcome::Failed(err.to_string()),
        }
    }
}

impl From<bool> for ToggleOutcome
{
    fn from(value: bool) -> Self
    {
        ToggleOutcome::Done(value)
    }
}

/// Every hook of the module, from load to unload.
#[derive(Debug)]
pub struct ErrorHooks
{
    controller: Option<HookController>,
    reporter: RuntimeErrorReporter,
    relay: ClientErrorRelay,
    attribution: AttributionResolver,
    config: HookConfig,
}

impl ErrorHooks
{
    /// Wire everything up with all switches off.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::MissingCapability`] when the registry, the
    /// reporter address or the current callback object is missing, or the
    /// primitive's error when the reporter cannot be hooked. Nothing is
    /// installed on error.
    pub fn initialize(bindings: HostBindings, config: HookConfig) -> Result<Self>
    {
        let HostBindings {
            interceptor,
            resolver,
            delegates,
            runtime,
            subscribers,
            registry,
            reporter,
            reporter_replacement,
            relay_replacement,
        } = bindings;

        let registry = registry.ok_or(HookError::MissingCapability("the content package registry"))?;
        let reporter_address = reporter.ok_or(HookError::MissingCapability("the runtime error reporter"))?;
        let original = delegates
            .current_delegate()
            .ok_or(HookError::MissingCapability("the error callback object"))?;

        let attribution = AttributionResolver::with_sentinel(registry, config.native_source.clone());
        let dispatcher = subscribers.map_or_else(EventDispatcher::detached, EventDispatcher::new);
        let bridge = Arc::new(BridgeSlot::new());
        let switches = Arc::new(SwitchSet::new());

        let wrapper = CapturingDelegate::new(
            Arc::clone(&original),
            Arc::clone(&switches),
            Arc::clone(&bridge),
            Arc::clone(&runtime),
            dispatcher.clone(),
            Some(attribution.clone()),
            config.runtime_event.clone(),
        )
        .filter_by_switch(config.filter_by_switch);
        let substitution = SharedSubstitution::with_switches(delegates, original, Arc::new(wrapper), switches);
        let relay_target = RelayTarget {
            symbol: config.relay_symbol.clone(),
            image: config.server_binary.clone(),
            signature: config.relay_signature.clone(),
            replacement: relay_replacement,
        };
        let controller = HookController::new(
            HookTable::new(interceptor),
            resolver,
            relay_target,
            reporter_address,
            reporter_replacement,
            substitution,
            Arc::clone(&bridge),
        )?;

        let relay = ClientErrorRelay::new(
            dispatcher,
            ErrorParser::new(config.error_tag.clone()),
            Some(attribution.clone()),
            config.client_event.clone(),
        );
        info!(flavor = %config.flavor, "error hooks initialized");
        Ok(Self {
            controller: Some(controller),
            reporter: RuntimeErrorReporter::new(bridge, runtime),
            relay,
            attribution,
            config,
        })
    }

    /// Settings the hooks were built with.
    pub fn config(&self) -> &HookConfig
    {
        &self.config
    }

    /// The switch owner, `None` after [`ErrorHooks::deinitialize`].
    pub fn controller(&self) -> Option<&HookController>
    {
        self.controller.as_ref()
    }

    /// Whether [`ErrorHooks::deinitialize`] has not run yet.
    pub fn is_initialized(&self) -> bool
    {
        self.controller.is_some()
    }

    /// Toggle the client error relay.
    ///
    /// # Errors
    ///
    /// Returns the install failure when enabling, or
    /// [`HookError::NotInitialized`] when enabling after teardown.
    pub fn set_server_error_relay(&self, enabled: bool) -> Result<bool>
    {
        match &self.controller {
            Some(controller) => controller.set_server_error_relay(enabled),
            None if enabled => Err(HookError::NotInitialized),
            None => Ok(true),
        }
    }

    /// Toggle runtime error capture.
    pub fn set_runtime_capture(&self, enabled: bool) -> bool
    {
        self.controller
            .as_ref()
            .map_or(!enabled, |controller| controller.set_runtime_capture(enabled))
    }

    /// Toggle compile-time error capture.
    pub fn set_compile_capture(&self, enabled: bool) -> bool
    {
        self.controller
            .as_ref()
            .map_or(!enabled, |controller| controller.set_compile_capture(enabled))
    }

    /// Whether `switch` is on.
    pub fn capture_enabled(&self, switch: CaptureSwitch) -> bool
    {
        self.controller
            .as_ref()
            .is_some_and(|controller| controller.capture_enabled(switch))
    }

    /// Package owning `path` as `(title, id)`.
    pub fn find_package_owner(&self, path: &str) -> Option<(String, String)>
    {
        self.attribution.owner_pair(path)
    }

    /// Body of the reporter replacement; `original` calls the trampoline.
    pub fn on_runtime_error<R, F>(&self, message: Option<&str>, original: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.reporter.on_report(message, original)
    }

    /// Body of the client error handler replacement; `original` calls the
    /// trampoline. `subject` is `None` when the reporting client is unknown.
    /// Returns `original`'s result when it ran.
    pub fn on_client_error<R, F>(&self, subject: impl Into<Option<SubjectId>>, error: &str, original: F) -> Option<R>
    where
        F: FnOnce() -> R,
    {
        self.relay.on_client_error(subject, error, original)
    }

    /// Trampoline of the runtime error reporter.
    pub fn reporter_trampoline(&self) -> Option<Address>
    {
        self.controller.as_ref()?.reporter_trampoline()
    }

    /// Trampoline of the client error handler, while the relay is on.
    pub fn relay_trampoline(&self) -> Option<Address>
    {
        self.controller.as_ref()?.relay_trampoline()
    }

    /// Remove every hook and restore the callback object.
    ///
    /// Calling it again does nothing.
    pub fn deinitialize(&mut self)
    {
        if let Some(controller) = self.controller.take() {
            controller.teardown();
            info!("error hooks deinitialized");
        } else {
            debug!("error hooks already deinitialized");
        }
    }
}

impl Drop for ErrorHooks
{
    fn drop(&mut self)
    {
        self.deinitialize();
    }
}
