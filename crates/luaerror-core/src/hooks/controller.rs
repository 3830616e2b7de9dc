//! The three toggles exposed to scripts.
//!
//! - server error relay: a machine-code detour on the function that handles
//!   errors reported by remote clients, located by signature when enabled;
//! - runtime capture: the reporter detour plus the callback substitution;
//! - compile-time capture: the callback substitution only.
//!
//! Turning a switch on twice or off twice is a successful no-op. Turning a
//! switch off never fails.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use super::{CaptureSwitch, HookHandle, HookId, HookTable, SharedSubstitution};
use crate::bridge::BridgeSlot;
use crate::error::{HookError, Result};
use crate::symbols::{Signature, SymbolResolver};
use crate::types::Address;

const RELAY_LABEL: &str = "client-relay";
const REPORTER_LABEL: &str = "runtime-reporter";

/// Where the relay detour goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayTarget
{
    /// Logical name, used in failure messages.
    pub symbol: String,
    /// Image the function lives in.
    pub image: PathBuf,
    /// How to find it; `None` when the platform has no known signature.
    pub signature: Option<Signature>,
    /// Replacement entry point.
    pub replacement: Address,
}

/// Owns every interception and the state of the three switches.
pub struct HookController
{
    table: HookTable,
    resolver: Arc<dyn SymbolResolver>,
    relay: RelayTarget,
    relay_address: OnceCell<Address>,
    relay_hook: Mutex<Option<HookId>>,
    reporter_hook: HookId,
    substitution: SharedSubstitution,
    bridge: Arc<BridgeSlot>,
}

impl HookController
{
    /// Controller over `table`. The reporter detour is created here, disabled.
    ///
    /// # Errors
    ///
    /// Returns the interception primitive's error when the reporter cannot be
    /// hooked; nothing is left in `table` in that case.
    pub fn new(
        table: HookTable,
        resolver: Arc<dyn SymbolResolver>,
        relay: RelayTarget,
        reporter: Address,
        reporter_replacement: Address,
        substitution: SharedSubstitution,
        bridge: Arc<BridgeSlot>,
    ) -> Result<Self>
    {
        let reporter_hook = table.create(REPORTER_LABEL, reporter, reporter_replacement)?;
        Ok(Self {
            table,
            resolver,
            relay,
            relay_address: OnceCell::new(),
            relay_hook: Mutex::new(None),
            reporter_hook,
            substitution,
            bridge,
        })
    }

    fn relay_hook(&self) -> MutexGuard<'_, Option<HookId>>
    {
        self.relay_hook.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Turn the client error relay on or off.
    ///
    /// # Errors
    ///
    /// Enabling fails when the target cannot be located or the primitive
    /// refuses it. No detour is left behind on failure. Disabling never fails.
    pub fn set_server_error_relay(&self, enabled: bool) -> Result<bool>
    {
        let mut slot = self.relay_hook();
        if !enabled {
            if let Some(id) = slot.take() {
                self.table.remove(id);
                info!("client error relay disabled");
            }
            return Ok(true);
        }
        if slot.is_some() {
            return Ok(true);
        }

        let target = self.locate_relay()?;
        let id = self.table.create(RELAY_LABEL, target, self.relay.replacement)?;
        if let Err(err) = self.table.enable(id) {
            self.table.remove(id);
            return Err(err);
        }
        *slot = Some(id);
        info!(%target, "client error relay enabled");
        Ok(true)
    }

    /// Address of the relay target. A successful scan is remembered; a
    /// failed one is retried on the next enable.
    fn locate_relay(&self) -> Result<Address>
    {
        self.relay_address
            .get_or_try_init(|| {
                let not_found = || HookError::SignatureNotFound {
                    symbol: self.relay.symbol.clone(),
                    image: self.relay.image.display().to_string(),
                };
                let signature = self.relay.signature.as_ref().ok_or_else(not_found)?;
                let target = self.resolver.resolve(&self.relay.image, signature).ok_or_else(not_found)?;
                debug!(symbol = %self.relay.symbol, %target, "located relay target");
                Ok(target)
            })
            .copied()
    }

    /// Turn runtime capture on or off.
    ///
    /// Returns `false` only when the reporter detour could not be activated;
    /// the switch stays off in that case.
    pub fn set_runtime_capture(&self, enabled: bool) -> bool
    {
        if enabled {
            if self.substitution.is_held(CaptureSwitch::Runtime) {
                return true;
            }
            if let Err(err) = self.table.enable(self.reporter_hook) {
                warn!("failed to enable runtime error reporter hook: {err}");
                return false;
            }
            self.substitution.acquire(CaptureSwitch::Runtime);
            info!("runtime error capture enabled");
            return true;
        }

        if self.substitution.release(CaptureSwitch::Runtime) {
            if let Err(err) = self.table.disable(self.reporter_hook) {
                warn!("failed to disable runtime error reporter hook: {err}");
            }
            self.bridge.clear();
            info!("runtime error capture disabled");
        }
        true
    }

    /// Turn compile-time capture on or off.
    pub fn set_compile_capture(&self, enabled: bool) -> bool
    {
        let changed = if enabled {
            self.substitution.acquire(CaptureSwitch::Compile)
        } else {
            self.substitution.release(CaptureSwitch::Compile)
        };
        if changed {
            info!(enabled, "compile-time error capture toggled");
        }
        true
    }

    /// Whether the relay detour is installed.
    pub fn relay_enabled(&self) -> bool
    {
        self.relay_hook().is_some()
    }

    /// Whether `switch` is on.
    pub fn capture_enabled(&self, switch: CaptureSwitch) -> bool
    {
        self.substitution.is_held(switch)
    }

    /// Entry point running the original client error handler.
    pub fn relay_trampoline(&self) -> Option<Address>
    {
        let id = (*self.relay_hook())?;
        self.table.info(id).map(|handle| handle.trampoline)
    }

    /// Entry point running the original runtime error reporter.
    pub fn reporter_trampoline(&self) -> Option<Address>
    {
        self.table.info(self.reporter_hook).map(|handle| handle.trampoline)
    }

    /// Every tracked detour.
    pub fn hooks(&self) -> Vec<HookHandle>
    {
        self.table.list()
    }

    /// Number of detours currently redirecting calls.
    pub fn active_hooks(&self) -> usize
    {
        self.table.active_count()
    }

    /// Whether the callback wrapper is installed.
    pub fn substitution_installed(&self) -> bool
    {
        self.substitution.is_installed()
    }

    /// Undo everything regardless of switch state.
    ///
    /// Safe to call more than once.
    pub fn teardown(&self)
    {
        self.substitution.reset();
        self.relay_hook().take();
        self.table.clear();
        self.bridge.clear();
        debug!("hooks torn down");
    }
}

impl std::fmt::Debug for HookController
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("HookController")
            .field("relay", &self.relay)
            .field("table", &self.table)
            .field("substitution", &self.substitution)
            .finish_non_exhaustive()
    }
}
