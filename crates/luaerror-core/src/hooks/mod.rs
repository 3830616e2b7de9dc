//! Interception bookkeeping.
//!
//! The low-level function-interception primitive (the thing that actually
//! rewrites a prologue and builds a trampoline) belongs to the embedder and
//! is reached through [`Interceptor`]. This module tracks what was asked of
//! it: which targets are hooked, where their trampolines live and whether
//! each detour is currently active.

pub mod controller;
pub mod delegate;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use tracing::{debug, warn};

pub use controller::{HookController, RelayTarget};
pub use delegate::{CaptureSwitch, DelegateHost, ErrorDelegate, SharedSubstitution, SwitchSet};

use crate::error::{HookError, Result};
use crate::types::Address;

/// Function-interception primitive supplied by the embedder.
///
/// Detours are created disabled, toggled with `enable`/`disable` and finally
/// released with `destroy`.
pub trait Interceptor
{
    /// Prepare a detour from `target` to `replacement` and return the address
    /// of the trampoline that runs the original code.
    ///
    /// # Errors
    ///
    /// Returns an error when the target cannot be patched (already hooked,
    /// non-writable, unsupported prologue).
    fn create(&self, target: Address, replacement: Address) -> Result<Address>;

    /// Redirect calls of `target` to its replacement.
    ///
    /// # Errors
    ///
    /// Returns an error when the patch cannot be written.
    fn enable(&self, target: Address) -> Result<()>;

    /// Restore the original entry of `target`, keeping the trampoline.
    ///
    /// # Errors
    ///
    /// Returns an error when the original bytes cannot be written back.
    fn disable(&self, target: Address) -> Result<()>;

    /// Release every resource held for `target`.
    ///
    /// # Errors
    ///
    /// Returns an error when the primitive has no detour for `target`.
    fn destroy(&self, target: Address) -> Result<()>;
}

/// Unique identifier for a hook tracked by a [`HookTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

impl HookId
{
    /// Create a new identifier from a raw value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self
    {
        Self(value)
    }

    /// Get the raw numeric representation (useful for logging / errors).
    #[must_use]
    pub const fn raw(self) -> u64
    {
        self.0
    }
}

/// One installed interception.
#[derive(Debug, Clone)]
pub struct HookHandle
{
    /// Identifier inside the owning table.
    pub id: HookId,
    /// Short name used in logs (`runtime-reporter`, `client-relay`, ...).
    pub label: &'static str,
    /// Patched function.
    pub target: Address,
    /// Entry point that runs the original code.
    pub trampoline: Address,
    /// Function calls are redirected to.
    pub replacement: Address,
    /// Whether calls are currently redirected.
    pub active: bool,
    /// When the detour was created.
    pub created_at: SystemTime,
}

/// Hook records indexed by id and by target address.
///
/// At most one record exists per target address.
#[derive(Debug, Default)]
pub struct HookStore
{
    next_id: u64,
    by_id: HashMap<HookId, HookHandle>,
    by_target: HashMap<Address, HookId>,
}

impl HookStore
{
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    fn allocate_id(&mut self) -> HookId
    {
        self.next_id = self.next_id.wrapping_add(1);
        HookId::from_raw(self.next_id)
    }

    /// Track a freshly created hook and return its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::AlreadyHooked`] when the target is already tracked.
    pub fn insert(&mut self, label: &'static str, target: Address, trampoline: Address, replacement: Address)
        -> Result<HookId>
    {
        if self.by_target.contains_key(&target) {
            return Err(HookError::AlreadyHooked(target));
        }
        let id = self.allocate_id();
        self.by_target.insert(target, id);
        self.by_id.insert(
            id,
            HookHandle {
                id,
                label,
                target,
                trampoline,
                replacement,
                active: false,
                created_at: SystemTime::now(),
            },
        );
        Ok(id)
    }

    /// Retrieve a hook by id.
    pub fn get(&self, id: HookId) -> Option<&HookHandle>
    {
        self.by_id.get(&id)
    }

    /// Retrieve a mutable hook by id.
    pub fn get_mut(&mut self, id: HookId) -> Option<&mut HookHandle>
    {
        self.by_id.get_mut(&id)
    }

    /// Identifier of the hook on `target`, if any.
    pub fn id_for_target(&self, target: Address) -> Option<HookId>
    {
        self.by_target.get(&target).copied()
    }

    /// Stop tracking a hook, returning its record if it was present.
    pub fn remove(&mut self, id: HookId) -> Option<HookHandle>
    {
        let handle = self.by_id.remove(&id)?;
        self.by_target.remove(&handle.target);
        Some(handle)
    }

    /// Snapshot of every tracked hook.
    pub fn list(&self) -> Vec<HookHandle>
    {
        self.by_id.values().cloned().collect()
    }

    /// Number of hooks currently redirecting calls.
    pub fn active_count(&self) -> usize
    {
        self.by_id.values().filter(|handle| handle.active).count()
    }

    /// Empty the store, returning every record.
    pub fn drain(&mut self) -> Vec<HookHandle>
    {
        self.by_target.clear();
        self.by_id.drain().map(|(_, handle)| handle).collect()
    }
}

/// [`Interceptor`] paired with the records of what it installed.
pub struct HookTable
{
    interceptor: Arc<dyn Interceptor>,
    store: Mutex<HookStore>,
}

impl HookTable
{
    /// Table driving `interceptor`.
    pub fn new(interceptor: Arc<dyn Interceptor>) -> Self
    {
        Self {
            interceptor,
            store: Mutex::new(HookStore::new()),
        }
    }

    fn store(&self) -> std::sync::MutexGuard<'_, HookStore>
    {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a disabled detour from `target` to `replacement`.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::AlreadyHooked`] if `target` is tracked, or the
    /// primitive's error if it refuses the target. Nothing is tracked on error.
    pub fn create(&self, label: &'static str, target: Address, replacement: Address) -> Result<HookId>
    {
        if target.is_null() {
            return Err(HookError::InvalidArgument(format!("{label} target is null")));
        }
        let mut store = self.store();
        if store.id_for_target(target).is_some() {
            return Err(HookError::AlreadyHooked(target));
        }
        let trampoline = self.interceptor.create(target, replacement)?;
        let id = store.insert(label, target, trampoline, replacement)?;
        debug!(hook = label, %target, %trampoline, "created detour");
        Ok(id)
    }

    /// Activate a hook. Activating an active hook does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::HookIdNotFound`] for unknown ids or the primitive's error.
    pub fn enable(&self, id: HookId) -> Result<()>
    {
        let mut store = self.store();
        let handle = store.get_mut(id).ok_or(HookError::HookIdNotFound(id.raw()))?;
        if handle.active {
            return Ok(());
        }
        self.interceptor.enable(handle.target)?;
        handle.active = true;
        debug!(hook = handle.label, target = %handle.target, "enabled detour");
        Ok(())
    }

    /// Deactivate a hook. Deactivating an inactive hook does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::HookIdNotFound`] for unknown ids or the primitive's error.
    pub fn disable(&self, id: HookId) -> Result<()>
    {
        let mut store = self.store();
        let handle = store.get_mut(id).ok_or(HookError::HookIdNotFound(id.raw()))?;
        if !handle.active {
            return Ok(());
        }
        self.interceptor.disable(handle.target)?;
        handle.active = false;
        debug!(hook = handle.label, target = %handle.target, "disabled detour");
        Ok(())
    }

    /// Disable (if needed) and destroy a hook, forgetting it even when the
    /// primitive complains.
    pub fn remove(&self, id: HookId)
    {
        let Some(handle) = self.store().remove(id) else {
            return;
        };
        release(self.interceptor.as_ref(), &handle);
    }

    /// Remove every hook.
    pub fn clear(&self)
    {
        let handles = self.store().drain();
        for handle in &handles {
            release(self.interceptor.as_ref(), handle);
        }
    }

    /// Record of a hook.
    pub fn info(&self, id: HookId) -> Option<HookHandle>
    {
        self.store().get(id).cloned()
    }

    /// Snapshot of every tracked hook.
    pub fn list(&self) -> Vec<HookHandle>
    {
        self.store().list()
    }

    /// Number of hooks currently redirecting calls.
    pub fn active_count(&self) -> usize
    {
        self.store().active_count()
    }
}

fn release(interceptor: &dyn Interceptor, handle: &HookHandle)
{
    if handle.active {
        if let Err(err) = interceptor.disable(handle.target) {
            warn!(hook = handle.label, target = %handle.target, "failed to disable detour: {err}");
        }
    }
    if let Err(err) = interceptor.destroy(handle.target) {
        warn!(hook = handle.label, target = %handle.target, "failed to destroy detour: {err}");
    }
    debug!(hook = handle.label, target = %handle.target, "removed detour");
}

impl std::fmt::Debug for HookTable
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("HookTable").field("store", &*self.store()).finish()
    }
}
