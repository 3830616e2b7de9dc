//! Callback-object substitution.
//!
//! The host routes error delivery through a callback object it holds a
//! pointer to. Runtime capture and compile-time capture both work by swapping
//! that pointer for a wrapper that forwards to the original, so the two
//! switches share one substitution: it is installed when the first switch
//! turns on and removed when the last one turns off.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

/// The host's error callback object.
///
/// Only the methods the host uses on the error path are modelled; a wrapper
/// forwards all of them to the object it replaced.
pub trait ErrorDelegate
{
    /// Deliver a script error to the host's default handling.
    fn lua_error(&self, message: &str);

    /// Print an error line to the console.
    fn error_print(&self, message: &str, print: bool);

    /// Print a plain console message.
    fn msg(&self, message: &str);
}

/// Owner of the callback pointer.
pub trait DelegateHost
{
    /// Callback object currently installed.
    fn current_delegate(&self) -> Option<Arc<dyn ErrorDelegate>>;

    /// Install `delegate` as the callback object.
    fn set_delegate(&self, delegate: Arc<dyn ErrorDelegate>);
}

/// Independent switches sharing one substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureSwitch
{
    /// Runtime errors (paired with the reporter hook).
    Runtime,
    /// Errors raised while loading chunks.
    Compile,
}

impl CaptureSwitch
{
    const fn bit(self) -> u8
    {
        match self {
            CaptureSwitch::Runtime => 0b01,
            CaptureSwitch::Compile => 0b10,
        }
    }
}

impl fmt::Display for CaptureSwitch
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            CaptureSwitch::Runtime => f.write_str("runtime"),
            CaptureSwitch::Compile => f.write_str("compile-time"),
        }
    }
}

/// On/off state of the capture switches, shared between the substitution
/// and the wrapper it installs.
#[derive(Debug, Default)]
pub struct SwitchSet
{
    bits: Mutex<u8>,
}

impl SwitchSet
{
    /// All switches off.
    pub fn new() -> Self
    {
        Self::default()
    }

    fn bits(&self) -> MutexGuard<'_, u8>
    {
        self.bits.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether `switch` is on.
    pub fn is_on(&self, switch: CaptureSwitch) -> bool
    {
        *self.bits() & switch.bit() != 0
    }

    /// Whether any switch is on.
    pub fn any(&self) -> bool
    {
        *self.bits() != 0
    }

    /// Number of switches on.
    pub fn count(&self) -> u32
    {
        self.bits().count_ones()
    }
}

/// One substitution of the host's callback object, reference-counted by
/// the switches holding it.
pub struct SharedSubstitution
{
    host: Arc<dyn DelegateHost>,
    original: Arc<dyn ErrorDelegate>,
    wrapper: Arc<dyn ErrorDelegate>,
    switches: Arc<SwitchSet>,
}

impl SharedSubstitution
{
    /// Substitution of `original` by `wrapper` inside `host`.
    pub fn new(host: Arc<dyn DelegateHost>, original: Arc<dyn ErrorDelegate>, wrapper: Arc<dyn ErrorDelegate>)
        -> Self
    {
        Self::with_switches(host, original, wrapper, Arc::new(SwitchSet::new()))
    }

    /// Same as [`SharedSubstitution::new`], recording state in `switches`
    /// so the wrapper can observe it.
    pub fn with_switches(
        host: Arc<dyn DelegateHost>,
        original: Arc<dyn ErrorDelegate>,
        wrapper: Arc<dyn ErrorDelegate>,
        switches: Arc<SwitchSet>,
    ) -> Self
    {
        Self {
            host,
            original,
            wrapper,
            switches,
        }
    }

    /// Turn `switch` on. Returns `true` if it was off.
    ///
    /// The wrapper is installed when this is the first switch on.
    pub fn acquire(&self, switch: CaptureSwitch) -> bool
    {
        let mut bits = self.switches.bits();
        if *bits & switch.bit() != 0 {
            return false;
        }
        if *bits == 0 {
            self.host.set_delegate(Arc::clone(&self.wrapper));
            debug!(%switch, "installed error callback wrapper");
        }
        *bits |= switch.bit();
        true
    }

    /// Turn `switch` off. Returns `true` if it was on.
    ///
    /// The original is restored when this was the last switch on.
    pub fn release(&self, switch: CaptureSwitch) -> bool
    {
        let mut bits = self.switches.bits();
        if *bits & switch.bit() == 0 {
            return false;
        }
        *bits &= !switch.bit();
        if *bits == 0 {
            self.host.set_delegate(Arc::clone(&self.original));
            debug!(%switch, "restored original error callback");
        }
        true
    }

    /// Drop every holder and put the original back unconditionally.
    pub fn reset(&self)
    {
        let mut bits = self.switches.bits();
        *bits = 0;
        self.host.set_delegate(Arc::clone(&self.original));
    }

    /// Whether `switch` is on.
    pub fn is_held(&self, switch: CaptureSwitch) -> bool
    {
        self.switches.is_on(switch)
    }

    /// Whether the wrapper is installed.
    pub fn is_installed(&self) -> bool
    {
        self.switches.any()
    }

    /// Number of switches holding the substitution.
    pub fn holder_count(&self) -> u32
    {
        self.switches.count()
    }
}

impl fmt::Debug for SharedSubstitution
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("SharedSubstitution")
            .field("holders", &self.holder_count())
            .finish_non_exhaustive()
    }
}
