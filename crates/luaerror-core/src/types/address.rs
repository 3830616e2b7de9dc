//! Code address type.

use std::fmt;
use std::ops::{Add, Sub};

/// Strongly typed address of code inside the host process
///
/// Hook targets, trampolines and replacement functions are all plain
/// addresses once they cross the embedding boundary. Wrapping them keeps a
/// target from being confused with a trampoline, an offset or a size.
///
/// ## Example
///
/// ```rust
/// use luaerror_core::types::Address;
///
/// let text = Address::from(0x1000_u64);
/// let function = text + 0x2a0;
/// assert_eq!(function.value(), 0x12a0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u64);

impl Address
{
    /// The null address, used by hosts to signal "no such function".
    pub const ZERO: Self = Address(0);

    /// Create a new address from a `u64` value
    ///
    /// ```rust
    /// use luaerror_core::types::Address;
    ///
    /// const IMAGE_BASE: Address = Address::new(0x400000);
    /// ```
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Address of a function or data pointer.
    pub fn from_ptr<T>(ptr: *const T) -> Self
    {
        Address(ptr as usize as u64)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// `true` for the null address.
    pub const fn is_null(self) -> bool
    {
        self.0 == 0
    }

    /// Add an offset to this address, checking for overflow
    ///
    /// ```rust
    /// use luaerror_core::types::Address;
    ///
    /// let addr = Address::new(0x1000);
    /// assert_eq!(addr.checked_add(0x100), Some(Address::new(0x1100)));
    /// assert_eq!(addr.checked_add(u64::MAX), None);
    /// ```
    pub fn checked_add(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }

    /// Apply a signed load bias, checking for overflow in either direction.
    pub fn checked_add_signed(self, bias: i64) -> Option<Self>
    {
        self.0.checked_add_signed(bias).map(Address)
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<usize> for Address
{
    fn from(value: usize) -> Self
    {
        Address(value as u64)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:016x}", self.0)
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}

impl Sub<u64> for Address
{
    type Output = Address;

    fn sub(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_sub(rhs))
    }
}
