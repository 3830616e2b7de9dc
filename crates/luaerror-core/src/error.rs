//! # Error Types
//!
//! General error handling for hook installation and host interaction.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages. The `Display` output of every variant is the
//! human-readable reason handed back to the scripting layer when a toggle
//! fails, so keep the messages short and specific.

use thiserror::Error;

use crate::types::Address;

/// Main error type for hook and lifecycle operations
///
/// ## Error Categories
///
/// 1. **Setup errors**: MissingCapability, NotInitialized
/// 2. **Install errors**: SignatureNotFound, InterceptRejected, AlreadyHooked
/// 3. **Lookup errors**: HookIdNotFound, ImageNotLoaded, ImageParse
/// 4. **Dispatch errors**: PayloadAssembly, SubscriberFault
/// 5. **I/O errors**: Io (reading binary images from disk)
#[derive(Error, Debug)]
pub enum HookError
{
    /// A host capability required at initialization is absent
    ///
    /// This is a setup failure: `ErrorHooks::initialize` aborts and nothing
    /// stays installed.
    #[error("unable to obtain {0}")]
    MissingCapability(&'static str),

    /// The signature scan over the named binary image found no match
    #[error("unable to sigscan function {symbol} in {image}")]
    SignatureNotFound
    {
        /// Logical name of the function being located.
        symbol: String,
        /// Binary image that was scanned.
        image: String,
    },

    /// The interception primitive refused to hook the target
    ///
    /// Typical causes are a non-writable page, an unsupported prologue or an
    /// ABI mismatch. The string carries the primitive's own reason.
    #[error("unable to create a hook for {target}: {reason}")]
    InterceptRejected
    {
        /// Address the primitive was asked to patch.
        target: Address,
        /// Reason reported by the primitive.
        reason: String,
    },

    /// A hook for this target address is already tracked
    #[error("function at {0} is already hooked")]
    AlreadyHooked(Address),

    /// No hook exists for the given identifier
    #[error("No hook with id {0}")]
    HookIdNotFound(u64),

    /// Invalid argument passed to a hook operation
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The named image is not mapped into the current process
    #[error("binary image {0} is not loaded")]
    ImageNotLoaded(String),

    /// The on-disk image could not be parsed
    #[error("failed to parse {path}: {details}")]
    ImageParse
    {
        /// Path of the image on disk.
        path: String,
        /// Parser error details.
        details: String,
    },

    /// A value needed to build the subscriber payload could not be produced
    #[error("failed to assemble payload: {0}")]
    PayloadAssembly(String),

    /// A subscriber raised an error while being invoked
    #[error("subscriber raised an error: {0}")]
    SubscriberFault(String),

    /// The hooks were already torn down
    #[error("error hooks are not initialized")]
    NotInitialized,

    /// I/O error (reading binary images, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, HookError>`
///
/// ```rust
/// use luaerror_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, HookError>;
