//! # Symbol resolution
//!
//! Locates functions inside binary images when no stable export exists.
//!
//! A [`Signature`] is either an exported/defined symbol name or a byte
//! pattern with wildcards. [`SymbolResolver`] implementations turn a
//! signature plus an image name into an address:
//!
//! - [`ImageScanner`] reads the image from disk and returns link-time
//!   addresses (used by the CLI and as the building block below).
//! - [`LoadedImageResolver`] (Linux) finds the image mapped into the current
//!   process and relocates the scanner's result by the load bias.
//!
//! The per-platform signatures of the functions we hook live in [`table`] as
//! plain data.

pub mod image;
#[cfg(target_os = "linux")]
pub mod loaded;
pub mod table;

use std::borrow::Cow;
use std::fmt;
use std::path::Path;

use rustc_demangle::try_demangle;

pub use image::ImageScanner;
#[cfg(target_os = "linux")]
pub use loaded::LoadedImageResolver;
pub use table::{HostFlavor, SignatureEntry, TargetOs};

use crate::error::{HookError, Result};
use crate::types::Address;

/// Byte that matches anything inside a pattern.
pub const WILDCARD: u8 = 0x2A;

/// Prefix marking a textual signature as a symbol name.
pub const SYMBOL_PREFIX: char = '@';

/// How to find a function inside an image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Signature
{
    /// Exported or defined symbol, matched by its raw (mangled) name.
    Symbol(Cow<'static, str>),
    /// Byte pattern matched against executable sections; [`WILDCARD`] bytes
    /// match anything.
    Pattern(Cow<'static, [u8]>),
}

impl Signature
{
    /// Parse the textual form: `@name` for symbols, otherwise hex bytes
    /// separated by spaces with `?`/`??` as wildcards (`55 8B EC ?? 2A`).
    ///
    /// # Errors
    ///
    /// Returns [`HookError::InvalidArgument`] for empty input or bad hex.
    pub fn parse(text: &str) -> Result<Self>
    {
        let text = text.trim();
        if let Some(name) = text.strip_prefix(SYMBOL_PREFIX) {
            if name.is_empty() {
                return Err(HookError::InvalidArgument("empty symbol name".into()));
            }
            return Ok(Signature::Symbol(Cow::Owned(name.to_string())));
        }

        let bytes = text
            .split_whitespace()
            .map(|token| match token {
                "?" | "??" => Ok(WILDCARD),
                hex => u8::from_str_radix(hex.trim_start_matches("0x"), 16)
                    .map_err(|err| HookError::InvalidArgument(format!("bad pattern byte {hex:?}: {err}"))),
            })
            .collect::<Result<Vec<u8>>>()?;
        if bytes.is_empty() {
            return Err(HookError::InvalidArgument("empty signature".into()));
        }
        Ok(Signature::Pattern(Cow::Owned(bytes)))
    }
}

impl fmt::Display for Signature
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Signature::Symbol(name) => write!(f, "{SYMBOL_PREFIX}{name}"),
            Signature::Pattern(bytes) => {
                for (index, byte) in bytes.iter().enumerate() {
                    if index > 0 {
                        f.write_str(" ")?;
                    }
                    if *byte == WILDCARD {
                        f.write_str("??")?;
                    } else {
                        write!(f, "{byte:02X}")?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// Signature-scanning capability.
pub trait SymbolResolver
{
    /// Address of the function described by `signature` inside `image`, or
    /// `None` when the image is unavailable or nothing matches.
    fn resolve(&self, image: &Path, signature: &Signature) -> Option<Address>;
}

/// Offset of the first match of `pattern` in `haystack`.
pub fn find_pattern(haystack: &[u8], pattern: &[u8]) -> Option<usize>
{
    if pattern.is_empty() || pattern.len() > haystack.len() {
        return None;
    }
    haystack.windows(pattern.len()).position(|window| {
        window
            .iter()
            .zip(pattern)
            .all(|(byte, expected)| *expected == WILDCARD || byte == expected)
    })
}

/// Human-readable form of a raw symbol name.
///
/// Rust symbols are demangled; anything else is returned unchanged.
pub fn display_name(raw: &str) -> String
{
    try_demangle(raw).map_or_else(|_| raw.to_string(), |demangled| format!("{demangled:#}"))
}
