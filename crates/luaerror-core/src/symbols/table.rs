//! Built-in signatures of hooked host functions.
//!
//! The client error relay (`HandleClientLuaError`) has no stable export on
//! every build, so each platform/flavour gets its own entry. Symbol entries
//! are preferred wherever the binary keeps its symbol table.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use super::{Signature, WILDCARD};

/// Operating system a signature applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetOs
{
    /// Windows (`.dll`).
    Windows,
    /// Linux (`.so`).
    Linux,
    /// macOS (`.dylib`).
    MacOs,
}

impl TargetOs
{
    /// Operating system this crate was built for.
    pub const fn current() -> Option<Self>
    {
        if cfg!(target_os = "windows") {
            Some(TargetOs::Windows)
        } else if cfg!(target_os = "linux") {
            Some(TargetOs::Linux)
        } else if cfg!(target_os = "macos") {
            Some(TargetOs::MacOs)
        } else {
            None
        }
    }

    const fn library_extension(self) -> &'static str
    {
        match self {
            TargetOs::Windows => "dll",
            TargetOs::Linux => "so",
            TargetOs::MacOs => "dylib",
        }
    }
}

impl fmt::Display for TargetOs
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            TargetOs::Windows => f.write_str("windows"),
            TargetOs::Linux => f.write_str("linux"),
            TargetOs::MacOs => f.write_str("macos"),
        }
    }
}

/// Which host build the module is loaded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HostFlavor
{
    /// Dedicated server build (`srcds`).
    #[default]
    Dedicated,
    /// Listen server running inside the game client.
    Listen,
}

impl FromStr for HostFlavor
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "dedicated" | "srcds" | "server" => Ok(HostFlavor::Dedicated),
            "listen" | "client" => Ok(HostFlavor::Listen),
            _ => Err(format!("Unknown host flavor: {s}. Use 'dedicated' or 'listen'")),
        }
    }
}

impl fmt::Display for HostFlavor
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            HostFlavor::Dedicated => f.write_str("dedicated"),
            HostFlavor::Listen => f.write_str("listen"),
        }
    }
}

/// One platform's signature for a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureEntry
{
    /// Operating system of the host build.
    pub os: TargetOs,
    /// Host flavour, `None` when the entry applies to both.
    pub flavor: Option<HostFlavor>,
    /// How to find the function.
    pub signature: Signature,
}

/// Logical name of the relay target.
pub const HANDLE_CLIENT_LUA_ERROR: &str = "HandleClientLuaError";

const W: u8 = WILDCARD;

/// Signatures of `HandleClientLuaError(CBasePlayer *, const char *)`.
pub static HANDLE_CLIENT_LUA_ERROR_SIGNATURES: &[SignatureEntry] = &[
    SignatureEntry {
        os: TargetOs::Windows,
        flavor: None,
        signature: Signature::Pattern(Cow::Borrowed(&[
            0x55, 0x8B, 0xEC, 0x83, 0xEC, 0x08, 0xA1, W, W, W, W, 0xF3, 0x0F, 0x10, 0x00, 0x56,
        ])),
    },
    SignatureEntry {
        os: TargetOs::Linux,
        flavor: Some(HostFlavor::Dedicated),
        signature: Signature::Symbol(Cow::Borrowed("_Z20HandleClientLuaErrorP11CBasePlayerPKc")),
    },
    SignatureEntry {
        os: TargetOs::Linux,
        flavor: Some(HostFlavor::Listen),
        signature: Signature::Pattern(Cow::Borrowed(&[
            0x55, 0x89, 0xE5, 0x57, 0x56, 0x53, 0x83, 0xEC, 0x4C, 0x65, 0xA1, W, W, W, W, 0x89, 0x45, 0xE4,
        ])),
    },
    SignatureEntry {
        os: TargetOs::MacOs,
        flavor: None,
        signature: Signature::Symbol(Cow::Borrowed("__Z20HandleClientLuaErrorP11CBasePlayerPKc")),
    },
];

/// Pick the entry of `table` matching `os` and `flavor`.
pub fn select(table: &[SignatureEntry], os: TargetOs, flavor: HostFlavor) -> Option<&Signature>
{
    table
        .iter()
        .find(|entry| entry.os == os && entry.flavor.map_or(true, |wanted| wanted == flavor))
        .map(|entry| &entry.signature)
}

/// Relative path of the server module for a host build.
pub fn server_binary(os: TargetOs, flavor: HostFlavor) -> String
{
    let suffix = match (os, flavor) {
        (TargetOs::Linux, HostFlavor::Dedicated) => "_srv",
        _ => "",
    };
    format!("garrysmod/bin/server{suffix}.{}", os.library_extension())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_select_by_flavor()
    {
        let table = HANDLE_CLIENT_LUA_ERROR_SIGNATURES;
        assert!(matches!(
            select(table, TargetOs::Linux, HostFlavor::Dedicated),
            Some(Signature::Symbol(_))
        ));
        assert!(matches!(
            select(table, TargetOs::Linux, HostFlavor::Listen),
            Some(Signature::Pattern(_))
        ));
        assert!(select(table, TargetOs::Windows, HostFlavor::Listen).is_some());
        assert!(select(table, TargetOs::MacOs, HostFlavor::Dedicated).is_some());
    }

    #[test]
    fn test_server_binary()
    {
        assert_eq!(server_binary(TargetOs::Linux, HostFlavor::Dedicated), "garrysmod/bin/server_srv.so");
        assert_eq!(server_binary(TargetOs::Linux, HostFlavor::Listen), "garrysmod/bin/server.so");
        assert_eq!(server_binary(TargetOs::Windows, HostFlavor::Dedicated), "garrysmod/bin/server.dll");
    }

    #[test]
    fn test_host_flavor_from_str()
    {
        assert_eq!(HostFlavor::from_str("srcds").unwrap(), HostFlavor::Dedicated);
        assert_eq!(HostFlavor::from_str("Listen").unwrap(), HostFlavor::Listen);
        assert!(HostFlavor::from_str("both").is_err());
    }
}
