//! # Configuration
//!
//! Names and paths the hooks depend on. Defaults match the stock host; each
//! value can be overridden through the environment:
//!
//! - `LUAERROR_HOST_FLAVOR`: `dedicated` or `listen` (default: `dedicated`)
//! - `LUAERROR_SERVER_BINARY`: path of the server module to scan
//! - `LUAERROR_RUNTIME_EVENT`: event name for local errors (default: `LuaError`)
//! - `LUAERROR_CLIENT_EVENT`: event name for relayed errors (default: `ClientLuaError`)
//! - `LUAERROR_FILTER_BY_SWITCH`: `1` or `true` to dispatch only errors whose
//!   capture switch is on (default: off)

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

use crate::attribution::NATIVE_SOURCE;
use crate::parser::ERROR_TAG;
use crate::symbols::table::{self, HANDLE_CLIENT_LUA_ERROR, HANDLE_CLIENT_LUA_ERROR_SIGNATURES};
use crate::symbols::{HostFlavor, Signature, TargetOs};

/// Event name for errors raised in this process.
pub const DEFAULT_RUNTIME_EVENT: &str = "LuaError";
/// Event name for errors relayed by remote clients.
pub const DEFAULT_CLIENT_EVENT: &str = "ClientLuaError";

/// Settings shared by the hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookConfig
{
    /// Host build the module is loaded into.
    pub flavor: HostFlavor,
    /// Image containing the client error relay.
    pub server_binary: PathBuf,
    /// Logical name of the relay target (for messages).
    pub relay_symbol: String,
    /// Signature of the relay target, `None` on unsupported platforms.
    pub relay_signature: Option<Signature>,
    /// Event dispatched for local errors.
    pub runtime_event: String,
    /// Event dispatched for relayed errors.
    pub client_event: String,
    /// Tag stripped from relayed messages.
    pub error_tag: String,
    /// Chunk name of native functions.
    pub native_source: String,
    /// Skip local errors whose capture switch is off.
    pub filter_by_switch: bool,
}

impl Default for HookConfig
{
    fn default() -> Self
    {
        Self::for_flavor(HostFlavor::default())
    }
}

impl HookConfig
{
    /// Defaults for a host flavour on the current platform.
    pub fn for_flavor(flavor: HostFlavor) -> Self
    {
        let os = TargetOs::current();
        Self {
            flavor,
            server_binary: os
                .map(|os| PathBuf::from(table::server_binary(os, flavor)))
                .unwrap_or_default(),
            relay_symbol: HANDLE_CLIENT_LUA_ERROR.to_string(),
            relay_signature: os.and_then(|os| table::select(HANDLE_CLIENT_LUA_ERROR_SIGNATURES, os, flavor).cloned()),
            runtime_event: DEFAULT_RUNTIME_EVENT.to_string(),
            client_event: DEFAULT_CLIENT_EVENT.to_string(),
            error_tag: ERROR_TAG.to_string(),
            native_source: NATIVE_SOURCE.to_string(),
            filter_by_switch: false,
        }
    }

    /// Defaults overridden by `LUAERROR_*` environment variables.
    ///
    /// Malformed values are logged and ignored.
    pub fn from_env() -> Self
    {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`HookConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flavor = lookup("LUAERROR_HOST_FLAVOR")
            .and_then(|value| {
                HostFlavor::from_str(&value)
                    .map_err(|err| warn!("ignoring LUAERROR_HOST_FLAVOR: {err}"))
                    .ok()
            })
            .unwrap_or_default();

        let mut config = Self::for_flavor(flavor);
        if let Some(path) = lookup("LUAERROR_SERVER_BINARY").filter(|value| !value.is_empty()) {
            config.server_binary = PathBuf::from(path);
        }
        if let Some(name) = lookup("LUAERROR_RUNTIME_EVENT").filter(|value| !value.is_empty()) {
            config.runtime_event = name;
        }
        if let Some(name) = lookup("LUAERROR_CLIENT_EVENT").filter(|value| !value.is_empty()) {
            config.client_event = name;
        }
        if let Some(value) = lookup("LUAERROR_FILTER_BY_SWITCH") {
            config.filter_by_switch = matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        config
    }

    /// Replace the relay signature.
    #[must_use]
    pub fn with_relay_signature(mut self, signature: Signature) -> Self
    {
        self.relay_signature = Some(signature);
        self
    }

    /// Dispatch only local errors whose capture switch is on.
    #[must_use]
    pub fn with_switch_filter(mut self, enabled: bool) -> Self
    {
        self.filter_by_switch = enabled;
        self
    }

    /// Replace the server image path.
    #[must_use]
    pub fn with_server_binary(mut self, path: impl Into<PathBuf>) -> Self
    {
        self.server_binary = path.into();
        self
    }
}
