//! # luaerror-core
//!
//! Error interception for a game server's embedded Lua runtime.
//!
//! The host reports script errors in three places, each of which can be
//! switched on independently:
//!
//! - **runtime errors**: the runtime's error reporter is detoured so the
//!   failing stack can be captured while it is still live, then the host's
//!   error callback object is wrapped so delivery can be turned into a
//!   `LuaError` event;
//! - **compile-time errors**: same callback wrapper, stack captured at
//!   delivery;
//! - **client errors**: the server's handler for errors reported by remote
//!   players is located by signature and detoured into a `ClientLuaError`
//!   event.
//!
//! Subscribers receive a fixed positional payload (see [`dispatch`]) and can
//! suppress the host's default handling by returning `true`.
//!
//! ## Host capabilities
//!
//! Everything the host provides is behind a trait: [`hooks::Interceptor`]
//! (detours), [`symbols::SymbolResolver`] (signature scanning),
//! [`hooks::DelegateHost`] (the callback object), [`capture::Introspection`]
//! (stack walking), [`dispatch::SubscriberHost`] (the subscriber table) and
//! [`attribution::ContentRegistry`] (package ownership).
//!
//! ## Why unsafe code is needed
//!
//! Finding live addresses inside images loaded by the host means asking the
//! dynamic loader (`dl_iterate_phdr`), which is a C API.

#![allow(unsafe_code)] // Required for the dynamic loader API

pub mod attribution;
pub mod bridge;
pub mod capture;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod hooks;
pub mod lifecycle;
pub mod parser;
pub mod prelude;
pub mod symbols;
pub mod trampolines;
pub mod types;

pub use config::HookConfig;
// Re-export commonly used types
pub use error::{HookError, Result};
pub use lifecycle::{ErrorHooks, HostBindings, ToggleOutcome};
pub use types::{Address, DispatchOutcome, ErrorEvent, ErrorOrigin};
