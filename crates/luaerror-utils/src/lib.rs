//! # luaerror utilities
//!
//! Logging setup shared by the `luaerror` command-line tool and by embedders
//! of `luaerror-core`.
//!
//! The library itself only emits `tracing` events; whoever owns the process
//! decides where they go by calling one of the initializers in [`logging`].

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{
    init_logging, init_logging_for_module, init_logging_with_level, LogFormat, LogLevel, LoggingError, LoggingGuard,
};
pub use tracing::{debug, error, info, trace, warn};
