/*!
Common infrastructure for the streamrtc stack.

This crate holds the pieces every other crate in the workspace shares:

- [`logging`]: `tracing` subscriber setup with a runtime-adjustable level
- [`config`]: TOML configuration loading
- [`errors`]: the common error type
*/

pub mod config;
pub mod errors;
pub mod logging;

pub use errors::{Error, Result};
pub use logging::{setup_logging, LogLevel, LogLevelHandle, LoggingConfig};
