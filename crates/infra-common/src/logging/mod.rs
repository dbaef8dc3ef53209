/*!
Logging

Standardized `tracing` setup for the streamrtc stack. The active level can be
changed at runtime through the [`LogLevelHandle`] returned by
[`setup_logging`].
*/

pub mod setup;

pub use setup::{parse_log_level, setup_logging, LogLevel, LogLevelHandle, LoggingConfig};
