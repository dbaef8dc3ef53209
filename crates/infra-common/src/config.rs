/*!
Configuration loading

Every config struct in the workspace is plain `serde`; this module turns TOML
text or files into them.
*/

use crate::errors::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Parse a configuration value from TOML text
pub fn from_toml_str<T: DeserializeOwned>(text: &str) -> Result<T> {
    toml::from_str(text).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
}

/// Load a configuration value from a TOML file
pub fn load_toml<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    from_toml_str(&text)
        .map_err(|e| Error::Config(format!("{} ({})", e, path.display())))
}
