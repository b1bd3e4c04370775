//! Configuration for my-ora.
//!
//! Read from TOML, by default `$CONFIG_DIR/my-ora/config.toml`:
//!
//! ```toml
//! driver_name = "my-ora"
//! log_filter = "myora=debug"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ShimError, ShimResult};
use crate::intercept::DRIVER_NAME;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShimConfig {
    /// Name the rewriting driver registers under.
    pub driver_name: String,
    /// `tracing-subscriber` filter directive.
    pub log_filter: Option<String>,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            driver_name: DRIVER_NAME.to_string(),
            log_filter: None,
        }
    }
}

impl ShimConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml(text: &str) -> ShimResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ShimError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file.
    pub fn load(path: impl AsRef<Path>) -> ShimResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&text)
    }

    /// The default config file location, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("my-ora").join("config.toml"))
    }

    /// Load the default config file, or defaults when there is none.
    pub fn discover() -> ShimResult<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    fn validate(&self) -> ShimResult<()> {
        if self.driver_name.trim().is_empty() {
            return Err(ShimError::Config("driver_name must not be empty".into()));
        }
        Ok(())
    }
}
