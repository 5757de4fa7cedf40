//! Driver selection from TOML.
//!
//! ```toml
//! kind = "simulated"
//!
//! [[devices]]
//! name = "SimDev1"
//! ai_channels = 4
//! ```
//!
//! A `remote` configuration carries session options only; the transport is
//! supplied in code through [`DriverConfig::connect_remote`].

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::driver::remote::{GrpcOptions, RemoteDriver, SessionTransport};
use crate::driver::simulated::{SimDevice, SimulatedDriver};
use crate::driver::Driver;
use crate::error::{error_codes, DaqError, ErrorKind, Result};

/// Simulated device entry of a configuration file.
pub type SimulatedDeviceConfig = SimDevice;

/// Error types for config loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Which adapter the binding talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DriverConfig {
    /// The vendor library in this process.
    Library,
    /// In-memory devices.
    Simulated {
        /// Devices to simulate; defaults to `SimDev1`.
        #[serde(default = "default_devices")]
        devices: Vec<SimulatedDeviceConfig>,
    },
    /// A session server.
    Remote {
        /// Session options for every task.
        #[serde(flatten)]
        options: GrpcOptions,
    },
}

fn default_devices() -> Vec<SimulatedDeviceConfig> {
    vec![SimDevice::new("SimDev1")]
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self::Simulated {
            devices: default_devices(),
        }
    }
}

impl DriverConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> std::result::Result<Self, ConfigLoadError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigLoadError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn from_toml_file(path: &Path) -> std::result::Result<Self, ConfigLoadError> {
        if !path.exists() {
            return Err(ConfigLoadError::NotFound(path.display().to_string()));
        }
        debug!("Loading driver config from: {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|e| ConfigLoadError::ReadError(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml_str(&text)?;
        info!(kind = config.kind(), "Loaded driver config from {}", path.display());
        Ok(config)
    }

    /// The `kind` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Library => "library",
            Self::Simulated { .. } => "simulated",
            Self::Remote { .. } => "remote",
        }
    }

    fn validate(&self) -> std::result::Result<(), ConfigLoadError> {
        let Self::Simulated { devices } = self else {
            return Ok(());
        };
        if devices.is_empty() {
            return Err(ConfigLoadError::ValidationError("a simulated driver needs at least one device".into()));
        }
        let mut names: Vec<String> = devices.iter().map(|d| d.name.to_ascii_lowercase()).collect();
        if names.iter().any(|n| n.is_empty() || n.contains('/')) {
            return Err(ConfigLoadError::ValidationError("device names must be non-empty and contain no '/'".into()));
        }
        names.sort();
        names.dedup();
        if names.len() != devices.len() {
            return Err(ConfigLoadError::ValidationError("device names must be unique".into()));
        }
        Ok(())
    }

    /// Build the configured adapter.
    ///
    /// A remote configuration needs a transport; use [`Self::connect_remote`].
    pub fn connect(&self) -> Result<Arc<dyn Driver>> {
        match self {
            Self::Library => library_driver(),
            Self::Simulated { devices } => Ok(Arc::new(SimulatedDriver::new(devices.clone()))),
            Self::Remote { .. } => Err(DaqError::new(
                ErrorKind::NotSupported,
                error_codes::UNKNOWN,
                "A remote driver configuration needs a session transport; use connect_remote.",
            )),
        }
    }

    /// Build a remote adapter over `transport`, or the configured adapter for
    /// non-remote kinds.
    pub fn connect_remote(&self, transport: Arc<dyn SessionTransport>) -> Result<Arc<dyn Driver>> {
        match self {
            Self::Remote { options } => Ok(Arc::new(RemoteDriver::new(transport, options.clone()))),
            _ => self.connect(),
        }
    }
}

#[cfg(feature = "hardware")]
fn library_driver() -> Result<Arc<dyn Driver>> {
    Ok(Arc::new(crate::driver::LibraryDriver::new()))
}

#[cfg(not(feature = "hardware"))]
fn library_driver() -> Result<Arc<dyn Driver>> {
    Err(DaqError::new(
        ErrorKind::NotFound,
        error_codes::UNKNOWN,
        "The NI-DAQmx library adapter was not compiled in; enable the `hardware` feature.",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::remote::SessionInitializationBehavior;

    #[test]
    fn test_simulated_devices_use_defaults() {
        let config = DriverConfig::from_toml_str(
            r#"
            kind = "simulated"

            [[devices]]
            name = "Bench"
            ai_channels = 2
            "#,
        )
        .unwrap();
        let DriverConfig::Simulated { devices } = config else {
            panic!("expected a simulated config");
        };
        assert_eq!(devices[0].name, "Bench");
        assert_eq!(devices[0].ai_channels, 2);
        assert_eq!(devices[0].counters, 4);
    }

    #[test]
    fn test_remote_options_are_flattened() {
        let config = DriverConfig::from_toml_str(
            r#"
            kind = "remote"
            session_name = "ai_task"
            initialization_behavior = "attach_to_server_session"
            "#,
        )
        .unwrap();
        assert_eq!(
            config,
            DriverConfig::Remote {
                options: GrpcOptions {
                    session_name: "ai_task".into(),
                    initialization_behavior: SessionInitializationBehavior::AttachToServerSession,
                },
            }
        );
        assert!(config.connect().is_err());
    }

    #[test]
    fn test_duplicate_device_names_rejected() {
        let err = DriverConfig::from_toml_str(
            r#"
            kind = "simulated"
            [[devices]]
            name = "Dev1"
            [[devices]]
            name = "dev1"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigLoadError::ValidationError(_)));
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("driver.toml");
        std::fs::write(&path, "kind = \"simulated\"\n").unwrap();
        let config = DriverConfig::from_toml_file(&path).unwrap();
        assert_eq!(config, DriverConfig::default());
        assert!(config.connect().is_ok());

        let missing = DriverConfig::from_toml_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(missing, ConfigLoadError::NotFound(_)));
    }
}
