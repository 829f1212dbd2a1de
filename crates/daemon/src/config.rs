//! Daemon configuration management

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    pub daemon: DaemonSettings,
    pub usb: UsbSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonSettings {
    /// Run headless for systemd (Type=notify)
    pub service_mode: bool,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsbSettings {
    /// Probe devices that are already connected when the daemon starts
    #[serde(default = "UsbSettings::default_probe_existing")]
    pub probe_existing: bool,
}

impl UsbSettings {
    fn default_probe_existing() -> bool {
        true
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            daemon: DaemonSettings {
                service_mode: false,
                log_level: "info".to_string(),
            },
            usb: UsbSettings {
                probe_existing: true,
            },
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the specified path
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p
        } else {
            // Try standard locations in order
            let candidates = vec![
                Self::default_path(),
                PathBuf::from("/etc/nanoface-init/daemon.toml"),
            ];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: DaemonConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config.validate()?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("nanoface-init").join("daemon.toml")
        } else {
            PathBuf::from(".config/nanoface-init/daemon.toml")
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.daemon.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.daemon.log_level,
                valid_levels.join(", ")
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.daemon.log_level, "info");
        assert!(!config.daemon.service_mode);
        assert!(config.usb.probe_existing);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = DaemonConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: DaemonConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.daemon.log_level, parsed.daemon.log_level);
        assert_eq!(config.daemon.service_mode, parsed.daemon.service_mode);
        assert_eq!(config.usb.probe_existing, parsed.usb.probe_existing);
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = DaemonConfig::default();
        assert!(config.validate().is_ok());

        config.daemon.log_level = "invalid".to_string();
        assert!(config.validate().is_err());

        config.daemon.log_level = "debug".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_probe_existing_defaults_when_missing() {
        let parsed: DaemonConfig = toml::from_str(
            "[daemon]\nservice_mode = false\nlog_level = \"info\"\n\n[usb]\n",
        )
        .unwrap();
        assert!(parsed.usb.probe_existing);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("daemon.toml");

        let mut config = DaemonConfig::default();
        config.daemon.log_level = "debug".to_string();
        config.usb.probe_existing = false;
        config.save(&path).unwrap();

        let loaded = DaemonConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.daemon.log_level, "debug");
        assert!(!loaded.usb.probe_existing);
    }

    #[test]
    fn test_load_rejects_invalid_level() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("daemon.toml");
        fs::write(
            &path,
            "[daemon]\nservice_mode = false\nlog_level = \"loud\"\n\n[usb]\nprobe_existing = true\n",
        )
        .unwrap();

        assert!(DaemonConfig::load(Some(path)).is_err());
    }
}
