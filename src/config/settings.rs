//! Application settings

use crate::core::port::SerialSettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Serial line settings applied to opened ports
    pub serial: SerialSettings,
    /// Override for the emulation plugin directory. Defaults to the
    /// `emulation/` directory next to the executable when unset.
    pub plugin_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Load config from file, falling back to defaults when absent
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = super::config_dir()
            .ok_or("Could not determine config directory")?
            .join("config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let config_path = super::config_dir()
            .ok_or("Could not determine config directory")?
            .join("config.toml");

        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let config = AppConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.serial.baud_rate, config.serial.baud_rate);
        assert_eq!(parsed.plugin_dir, None);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: AppConfig = toml::from_str("plugin_dir = \"/opt/emulations\"").unwrap();
        assert_eq!(parsed.plugin_dir, Some(PathBuf::from("/opt/emulations")));
        assert_eq!(parsed.serial.baud_rate, 115_200);
    }
}
