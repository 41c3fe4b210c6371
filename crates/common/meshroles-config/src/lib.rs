use anyhow::{Context, Result};
use meshroles_types::QualifierTable;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DATA_DIR_ENV: &str = "MESHROLES_DATA_DIR";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const REGISTRY_FILE_NAME: &str = "registry.json";

/// Returns ~/.meshroles by default, respecting $MESHROLES_DATA_DIR override.
pub fn data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Failed to find home directory"))?;
    Ok(home.join(".meshroles"))
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(data_dir()?.join(CONFIG_FILE_NAME))
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct MeshConfig {
    #[serde(default)]
    pub meshtastic: MeshtasticConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub qualifiers: QualifierTable,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct MeshtasticConfig {
    /// Name or path of the meshtastic python CLI.
    #[serde(default = "default_binary")]
    pub binary: String,
    /// Serial port used when none is given on the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_binary() -> String {
    "meshtastic".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for MeshtasticConfig {
    fn default() -> Self {
        MeshtasticConfig {
            binary: default_binary(),
            port: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct RegistryConfig {
    /// Registry file; <data dir>/registry.json when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl MeshConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("Failed to parse config TOML")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml_str(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            log::debug!("Loading config from {}", path.display());
            Self::load(path)
        } else {
            log::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.meshtastic.binary.trim().is_empty() {
            anyhow::bail!("meshtastic.binary must not be empty");
        }
        if self.meshtastic.timeout_secs == 0 {
            anyhow::bail!("meshtastic.timeout_secs must be greater than zero");
        }
        for role in meshroles_types::DeploymentRole::ALL {
            let q = self.qualifiers.get(role);
            let bad = |v: Option<f64>| v.map_or(false, |v| !v.is_finite() || v < 0.0);
            if bad(q.elevation_above_ft) || bad(q.min_standalone_days) {
                anyhow::bail!("qualifiers for {} must use non-negative thresholds", role);
            }
        }
        Ok(())
    }

    pub fn registry_path(&self) -> Result<PathBuf> {
        match &self.registry.path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join(REGISTRY_FILE_NAME)),
        }
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Writes the config, creating parent directories. Refuses to overwrite.
    pub fn write_new(&self, path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, self.to_toml_string()?)
            .with_context(|| format!("Failed to write config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshroles_types::{DeploymentRole, PowerSource};

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = MeshConfig::from_toml_str("").unwrap();
        assert_eq!(config, MeshConfig::default());
        assert_eq!(config.meshtastic.binary, "meshtastic");
        assert_eq!(config.meshtastic.timeout_secs, 30);
    }

    #[test]
    fn test_override_single_qualifier_row() {
        let config = MeshConfig::from_toml_str(
            r#"
            [meshtastic]
            port = "/dev/ttyACM0"

            [qualifiers.infrastructure]
            elevation_above_ft = 150.0
            min_standalone_days = 10.0
            power_sources = ["solar"]
            "#,
        )
        .unwrap();
        assert_eq!(config.meshtastic.port.as_deref(), Some("/dev/ttyACM0"));
        let infra = config.qualifiers.get(DeploymentRole::Infrastructure);
        assert_eq!(infra.elevation_above_ft, Some(150.0));
        assert_eq!(infra.power_sources, vec![PowerSource::Solar]);
        assert!(infra.antenna_locations.is_empty());
        assert_eq!(
            config.qualifiers.get(DeploymentRole::Pocket),
            &meshroles_types::RoleQualifier::default_pocket()
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = MeshConfig::from_toml_str("[meshtastic]\ntimeout_secs = 0\n").unwrap();
        assert!(config.validate().is_err());

        let config = MeshConfig::from_toml_str(
            "[qualifiers.mobile]\nmin_standalone_days = -2.0\n",
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_write_new_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        let config = MeshConfig::default();
        config.write_new(&path).unwrap();
        assert!(config.write_new(&path).is_err());
        assert_eq!(MeshConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = MeshConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, MeshConfig::default());
    }

    #[test]
    fn test_explicit_registry_path_wins() {
        let mut config = MeshConfig::default();
        config.registry.path = Some(PathBuf::from("/tmp/field/registry.json"));
        assert_eq!(config.registry_path().unwrap(), PathBuf::from("/tmp/field/registry.json"));
    }
}
