use crate::cli::GlobalOpts;
use crate::error::{CliError, CliResult};
use crate::source::{CapturedInfo, MeshtasticCli, NodeSource};
use meshroles_config::{default_config_path, MeshConfig};
use meshroles_registry::Registry;
use meshroles_types::QualifierTable;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// State shared by every command handler: resolved paths and loaded config.
pub struct CliContext {
    pub config_path: PathBuf,
    pub config: MeshConfig,
    pub registry_path: PathBuf,
}

impl CliContext {
    pub fn new(opts: &GlobalOpts) -> CliResult<Self> {
        Self::build(opts, false)
    }

    /// Falls back to the default config when the file cannot be loaded, so
    /// `doctor` can still run and report the problem.
    pub fn lenient(opts: &GlobalOpts) -> CliResult<Self> {
        Self::build(opts, true)
    }

    fn build(opts: &GlobalOpts, lenient: bool) -> CliResult<Self> {
        let config_path = match &opts.config {
            Some(path) => path.clone(),
            None => default_config_path().map_err(config_error)?,
        };
        if opts.config.is_some() && !config_path.exists() {
            log::warn!("Config file {} does not exist, using defaults", config_path.display());
        }
        let config = match MeshConfig::load_or_default(&config_path) {
            Ok(config) => config,
            Err(e) if lenient => {
                log::warn!("Ignoring unusable config {}: {:#}", config_path.display(), e);
                MeshConfig::default()
            }
            Err(e) => return Err(config_error(e)),
        };
        let registry_path = match &opts.registry {
            Some(path) => path.clone(),
            None => config.registry_path().map_err(config_error)?,
        };
        log::debug!(
            "Using config {} and registry {}",
            config_path.display(),
            registry_path.display()
        );
        Ok(CliContext {
            config_path,
            config,
            registry_path,
        })
    }

    pub fn qualifiers(&self) -> &QualifierTable {
        &self.config.qualifiers
    }

    pub fn open_registry(&self) -> CliResult<Registry> {
        Ok(Registry::open(&self.registry_path)?)
    }

    /// Captured output when `input` is given, otherwise the live device on
    /// `port` (or the configured port).
    pub fn node_source(
        &self,
        port: Option<&str>,
        input: Option<&Path>,
    ) -> CliResult<Box<dyn NodeSource>> {
        if let Some(path) = input {
            return Ok(Box::new(CapturedInfo { path: path.to_path_buf() }));
        }
        let port = port
            .map(str::to_string)
            .or_else(|| self.config.meshtastic.port.clone())
            .ok_or_else(|| {
                CliError::InvalidArgument(
                    "No serial port given; pass one (e.g. /dev/ttyUSB0), use --input, or set meshtastic.port in the config".to_string(),
                )
            })?;
        Ok(Box::new(MeshtasticCli {
            binary: self.config.meshtastic.binary.clone(),
            port,
            timeout: Duration::from_secs(self.config.meshtastic.timeout_secs),
        }))
    }
}

fn config_error(e: anyhow::Error) -> CliError {
    CliError::Config(format!("{:#}", e))
}
