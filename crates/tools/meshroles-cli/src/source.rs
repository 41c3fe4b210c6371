//! Where `meshtastic --info` output comes from: a live device or a capture.

use crate::error::{CliError, CliResult};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

#[async_trait]
pub trait NodeSource: Send + Sync {
    /// Raw text as printed by `meshtastic --info`.
    async fn info_output(&self) -> CliResult<String>;

    fn describe(&self) -> String;
}

/// Runs the meshtastic python CLI against a serial port.
pub struct MeshtasticCli {
    pub binary: String,
    pub port: String,
    pub timeout: Duration,
}

#[async_trait]
impl NodeSource for MeshtasticCli {
    async fn info_output(&self) -> CliResult<String> {
        log::info!("Running {} --port {} --info", self.binary, self.port);
        let child = Command::new(&self.binary)
            .args(["--port", self.port.as_str(), "--info"])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Err(_) => return Err(CliError::Timeout(self.timeout.as_secs())),
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
                return Err(CliError::MeshtasticNotFound(self.binary.clone()))
            }
            Ok(Err(e)) => return Err(CliError::Io(e)),
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            return Err(CliError::MeshtasticFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        log::debug!("meshtastic returned {} bytes", output.stdout.len());
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn describe(&self) -> String {
        format!("device on {}", self.port)
    }
}

/// Previously captured `--info` output saved to a file.
pub struct CapturedInfo {
    pub path: PathBuf,
}

#[async_trait]
impl NodeSource for CapturedInfo {
    async fn info_output(&self) -> CliResult<String> {
        log::info!("Reading captured node info from {}", self.path.display());
        tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                CliError::NotFound(format!("input file {}", self.path.display()))
            } else {
                CliError::Io(e)
            }
        })
    }

    fn describe(&self) -> String {
        format!("capture {}", self.path.display())
    }
}
