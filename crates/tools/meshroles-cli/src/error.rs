use meshroles_registry::RegistryError;
use meshroles_types::{NodeDbError, TypesError};
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("I/O Error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON Serialization/Deserialization Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML Parse Error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Invalid Argument: {0}")]
    InvalidArgument(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Meshtastic CLI '{0}' not found. Make sure it's installed and in your PATH.")]
    MeshtasticNotFound(String),

    #[error("Error running Meshtastic CLI ({status}): {stderr}")]
    MeshtasticFailed { status: String, stderr: String },

    #[error("Meshtastic command timed out after {0}s. Check your device connection.")]
    Timeout(u64),

    #[error(transparent)]
    NodeDb(#[from] NodeDbError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Types(#[from] TypesError),

    #[error("Registry audit found {0} problem(s)")]
    AuditFailed(usize),

    #[error("Generic Error: {0}")]
    Any(#[from] anyhow::Error), // Catch-all for other anyhow errors
}

// Define the standard Result type alias
pub type CliResult<T = ()> = Result<T, CliError>;
