use meshroles_types::{NodeId, TypesError};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("I/O Error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Registry file {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON Serialization Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported registry version {0}")]
    UnsupportedVersion(u32),

    #[error("Registry has no backing file; use save_to")]
    NoPath,

    #[error("Node {0} is already registered")]
    AlreadyRegistered(NodeId),

    #[error("Node {0} is not registered")]
    UnknownNode(NodeId),

    #[error("Node {0} has no telemetry; record a site survey before assigning a role")]
    MissingTelemetry(NodeId),

    #[error("A node cannot be its own line-of-sight peer: {0}")]
    SelfLink(NodeId),

    #[error(transparent)]
    Types(#[from] TypesError),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
