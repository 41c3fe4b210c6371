use chrono::{DateTime, Utc};
use meshroles_types::{DeploymentRole, NodeId, NodeTelemetry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A node as recorded in the registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegisteredNode {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub telemetry: Option<NodeTelemetry>,
    #[serde(default)]
    pub role: Option<DeploymentRole>,
    /// Firmware role last seen on the air (e.g. `ROUTER`).
    #[serde(default)]
    pub device_role: Option<String>,
    #[serde(default)]
    pub los_peers: BTreeSet<NodeId>,
    #[serde(default)]
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl RegisteredNode {
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        RegisteredNode {
            id,
            name: name.into(),
            telemetry: None,
            role: None,
            device_role: None,
            los_peers: BTreeSet::new(),
            notes: None,
            updated_at: Utc::now(),
        }
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
