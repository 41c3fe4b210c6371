use crate::Registry;
use meshroles_types::{DeploymentRole, NodeId, QualifierTable, UnmetCriterion};
use serde::Serialize;
use std::fmt;

/// Something the audit found wrong with the registry.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// Entry filed under a map key other than its own id.
    KeyMismatch {
        key: NodeId,
        id: NodeId,
    },
    /// Assigned role no longer satisfied, typically after a qualifier change.
    RoleNotQualified {
        node: NodeId,
        role: DeploymentRole,
        unmet: Vec<UnmetCriterion>,
    },
    RoleWithoutTelemetry {
        node: NodeId,
        role: DeploymentRole,
    },
    SelfLink {
        node: NodeId,
    },
    AsymmetricLink {
        node: NodeId,
        peer: NodeId,
    },
    DanglingPeer {
        node: NodeId,
        peer: NodeId,
    },
    /// Relay roles are pointless without at least one line-of-sight peer.
    IsolatedRelay {
        node: NodeId,
        role: DeploymentRole,
    },
    DeviceRoleMismatch {
        node: NodeId,
        role: DeploymentRole,
        device_role: String,
        expected: String,
    },
}

impl Finding {
    pub fn node(&self) -> NodeId {
        match self {
            Finding::KeyMismatch { key, .. } => *key,
            Finding::RoleNotQualified { node, .. }
            | Finding::RoleWithoutTelemetry { node, .. }
            | Finding::SelfLink { node }
            | Finding::AsymmetricLink { node, .. }
            | Finding::DanglingPeer { node, .. }
            | Finding::IsolatedRelay { node, .. }
            | Finding::DeviceRoleMismatch { node, .. } => *node,
        }
    }

    /// Whether the finding breaks a registry invariant rather than being advice.
    pub fn is_violation(&self) -> bool {
        !matches!(self, Finding::IsolatedRelay { .. } | Finding::DeviceRoleMismatch { .. })
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::KeyMismatch { key, id } => {
                write!(f, "registry key {} holds the entry for {}", key, id)
            }
            Finding::RoleNotQualified { node, role, unmet } => {
                let reasons: Vec<String> = unmet.iter().map(|u| u.to_string()).collect();
                write!(f, "{} no longer qualifies as {}: {}", node, role, reasons.join("; "))
            }
            Finding::RoleWithoutTelemetry { node, role } => {
                write!(f, "{} holds {} but has no telemetry", node, role)
            }
            Finding::SelfLink { node } => write!(f, "{} lists itself as a line-of-sight peer", node),
            Finding::AsymmetricLink { node, peer } => {
                write!(f, "{} sees {} but {} does not list {}", node, peer, peer, node)
            }
            Finding::DanglingPeer { node, peer } => {
                write!(f, "{} lists unregistered peer {}", node, peer)
            }
            Finding::IsolatedRelay { node, role } => {
                write!(f, "{} is {} but has no line-of-sight peers", node, role)
            }
            Finding::DeviceRoleMismatch { node, role, device_role, expected } => write!(
                f,
                "{} is {} but advertises {} (expected {})",
                node, role, device_role, expected
            ),
        }
    }
}

pub(crate) fn audit(registry: &Registry, table: &QualifierTable) -> Vec<Finding> {
    let mut findings = Vec::new();

    for (key, node) in &registry.doc.nodes {
        if *key != node.id {
            findings.push(Finding::KeyMismatch { key: *key, id: node.id });
        }

        if let Some(role) = node.role {
            match &node.telemetry {
                Some(telemetry) => {
                    let unmet = table.get(role).evaluate(telemetry);
                    if !unmet.is_empty() {
                        findings.push(Finding::RoleNotQualified { node: node.id, role, unmet });
                    }
                }
                None => findings.push(Finding::RoleWithoutTelemetry { node: node.id, role }),
            }

            if role.is_relay() && node.los_peers.is_empty() {
                findings.push(Finding::IsolatedRelay { node: node.id, role });
            }

            if let Some(device_role) = &node.device_role {
                if !role.accepts_device_role(device_role) {
                    findings.push(Finding::DeviceRoleMismatch {
                        node: node.id,
                        role,
                        device_role: device_role.clone(),
                        expected: role.recommended_device_role().to_string(),
                    });
                }
            }
        }

        for peer in &node.los_peers {
            if *peer == node.id {
                findings.push(Finding::SelfLink { node: node.id });
                continue;
            }
            match registry.get(*peer) {
                None => findings.push(Finding::DanglingPeer { node: node.id, peer: *peer }),
                Some(other) if !other.los_peers.contains(&node.id) => {
                    findings.push(Finding::AsymmetricLink { node: node.id, peer: *peer })
                }
                Some(_) => {}
            }
        }
    }

    findings
}
