//! Persistent registry of mesh nodes, their deployment roles and the
//! line-of-sight relationships between them.
//!
//! The registry keeps three invariants: a role is only stored when the
//! node's telemetry meets that role's qualifier, LOS links are symmetric and
//! never point at the node itself, and every LOS peer is a registered node.
//! Files edited by hand can break them; [`Registry::audit`] reports that.

pub mod audit;
pub mod error;
pub mod node;

pub use audit::Finding;
pub use error::{RegistryError, RegistryResult};
pub use node::RegisteredNode;

use meshroles_types::{Classification, DeploymentRole, NodeId, NodeSummary, NodeTelemetry, QualifierTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const REGISTRY_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct RegistryDocument {
    version: u32,
    #[serde(default)]
    nodes: BTreeMap<NodeId, RegisteredNode>,
}

impl Default for RegistryDocument {
    fn default() -> Self {
        RegistryDocument {
            version: REGISTRY_VERSION,
            nodes: BTreeMap::new(),
        }
    }
}

/// Result of updating a node's telemetry.
#[derive(Clone, Debug, PartialEq)]
pub struct TelemetryUpdate {
    /// Role removed because the new telemetry no longer meets it.
    pub role_cleared: Option<DeploymentRole>,
}

/// Summary of merging a mesh snapshot into the registry.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub registered: Vec<NodeId>,
    pub updated: Vec<NodeId>,
    pub linked: Vec<NodeId>,
    /// Snapshot keys that are not valid node ids.
    pub skipped: Vec<String>,
}

#[derive(Debug, Default)]
pub struct Registry {
    path: Option<PathBuf>,
    doc: RegistryDocument,
}

impl Registry {
    /// Empty registry with no backing file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the registry at `path`; a missing file yields an empty registry.
    pub fn open(path: impl AsRef<Path>) -> RegistryResult<Self> {
        let path = path.as_ref().to_path_buf();
        let doc = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|source| RegistryError::Io {
                path: path.clone(),
                source,
            })?;
            let doc: RegistryDocument =
                serde_json::from_str(&raw).map_err(|source| RegistryError::Corrupt {
                    path: path.clone(),
                    source,
                })?;
            if doc.version != REGISTRY_VERSION {
                return Err(RegistryError::UnsupportedVersion(doc.version));
            }
            log::debug!("Loaded {} nodes from {}", doc.nodes.len(), path.display());
            doc
        } else {
            log::debug!("No registry at {}, starting empty", path.display());
            RegistryDocument::default()
        };
        Ok(Registry { path: Some(path), doc })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn save(&self) -> RegistryResult<()> {
        let path = self.path.as_ref().ok_or(RegistryError::NoPath)?;
        self.save_to(path)
    }

    /// Writes the registry next to `path` and renames it into place so a
    /// crash never leaves a half-written file.
    pub fn save_to(&self, path: &Path) -> RegistryResult<()> {
        let io_err = |source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(&self.doc)?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)?;
        log::info!("Saved {} nodes to {}", self.doc.nodes.len(), path.display());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.doc.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&RegisteredNode> {
        self.doc.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.doc.nodes.contains_key(&id)
    }

    /// All nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &RegisteredNode> {
        self.doc.nodes.values()
    }

    pub fn by_role(&self, role: DeploymentRole) -> Vec<&RegisteredNode> {
        self.nodes().filter(|n| n.role == Some(role)).collect()
    }

    fn node_mut(&mut self, id: NodeId) -> RegistryResult<&mut RegisteredNode> {
        self.doc.nodes.get_mut(&id).ok_or(RegistryError::UnknownNode(id))
    }

    pub fn register(&mut self, id: NodeId, name: impl Into<String>) -> RegistryResult<&RegisteredNode> {
        if self.contains(id) {
            return Err(RegistryError::AlreadyRegistered(id));
        }
        let node = RegisteredNode::new(id, name);
        log::info!("Registered node {} ({})", id, node.name);
        Ok(self.doc.nodes.entry(id).or_insert(node))
    }

    pub fn rename(&mut self, id: NodeId, name: impl Into<String>) -> RegistryResult<()> {
        let node = self.node_mut(id)?;
        node.name = name.into();
        node.touch();
        Ok(())
    }

    pub fn set_notes(&mut self, id: NodeId, notes: Option<String>) -> RegistryResult<()> {
        let node = self.node_mut(id)?;
        node.notes = notes;
        node.touch();
        Ok(())
    }

    /// Records site-survey telemetry. A role the new telemetry no longer
    /// meets is cleared and reported back.
    pub fn set_telemetry(
        &mut self,
        id: NodeId,
        telemetry: NodeTelemetry,
        table: &QualifierTable,
    ) -> RegistryResult<TelemetryUpdate> {
        telemetry.validate()?;
        let node = self.node_mut(id)?;
        let role_cleared = match node.role {
            Some(role) if !table.get(role).is_met(&telemetry) => {
                log::warn!("Telemetry for {} no longer meets {}; clearing role", id, role);
                node.role = None;
                Some(role)
            }
            _ => None,
        };
        node.telemetry = Some(telemetry);
        node.touch();
        Ok(TelemetryUpdate { role_cleared })
    }

    /// Assigns `role` after checking the node's telemetry against its qualifier.
    pub fn assign_role(
        &mut self,
        id: NodeId,
        role: DeploymentRole,
        table: &QualifierTable,
    ) -> RegistryResult<()> {
        let node = self.node_mut(id)?;
        let telemetry = node
            .telemetry
            .as_ref()
            .ok_or(RegistryError::MissingTelemetry(id))?;
        table.check(role, telemetry)?;
        node.role = Some(role);
        node.touch();
        log::info!("Assigned {} to {}", role, id);
        Ok(())
    }

    /// Classifies the node from its telemetry and stores the result; an
    /// unclassified node loses any role it held.
    pub fn auto_assign(&mut self, id: NodeId, table: &QualifierTable) -> RegistryResult<Classification> {
        let node = self.node_mut(id)?;
        let telemetry = node
            .telemetry
            .as_ref()
            .ok_or(RegistryError::MissingTelemetry(id))?;
        let classification = table.classify(telemetry);
        node.role = classification.role();
        node.touch();
        log::info!("Classified {} as {}", id, classification);
        Ok(classification)
    }

    pub fn clear_role(&mut self, id: NodeId) -> RegistryResult<Option<DeploymentRole>> {
        let node = self.node_mut(id)?;
        let previous = node.role.take();
        node.touch();
        Ok(previous)
    }

    pub fn record_device_role(&mut self, id: NodeId, device_role: impl Into<String>) -> RegistryResult<()> {
        let node = self.node_mut(id)?;
        node.device_role = Some(device_role.into().to_ascii_uppercase());
        node.touch();
        Ok(())
    }

    /// Records a line-of-sight path between `a` and `b` on both nodes.
    /// Returns false when the link already existed.
    pub fn link(&mut self, a: NodeId, b: NodeId) -> RegistryResult<bool> {
        if a == b {
            return Err(RegistryError::SelfLink(a));
        }
        for id in [a, b] {
            if !self.contains(id) {
                return Err(RegistryError::UnknownNode(id));
            }
        }
        let added_a = self.node_mut(a)?.los_peers.insert(b);
        let added_b = self.node_mut(b)?.los_peers.insert(a);
        if added_a || added_b {
            self.node_mut(a)?.touch();
            self.node_mut(b)?.touch();
            log::info!("Linked {} <-> {}", a, b);
        }
        Ok(added_a || added_b)
    }

    /// Removes the link in both directions. Returns false when there was none.
    pub fn unlink(&mut self, a: NodeId, b: NodeId) -> RegistryResult<bool> {
        for id in [a, b] {
            if !self.contains(id) {
                return Err(RegistryError::UnknownNode(id));
            }
        }
        let removed_a = self.node_mut(a)?.los_peers.remove(&b);
        let removed_b = self.node_mut(b)?.los_peers.remove(&a);
        if removed_a || removed_b {
            self.node_mut(a)?.touch();
            self.node_mut(b)?.touch();
            log::info!("Unlinked {} <-> {}", a, b);
        }
        Ok(removed_a || removed_b)
    }

    /// Removes the node and every reference to it.
    pub fn remove(&mut self, id: NodeId) -> RegistryResult<RegisteredNode> {
        let removed = self.doc.nodes.remove(&id).ok_or(RegistryError::UnknownNode(id))?;
        for node in self.doc.nodes.values_mut() {
            if node.los_peers.remove(&id) {
                node.touch();
            }
        }
        log::info!("Removed node {}", id);
        Ok(removed)
    }

    /// Merges a mesh snapshot: unseen nodes are registered, every node's
    /// firmware role is recorded, and when `link_direct_to` is given that
    /// node gains a LOS link to each zero-hop neighbour.
    pub fn import_snapshot(
        &mut self,
        summaries: &[NodeSummary],
        link_direct_to: Option<NodeId>,
    ) -> RegistryResult<ImportReport> {
        let mut report = ImportReport::default();

        if let Some(local) = link_direct_to {
            let in_snapshot = summaries.iter().any(|s| s.id.parse::<NodeId>().ok() == Some(local));
            if !in_snapshot && !self.contains(local) {
                return Err(RegistryError::UnknownNode(local));
            }
        }

        let mut direct = Vec::new();
        for summary in summaries {
            let id = match summary.id.parse::<NodeId>() {
                Ok(id) => id,
                Err(_) => {
                    log::warn!("Skipping snapshot entry with invalid id {}", summary.id);
                    report.skipped.push(summary.id.clone());
                    continue;
                }
            };
            if self.contains(id) {
                report.updated.push(id);
            } else {
                self.register(id, summary.name.clone())?;
                report.registered.push(id);
            }
            if summary.role != "UNKNOWN" {
                self.record_device_role(id, summary.role.clone())?;
            }
            if summary.is_direct() {
                direct.push(id);
            }
        }

        if let Some(local) = link_direct_to {
            for id in direct.into_iter().filter(|id| *id != local) {
                if self.link(local, id)? {
                    report.linked.push(id);
                }
            }
        }

        Ok(report)
    }

    /// Checks every invariant and a couple of deployment sanity rules.
    pub fn audit(&self, table: &QualifierTable) -> Vec<Finding> {
        audit::audit(self, table)
    }
}
