//! meshroles-types
//! Data structures shared across the meshroles workspace: node identifiers,
//! deployment roles, field telemetry, the role qualifier table and the
//! Meshtastic node-database model.

pub mod error;
pub mod node_id;
pub mod nodedb;
pub mod qualifier;
pub mod role;
pub mod telemetry;

// Re-export core types for easier access
pub use error::TypesError;
pub use node_id::NodeId;
pub use nodedb::{FilterMode, MeshNode, NodeDbError, NodeSummary};
pub use qualifier::{Classification, Criterion, QualifierTable, RoleEvaluation, RoleQualifier, UnmetCriterion};
pub use role::DeploymentRole;
pub use telemetry::{AntennaLocation, NodeTelemetry, PowerSource};
