use crate::qualifier::UnmetCriterion;
use crate::role::DeploymentRole;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TypesError {
    #[error("Invalid node id '{0}': expected '!' followed by 8 hex digits")]
    InvalidNodeId(String),

    #[error("Unknown deployment role: {0}")]
    UnknownRole(String),

    #[error("Unknown power source: {0}")]
    UnknownPowerSource(String),

    #[error("Unknown antenna location: {0}")]
    UnknownAntennaLocation(String),

    #[error("Invalid telemetry: {0}")]
    InvalidTelemetry(String),

    #[error("Invalid age '{0}': expected a number followed by s, m, h or d (e.g. 30m, 2h)")]
    InvalidAge(String),

    #[error("Node does not qualify as {role}: {}", join_unmet(.unmet))]
    NotQualified {
        role: DeploymentRole,
        unmet: Vec<UnmetCriterion>,
    },
}

fn join_unmet(unmet: &[UnmetCriterion]) -> String {
    unmet
        .iter()
        .map(|u| u.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
