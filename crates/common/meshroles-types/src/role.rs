use crate::error::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Deployment role of a mesh node, ordered by relay responsibility.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentRole {
    /// High site (tower, ridge, tall building) on standalone power.
    Infrastructure,
    /// Elevated fixed relay bridging infrastructure and neighborhoods.
    Intermediate,
    /// Fixed station at a home, shelter or team HQ.
    Neighborhood,
    /// Vehicle-mounted node.
    Mobile,
    /// Handheld, battery powered node carried on a person.
    Pocket,
}

impl DeploymentRole {
    /// All roles, highest relay responsibility first.
    pub const ALL: [DeploymentRole; 5] = [
        DeploymentRole::Infrastructure,
        DeploymentRole::Intermediate,
        DeploymentRole::Neighborhood,
        DeploymentRole::Mobile,
        DeploymentRole::Pocket,
    ];

    /// Relay responsibility, 0 being the highest.
    pub fn rank(&self) -> usize {
        match self {
            DeploymentRole::Infrastructure => 0,
            DeploymentRole::Intermediate => 1,
            DeploymentRole::Neighborhood => 2,
            DeploymentRole::Mobile => 3,
            DeploymentRole::Pocket => 4,
        }
    }

    /// Whether nodes in this role are expected to relay for the rest of the mesh.
    pub fn is_relay(&self) -> bool {
        matches!(self, DeploymentRole::Infrastructure | DeploymentRole::Intermediate)
    }

    /// Firmware device roles that fit this deployment role, preferred first.
    pub fn accepted_device_roles(&self) -> &'static [&'static str] {
        match self {
            DeploymentRole::Infrastructure => &["ROUTER", "REPEATER"],
            DeploymentRole::Intermediate => &["ROUTER_LATE", "ROUTER"],
            DeploymentRole::Neighborhood => &["CLIENT", "CLIENT_BASE"],
            DeploymentRole::Mobile => &["CLIENT", "TRACKER", "TAK_TRACKER"],
            DeploymentRole::Pocket => &["CLIENT_MUTE", "CLIENT"],
        }
    }

    pub fn recommended_device_role(&self) -> &'static str {
        self.accepted_device_roles()[0]
    }

    pub fn accepts_device_role(&self, device_role: &str) -> bool {
        let device_role = device_role.trim().to_ascii_uppercase();
        self.accepted_device_roles().iter().any(|r| *r == device_role)
    }

    pub fn label(&self) -> &'static str {
        match self {
            DeploymentRole::Infrastructure => "Infrastructure",
            DeploymentRole::Intermediate => "Intermediate",
            DeploymentRole::Neighborhood => "Neighborhood/HQ",
            DeploymentRole::Mobile => "Mobile",
            DeploymentRole::Pocket => "Pocket",
        }
    }
}

impl fmt::Display for DeploymentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for DeploymentRole {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "infrastructure" | "infra" => Ok(DeploymentRole::Infrastructure),
            "intermediate" => Ok(DeploymentRole::Intermediate),
            "neighborhood" | "hq" | "neighborhood/hq" => Ok(DeploymentRole::Neighborhood),
            "mobile" => Ok(DeploymentRole::Mobile),
            "pocket" => Ok(DeploymentRole::Pocket),
            _ => Err(TypesError::UnknownRole(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_in_rank_order() {
        for (i, role) in DeploymentRole::ALL.iter().enumerate() {
            assert_eq!(role.rank(), i);
        }
    }

    #[test]
    fn test_neighborhood_aliases() {
        for s in ["neighborhood", "HQ", "Neighborhood/HQ"] {
            assert_eq!(s.parse::<DeploymentRole>().unwrap(), DeploymentRole::Neighborhood);
        }
        assert_eq!(DeploymentRole::Neighborhood.to_string(), "Neighborhood/HQ");
        assert!("gateway".parse::<DeploymentRole>().is_err());
    }

    #[test]
    fn test_only_high_sites_relay() {
        assert!(DeploymentRole::Infrastructure.is_relay());
        assert!(DeploymentRole::Intermediate.is_relay());
        assert!(!DeploymentRole::Pocket.is_relay());
    }

    #[test]
    fn test_device_role_fit() {
        assert_eq!(DeploymentRole::Infrastructure.recommended_device_role(), "ROUTER");
        assert!(DeploymentRole::Infrastructure.accepts_device_role("repeater"));
        assert!(!DeploymentRole::Infrastructure.accepts_device_role("CLIENT"));
        assert_eq!(DeploymentRole::Pocket.recommended_device_role(), "CLIENT_MUTE");
    }
}
