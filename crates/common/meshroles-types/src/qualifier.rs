//! Role qualifier table and the classifier built on it.
//!
//! A qualifier lists the physical criteria a node must meet to hold a
//! deployment role. Classification walks the roles from the highest relay
//! responsibility down and picks the first one whose criteria are all met.

use crate::error::TypesError;
use crate::role::DeploymentRole;
use crate::telemetry::{AntennaLocation, NodeTelemetry, PowerSource};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleQualifier {
    /// Antenna must sit strictly higher than this, in feet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_above_ft: Option<f64>,
    /// Node must run at least this many days without outside power.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_standalone_days: Option<f64>,
    /// Accepted power sources; empty accepts any.
    #[serde(default)]
    pub power_sources: Vec<PowerSource>,
    /// Accepted antenna locations; empty accepts any.
    #[serde(default)]
    pub antenna_locations: Vec<AntennaLocation>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Elevation,
    StandaloneDays,
    PowerSource,
    AntennaLocation,
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criterion::Elevation => write!(f, "elevation"),
            Criterion::StandaloneDays => write!(f, "standalone days"),
            Criterion::PowerSource => write!(f, "power source"),
            Criterion::AntennaLocation => write!(f, "antenna location"),
        }
    }
}

/// A criterion the node failed, with what was observed and what is required.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmetCriterion {
    pub criterion: Criterion,
    pub observed: String,
    pub required: String,
}

impl fmt::Display for UnmetCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is {} (requires {})", self.criterion, self.observed, self.required)
    }
}

impl RoleQualifier {
    /// Every criterion `telemetry` fails. An empty result means the node qualifies.
    pub fn evaluate(&self, telemetry: &NodeTelemetry) -> Vec<UnmetCriterion> {
        let mut unmet = Vec::new();

        if let Some(min) = self.elevation_above_ft {
            if telemetry.elevation_ft <= min {
                unmet.push(UnmetCriterion {
                    criterion: Criterion::Elevation,
                    observed: format!("{} ft", telemetry.elevation_ft),
                    required: format!("> {} ft", min),
                });
            }
        }

        if let Some(min) = self.min_standalone_days {
            if telemetry.min_standalone_days < min {
                unmet.push(UnmetCriterion {
                    criterion: Criterion::StandaloneDays,
                    observed: format!("{} days", telemetry.min_standalone_days),
                    required: format!(">= {} days", min),
                });
            }
        }

        if !self.power_sources.is_empty() && !self.power_sources.contains(&telemetry.power_source) {
            unmet.push(UnmetCriterion {
                criterion: Criterion::PowerSource,
                observed: telemetry.power_source.to_string(),
                required: join(&self.power_sources),
            });
        }

        if !self.antenna_locations.is_empty()
            && !self.antenna_locations.contains(&telemetry.antenna_location)
        {
            unmet.push(UnmetCriterion {
                criterion: Criterion::AntennaLocation,
                observed: telemetry.antenna_location.to_string(),
                required: join(&self.antenna_locations),
            });
        }

        unmet
    }

    pub fn is_met(&self, telemetry: &NodeTelemetry) -> bool {
        self.evaluate(telemetry).is_empty()
    }

    /// One-line human summary, e.g. `elevation > 100 ft, standalone >= 7 days, ...`.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(min) = self.elevation_above_ft {
            parts.push(format!("elevation > {} ft", min));
        }
        if let Some(min) = self.min_standalone_days {
            parts.push(format!("standalone >= {} days", min));
        }
        if !self.power_sources.is_empty() {
            parts.push(format!("power: {}", join(&self.power_sources)));
        }
        if !self.antenna_locations.is_empty() {
            parts.push(format!("antenna: {}", join(&self.antenna_locations)));
        }
        if parts.is_empty() {
            "no requirements".to_string()
        } else {
            parts.join(", ")
        }
    }

    pub fn default_infrastructure() -> Self {
        RoleQualifier {
            elevation_above_ft: Some(100.0),
            min_standalone_days: Some(7.0),
            power_sources: vec![PowerSource::Solar, PowerSource::GridWithBackup],
            antenna_locations: vec![AntennaLocation::Tower, AntennaLocation::Rooftop, AntennaLocation::Mast],
        }
    }

    pub fn default_intermediate() -> Self {
        RoleQualifier {
            elevation_above_ft: Some(30.0),
            min_standalone_days: Some(3.0),
            power_sources: vec![PowerSource::Solar, PowerSource::GridWithBackup, PowerSource::Grid],
            antenna_locations: vec![
                AntennaLocation::Tower,
                AntennaLocation::Rooftop,
                AntennaLocation::Mast,
                AntennaLocation::Attic,
            ],
        }
    }

    pub fn default_neighborhood() -> Self {
        RoleQualifier {
            elevation_above_ft: None,
            min_standalone_days: Some(1.0),
            power_sources: vec![PowerSource::Grid, PowerSource::GridWithBackup, PowerSource::Solar],
            antenna_locations: vec![
                AntennaLocation::Rooftop,
                AntennaLocation::Mast,
                AntennaLocation::Attic,
                AntennaLocation::Window,
                AntennaLocation::Indoor,
            ],
        }
    }

    pub fn default_mobile() -> Self {
        RoleQualifier {
            power_sources: vec![PowerSource::Vehicle],
            antenna_locations: vec![AntennaLocation::Vehicle],
            ..Default::default()
        }
    }

    pub fn default_pocket() -> Self {
        RoleQualifier {
            power_sources: vec![PowerSource::Battery],
            antenna_locations: vec![AntennaLocation::OnBody],
            ..Default::default()
        }
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(" | ")
}

/// Qualifier for every deployment role. Each row can be overridden on its own
/// from configuration; rows left out keep their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QualifierTable {
    #[serde(default = "RoleQualifier::default_infrastructure")]
    pub infrastructure: RoleQualifier,
    #[serde(default = "RoleQualifier::default_intermediate")]
    pub intermediate: RoleQualifier,
    #[serde(default = "RoleQualifier::default_neighborhood")]
    pub neighborhood: RoleQualifier,
    #[serde(default = "RoleQualifier::default_mobile")]
    pub mobile: RoleQualifier,
    #[serde(default = "RoleQualifier::default_pocket")]
    pub pocket: RoleQualifier,
}

impl Default for QualifierTable {
    fn default() -> Self {
        QualifierTable {
            infrastructure: RoleQualifier::default_infrastructure(),
            intermediate: RoleQualifier::default_intermediate(),
            neighborhood: RoleQualifier::default_neighborhood(),
            mobile: RoleQualifier::default_mobile(),
            pocket: RoleQualifier::default_pocket(),
        }
    }
}

/// Outcome of classifying a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "role", rename_all = "snake_case")]
pub enum Classification {
    Classified(DeploymentRole),
    Unclassified,
}

impl Classification {
    pub fn role(&self) -> Option<DeploymentRole> {
        match self {
            Classification::Classified(role) => Some(*role),
            Classification::Unclassified => None,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Classified(role) => write!(f, "{}", role),
            Classification::Unclassified => write!(f, "Unclassified"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoleEvaluation {
    pub role: DeploymentRole,
    pub unmet: Vec<UnmetCriterion>,
}

impl RoleEvaluation {
    pub fn qualifies(&self) -> bool {
        self.unmet.is_empty()
    }
}

impl QualifierTable {
    pub fn get(&self, role: DeploymentRole) -> &RoleQualifier {
        match role {
            DeploymentRole::Infrastructure => &self.infrastructure,
            DeploymentRole::Intermediate => &self.intermediate,
            DeploymentRole::Neighborhood => &self.neighborhood,
            DeploymentRole::Mobile => &self.mobile,
            DeploymentRole::Pocket => &self.pocket,
        }
    }

    pub fn classify(&self, telemetry: &NodeTelemetry) -> Classification {
        let found = DeploymentRole::ALL
            .into_iter()
            .find(|role| self.get(*role).is_met(telemetry));
        match found {
            Some(role) => Classification::Classified(role),
            None => Classification::Unclassified,
        }
    }

    /// Per-role breakdown, highest relay responsibility first.
    pub fn explain(&self, telemetry: &NodeTelemetry) -> Vec<RoleEvaluation> {
        DeploymentRole::ALL
            .into_iter()
            .map(|role| RoleEvaluation {
                role,
                unmet: self.get(role).evaluate(telemetry),
            })
            .collect()
    }

    /// Fails with `NotQualified` unless `telemetry` meets `role`'s qualifier.
    pub fn check(&self, role: DeploymentRole, telemetry: &NodeTelemetry) -> Result<(), TypesError> {
        let unmet = self.get(role).evaluate(telemetry);
        if unmet.is_empty() {
            Ok(())
        } else {
            Err(TypesError::NotQualified { role, unmet })
        }
    }
}
