use crate::error::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerSource {
    /// Mains power with no backup.
    Grid,
    /// Mains power with battery or generator backup.
    GridWithBackup,
    /// Solar panel charging a battery.
    Solar,
    /// Vehicle electrical system.
    Vehicle,
    /// Internal or pack battery only.
    Battery,
}

impl PowerSource {
    pub const ALL: [PowerSource; 5] = [
        PowerSource::Grid,
        PowerSource::GridWithBackup,
        PowerSource::Solar,
        PowerSource::Vehicle,
        PowerSource::Battery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PowerSource::Grid => "grid",
            PowerSource::GridWithBackup => "grid_with_backup",
            PowerSource::Solar => "solar",
            PowerSource::Vehicle => "vehicle",
            PowerSource::Battery => "battery",
        }
    }
}

impl fmt::Display for PowerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PowerSource {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize(s);
        PowerSource::ALL
            .into_iter()
            .find(|p| p.as_str() == key)
            .ok_or_else(|| TypesError::UnknownPowerSource(s.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AntennaLocation {
    Tower,
    Rooftop,
    Mast,
    Attic,
    Window,
    Indoor,
    Vehicle,
    OnBody,
}

impl AntennaLocation {
    pub const ALL: [AntennaLocation; 8] = [
        AntennaLocation::Tower,
        AntennaLocation::Rooftop,
        AntennaLocation::Mast,
        AntennaLocation::Attic,
        AntennaLocation::Window,
        AntennaLocation::Indoor,
        AntennaLocation::Vehicle,
        AntennaLocation::OnBody,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AntennaLocation::Tower => "tower",
            AntennaLocation::Rooftop => "rooftop",
            AntennaLocation::Mast => "mast",
            AntennaLocation::Attic => "attic",
            AntennaLocation::Window => "window",
            AntennaLocation::Indoor => "indoor",
            AntennaLocation::Vehicle => "vehicle",
            AntennaLocation::OnBody => "on_body",
        }
    }

    /// Outdoors and clear of the supporting structure.
    pub fn is_exposed(&self) -> bool {
        matches!(self, AntennaLocation::Tower | AntennaLocation::Rooftop | AntennaLocation::Mast)
    }
}

impl fmt::Display for AntennaLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AntennaLocation {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize(s);
        AntennaLocation::ALL
            .into_iter()
            .find(|a| a.as_str() == key)
            .ok_or_else(|| TypesError::UnknownAntennaLocation(s.to_string()))
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}

/// Physical deployment facts reported for a node during a site survey.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeTelemetry {
    /// Antenna height above surrounding terrain, in feet.
    pub elevation_ft: f64,
    pub power_source: PowerSource,
    /// Days the node keeps running with no external power or service visit.
    pub min_standalone_days: f64,
    pub antenna_location: AntennaLocation,
}

impl NodeTelemetry {
    pub fn new(
        elevation_ft: f64,
        power_source: PowerSource,
        min_standalone_days: f64,
        antenna_location: AntennaLocation,
    ) -> Result<Self, TypesError> {
        let telemetry = NodeTelemetry {
            elevation_ft,
            power_source,
            min_standalone_days,
            antenna_location,
        };
        telemetry.validate()?;
        Ok(telemetry)
    }

    pub fn validate(&self) -> Result<(), TypesError> {
        if !self.elevation_ft.is_finite() || self.elevation_ft < 0.0 {
            return Err(TypesError::InvalidTelemetry(format!(
                "elevation must be a non-negative number of feet, got {}",
                self.elevation_ft
            )));
        }
        if !self.min_standalone_days.is_finite() || self.min_standalone_days < 0.0 {
            return Err(TypesError::InvalidTelemetry(format!(
                "standalone days must be a non-negative number, got {}",
                self.min_standalone_days
            )));
        }
        Ok(())
    }
}
