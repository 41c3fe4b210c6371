//! Meshtastic node database as printed by `meshtastic --info`.
//!
//! The device prints a human readable report in which the node table appears
//! as a JSON object after the `Nodes in mesh:` marker. This module pulls that
//! object out, deserializes it and turns it into filtered, sorted report rows.

use crate::error::TypesError;
use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const NODES_MARKER: &str = "Nodes in mesh:";

#[derive(Error, Debug)]
pub enum NodeDbError {
    #[error("No 'Nodes in mesh' section found in the output")]
    MarkerNotFound,

    #[error("Failed to extract a balanced JSON block from 'Nodes in mesh'")]
    UnbalancedBlock,

    #[error("Failed to parse node database JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Returns the first balanced `{...}` block following the `Nodes in mesh:` marker.
pub fn extract_node_db(output: &str) -> Result<&str, NodeDbError> {
    let start = output.find(NODES_MARKER).ok_or(NodeDbError::MarkerNotFound)?;
    let rest = &output[start + NODES_MARKER.len()..];
    extract_balanced_braces(rest).ok_or(NodeDbError::UnbalancedBlock)
}

/// Scans from the first `{` to its matching `}`. Braces inside JSON string
/// literals do not count, so long names like `"Relay {north}"` are safe.
pub fn extract_balanced_braces(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshUser {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub long_name: Option<String>,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub hw_model: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Metres above mean sea level.
    #[serde(default)]
    pub altitude: Option<f64>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceMetrics {
    #[serde(default)]
    pub battery_level: Option<u32>,
    #[serde(default)]
    pub voltage: Option<f64>,
    #[serde(default)]
    pub channel_utilization: Option<f64>,
    #[serde(default)]
    pub air_util_tx: Option<f64>,
    #[serde(default)]
    pub uptime_seconds: Option<u64>,
}

/// One entry of the node database. Unknown keys are ignored.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshNode {
    #[serde(default)]
    pub num: Option<u64>,
    #[serde(default)]
    pub user: Option<MeshUser>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub snr: Option<f64>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_heard: Option<i64>,
    #[serde(default)]
    pub hops_away: Option<u32>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub device_metrics: Option<DeviceMetrics>,
}

// The python client has emitted both integer and float epochs.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    })
}

impl MeshNode {
    /// Firmware role, preferring the top-level field; `UNKNOWN` when absent.
    pub fn device_role(&self) -> String {
        self.role
            .as_deref()
            .filter(|r| !r.is_empty())
            .or_else(|| self.user.as_ref().and_then(|u| u.role.as_deref()).filter(|r| !r.is_empty()))
            .unwrap_or("unknown")
            .to_uppercase()
    }

    /// Long name, else short name, else the node key.
    pub fn display_name(&self, key: &str) -> String {
        self.user
            .as_ref()
            .and_then(|u| {
                u.long_name
                    .as_deref()
                    .filter(|n| !n.is_empty())
                    .or_else(|| u.short_name.as_deref().filter(|n| !n.is_empty()))
            })
            .unwrap_or(key)
            .to_string()
    }

    pub fn is_direct(&self) -> bool {
        self.hops_away == Some(0)
    }

    pub fn is_router(&self) -> bool {
        let role = self.device_role();
        role.contains("ROUTER") || role.contains("REPEATER")
    }
}

pub type NodeDb = BTreeMap<String, MeshNode>;

pub fn parse_node_db(json: &str) -> Result<NodeDb, NodeDbError> {
    Ok(serde_json::from_str(json)?)
}

/// Extracts and parses the node database from raw `--info` output.
pub fn parse_info_output(output: &str) -> Result<NodeDb, NodeDbError> {
    let block = extract_node_db(output)?;
    log::debug!("Extracted node database block of {} bytes", block.len());
    parse_node_db(block)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    All,
    Direct,
    Routers,
}

impl FilterMode {
    pub fn label(&self) -> &'static str {
        match self {
            FilterMode::All => "All Nodes",
            FilterMode::Direct => "Directly Connected Nodes",
            FilterMode::Routers => "Router and Repeater Nodes",
        }
    }

    pub fn accepts(&self, node: &MeshNode) -> bool {
        match self {
            FilterMode::All => true,
            FilterMode::Direct => node.is_direct(),
            FilterMode::Routers => node.is_router(),
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterMode::All => write!(f, "all"),
            FilterMode::Direct => write!(f, "direct"),
            FilterMode::Routers => write!(f, "routers"),
        }
    }
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(FilterMode::All),
            "direct" => Ok(FilterMode::Direct),
            "routers" => Ok(FilterMode::Routers),
            other => Err(format!("unknown mode '{}' (expected all, direct or routers)", other)),
        }
    }
}

/// Parses ages like `30s`, `5m`, `2h` or `1d`.
pub fn parse_age(s: &str) -> Result<Duration, TypesError> {
    let invalid = || TypesError::InvalidAge(s.to_string());
    let trimmed = s.trim();
    let unit = trimmed.chars().last().ok_or_else(invalid)?;
    let digits = &trimmed[..trimmed.len() - unit.len_utf8()];
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let value: i64 = digits.parse::<u32>().map_err(|_| invalid())?.into();
    let seconds = match unit {
        's' => value,
        'm' => value * 60,
        'h' => value * 3_600,
        'd' => value * 86_400,
        _ => return Err(invalid()),
    };
    Ok(Duration::seconds(seconds))
}

/// Renders an epoch in local time; `N/A` when missing.
pub fn format_timestamp(ts: Option<i64>) -> String {
    match ts {
        None => "N/A".to_string(),
        Some(secs) => match Local.timestamp_opt(secs, 0).single() {
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => "Invalid timestamp".to_string(),
        },
    }
}

/// One row of the node report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub name: String,
    pub id: String,
    pub role: String,
    pub snr: Option<f64>,
    pub hops_away: Option<u32>,
    pub last_heard: Option<i64>,
    pub last_heard_str: String,
}

impl NodeSummary {
    pub fn from_node(key: &str, node: &MeshNode) -> Self {
        NodeSummary {
            name: node.display_name(key),
            id: key.to_string(),
            role: node.device_role(),
            snr: node.snr,
            hops_away: node.hops_away,
            last_heard: node.last_heard,
            last_heard_str: format_timestamp(node.last_heard),
        }
    }

    pub fn is_direct(&self) -> bool {
        self.hops_away == Some(0)
    }
}

/// Applies the mode and age filters, then sorts most recently heard first.
/// Nodes that were never heard are kept by the age filter and sort last.
pub fn select_nodes(
    db: &NodeDb,
    mode: FilterMode,
    max_age: Option<Duration>,
    now: DateTime<Utc>,
) -> Vec<NodeSummary> {
    // An age reaching past the earliest representable time keeps everything.
    let cutoff = max_age
        .and_then(|age| now.checked_sub_signed(age))
        .map(|t| t.timestamp());

    let mut rows: Vec<NodeSummary> = db
        .iter()
        .filter(|(_, node)| mode.accepts(node))
        .filter(|(_, node)| match (cutoff, node.last_heard) {
            (Some(cutoff), Some(heard)) => heard >= cutoff,
            _ => true,
        })
        .map(|(key, node)| NodeSummary::from_node(key, node))
        .collect();

    rows.sort_by(|a, b| b.last_heard.unwrap_or(0).cmp(&a.last_heard.unwrap_or(0)));
    log::debug!("Selected {} of {} nodes (mode: {})", rows.len(), db.len(), mode);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    const INFO_OUTPUT: &str = r#"Connected to radio
Owner: Base Camp (BASE)
My info: { "myNodeNum": 2864434397 }

Nodes in mesh: {
  "!aabbccdd": {
    "num": 2864434397,
    "user": { "id": "!aabbccdd", "longName": "Base Camp", "shortName": "BASE", "role": "CLIENT" },
    "lastHeard": 1700000300
  },
  "!11111111": {
    "num": 286331153,
    "user": { "id": "!11111111", "longName": "Ridge {north}", "shortName": "RDG" },
    "role": "router",
    "snr": 6.25,
    "lastHeard": 1700000000,
    "hopsAway": 0
  },
  "!22222222": {
    "user": { "shortName": "CAR" },
    "snr": -3.5,
    "lastHeard": 1699990000.7,
    "hopsAway": 1,
    "deviceMetrics": { "batteryLevel": 80 }
  },
  "!33333333": {
    "user": { "longName": "Silo", "role": "REPEATER" },
    "hopsAway": 0
  }
}

Preferences: { "lora": {} }
"#;

    fn db() -> NodeDb {
        parse_info_output(INFO_OUTPUT).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_600, 0).unwrap()
    }

    #[test]
    fn test_extract_ignores_braces_in_strings() {
        let block = extract_node_db(INFO_OUTPUT).unwrap();
        assert!(block.starts_with('{'));
        assert!(block.ends_with('}'));
        assert!(block.contains("Ridge {north}"));
        assert!(!block.contains("Preferences"));
    }

    #[test]
    fn test_extract_errors() {
        assert!(matches!(extract_node_db("no table here"), Err(NodeDbError::MarkerNotFound)));
        assert!(matches!(
            extract_node_db("Nodes in mesh: { \"a\": {"),
            Err(NodeDbError::UnbalancedBlock)
        ));
        assert!(matches!(extract_node_db("Nodes in mesh:"), Err(NodeDbError::UnbalancedBlock)));
    }

    #[test]
    fn test_escaped_quote_inside_string() {
        let text = r#"{"name": "say \"}\" twice"} trailing }"#;
        assert_eq!(extract_balanced_braces(text), Some(r#"{"name": "say \"}\" twice"}"#));
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let err = parse_info_output("Nodes in mesh: { \"!11111111\": nope }").unwrap_err();
        assert!(matches!(err, NodeDbError::Json(_)));
    }

    #[test]
    fn test_name_and_role_fallbacks() {
        let db = db();
        let car = &db["!22222222"];
        assert_eq!(car.display_name("!22222222"), "CAR");
        assert_eq!(car.device_role(), "UNKNOWN");
        assert_eq!(car.last_heard, Some(1_699_990_000));
        assert_eq!(car.device_metrics.as_ref().and_then(|m| m.battery_level), Some(80));

        let ridge = &db["!11111111"];
        assert_eq!(ridge.device_role(), "ROUTER");
        assert!(ridge.is_router());

        let bare = MeshNode::default();
        assert_eq!(bare.display_name("!deadbeef"), "!deadbeef");
    }

    #[test]
    fn test_select_all_sorted_by_last_heard() {
        let rows = select_nodes(&db(), FilterMode::All, None, now());
        let ids: Vec<_> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["!aabbccdd", "!11111111", "!22222222", "!33333333"]);
        assert_eq!(rows[3].last_heard_str, "N/A");
    }

    #[test]
    fn test_select_direct_and_routers() {
        let direct = select_nodes(&db(), FilterMode::Direct, None, now());
        let ids: Vec<_> = direct.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["!11111111", "!33333333"]);

        let routers = select_nodes(&db(), FilterMode::Routers, None, now());
        let roles: Vec<_> = routers.iter().map(|r| r.role.as_str()).collect();
        assert_eq!(roles, vec!["ROUTER", "REPEATER"]);
    }

    #[test]
    fn test_age_filter_keeps_never_heard_nodes() {
        let age = parse_age("10m").unwrap();
        let rows = select_nodes(&db(), FilterMode::All, Some(age), now());
        let ids: Vec<_> = rows.iter().map(|r| r.id.as_str()).collect();
        // !22222222 was heard ~10600s before now
        assert_eq!(ids, vec!["!aabbccdd", "!11111111", "!33333333"]);
    }

    #[test]
    fn test_age_filter_keeps_node_heard_exactly_at_cutoff() {
        // !11111111 was heard exactly 600s before now
        let at_cutoff = select_nodes(&db(), FilterMode::Direct, Some(parse_age("600s").unwrap()), now());
        assert!(at_cutoff.iter().any(|r| r.id == "!11111111"));

        let just_past = select_nodes(&db(), FilterMode::Direct, Some(parse_age("599s").unwrap()), now());
        let ids: Vec<_> = just_past.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["!33333333"]);
    }

    #[test]
    fn test_age_beyond_calendar_range_keeps_everything() {
        let age = parse_age("100000000d").unwrap();
        assert_eq!(select_nodes(&db(), FilterMode::All, Some(age), now()).len(), 4);
        assert_eq!(select_nodes(&db(), FilterMode::All, Some(age), Utc::now()).len(), 4);
    }

    #[test]
    fn test_parse_age() {
        assert_eq!(parse_age("45s").unwrap(), Duration::seconds(45));
        assert_eq!(parse_age("5m").unwrap(), Duration::minutes(5));
        assert_eq!(parse_age("2h").unwrap(), Duration::hours(2));
        assert_eq!(parse_age("1d").unwrap(), Duration::days(1));
        for bad in ["", "h", "1", "1w", "1h30m", "-1h", "1.5h"] {
            assert!(parse_age(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(None), "N/A");
        assert_eq!(format_timestamp(Some(i64::MAX)), "Invalid timestamp");
        assert_eq!(format_timestamp(Some(1_700_000_000)).len(), 19);
    }

    #[test]
    fn test_filter_mode_from_str() {
        assert_eq!("Direct".parse::<FilterMode>().unwrap(), FilterMode::Direct);
        assert!("nearby".parse::<FilterMode>().is_err());
        assert_eq!(FilterMode::Routers.label(), "Router and Repeater Nodes");
    }
}
