//! End-to-end flow of a field survey: read what the device hears, register
//! it, record site telemetry, classify, link and audit, with thresholds
//! coming from a config file.

use anyhow::Result;
use chrono::{TimeZone, Utc};
use meshroles_config::MeshConfig;
use meshroles_registry::{Finding, Registry};
use meshroles_types::nodedb::{parse_info_output, select_nodes};
use meshroles_types::{
    AntennaLocation, Classification, DeploymentRole, FilterMode, NodeId, NodeTelemetry, PowerSource,
};
use tempfile::tempdir;

const INFO: &str = r#"Connected to radio
Nodes in mesh: {
  "!0a0a0a0a": { "user": { "longName": "HQ Barn", "role": "CLIENT" }, "lastHeard": 1760000000 },
  "!0b0b0b0b": { "user": { "longName": "Water Tower", "role": "ROUTER" }, "hopsAway": 0, "snr": 9.5, "lastHeard": 1759999000 },
  "!0c0c0c0c": { "user": { "longName": "Hill House", "role": "CLIENT" }, "hopsAway": 0, "lastHeard": 1759998000 },
  "!0d0d0d0d": { "user": { "shortName": "PKT1" }, "hopsAway": 2, "lastHeard": 1759000000 }
}
"#;

fn id(s: &str) -> NodeId {
    s.parse().unwrap()
}

#[test]
fn survey_classify_link_and_audit() -> Result<()> {
    let dir = tempdir()?;
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        format!(
            "[registry]\npath = {:?}\n\n[qualifiers.intermediate]\nelevation_above_ft = 20.0\nmin_standalone_days = 2.0\nantenna_locations = [\"rooftop\", \"attic\"]\n",
            dir.path().join("registry.json")
        ),
    )?;
    let config = MeshConfig::load(&config_path)?;
    let table = &config.qualifiers;

    let db = parse_info_output(INFO)?;
    let now = Utc.timestamp_opt(1_760_000_100, 0).unwrap();
    let snapshot = select_nodes(&db, FilterMode::All, None, now);
    assert_eq!(snapshot.len(), 4);

    let mut registry = Registry::open(config.registry_path()?)?;
    let report = registry.import_snapshot(&snapshot, Some(id("!0a0a0a0a")))?;
    assert_eq!(report.registered.len(), 4);
    assert_eq!(report.linked, vec![id("!0b0b0b0b"), id("!0c0c0c0c")]);

    let surveys = [
        ("!0a0a0a0a", NodeTelemetry::new(10.0, PowerSource::GridWithBackup, 2.0, AntennaLocation::Window)?),
        ("!0b0b0b0b", NodeTelemetry::new(130.0, PowerSource::Solar, 12.0, AntennaLocation::Tower)?),
        ("!0c0c0c0c", NodeTelemetry::new(24.0, PowerSource::Grid, 2.0, AntennaLocation::Attic)?),
        ("!0d0d0d0d", NodeTelemetry::new(5.0, PowerSource::Battery, 1.0, AntennaLocation::OnBody)?),
    ];
    let mut roles = Vec::new();
    for (node, telemetry) in surveys {
        registry.set_telemetry(id(node), telemetry, table)?;
        roles.push(registry.auto_assign(id(node), table)?);
    }
    assert_eq!(
        roles,
        vec![
            Classification::Classified(DeploymentRole::Neighborhood),
            Classification::Classified(DeploymentRole::Infrastructure),
            Classification::Classified(DeploymentRole::Intermediate),
            Classification::Classified(DeploymentRole::Pocket),
        ]
    );

    registry.link(id("!0b0b0b0b"), id("!0c0c0c0c"))?;
    registry.save()?;

    let reopened = Registry::open(config.registry_path()?)?;
    assert_eq!(reopened.by_role(DeploymentRole::Infrastructure).len(), 1);
    let findings = reopened.audit(table);
    // The hill house still advertises CLIENT though it now relays.
    assert_eq!(
        findings,
        vec![Finding::DeviceRoleMismatch {
            node: id("!0c0c0c0c"),
            role: DeploymentRole::Intermediate,
            device_role: "CLIENT".to_string(),
            expected: "ROUTER_LATE".to_string(),
        }]
    );
    Ok(())
}

#[test]
fn tightened_thresholds_surface_in_audit() -> Result<()> {
    let loose = MeshConfig::default();
    let tight = MeshConfig::from_toml_str("[qualifiers.intermediate]\nelevation_above_ft = 80.0\n")?;
    let ridge = id("!00c0ffee");
    let valley = id("!00beef00");

    let mut registry = Registry::new();
    registry.register(ridge, "Ridge")?;
    registry.register(valley, "Valley")?;
    registry.link(ridge, valley)?;
    let telemetry = NodeTelemetry::new(60.0, PowerSource::Solar, 10.0, AntennaLocation::Mast)?;
    registry.set_telemetry(ridge, telemetry.clone(), &loose.qualifiers)?;
    registry.assign_role(ridge, DeploymentRole::Intermediate, &loose.qualifiers)?;
    assert!(registry.audit(&loose.qualifiers).is_empty());

    let findings = registry.audit(&tight.qualifiers);
    assert_eq!(findings.len(), 1);
    assert!(findings[0].is_violation());
    assert_eq!(
        findings[0].to_string(),
        "!00c0ffee no longer qualifies as Intermediate: elevation is 60 ft (requires > 80 ft)"
    );

    // Re-surveying under the tighter table drops the stale role.
    let update = registry.set_telemetry(ridge, telemetry, &tight.qualifiers)?;
    assert_eq!(update.role_cleared, Some(DeploymentRole::Intermediate));
    assert!(registry.audit(&tight.qualifiers).is_empty());
    Ok(())
}
