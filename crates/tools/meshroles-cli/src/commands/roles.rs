use crate::cli::OutputFormat;
use crate::context::CliContext;
use crate::error::{CliError, CliResult};
use clap::Args;
use colored::Colorize;
use meshroles_types::{AntennaLocation, DeploymentRole, NodeTelemetry, PowerSource};
use serde_json::json;
use std::fs;
use std::path::PathBuf;

/// Site-survey telemetry, given as flags or as a TOML file.
#[derive(Args, Debug, Clone, Default)]
pub struct TelemetryArgs {
    /// Antenna height above surrounding terrain, in feet
    #[arg(long, value_name = "FEET")]
    pub elevation_ft: Option<f64>,

    /// Power source (grid, grid_with_backup, solar, vehicle, battery)
    #[arg(long, value_name = "SOURCE")]
    pub power: Option<PowerSource>,

    /// Days the node runs with no outside power
    #[arg(long, value_name = "DAYS")]
    pub standalone_days: Option<f64>,

    /// Antenna location (tower, rooftop, mast, attic, window, indoor, vehicle, on_body)
    #[arg(long, value_name = "LOCATION")]
    pub antenna: Option<AntennaLocation>,

    /// TOML file with elevation_ft, power_source, min_standalone_days, antenna_location
    #[arg(
        long = "telemetry",
        value_name = "FILE",
        conflicts_with_all = ["elevation_ft", "power", "standalone_days", "antenna"]
    )]
    pub file: Option<PathBuf>,
}

impl TelemetryArgs {
    pub fn resolve(&self) -> CliResult<NodeTelemetry> {
        if let Some(path) = &self.file {
            let raw = fs::read_to_string(path).map_err(|e| {
                CliError::InvalidArgument(format!("Cannot read telemetry file {}: {}", path.display(), e))
            })?;
            let telemetry: NodeTelemetry = toml::from_str(&raw)?;
            telemetry.validate()?;
            return Ok(telemetry);
        }

        let missing = |flag: &str| {
            CliError::InvalidArgument(format!("missing {} (or pass --telemetry FILE)", flag))
        };
        Ok(NodeTelemetry::new(
            self.elevation_ft.ok_or_else(|| missing("--elevation-ft"))?,
            self.power.ok_or_else(|| missing("--power"))?,
            self.standalone_days.ok_or_else(|| missing("--standalone-days"))?,
            self.antenna.ok_or_else(|| missing("--antenna"))?,
        )?)
    }
}

#[derive(Args, Debug, Clone)]
pub struct ClassifyCmd {
    #[command(flatten)]
    pub telemetry: TelemetryArgs,

    /// Show which criteria each role met or missed
    #[arg(long)]
    pub explain: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

pub fn handle_classify_command(ctx: &CliContext, cmd: &ClassifyCmd) -> CliResult {
    let telemetry = cmd.telemetry.resolve()?;
    let table = ctx.qualifiers();
    let classification = table.classify(&telemetry);
    let evaluations = table.explain(&telemetry);

    match cmd.output {
        OutputFormat::Json => {
            let mut doc = json!({
                "telemetry": telemetry,
                "classification": classification,
            });
            if cmd.explain {
                doc["evaluations"] = serde_json::to_value(&evaluations)?;
            }
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        OutputFormat::Text => {
            println!("Classification: {}", classification.to_string().bold());
            if let Some(role) = classification.role() {
                println!("Recommended device role: {}", role.recommended_device_role());
            }
            if cmd.explain {
                for eval in &evaluations {
                    if eval.qualifies() {
                        println!("  {} {}", "✓".green(), eval.role);
                    } else {
                        let reasons: Vec<String> = eval.unmet.iter().map(|u| u.to_string()).collect();
                        println!("  {} {}: {}", "✗".red(), eval.role, reasons.join("; "));
                    }
                }
            }
        }
    }
    Ok(())
}

#[derive(Args, Debug, Clone)]
pub struct RolesCmd {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

pub fn handle_roles_command(ctx: &CliContext, cmd: &RolesCmd) -> CliResult {
    let table = ctx.qualifiers();
    match cmd.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(table)?),
        OutputFormat::Text => {
            println!("Deployment roles, highest relay responsibility first:");
            for role in DeploymentRole::ALL {
                let relay = if role.is_relay() { " (relay)" } else { "" };
                println!("\n{}{}", role.label().bold(), relay);
                println!("  requires: {}", table.get(role).describe());
                println!("  device role: {}", role.accepted_device_roles().join(" or "));
            }
        }
    }
    Ok(())
}
