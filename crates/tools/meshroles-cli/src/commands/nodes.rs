use crate::cli::OutputFormat;
use crate::context::CliContext;
use crate::error::{CliError, CliResult};
use chrono::Utc;
use clap::Args;
use colored::Colorize;
use meshroles_types::nodedb::{parse_age, parse_info_output, select_nodes};
use meshroles_types::{FilterMode, NodeSummary};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug, Clone)]
pub struct NodesCmd {
    /// Serial port for the Meshtastic device (e.g., /dev/ttyUSB0)
    pub port: Option<String>,

    /// Read captured `meshtastic --info` output instead of querying a device
    #[arg(long, value_name = "FILE", conflicts_with = "port")]
    pub input: Option<PathBuf>,

    /// Filter mode: all nodes, direct connections only, or routers/repeaters only
    #[arg(long, default_value = "all")]
    pub mode: FilterMode,

    /// Same as --mode direct
    #[arg(long, conflicts_with_all = ["mode", "routers"])]
    pub direct: bool,

    /// Same as --mode routers
    #[arg(long, conflicts_with = "mode")]
    pub routers: bool,

    /// Only show nodes heard within this time (format: 1s, 5m, 2h, 1d)
    #[arg(long)]
    pub age: Option<String>,

    /// Save node data to a JSON file
    #[arg(long, value_name = "FILENAME")]
    pub json_out: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

impl NodesCmd {
    pub fn effective_mode(&self) -> FilterMode {
        if self.direct {
            FilterMode::Direct
        } else if self.routers {
            FilterMode::Routers
        } else {
            self.mode
        }
    }
}

pub async fn handle_nodes_command(ctx: &CliContext, cmd: &NodesCmd) -> CliResult {
    let max_age = cmd.age.as_deref().map(parse_age).transpose()?;
    let mode = cmd.effective_mode();

    let source = ctx.node_source(cmd.port.as_deref(), cmd.input.as_deref())?;
    log::info!("Reading node database from {}", source.describe());
    let output = source.info_output().await?;
    let db = parse_info_output(&output)?;
    let rows = select_nodes(&db, mode, max_age, Utc::now());

    match cmd.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Text => print!("{}", render_table(&rows, mode)),
    }

    if let Some(path) = &cmd.json_out {
        write_report(path, &rows)?;
        println!("\n{} JSON report saved to {}", "✓".green(), path.display());
    }

    Ok(())
}

fn write_report(path: &Path, rows: &[NodeSummary]) -> CliResult {
    let json = serde_json::to_string_pretty(rows)?;
    fs::write(path, json).map_err(|e| {
        CliError::InvalidArgument(format!("Error writing to JSON file {}: {}", path.display(), e))
    })
}

/// Column-aligned report, one node per line.
pub fn render_table(rows: &[NodeSummary], mode: FilterMode) -> String {
    let mut out = format!("\n{} (Filtered & Sorted):\n", mode.label());

    if rows.is_empty() {
        out.push_str("No nodes found matching the criteria.\n");
        return out;
    }

    let width = |f: fn(&NodeSummary) -> usize, header: &str| {
        rows.iter().map(f).max().unwrap_or(0).max(header.len()) + 2
    };
    let name_w = width(|r| r.name.chars().count(), "Name");
    let id_w = width(|r| r.id.len(), "ID");
    let role_w = width(|r| r.role.len(), "Role");

    out.push_str(&format!(
        "{:<name_w$} {:<id_w$} {:<role_w$} {:<8} {:<5} {}\n",
        "Name", "ID", "Role", "SNR", "Hops", "Last Heard"
    ));
    out.push_str(&format!(
        "{} {} {} {} {} {}\n",
        "-".repeat(name_w),
        "-".repeat(id_w),
        "-".repeat(role_w),
        "-".repeat(8),
        "-".repeat(5),
        "-".repeat(19)
    ));

    for row in rows {
        let snr = row.snr.map(|s| s.to_string()).unwrap_or_else(|| "N/A".to_string());
        let hops = row.hops_away.map(|h| h.to_string()).unwrap_or_else(|| "N/A".to_string());
        out.push_str(&format!(
            "{:<name_w$} {:<id_w$} {:<role_w$} {:<8} {:<5} {}\n",
            row.name, row.id, row.role, snr, hops, row.last_heard_str
        ));
    }
    out
}
