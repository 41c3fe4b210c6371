use super::roles::TelemetryArgs;
use crate::cli::OutputFormat;
use crate::context::CliContext;
use crate::error::{CliError, CliResult};
use chrono::Utc;
use clap::{Args, Subcommand};
use colored::Colorize;
use meshroles_registry::{RegisteredNode, Registry};
use meshroles_types::nodedb::{parse_info_output, select_nodes};
use meshroles_types::{DeploymentRole, FilterMode, NodeId};
use std::path::PathBuf;

/// Commands for the node role registry
#[derive(Subcommand, Debug, Clone)]
pub enum RegistryCmd {
    /// Register a node
    Add {
        /// Node id, e.g. !a1b2c3d4
        id: NodeId,
        /// Human readable name
        #[arg(long)]
        name: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Change a node's display name
    Rename { id: NodeId, name: String },
    /// Record site-survey telemetry for a node
    Telemetry {
        id: NodeId,
        #[command(flatten)]
        telemetry: TelemetryArgs,
    },
    /// Assign a deployment role; the node's telemetry must qualify
    Assign {
        id: NodeId,
        /// infrastructure, intermediate, neighborhood (hq), mobile or pocket
        role: DeploymentRole,
    },
    /// Classify from telemetry and store the result
    AutoAssign {
        /// Node to classify; every node with telemetry when omitted
        id: Option<NodeId>,
    },
    /// Remove a node's role
    ClearRole { id: NodeId },
    /// Record a line-of-sight path between two nodes
    Link { a: NodeId, b: NodeId },
    /// Remove a line-of-sight path
    Unlink { a: NodeId, b: NodeId },
    /// Remove a node and every link to it
    Remove { id: NodeId },
    /// Show one node
    Show {
        id: NodeId,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },
    /// List registered nodes
    List {
        /// Only nodes holding this role
        #[arg(long)]
        role: Option<DeploymentRole>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },
    /// Check role assignments and line-of-sight links
    Audit {
        /// Fail on advisories too, not only on broken invariants
        #[arg(long)]
        strict: bool,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },
    /// Register the nodes a device has heard
    Import(ImportArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// Serial port for the Meshtastic device
    #[arg(long)]
    pub port: Option<String>,

    /// Read captured `meshtastic --info` output instead of querying a device
    #[arg(long, value_name = "FILE", conflicts_with = "port")]
    pub input: Option<PathBuf>,

    /// Link this node to every directly connected (zero hop) node
    #[arg(long, value_name = "LOCAL_ID")]
    pub link_direct: Option<NodeId>,
}

pub async fn handle_registry_command(ctx: &CliContext, cmd: &RegistryCmd) -> CliResult {
    let mut registry = ctx.open_registry()?;
    let table = ctx.qualifiers();

    let modified = match cmd {
        RegistryCmd::Add { id, name, notes } => {
            registry.register(*id, name.clone())?;
            if notes.is_some() {
                registry.set_notes(*id, notes.clone())?;
            }
            println!("{} Registered {} ({})", "✓".green(), id, name);
            true
        }
        RegistryCmd::Rename { id, name } => {
            registry.rename(*id, name.clone())?;
            println!("{} {} is now {}", "✓".green(), id, name);
            true
        }
        RegistryCmd::Telemetry { id, telemetry } => {
            let telemetry = telemetry.resolve()?;
            let update = registry.set_telemetry(*id, telemetry, table)?;
            println!("{} Telemetry recorded for {}", "✓".green(), id);
            if let Some(role) = update.role_cleared {
                println!("{} {} no longer qualifies as {}; role cleared", "!".yellow(), id, role);
            }
            true
        }
        RegistryCmd::Assign { id, role } => {
            registry.assign_role(*id, *role, table)?;
            println!("{} {} assigned {}", "✓".green(), id, role);
            true
        }
        RegistryCmd::AutoAssign { id } => {
            let ids: Vec<NodeId> = match id {
                Some(id) => vec![*id],
                None => registry
                    .nodes()
                    .filter(|n| n.telemetry.is_some())
                    .map(|n| n.id)
                    .collect(),
            };
            for id in &ids {
                let classification = registry.auto_assign(*id, table)?;
                println!("{}: {}", id, classification);
            }
            !ids.is_empty()
        }
        RegistryCmd::ClearRole { id } => {
            match registry.clear_role(*id)? {
                Some(role) => println!("{} {} no longer holds {}", "✓".green(), id, role),
                None => println!("{} had no role", id),
            }
            true
        }
        RegistryCmd::Link { a, b } => {
            if registry.link(*a, *b)? {
                println!("{} Linked {} <-> {}", "✓".green(), a, b);
            } else {
                println!("{} and {} were already linked", a, b);
            }
            true
        }
        RegistryCmd::Unlink { a, b } => {
            if registry.unlink(*a, *b)? {
                println!("{} Unlinked {} <-> {}", "✓".green(), a, b);
            } else {
                println!("{} and {} were not linked", a, b);
            }
            true
        }
        RegistryCmd::Remove { id } => {
            let node = registry.remove(*id)?;
            println!("{} Removed {} ({})", "✓".green(), id, node.name);
            true
        }
        RegistryCmd::Show { id, output } => {
            let node = registry
                .get(*id)
                .ok_or_else(|| CliError::NotFound(format!("node {}", id)))?;
            match output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(node)?),
                OutputFormat::Text => print!("{}", render_node(node)),
            }
            false
        }
        RegistryCmd::List { role, output } => {
            let nodes: Vec<&RegisteredNode> = match role {
                Some(role) => registry.by_role(*role),
                None => registry.nodes().collect(),
            };
            match output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&nodes)?),
                OutputFormat::Text => print!("{}", render_list(&nodes)),
            }
            false
        }
        RegistryCmd::Audit { strict, output } => {
            let findings = registry.audit(table);
            match output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&findings)?),
                OutputFormat::Text if findings.is_empty() => {
                    println!("{} Registry is consistent ({} nodes)", "✓".green(), registry.len())
                }
                OutputFormat::Text => {
                    for finding in &findings {
                        let marker = if finding.is_violation() { "✗".red() } else { "!".yellow() };
                        println!("{} {}", marker, finding);
                    }
                }
            }
            let failing = findings.iter().filter(|f| *strict || f.is_violation()).count();
            if failing > 0 {
                return Err(CliError::AuditFailed(failing));
            }
            false
        }
        RegistryCmd::Import(args) => {
            import(ctx, &mut registry, args).await?;
            true
        }
    };

    if modified {
        registry.save()?;
    }
    Ok(())
}

async fn import(ctx: &CliContext, registry: &mut Registry, args: &ImportArgs) -> CliResult {
    let source = ctx.node_source(args.port.as_deref(), args.input.as_deref())?;
    let output = source.info_output().await?;
    let db = parse_info_output(&output)?;
    let summaries = select_nodes(&db, FilterMode::All, None, Utc::now());
    let report = registry.import_snapshot(&summaries, args.link_direct)?;

    println!(
        "{} Imported {} nodes from {}: {} new, {} already known, {} linked",
        "✓".green(),
        summaries.len() - report.skipped.len(),
        source.describe(),
        report.registered.len(),
        report.updated.len(),
        report.linked.len()
    );
    for skipped in &report.skipped {
        println!("{} skipped entry with invalid id {}", "!".yellow(), skipped);
    }
    Ok(())
}

fn role_cell(node: &RegisteredNode) -> String {
    node.role.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string())
}

fn render_node(node: &RegisteredNode) -> String {
    let mut out = format!("{} ({})\n", node.name, node.id);
    out.push_str(&format!("  role:        {}\n", role_cell(node)));
    out.push_str(&format!(
        "  device role: {}\n",
        node.device_role.as_deref().unwrap_or("-")
    ));
    match &node.telemetry {
        Some(t) => out.push_str(&format!(
            "  telemetry:   {} ft, {}, {} standalone days, antenna {}\n",
            t.elevation_ft, t.power_source, t.min_standalone_days, t.antenna_location
        )),
        None => out.push_str("  telemetry:   -\n"),
    }
    let peers: Vec<String> = node.los_peers.iter().map(|p| p.to_string()).collect();
    out.push_str(&format!(
        "  LOS peers:   {}\n",
        if peers.is_empty() { "-".to_string() } else { peers.join(", ") }
    ));
    if let Some(notes) = &node.notes {
        out.push_str(&format!("  notes:       {}\n", notes));
    }
    out.push_str(&format!("  updated:     {}\n", node.updated_at.format("%Y-%m-%d %H:%M:%S UTC")));
    out
}

fn render_list(nodes: &[&RegisteredNode]) -> String {
    if nodes.is_empty() {
        return "No registered nodes.\n".to_string();
    }
    let name_w = nodes.iter().map(|n| n.name.chars().count()).max().unwrap_or(0).max(4) + 2;
    let mut out = format!("{:<11} {:<name_w$} {:<17} {}\n", "ID", "Name", "Role", "LOS peers");
    for node in nodes {
        out.push_str(&format!(
            "{:<11} {:<name_w$} {:<17} {}\n",
            node.id.to_string(),
            node.name,
            role_cell(node),
            node.los_peers.len()
        ));
    }
    out
}
