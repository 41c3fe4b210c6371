use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::commands::config::ConfigCmd;
use crate::commands::nodes::NodesCmd;
use crate::commands::registry::RegistryCmd;
use crate::commands::roles::{ClassifyCmd, RolesCmd};

#[derive(Parser, Debug)]
#[command(
    name = "meshroles",
    author,
    version,
    about = "Inspect a Meshtastic mesh and keep track of node deployment roles",
    long_about = None
)]
pub struct Cli {
    #[command(flatten)]
    pub global_opts: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct GlobalOpts {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to <data dir>/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Registry file (overrides the config file)
    #[arg(long, global = true, value_name = "PATH")]
    pub registry: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List nodes the device has heard, filtered and sorted
    Nodes(NodesCmd),

    /// Classify a node from its site-survey telemetry
    Classify(ClassifyCmd),

    /// Show the role qualifier table in effect
    Roles(RolesCmd),

    /// Manage the node role registry
    #[command(subcommand)]
    Registry(RegistryCmd),

    /// Create or inspect the config file
    #[command(subcommand)]
    Config(ConfigCmd),

    /// Check the local environment
    Doctor,
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
