use crate::context::CliContext;
use crate::error::CliResult;
use clap::Subcommand;
use colored::Colorize;
use meshroles_config::MeshConfig;

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCmd {
    /// Write a config file with the default settings and qualifier table
    Init {
        /// Default serial port to store in the new config
        #[arg(long)]
        port: Option<String>,
    },
    /// Print the effective configuration
    Show,
    /// Print the config and registry paths in use
    Path,
}

pub fn handle_config_command(ctx: &CliContext, cmd: &ConfigCmd) -> CliResult {
    match cmd {
        ConfigCmd::Init { port } => {
            let mut config = MeshConfig::default();
            config.meshtastic.port = port.clone();
            config.write_new(&ctx.config_path)?;
            println!("{} Wrote {}", "✓".green(), ctx.config_path.display());
        }
        ConfigCmd::Show => {
            print!("{}", ctx.config.to_toml_string()?);
        }
        ConfigCmd::Path => {
            println!("config:   {}", ctx.config_path.display());
            println!("registry: {}", ctx.registry_path.display());
        }
    }
    Ok(())
}
