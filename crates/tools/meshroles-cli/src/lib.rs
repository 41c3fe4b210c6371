//! meshroles command-line tool.

pub mod cli;
pub mod commands;
pub mod context;
pub mod error;
pub mod source;

// Re-export key types
pub use cli::{Cli, Commands, GlobalOpts, OutputFormat};
pub use context::CliContext;
pub use error::{CliError, CliResult};

/// Sets up env_logger; `RUST_LOG` wins over the `-v` count.
pub fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env = env_logger::Env::default().default_filter_or(level);
    // Ignore error if logger is already initialized
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}

/// Main library entry point.
pub async fn run(cli: Cli) -> CliResult<()> {
    let ctx = match cli.command {
        Commands::Doctor => CliContext::lenient(&cli.global_opts)?,
        _ => CliContext::new(&cli.global_opts)?,
    };

    match cli.command {
        Commands::Nodes(cmd) => commands::nodes::handle_nodes_command(&ctx, &cmd).await?,
        Commands::Classify(cmd) => commands::roles::handle_classify_command(&ctx, &cmd)?,
        Commands::Roles(cmd) => commands::roles::handle_roles_command(&ctx, &cmd)?,
        Commands::Registry(cmd) => commands::registry::handle_registry_command(&ctx, &cmd).await?,
        Commands::Config(cmd) => commands::config::handle_config_command(&ctx, &cmd)?,
        Commands::Doctor => commands::doctor::run_diagnostics(&ctx).await?,
    }

    Ok(())
}
