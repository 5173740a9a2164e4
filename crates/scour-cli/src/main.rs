use anyhow::Result;
use clap::Parser;
use tracing::debug;

use scour_cli::{
    cli::{Cli, Commands},
    commands,
    config::CliConfig,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging (stderr, so documents on stdout stay parseable)
    let level = cli.level_filter();
    let env_filter = format!("scour_query={},scour_cli={}", level, level);
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::new(env_filter))
        .init();

    let config = CliConfig::load(cli.config.as_deref())?;
    debug!(
        default_fields = config.query.default_fields.len(),
        fuzziness = config.query.fuzziness(),
        "configuration loaded"
    );

    let output = match cli.command {
        Commands::Compile {
            query,
            base,
            pretty,
        } => commands::compile(&config, &query, base.as_deref(), pretty)?,
        Commands::Config { format } => commands::show_config(&config, format)?,
    };

    println!("{}", output);
    Ok(())
}
