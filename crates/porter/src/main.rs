//! Porter CLI binary.
//!
//! This binary provides command-line access to Porter's functionality:
//! - Migrate a repository and follow the job to completion
//! - Inspect the platform quota left for a credential
//! - Print the directive path for a Java upgrade

use clap::Parser;
use porter::{LoggingConfig, PorterConfig, init_logging};

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, print_directives, run_migration, show_quota};

    // Tokens usually live in .env during local runs
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(
        &LoggingConfig::new()
            .with_verbose(cli.verbose)
            .with_json_logs(cli.json_logs),
    )?;

    let config = match &cli.config {
        Some(path) => PorterConfig::from_file(path)?,
        None => PorterConfig::load()?,
    };

    match cli.command {
        Commands::Run(args) => {
            run_migration(config, args).await?;
        }

        Commands::Quota {
            repository,
            credential,
        } => {
            show_quota(&config, &repository, credential).await?;
        }

        Commands::Directives { source, target } => {
            print_directives(source, target);
        }
    }

    Ok(())
}
