//! CLI command definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Porter: rate-limited Java migrations for GitHub and GitLab repositories
#[derive(Parser, Debug)]
#[command(name = "porter")]
#[command(about = "Migrate Java repositories and publish the result as a change request", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug output from every porter crate
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Read configuration from this file instead of the default locations
    #[arg(short, long, global = true, env = "PORTER_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Migrate a repository and follow the job until it finishes
    Run(RunArgs),

    /// Read a repository once and show the quota left on its platform
    Quota {
        /// Repository reference (owner/repo, https URL or git@ URL)
        repository: String,

        /// Environment variable holding the platform token
        #[arg(long)]
        credential: Option<String>,
    },

    /// Print the directive path for a Java version upgrade
    Directives {
        /// Java version the code currently targets
        #[arg(short, long, default_value_t = 8)]
        source: u32,

        /// Java version to migrate to
        #[arg(short, long)]
        target: u32,
    },
}

/// Arguments of `porter run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Repository reference (owner/repo, https URL or git@ URL)
    pub repository: String,

    /// Java version to migrate to
    #[arg(short, long)]
    pub target: u32,

    /// Java version the code currently targets
    #[arg(short, long, default_value_t = 8)]
    pub source: u32,

    /// Directive to apply (repeatable); defaults to the upgrade path
    #[arg(short, long = "directive")]
    pub directives: Vec<String>,

    /// Environment variable holding the platform token
    #[arg(long)]
    pub credential: Option<String>,

    /// Branch to publish to
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Recipient to notify when the job finishes
    #[arg(long)]
    pub notify: Option<String>,

    /// Re-fetch repository analysis even when cached
    #[arg(long)]
    pub force_refresh: bool,

    /// Directory for job workspaces and reports
    #[arg(short, long)]
    pub workspace: Option<PathBuf>,
}
