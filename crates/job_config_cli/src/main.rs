use clap::{Parser, Subcommand};

use job_config_cli::commands::inspect_cmd::{
    check, in_repo_status, resolve_defaults, tide_queries, InRepoArgs, ResolveArgs,
};
use job_config_cli::commands::jobs_cmd::{list_jobs, JobsArgs};
use job_config_cli::commands::{render, OutputFormat};
use job_config_cli::config::{get_config_path, load_config};
use job_config_cli::errors::Error;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;

/// job-config CLI: Inspect and validate versioned CI job configuration
#[derive(Parser)]
#[command(name = "job-config")]
#[command(about = "Inspect and validate versioned CI job configuration", long_about = None)]
struct Cli {
    /// Path to the cluster configuration file (defaults to ./config.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate the cluster configuration
    Check,

    /// Show the effective defaults for a repository and cluster
    Resolve(ResolveArgs),

    /// Show in-repo configuration enablement and allowed clusters
    InRepo(InRepoArgs),

    /// Print the deduplicated merge-pool search queries
    TideQueries,

    /// Resolve static and in-repo jobs for a repository state
    Jobs(JobsArgs),

    /// Show the CLI version
    Version,
}

fn version() -> String {
    format!(
        "job-config version {}",
        option_env!("JOB_CONFIG_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
    )
}

async fn run(cli: &Cli) -> Result<String, Error> {
    let load = || load_config(&get_config_path(cli.config.as_deref()));

    match &cli.command {
        Commands::Check => Ok(check(&load()?)),
        Commands::Resolve(args) => resolve_defaults(&load()?, args),
        Commands::InRepo(args) => render(&in_repo_status(&load()?, args), OutputFormat::Json),
        Commands::TideQueries => Ok(tide_queries(&load()?).join("\n")),
        Commands::Jobs(args) => list_jobs(load()?, args).await,
        Commands::Version => Ok(version()),
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().pretty())
        .with(EnvFilter::from_env("JOB_CONFIG_LOG"))
        .init();

    let cli = Cli::parse();
    match run(&cli).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            error!("Error: {e}");
            std::process::exit(1);
        }
    }
}
