mod aws;
mod commands;
mod config;
mod domain;
mod kube;
mod select;
mod tools;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::upgrade::UpgradeOptions;

#[derive(Parser)]
#[command(
    name = "upgrade-ami",
    version,
    about = "Roll EC2NodeClass AMI references forward and watch NodeClaims converge"
)]
struct Cli {
    /// Path to config file (default: ~/.config/upgrade-ami/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter (overrides config; RUST_LOG wins over both)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Pick an AMI build, pin every node class to it, and wait for drift to clear
    Upgrade {
        /// Date version to pin (e.g. 20251001 or v20251001); prompts when omitted
        #[arg(long)]
        version: Option<String>,

        /// Print the plan without applying it
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,

        /// Do not monitor nodeclaims after applying
        #[arg(long)]
        no_wait: bool,
    },

    /// List AMI builds available for the cluster's Kubernetes version
    Versions,

    /// Show node classes and how their AMI names would be rewritten
    List,

    /// Monitor nodeclaim drift without changing anything
    Wait {
        /// Seconds between polls (overrides config)
        #[arg(long)]
        interval: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = config::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    init_tracing(&config);

    match cli.command.unwrap_or(Commands::Upgrade {
        version: None,
        dry_run: false,
        yes: false,
        no_wait: false,
    }) {
        Commands::Upgrade {
            version,
            dry_run,
            yes,
            no_wait,
        } => commands::upgrade::run(
            &config,
            UpgradeOptions {
                version,
                dry_run,
                yes,
                no_wait,
            },
        ),
        Commands::Versions => commands::versions::run(&config),
        Commands::List => commands::list::run(&config),
        Commands::Wait { interval } => {
            if interval == Some(0) {
                anyhow::bail!("--interval must be greater than zero");
            }
            commands::wait::run(&config, interval)
        }
    }
}

fn init_tracing(config: &config::Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.log_format == "json" {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}
