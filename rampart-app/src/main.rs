mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use rampart_aws::{AwsCli, Ec2Client};
use rampart_core::AuditConfig;

#[derive(Parser, Debug)]
#[command(
    name = "rampart",
    version,
    about = "Rampart — security group risk audit and remediation"
)]
struct Cli {
    /// AWS region (defaults to the profile's configured region)
    #[arg(long, global = true)]
    region: Option<String>,

    /// AWS credentials profile
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "rampart.toml")]
    config: String,

    /// Log level (overrides config file)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Audit all groups and list world-open findings
    Find {
        /// Ports to match: a csv list or "all" (default: configured watched ports)
        #[arg(long)]
        ports: Option<String>,

        /// Write the JSON findings here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Replace one group's world-open rules with restricted ranges
    Remediate {
        /// Security group id
        group_id: String,

        /// Compute and log the plan without changing anything
        #[arg(long)]
        dry_run: bool,

        /// Replacement CIDRs (csv; default: the RFC 1918 ranges)
        #[arg(long)]
        cidrs: Option<String>,

        /// Ports to remediate: a csv list or "all"
        #[arg(long)]
        ports: Option<String>,
    },

    /// Remediate every group, recording per-group failures without aborting
    BulkRemediate {
        /// Compute and log plans without changing anything
        #[arg(long)]
        dry_run: bool,

        /// Replacement CIDRs (csv; default: the RFC 1918 ranges)
        #[arg(long)]
        cidrs: Option<String>,

        /// Ports to remediate: a csv list or "all"
        #[arg(long)]
        ports: Option<String>,

        /// Write the JSON outcomes here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Full audit across all ports, with a summary logged
    Report {
        /// Write the JSON findings here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Write the default configuration file and exit
    GenerateConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Command::GenerateConfig) {
        let config = AuditConfig::default();
        config.save(&cli.config)?;
        println!("Default configuration written to {}", cli.config);
        return Ok(());
    }

    let config = AuditConfig::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: {e}, using defaults");
        AuditConfig::default()
    });

    // ── Tracing ──────────────────────────────────────────────────────
    let log_level = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.general.log_level);
    let level = match log_level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    // logs go to stderr so stdout stays valid JSON
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let client = Ec2Client::new(AwsCli::new(cli.region.clone(), cli.profile.clone()));

    match cli.command {
        Command::Find { ports, output } => {
            commands::find(client, &config, ports.as_deref(), output.as_deref())
        }
        Command::Remediate {
            group_id,
            dry_run,
            cidrs,
            ports,
        } => commands::remediate(
            client,
            &config,
            &group_id,
            dry_run,
            cidrs.as_deref(),
            ports.as_deref(),
        ),
        Command::BulkRemediate {
            dry_run,
            cidrs,
            ports,
            output,
        } => commands::bulk_remediate(
            client,
            &config,
            dry_run,
            cidrs.as_deref(),
            ports.as_deref(),
            output.as_deref(),
        ),
        Command::Report { output } => commands::report(client, &config, output.as_deref()),
        Command::GenerateConfig => unreachable!("handled above"),
    }
}
