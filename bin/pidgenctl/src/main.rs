//! ---
//! pid_section: "05-operator-interfaces"
//! pid_subsection: "binary"
//! pid_type: "source"
//! pid_scope: "code"
//! pid_description: "Operator CLI for PIDGen installations."
//! pid_version: "v0.0.0-prealpha"
//! pid_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pidgen_common::config::AppConfig;
use pidgen_common::logging::init_tracing;
use pidgen_core::Installation;
use prometheus::{Registry, TextEncoder};

mod access;
mod records;
mod setup;

/// Relative locations searched when neither `--config` nor `PIDGEN_CONFIG` is set.
const CONFIG_CANDIDATES: [&str; 2] = ["pidgen.toml", "config/pidgen.toml"];

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "PIDGen patient identifier enrollment utility",
    long_about = None
)]
struct Cli {
    /// Configuration file (TOML). Falls back to PIDGEN_CONFIG, then ./pidgen.toml.
    #[arg(long = "config", short = 'c', value_name = "FILE", global = true)]
    config: Option<PathBuf>,
    /// Print the Prometheus counters collected by this invocation to stderr.
    #[arg(long, global = true)]
    metrics: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create directories, stores, the default admin secret and the trial start date.
    Init,
    /// Authenticate a role.
    #[command(subcommand)]
    Login(access::LoginCommand),
    /// Clear a User lockout and issue a new User secret.
    Override(access::OverrideCommand),
    /// Replace a role's secret.
    #[command(subcommand)]
    Rotate(access::RotateCommand),
    /// Authenticate as User and issue a patient identifier.
    Enroll(records::EnrollCommand),
    /// Inspect stored records.
    #[command(subcommand)]
    Records(records::RecordsCommand),
    /// Inspect the trial license.
    #[command(subcommand)]
    License(records::LicenseCommand),
    /// Preview the age derived from a date of birth.
    Age(records::AgeCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::from_path(path)?,
        None => AppConfig::load(&CONFIG_CANDIDATES[..])?,
    };
    if init_tracing("pidgenctl", &config.logging).is_err() {
        pidgen_logging::init();
    }

    let registry = Arc::new(Registry::new());
    let install = Installation::new(config).with_metrics(registry.clone())?;
    let outcome = match cli.command {
        Commands::Init => setup::run(&install),
        Commands::Login(cmd) => access::login(&install, cmd),
        Commands::Override(cmd) => access::admin_override(&install, cmd),
        Commands::Rotate(cmd) => access::rotate(&install, cmd),
        Commands::Enroll(cmd) => records::enroll(&install, cmd),
        Commands::Records(cmd) => records::list(&install, cmd),
        Commands::License(cmd) => records::license(&install, cmd),
        Commands::Age(cmd) => records::age(cmd),
    };
    if cli.metrics {
        let body = TextEncoder::new()
            .encode_to_string(&registry.gather())
            .context("failed to encode metrics")?;
        eprint!("{body}");
    }
    outcome
}
