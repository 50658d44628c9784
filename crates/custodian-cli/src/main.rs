//! Custodian CLI.
//!
//! Evaluates access decisions against a policy fixture.
//!
//! # Quick Start
//!
//! ```bash
//! # Can alice view the budget?
//! custodian decide --fixture fixtures/demo.toml --actor alice --action view --resource budget
//!
//! # Which rules run, in which order?
//! custodian rules --fixture fixtures/demo.toml
//!
//! # What configuration is in effect?
//! custodian config
//! ```
//!
//! `decide` exits 0 when access is allowed, 2 when it is denied and 1 when
//! no decision could be reached.

mod commands;
mod style;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use custodian_config::{ConfigLoader, CustodianConfig};
use custodian_types::{Action, PermissionName};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

/// Custodian - unified access-control decisions.
#[derive(Parser)]
#[command(name = "custodian")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file layered above custodian.toml and custodian.local.toml.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decide a single access request and print the decision as JSON.
    Decide {
        /// Policy fixture (TOML) to load into the store.
        #[arg(short, long)]
        fixture: PathBuf,

        /// Id of the acting user. Must exist in the fixture.
        #[arg(short, long)]
        actor: String,

        /// Action to perform (view, edit, share, delete).
        #[arg(long)]
        action: Action,

        /// Targeted resource id.
        #[arg(short, long)]
        resource: Option<String>,

        /// Permission the call site requires; enables the RBAC gate.
        #[arg(short, long)]
        permission: Option<PermissionName>,

        /// Network origin of the request.
        #[arg(long)]
        ip: Option<String>,

        /// Evaluate at this instant (RFC 3339) instead of now.
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// List the fixture's rules in evaluation order.
    Rules {
        /// Policy fixture (TOML).
        #[arg(short, long)]
        fixture: PathBuf,

        /// Output format.
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Print the effective configuration.
    Config {
        /// Output format.
        #[arg(long, value_enum, default_value_t = ConfigFormat::Toml)]
        format: ConfigFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum ConfigFormat {
    Toml,
    Json,
}

fn main() -> ExitCode {
    // Usage errors exit 1 like any other failure; 2 is reserved for denials.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    style::set_no_color(cli.no_color);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            style::print_error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(cli.config.as_ref())?;
    init_logging(&config)?;

    match cli.command {
        Commands::Decide {
            fixture,
            actor,
            action,
            resource,
            permission,
            ip,
            at,
        } => commands::decide::run(
            &config,
            &commands::decide::DecideArgs {
                fixture,
                actor,
                action,
                resource,
                permission,
                ip,
                at,
            },
        ),
        Commands::Rules { fixture, format } => {
            commands::rules::run(&fixture, matches!(format, Format::Json))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { format } => {
            commands::config::show(&config, matches!(format, ConfigFormat::Json))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(explicit: Option<&PathBuf>) -> Result<CustodianConfig> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = explicit {
        loader = loader.with_file(path);
    }
    loader.load().context("Failed to load configuration")
}

fn init_logging(config: &CustodianConfig) -> Result<()> {
    let directive = config
        .logging
        .level
        .parse::<Directive>()
        .with_context(|| format!("Invalid logging.level '{}'", config.logging.level))?;

    // Logs go to stderr so decision JSON on stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
