//! OceanStor Inventory CLI
//!
//! Lists array inventory and manages snapshots through an
//! [`OceanStorSession`] over the REST transport. Results are printed as JSON.

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use oceanstor_inventory::{AccountSelector, OceanStorSession, RestClient, SessionConfig};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Inventory and snapshot tool for OceanStor arrays
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Session configuration file (YAML)
    #[arg(long, env = "OCEANSTOR_CONFIG")]
    config: Option<PathBuf>,

    /// Management API URL, overrides the configuration file
    #[arg(long, env = "OCEANSTOR_URL")]
    url: Option<String>,

    /// Session token, overrides the configuration file
    #[arg(long, env = "OCEANSTOR_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct ListFilter {
    /// Account name, or "all"
    #[arg(long)]
    account: Option<String>,

    /// Storage pool name
    #[arg(long)]
    pool: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Active accounts
    Accounts,
    /// Storage pools
    Pools,
    /// Namespaces by account
    Namespaces(ListFilter),
    /// Object buckets by account
    Buckets(ListFilter),
    /// Filesystems by name
    Filesystems {
        /// Restrict to these filesystems
        #[arg(long = "device")]
        devices: Vec<String>,
        #[arg(long)]
        pool: Option<String>,
    },
    /// Filesets by filesystem
    Filesets {
        /// Restrict to these filesystems
        #[arg(long = "device")]
        devices: Vec<String>,
        /// Restrict to these filesets
        #[arg(long = "fileset")]
        filesets: Vec<String>,
        #[arg(long)]
        pool: Option<String>,
    },
    /// Snapshot names of a filesystem, fileset or namespace
    Snapshots {
        target: String,
        #[arg(long, conflicts_with = "namespace")]
        fileset: Option<String>,
        /// Treat the target as a converged namespace
        #[arg(long)]
        namespace: bool,
    },
    /// Create a snapshot unless it already exists
    CreateSnapshot {
        target: String,
        name: String,
        /// Snapshot these filesets instead of the whole filesystem
        #[arg(long = "fileset", conflicts_with = "namespace")]
        filesets: Vec<String>,
        #[arg(long)]
        namespace: bool,
    },
    /// Delete a snapshot if it exists
    DeleteSnapshot {
        target: String,
        name: String,
        #[arg(long, conflicts_with = "namespace")]
        fileset: Option<String>,
        #[arg(long)]
        namespace: bool,
    },
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args)?;

    let config = load_config(&args)?;
    info!("Starting {} {}", oceanstor_inventory::NAME, oceanstor_inventory::VERSION);
    info!("  API: {}", config.api.url);
    info!("  Account: {}", config.api.account);

    let client = RestClient::new(&config.api).context("failed to build REST client")?;
    let quota = Arc::new(client);
    let session = OceanStorSession::new(quota.clone(), config).with_quota_manager(quota);
    debug!("Session ready: {:?}", session);

    run(&session, args.command).await
}

fn load_config(args: &Args) -> anyhow::Result<SessionConfig> {
    let mut config = match &args.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => SessionConfig::default(),
    };
    if let Some(url) = &args.url {
        config.api.url = url.clone();
    }
    if let Some(token) = &args.token {
        config.api.token = Some(token.clone());
    }
    config.validate()?;
    Ok(config)
}

async fn run(session: &OceanStorSession, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Accounts => print(&session.list_accounts(false).await?),
        Command::Pools => print(&session.list_storage_pools(false).await?),
        Command::Namespaces(filter) => {
            let accounts = AccountSelector::parse(filter.account.as_deref());
            print(
                &session
                    .list_namespaces(&accounts, filter.pool.as_deref(), false)
                    .await?,
            )
        }
        Command::Buckets(filter) => {
            let accounts = AccountSelector::parse(filter.account.as_deref());
            print(
                &session
                    .list_buckets(&accounts, filter.pool.as_deref(), false)
                    .await?,
            )
        }
        Command::Filesystems { devices, pool } => {
            let devices: Vec<&str> = devices.iter().map(String::as_str).collect();
            print(&session.list_filesystems(&devices, pool.as_deref(), false).await?)
        }
        Command::Filesets {
            devices,
            filesets,
            pool,
        } => {
            let devices: Vec<&str> = devices.iter().map(String::as_str).collect();
            let filesets: Vec<&str> = filesets.iter().map(String::as_str).collect();
            print(
                &session
                    .list_filesets(&devices, &filesets, pool.as_deref(), false)
                    .await?,
            )
        }
        Command::Snapshots {
            target,
            fileset,
            namespace,
        } => {
            let names = if namespace {
                session.list_namespace_snapshots(&target).await?
            } else {
                session
                    .list_filesystem_snapshots(&target, fileset.as_deref())
                    .await?
            };
            print(&names)
        }
        Command::CreateSnapshot {
            target,
            name,
            filesets,
            namespace,
        } => {
            let outcome = if namespace {
                session.create_namespace_snapshot(&target, &name).await?
            } else {
                let filesets: Vec<&str> = filesets.iter().map(String::as_str).collect();
                session
                    .create_filesystem_snapshot(&target, &name, &filesets)
                    .await?
            };
            info!("Snapshot {} on {}: {}", name, target, outcome);
            print(&outcome)
        }
        Command::DeleteSnapshot {
            target,
            name,
            fileset,
            namespace,
        } => {
            let outcome = if namespace {
                session.delete_namespace_snapshot(&target, &name).await?
            } else {
                session
                    .delete_filesystem_snapshot(&target, &name, fileset.as_deref())
                    .await?
            };
            info!("Snapshot {} on {}: {}", name, target, outcome);
            print(&outcome)
        }
    }
}

fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) -> anyhow::Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?);

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}
