//! entikit CLI - configuration, health check and criteria search demo

mod demo;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use entikit_core::config::Config;
use entikit_core::prelude::*;
use entikit_core::stamping::FixedUser;
use entikit_core::storage::DatabaseConfig;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use demo::Contact;

#[derive(Parser)]
#[command(name = "entikit")]
#[command(author, version, about = "Criteria search and entity stamping over SQLite", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run health check
    Doctor {
        /// Database file to check instead of the configured one
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Search a seeded in-memory contact table
    Demo {
        /// Number of contacts to seed
        #[arg(short, long, default_value_t = 25)]
        rows: usize,
        /// Criteria as JSON, e.g. '{"sorts":[{"field":"name"}],"page":{"index":0,"size":5}}'
        #[arg(short, long)]
        criteria: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show all configuration values
    Show,
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// Write a config file with default values
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Reset configuration to defaults
    Reset,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("entikit=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { action } => cmd_config(action, cli.format, cli.quiet),

        Commands::Doctor { db } => cmd_doctor(db, cli.quiet).await,

        Commands::Demo { rows, criteria } => {
            cmd_demo(rows, criteria.as_deref(), cli.format, cli.quiet).await
        }
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

fn cmd_config(action: ConfigAction, format: OutputFormat, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            let items = config.list()?;
            if format == OutputFormat::Json {
                let map: serde_json::Map<String, serde_json::Value> = items
                    .into_iter()
                    .map(|(key, value)| (key, serde_json::Value::String(value)))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&map)?);
            } else {
                for (key, value) in items {
                    println!("{} = {}", key, value);
                }
            }
        }
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::Init { force } => {
            let path = Config::config_path()?;
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {} (use --force to overwrite)",
                    path.display()
                );
            }
            Config::default().save()?;
            if !quiet {
                println!("Wrote default configuration to {}", path.display());
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

async fn cmd_doctor(db_path: Option<PathBuf>, quiet: bool) -> anyhow::Result<()> {
    if !quiet {
        println!("entikit Health Check");
        println!("====================");
        println!();
    }

    let mut all_ok = true;

    let config = match Config::load() {
        Ok(config) => {
            if !quiet {
                println!("[OK] Configuration: Valid");
            }
            config
        }
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Configuration: Error - {:#}", e);
            }
            Config::default()
        }
    };

    if !quiet {
        match Config::config_path() {
            Ok(path) if path.exists() => println!("[OK] Config file: {}", path.display()),
            Ok(path) => println!("[--] Config file: {} (using defaults)", path.display()),
            Err(e) => println!("[!!] Config file: Error - {}", e),
        }
    }

    let db_config = match db_path {
        Some(path) => DatabaseConfig::with_path(path)
            .max_connections(config.database.max_connections),
        None => DatabaseConfig::from(&config.database),
    };

    match Database::new(db_config).await {
        Ok(db) => match db.health_check().await {
            Ok(()) => {
                if !quiet {
                    println!("[OK] Database: Connected");
                    println!("     Path: {}", db.path().display());
                    let version: Option<String> = sqlx::query_scalar("SELECT sqlite_version()")
                        .fetch_one(db.pool())
                        .await
                        .ok();
                    if let Some(version) = version {
                        println!("     SQLite: {}", version);
                    }
                }
                db.close().await;
            }
            Err(e) => {
                all_ok = false;
                if !quiet {
                    println!("[!!] Database: Health check failed - {:#}", e);
                }
            }
        },
        Err(e) => {
            all_ok = false;
            warn!(error = %e, "Database failed to open");
            if !quiet {
                println!("[!!] Database: Failed to initialize - {:#}", e);
            }
        }
    }

    if !quiet {
        println!();
        if all_ok {
            println!("All checks passed!");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }

    if !all_ok {
        anyhow::bail!("Health check failed");
    }
    Ok(())
}

async fn cmd_demo(
    rows: usize,
    criteria: Option<&str>,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let config = Config::load()?;
    let criteria = match criteria {
        Some(json) => Criteria::from_json(json).map_err(report)?,
        None => Criteria::new(),
    };

    let db = Database::in_memory().await?;
    let stamper = Stamper::from_config(&config.stamping).with_user(FixedUser(1));
    let store = EntityStore::<Contact>::from_database(&db, stamper);
    demo::seed(&store, &db, rows).await?;

    // Ctrl-C abandons the search instead of killing the process mid-query
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let searcher = CriteriaSearcher::new(config.search.clone());
    let result = searcher
        .to_criteria_result(&store.queryable(), &criteria, &cancel)
        .await
        .map_err(report)?;
    info!(
        total = result.total_count,
        returned = result.len(),
        "Demo search finished"
    );

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&result).context("Failed to serialize result")?
            );
        }
        OutputFormat::Text => {
            if !quiet {
                println!(
                    "Page {} of {} ({} matching of {} seeded)",
                    result.page.index + 1,
                    result.page_count().max(1),
                    result.total_count,
                    rows
                );
                println!();
            }
            for contact in &result.items {
                println!(
                    "{:>4}  {:<12} {:<8} {:>3}  {}",
                    contact.id.unwrap_or_default(),
                    contact.name,
                    contact.city,
                    contact.age,
                    if contact.active { "active" } else { "inactive" }
                );
            }
        }
    }
    Ok(())
}

/// Attach the error code and suggestion to a library error
fn report(err: Error) -> anyhow::Error {
    let code = err.code();
    match err.suggestion() {
        Some(hint) => anyhow::anyhow!("[{}] {}\n  hint: {}", code, err, hint),
        None => anyhow::anyhow!("[{}] {}", code, err),
    }
}
