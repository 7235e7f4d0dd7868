//! Script Vault CLI - read-only journal tooling
//!
//! The tool never submits operations. It provides:
//! - `verify`: check a journal's hash chain, replay it, and check invariants
//! - `show`: print one script, its version history, and its grantees

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vault_registry::{Journal, Registry, ScriptReader, VaultConfig};
use vault_types::ScriptId;

/// Script Vault CLI
#[derive(Parser)]
#[command(name = "script-vault")]
#[command(about = "Script Vault - verify and inspect registry journals", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "SCRIPT_VAULT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (overrides configuration)
    #[arg(long, env = "SCRIPT_VAULT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate the hash chain, replay every entry, and check invariants
    Verify {
        /// Journal file (defaults to the configured journal path)
        #[arg(short, long)]
        journal: Option<PathBuf>,
    },

    /// Print a script with its version history and grantees as JSON
    Show {
        /// Journal file (defaults to the configured journal path)
        #[arg(short, long)]
        journal: Option<PathBuf>,

        /// Script id
        script_id: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = VaultConfig::load(cli.config.as_deref()).context("loading configuration")?;

    // Initialize tracing
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    if cli.json || config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    match cli.command {
        Command::Verify { journal } => {
            let path = journal_path(journal, &config)?;
            let (journal, registry) = replay(&path, &config)?;
            registry
                .check_invariants()
                .context("registry invariants violated")?;

            let head = journal
                .head_hash()
                .map(hex::encode)
                .unwrap_or_else(|| "-".to_string());
            println!("journal:  {}", path.display());
            println!("entries:  {}", journal.len());
            println!("scripts:  {}", registry.len());
            println!("head:     {}", head);
            println!("status:   ok");
        }

        Command::Show { journal, script_id } => {
            let path = journal_path(journal, &config)?;
            let (_, registry) = replay(&path, &config)?;
            let id = ScriptId::new(script_id);

            let Some(script) = registry.get_script(id) else {
                bail!("{} not found in {}", id, path.display());
            };

            let output = json!({
                "script_id": id,
                "script": script,
                "versions": registry.version_history(id).unwrap_or_default(),
                "grantees": registry.grantees(id),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn journal_path(explicit: Option<PathBuf>, config: &VaultConfig) -> Result<PathBuf> {
    match explicit.or_else(|| config.journal.path.clone()) {
        Some(path) => Ok(path),
        None => bail!("no journal given: pass --journal or set journal.path in configuration"),
    }
}

fn replay(path: &Path, config: &VaultConfig) -> Result<(Journal, Registry)> {
    let journal = Journal::load(path)
        .with_context(|| format!("loading journal {}", path.display()))?;
    let registry = journal
        .replay(config.policy.clone())
        .with_context(|| format!("replaying journal {}", path.display()))?;

    info!(
        path = %path.display(),
        entries = journal.len(),
        scripts = registry.len(),
        "Journal replayed"
    );
    Ok((journal, registry))
}
