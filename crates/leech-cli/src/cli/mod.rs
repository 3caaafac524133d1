//! CLI for the leech bot.

mod bot;
mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use leech_core::config::{self, LeechConfig};
use std::path::{Path, PathBuf};

use commands::{run_classify, run_fetch, run_serve};

/// Top-level CLI for the leech bot.
#[derive(Debug, Parser)]
#[command(name = "leech")]
#[command(about = "Leech: fetch URLs, magnets and torrents and deliver them to a chat", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/leech/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run the bot: long-poll for messages and process leech requests.
    Serve,

    /// Run one job end-to-end and deliver the result to a chat.
    Fetch {
        /// Direct URL, magnet link, or path to a .torrent file.
        reference: String,

        /// Chat that receives status messages and files.
        #[arg(long, value_name = "ID", allow_negative_numbers = true)]
        chat: i64,
    },

    /// Show which transport a reference would use.
    Classify {
        /// Direct URL, magnet link, or path to a .torrent file.
        reference: String,
    },
}

/// Config file (explicit or default) plus the bot's environment overrides.
fn load_config(path: Option<&Path>) -> Result<LeechConfig> {
    let mut cfg = match path {
        Some(p) => config::load_from_path(p)?,
        None => config::load_or_init()?,
    };
    cfg.apply_env(|key| std::env::var(key).ok());
    Ok(cfg)
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Classify { reference } => run_classify(&reference)?,
            CliCommand::Serve => {
                let cfg = load_config(cli.config.as_deref())?;
                tracing::debug!("loaded config: {:?}", cfg);
                run_serve(cfg).await?;
            }
            CliCommand::Fetch { reference, chat } => {
                let cfg = load_config(cli.config.as_deref())?;
                tracing::debug!("loaded config: {:?}", cfg);
                run_fetch(cfg, &reference, chat).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
