//! Command-line interface

use crate::auth::CredentialManager;
use crate::config::TapConfig;
use crate::error::Error;
use crate::http::SquareClient;
use crate::state::StateStore;
use crate::sync::{JsonLinesWriter, SyncEngine, ALL_STREAMS};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Square extraction connector
#[derive(Parser, Debug)]
#[command(name = "square-tap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract streams and emit RECORD/STATE lines to stdout
    Sync {
        /// Configuration file (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// State file (JSON); omitted means a fresh, unpersisted run
        #[arg(short, long)]
        state: Option<PathBuf>,

        /// Streams to sync (default: all)
        #[arg(long, value_delimiter = ',')]
        streams: Vec<String>,
    },
    /// Validate the credential, refreshing it if needed
    Check {
        /// Configuration file (JSON)
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Run a parsed CLI invocation
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Sync {
            config: config_path,
            state,
            streams,
        } => {
            let mut config = TapConfig::load(&config_path)?;
            let environment = config.environment();

            let manager = CredentialManager::new(environment);
            let access_token = manager
                .ensure_valid_credential(&mut config, &config_path)
                .await?;

            let start_date = config
                .start_date
                .clone()
                .ok_or_else(|| Error::missing_field("start_date"))?;

            let client = SquareClient::new(environment, access_token);
            let store = match &state {
                Some(path) => StateStore::from_file(path)?,
                None => StateStore::in_memory(),
            };

            let selected: Vec<String> = if streams.is_empty() {
                ALL_STREAMS.iter().map(ToString::to_string).collect()
            } else {
                streams
            };

            let mut engine = SyncEngine::new(&client, store, start_date);
            let stdout = std::io::stdout();
            let mut out = JsonLinesWriter::new(stdout.lock());
            engine.sync(&selected, &mut out).await?;
            Ok(())
        }
        Command::Check {
            config: config_path,
        } => {
            let mut config = TapConfig::load(&config_path)?;
            let manager = CredentialManager::new(config.environment());
            manager
                .ensure_valid_credential(&mut config, &config_path)
                .await?;
            println!("Credential OK");
            Ok(())
        }
    }
}
