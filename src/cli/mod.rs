mod auth;
mod edit;
mod fetch;
mod set;
mod show;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::sheets::SheetsClient;
use crate::sheets::a1::RangeWindow;
use crate::sync::SyncEngine;
use clap::{Parser, Subcommand};

pub use show::ShowResource;

#[derive(Parser, Debug)]
#[command(name = "sheet-sync")]
#[command(about = "Read and edit a Google Sheets range through a service account", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Show { resource } => resource.execute().await,
            Commands::Auth => auth::execute().await,
            Commands::Fetch => fetch::execute().await,
            Commands::Set { range, value } => set::execute(range, value).await,
            Commands::Edit => edit::execute().await,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Show {
        #[command(subcommand)]
        resource: ShowResource,
    },
    /// Verify the service account can obtain an access token
    Auth,
    /// Print the configured range as CSV
    Fetch,
    /// Write a single cell
    Set {
        /// Cell in A1 notation, e.g. B2
        range: String,
        value: String,
    },
    /// Edit cells interactively; edits are written back after a quiet period
    Edit,
}

fn sync_engine(config: &Config) -> Result<SyncEngine<SheetsClient>> {
    let client = SheetsClient::new(&config.sheets, &config.sync)?;
    Ok(SyncEngine::new(&config.sync, client))
}

fn range_window(config: &Config) -> Result<RangeWindow> {
    RangeWindow::parse(&config.sheets.range).ok_or_else(|| {
        AppError::Config(format!(
            "Invalid range in config file: {}",
            config.sheets.range
        ))
    })
}
