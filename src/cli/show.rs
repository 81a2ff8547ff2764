use crate::config::Config;
use crate::error::Result;
use crate::models::{SheetCell, SyncResult};
use crate::sheets::a1::RangeWindow;
use clap::Subcommand;
use tracing::info;

#[derive(Subcommand, Debug)]
pub enum ShowResource {
    /// Show configuration and cache paths
    Paths,
    /// Show the configured sheet, range and credentials
    Config,
    /// Show the dropdown options for each validated cell
    Dropdowns,
}

impl ShowResource {
    pub async fn execute(&self) -> Result<()> {
        match self {
            ShowResource::Paths => show_paths(),
            ShowResource::Config => show_config(),
            ShowResource::Dropdowns => show_dropdowns().await,
        }
    }
}

fn show_paths() -> Result<()> {
    let config_path = Config::config_file()?;
    let cache_dir = Config::cache_dir()?;

    info!(path = ?config_path, "Config path");
    info!(path = ?cache_dir, "Cache path");

    Ok(())
}

fn show_config() -> Result<()> {
    let config = Config::load()?;
    let sheets = &config.sheets;

    let credential = if sheets.service_account_json.is_some() {
        "service account (inline)"
    } else if sheets.service_account_file.is_some() {
        "service account (file)"
    } else if sheets.api_key().is_some() {
        "API key (read only)"
    } else {
        "none"
    };

    info!(
        spreadsheet_id = %sheets.spreadsheet_id,
        sheet = %sheets.sheet_name,
        range = %sheets.range,
        credential,
        "Sheet"
    );
    info!(
        debounce_ms = config.sync.debounce_ms,
        write_retries = config.sync.write_retries,
        request_timeout_secs = config.sync.request_timeout_secs,
        "Sync"
    );

    Ok(())
}

async fn show_dropdowns() -> Result<()> {
    let config = Config::load()?;
    let window = super::range_window(&config)?;
    let engine = super::sync_engine(&config)?;

    let result = engine.fetch_grid_with_validation().await;
    for (label, value, options) in dropdowns(&result, &window) {
        info!(cell = %label, value = %value, options = ?options, "Dropdown");
    }

    engine.close().await;

    Ok(())
}

/// Validated cells labelled with their sheet reference
fn dropdowns<'a>(
    result: &'a SyncResult,
    window: &RangeWindow,
) -> Vec<(String, &'a str, &'a [String])> {
    let mut found = Vec::new();
    for (row, cells) in result.rows.iter().enumerate() {
        for (col, value) in cells.iter().enumerate() {
            let key = SheetCell::new(row, col, value.as_str()).validation_key();
            if let Some(options) = result.validation.get(&key) {
                found.push((window.cell_ref(row, col), value.as_str(), options.as_slice()));
            }
        }
    }
    found
}
