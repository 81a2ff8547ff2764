use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::SheetCell;
use tracing::info;

pub async fn execute(range: &str, value: &str) -> Result<()> {
    let cell = SheetCell::parse(range, value)?;

    let config = Config::load()?;
    let engine = super::sync_engine(&config)?;
    if !engine.sheets_client().can_write() {
        return Err(AppError::Config(
            "Writing requires a service account credential".to_string(),
        ));
    }

    let updated = engine.update_cell(&cell.range(), &cell.value).await;
    let url = engine.sheets_client().spreadsheet_url();
    engine.close().await;

    if !updated {
        return Err(AppError::Transport(format!(
            "Failed to update {}",
            cell.range()
        )));
    }

    info!(cell = %cell.range(), url = %url, "Cell updated");

    Ok(())
}
