use crate::config::Config;
use crate::error::{AppError, Result};
use std::io;
use tracing::info;

pub async fn execute() -> Result<()> {
    let config = Config::load()?;
    let engine = super::sync_engine(&config)?;

    let result = engine.fetch_grid_with_validation().await;

    // Rows can be shorter than the widest row
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(io::stdout());
    for row in &result.rows {
        writer
            .write_record(row)
            .map_err(|e| AppError::Other(e.into()))?;
    }
    writer.flush()?;

    info!(
        rows = result.rows.len(),
        columns = result.width(),
        "Range written as CSV"
    );
    for (cell, options) in &result.validation {
        info!(cell = %cell, options = ?options, "Dropdown");
    }

    engine.close().await;

    Ok(())
}
