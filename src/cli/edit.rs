use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{SheetCell, SyncResult};
use crate::sheets::a1::{self, RangeWindow};
use crate::sync::WriteOutcome;
use dialoguer::{Input, Select};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{error, info, warn};

pub async fn execute() -> Result<()> {
    let config = Config::load()?;
    let window = super::range_window(&config)?;
    let engine = super::sync_engine(&config)?;
    if !engine.sheets_client().can_write() {
        return Err(AppError::Config(
            "Editing requires a service account credential".to_string(),
        ));
    }

    let mut grid = engine.fetch_grid_with_validation().await;
    if grid.is_empty() {
        warn!("Nothing to edit, the grid is empty");
    }

    let report = tokio::spawn(report_outcomes(engine.subscribe()));

    loop {
        let snapshot = grid.clone();
        let cell = tokio::task::spawn_blocking(move || prompt_edit(&snapshot, &window))
            .await
            .map_err(|e| AppError::Other(e.into()))??;

        let Some(cell) = cell else {
            break;
        };

        apply_locally(&mut grid, &cell);
        engine.queue_edit(window.cell_ref(cell.row, cell.col), cell.value);
    }

    engine.close().await;

    let failed = report.await.map_err(|e| AppError::Other(e.into()))?;
    if failed > 0 {
        return Err(AppError::Transport(format!(
            "{} edit(s) could not be written",
            failed
        )));
    }

    Ok(())
}

async fn report_outcomes(mut outcomes: broadcast::Receiver<WriteOutcome>) -> usize {
    let mut failed = 0;

    loop {
        match outcomes.recv().await {
            Ok(outcome) if outcome.success => {
                info!(cell = %outcome.range, value = %outcome.value, "Saved");
            }
            Ok(outcome) => {
                failed += 1;
                error!(
                    cell = %outcome.range,
                    value = %outcome.value,
                    attempts = outcome.attempts,
                    "Edit was not saved"
                );
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Missed write outcomes");
            }
            Err(RecvError::Closed) => break,
        }
    }

    failed
}

/// A cell of the fetched grid picked by its sheet reference.
#[derive(Debug, PartialEq)]
struct Target<'a> {
    row: usize,
    col: usize,
    current: &'a str,
    options: Option<&'a [String]>,
}

fn locate<'a>(
    grid: &'a SyncResult,
    window: &RangeWindow,
    reference: &str,
) -> Option<Target<'a>> {
    let (row, col) = a1::parse_cell_ref(reference)?;
    let (row, col) = window.to_grid(row, col)?;

    Some(Target {
        row,
        col,
        current: grid.cell(row, col).unwrap_or_default(),
        options: grid.options(row, col).filter(|options| !options.is_empty()),
    })
}

/// Ask for a cell and its new value. `None` ends the session; the returned
/// cell is indexed like the grid.
fn prompt_edit(grid: &SyncResult, window: &RangeWindow) -> Result<Option<SheetCell>> {
    loop {
        let reference: String = Input::new()
            .with_prompt("Cell (empty to finish)")
            .allow_empty(true)
            .interact_text()
            .map_err(|e| AppError::Other(e.into()))?;

        let reference = reference.trim();
        if reference.is_empty() {
            return Ok(None);
        }

        let Some(target) = locate(grid, window, reference) else {
            warn!(cell = reference, "Not a cell inside the configured range");
            continue;
        };

        let label = window.cell_ref(target.row, target.col);
        let value = match target.options {
            Some(options) => {
                let selected = options
                    .iter()
                    .position(|o| o == target.current)
                    .unwrap_or(0);
                let index = Select::new()
                    .with_prompt(label)
                    .items(options)
                    .default(selected)
                    .interact()
                    .map_err(|e| AppError::Other(e.into()))?;
                options[index].clone()
            }
            None => Input::<String>::new()
                .with_prompt(label)
                .with_initial_text(target.current)
                .allow_empty(true)
                .interact_text()
                .map_err(|e| AppError::Other(e.into()))?,
        };

        return Ok(Some(SheetCell::new(target.row, target.col, value)));
    }
}

fn apply_locally(grid: &mut SyncResult, cell: &SheetCell) {
    if grid.rows.len() <= cell.row {
        grid.rows.resize_with(cell.row + 1, Vec::new);
    }
    let row = &mut grid.rows[cell.row];
    if row.len() <= cell.col {
        row.resize(cell.col + 1, String::new());
    }
    row[cell.col] = cell.value.clone();
}
