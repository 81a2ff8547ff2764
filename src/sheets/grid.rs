use crate::error::{AppError, Result};
use crate::models::{SyncResult, ValidationRule};
use serde::Deserialize;
use tracing::debug;

const ONE_OF_LIST: &str = "ONE_OF_LIST";

// https://developers.google.com/sheets/api/reference/rest/v4/spreadsheets#Spreadsheet
// Only the fields the grid view needs; everything else in the response is ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SpreadsheetResponse {
    sheets: Vec<SheetData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SheetData {
    data: Vec<GridData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GridData {
    row_data: Vec<RowData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RowData {
    values: Vec<CellData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CellData {
    formatted_value: Option<String>,
    data_validation: Option<DataValidationRule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DataValidationRule {
    condition: Option<BooleanCondition>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BooleanCondition {
    #[serde(rename = "type")]
    type_: Option<String>,
    values: Vec<ConditionValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ConditionValue {
    user_entered_value: Option<String>,
}

impl CellData {
    fn dropdown_options(&self) -> Option<Vec<String>> {
        let condition = self.data_validation.as_ref()?.condition.as_ref()?;
        if condition.type_.as_deref() != Some(ONE_OF_LIST) {
            return None;
        }

        Some(
            condition
                .values
                .iter()
                .filter_map(|v| v.user_entered_value.clone())
                .collect(),
        )
    }
}

/// Extract rows and dropdown validation from a `spreadsheets.get` response
/// requested with `includeGridData=true`.
///
/// Rows are numbered in response order across every returned grid, so a
/// single-range request yields indices relative to the top-left of that range.
pub fn parse_grid(body: &str) -> Result<SyncResult> {
    let response: SpreadsheetResponse = serde_json::from_str(body)
        .map_err(|e| AppError::Parse(format!("Unexpected grid response: {}", e)))?;

    let mut result = SyncResult::default();

    let rows = response
        .sheets
        .into_iter()
        .flat_map(|sheet| sheet.data)
        .flat_map(|grid| grid.row_data);

    for (row_idx, row) in rows.enumerate() {
        let mut cells = Vec::with_capacity(row.values.len());

        for (col_idx, cell) in row.values.into_iter().enumerate() {
            if let Some(options) = cell.dropdown_options() {
                result.add_rule(ValidationRule {
                    row: row_idx,
                    col: col_idx,
                    options,
                });
            }
            cells.push(cell.formatted_value.unwrap_or_default());
        }

        result.rows.push(cells);
    }

    debug!(
        rows = result.rows.len(),
        rules = result.validation.len(),
        "Parsed grid"
    );

    Ok(result)
}
