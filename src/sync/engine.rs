use crate::config::SyncConfig;
use crate::models::{SheetCell, SyncResult};
use crate::sheets::SheetOperations;
use crate::sync::writeback::{WriteBackQueue, WriteOutcome};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, instrument};

/// Entry point for callers: reads the grid, writes single cells and
/// debounces interactive edits.
pub struct SyncEngine<SC> {
    sheets_client: Arc<SC>,
    queue: WriteBackQueue,
}

impl<SC> SyncEngine<SC>
where
    SC: SheetOperations + Send + Sync + 'static,
{
    /// Must be called from within a Tokio runtime; the write-back worker starts here
    pub fn new(config: &SyncConfig, sheets_client: SC) -> Self {
        let sheets_client = Arc::new(sheets_client);
        let queue = WriteBackQueue::spawn(sheets_client.clone(), config);

        Self {
            sheets_client,
            queue,
        }
    }

    pub fn sheets_client(&self) -> &SC {
        &self.sheets_client
    }

    #[instrument(name = "Sync", skip_all)]
    pub async fn fetch_grid_with_validation(&self) -> SyncResult {
        let result = self.sheets_client.fetch_grid_with_validation().await;
        info!(
            rows = result.rows.len(),
            dropdowns = result.validation.len(),
            "Grid fetched"
        );
        result
    }

    pub async fn update_cell(&self, range: &str, value: &str) -> bool {
        self.sheets_client.update_cell(range, value).await
    }

    pub fn queue_edit(&self, range: impl Into<String>, value: impl Into<String>) {
        self.queue.queue_edit(range, value);
    }

    pub fn queue_cell(&self, cell: &SheetCell) {
        self.queue.queue_cell(cell);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WriteOutcome> {
        self.queue.subscribe()
    }

    pub async fn flush(&self) {
        self.queue.flush().await;
    }

    /// Write any pending edits and stop the write-back worker
    pub async fn close(self) {
        self.queue.shutdown().await;
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SheetsConfig;
    use crate::sheets::SheetsClient;
    use crate::auth::test_helpers::test_credential;
    use crate::models::ValidationRule;
    use crate::transport::mocks::{MockTransport, respond};
    use reqwest::Method;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fetch_passes_through() {
        let mut grid = SyncResult {
            rows: vec![vec!["a".to_string()]],
            ..Default::default()
        };
        grid.add_rule(ValidationRule {
            row: 0,
            col: 0,
            options: vec!["a".to_string(), "b".to_string()],
        });
        let sheets = mocks::MockSheetsClient {
            grid: grid.clone(),
            ..Default::default()
        };

        let engine = SyncEngine::new(&SyncConfig::default(), sheets);
        assert_eq!(engine.fetch_grid_with_validation().await, grid);
    }

    #[tokio::test]
    async fn test_close_flushes_queued_edits() {
        let sheets = mocks::MockSheetsClient::default();
        let engine = SyncEngine::new(&SyncConfig::default(), sheets.clone());

        engine.queue_cell(&SheetCell::new(0, 0, "x"));
        engine.queue_edit("A1", "y");
        engine.close().await;

        assert_eq!(sheets.written(), vec![("A1".to_string(), "y".to_string())]);
    }

    #[tokio::test]
    async fn test_update_cell_reports_failure() {
        let sheets = mocks::MockSheetsClient::default().failing("A1", 1);
        let engine = SyncEngine::new(&SyncConfig::default(), sheets);

        assert!(!engine.update_cell("A1", "x").await);
        assert!(engine.update_cell("A1", "x").await);
    }

    fn grid_response() -> String {
        json!({
            "spreadsheetId": "S1",
            "properties": {"title": "Team"},
            "sheets": [{
                "properties": {"sheetId": 0, "title": "Sheet1", "gridProperties": {"rowCount": 100}},
                "data": [{
                    "rowData": [
                        {"values": [
                            {"formattedValue": "Name", "effectiveFormat": {"textFormat": {"bold": true}}},
                            {"formattedValue": "Status", "effectiveFormat": {"textFormat": {"bold": true}}}
                        ]},
                        {"values": [
                            {"formattedValue": "Bob", "userEnteredValue": {"stringValue": "Bob"}},
                            {
                                "formattedValue": "Done",
                                "dataValidation": {
                                    "condition": {
                                        "type": "ONE_OF_LIST",
                                        "values": [
                                            {"userEnteredValue": "Done"},
                                            {"userEnteredValue": "Pending"}
                                        ]
                                    },
                                    "showCustomUi": true
                                }
                            }
                        ]}
                    ],
                    "columnMetadata": [{"pixelSize": 100}, {"pixelSize": 100}]
                }]
            }]
        })
        .to_string()
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end() {
        let transport = MockTransport::new(|request| match request.url.host_str() {
            Some("oauth2.googleapis.com") => {
                respond(200, r#"{"access_token":"ya29.e2e","expires_in":3599}"#)
            }
            _ if request.method == Method::GET => respond(200, grid_response()),
            _ => respond(200, "{}"),
        });

        let credential = test_credential();
        let config = SheetsConfig {
            spreadsheet_id: "S1".to_string(),
            sheet_name: "Sheet1".to_string(),
            range: "A1:B2".to_string(),
            service_account_json: Some(
                json!({
                    "client_email": credential.client_email,
                    "private_key": credential.private_key,
                })
                .to_string(),
            ),
            ..Default::default()
        };
        let client = SheetsClient::with_transport(config, Arc::new(transport.clone())).unwrap();
        let engine = SyncEngine::new(&SyncConfig::default(), client);

        let result = engine.fetch_grid_with_validation().await;
        assert_eq!(result.rows, vec![vec!["Name", "Status"], vec!["Bob", "Done"]]);
        assert_eq!(
            result.validation,
            [("1:1".to_string(), vec!["Done".to_string(), "Pending".to_string()])]
                .into_iter()
                .collect::<BTreeMap<_, _>>()
        );

        let mut outcomes = engine.subscribe();
        engine.queue_cell(&SheetCell::new(1, 1, "Done"));
        engine.queue_cell(&SheetCell::new(1, 1, "Pending"));
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let outcome = outcomes.recv().await.unwrap();
        assert_eq!(outcome.range, "B2");
        assert_eq!(outcome.value, "Pending");
        assert!(outcome.success);

        let puts: Vec<_> = transport
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == Method::PUT)
            .cloned()
            .collect();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].url.path(), "/v4/spreadsheets/S1/values/Sheet1!B2");
        assert_eq!(transport.requests_to("oauth2.googleapis.com").len(), 1);

        engine.close().await;
    }
}
