use super::SheetOperations;
use crate::auth::ServiceAccountCredential;
use crate::config::{SheetsConfig, SyncConfig};
use crate::error::{AppError, Result};
use crate::models::SyncResult;
use crate::sheets::a1;
use crate::sheets::auth::TokenProvider;
use crate::sheets::grid::parse_grid;
use crate::transport::{HttpRequest, HttpTransport, ReqwestTransport};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};
use url::Url;

const SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

enum ReadAuth {
    Bearer(String),
    ApiKey(String),
}

pub struct SheetsClient {
    transport: Arc<dyn HttpTransport + Send + Sync>,
    config: SheetsConfig,
    tokens: Option<TokenProvider>,
}

impl SheetsClient {
    /// Create a new SheetsClient over HTTPS with the configured request timeout
    pub fn new(config: &SheetsConfig, sync: &SyncConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(sync.request_timeout())?;
        Self::with_transport(config.clone(), Arc::new(transport))
    }

    pub fn with_transport(
        config: SheetsConfig,
        transport: Arc<dyn HttpTransport + Send + Sync>,
    ) -> Result<Self> {
        let tokens = match config.service_account_text()? {
            Some(text) => {
                let credential = ServiceAccountCredential::from_json(&text)?;
                debug!(client_email = %credential.client_email, "Using service account");
                Some(TokenProvider::new(credential, transport.clone()))
            }
            None => None,
        };

        Ok(Self {
            transport,
            config,
            tokens,
        })
    }

    /// Writes need a signed token; an API key alone only grants reads
    pub fn can_write(&self) -> bool {
        self.tokens.is_some()
    }

    pub fn spreadsheet_url(&self) -> String {
        format!(
            "https://docs.google.com/spreadsheets/d/{}",
            self.config.spreadsheet_id
        )
    }

    /// Exchange an assertion to check the service account credential
    #[instrument(name = "Authenticating to Google Sheets", skip_all)]
    pub async fn verify_auth(&self) -> Result<()> {
        let tokens = self.tokens.as_ref().ok_or_else(|| {
            AppError::Config("No service account credential configured".to_string())
        })?;
        tokens.access_token().await?;
        debug!(client_email = tokens.client_email(), "Service account token issued");
        Ok(())
    }

    fn qualified_range(&self, range: &str) -> String {
        format!("{}!{}", a1::quote_sheet_name(&self.config.sheet_name), range)
    }

    fn spreadsheet_endpoint(&self, segments: &[&str]) -> Result<Url> {
        if self.config.spreadsheet_id.is_empty() {
            return Err(AppError::Config(
                "spreadsheet_id must be set in config file".to_string(),
            ));
        }

        let mut url = Url::parse(SHEETS_API_URL)
            .map_err(|e| AppError::Config(format!("Invalid Sheets API URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Config("Sheets API URL cannot have a path".to_string()))?
            .push(&self.config.spreadsheet_id)
            .extend(segments);

        Ok(url)
    }

    async fn read_auth(&self) -> Result<ReadAuth> {
        let api_key = self.config.api_key();

        if let Some(tokens) = &self.tokens {
            match (tokens.access_token().await, api_key) {
                (Ok(token), _) => return Ok(ReadAuth::Bearer(token)),
                (Err(e), Some(key)) => {
                    warn!(error = %e, "Service account unavailable, reading with API key");
                    return Ok(ReadAuth::ApiKey(key.to_string()));
                }
                (Err(e), None) => return Err(e),
            }
        }

        api_key
            .map(|key| ReadAuth::ApiKey(key.to_string()))
            .ok_or_else(|| {
                AppError::Config("No API key or service account configured".to_string())
            })
    }

    async fn reject_token(&self, status: u16) {
        if status == 401 {
            if let Some(tokens) = &self.tokens {
                tokens.invalidate().await;
            }
        }
    }

    pub async fn try_fetch_grid(&self) -> Result<SyncResult> {
        let mut url = self.spreadsheet_endpoint(&[])?;
        let auth = self.read_auth().await?;

        url.query_pairs_mut()
            .append_pair("ranges", &self.qualified_range(&self.config.range))
            .append_pair("includeGridData", "true");
        if let ReadAuth::ApiKey(key) = &auth {
            url.query_pairs_mut().append_pair("key", key);
        }

        let mut request = HttpRequest::new(Method::GET, url);
        if let ReadAuth::Bearer(token) = auth {
            request = request.bearer_auth(token);
        }

        let response = self.transport.send(request).await?;

        if !response.is_success() {
            self.reject_token(response.status).await;
            return Err(AppError::Transport(format!(
                "Failed to fetch grid: {} - {}",
                response.status, response.body
            )));
        }

        parse_grid(&response.body)
    }

    pub async fn try_update_cell(&self, range: &str, value: &str) -> Result<()> {
        let qualified = self.qualified_range(range);
        let mut url = self.spreadsheet_endpoint(&["values", qualified.as_str()])?;
        let tokens = self.tokens.as_ref().ok_or_else(|| {
            AppError::Config("Writing cells requires a service account".to_string())
        })?;
        let token = tokens.access_token().await?;

        url.query_pairs_mut().append_pair("valueInputOption", "RAW");

        let request = HttpRequest::new(Method::PUT, url)
            .bearer_auth(token)
            .json(json!({ "values": [[value]] }));

        let response = self.transport.send(request).await?;

        if !response.is_success() {
            self.reject_token(response.status).await;
            return Err(AppError::Transport(format!(
                "Failed to update {}: {} - {}",
                range, response.status, response.body
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl SheetOperations for SheetsClient {
    #[instrument(name = "Fetching grid", skip(self))]
    async fn fetch_grid_with_validation(&self) -> SyncResult {
        match self.try_fetch_grid().await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "Failed to fetch grid");
                SyncResult::default()
            }
        }
    }

    #[instrument(name = "Updating cell", skip(self, value))]
    async fn update_cell(&self, range: &str, value: &str) -> bool {
        match self.try_update_cell(range, value).await {
            Ok(()) => {
                debug!("Cell updated");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to update cell");
                false
            }
        }
    }
}
