use crate::auth::{JwtSigner, ServiceAccountCredential, TOKEN_URL};
use crate::error::{AppError, Result};
use crate::transport::{HttpRequest, HttpTransport};
use once_cell::sync::OnceCell;
use reqwest::Method;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use url::Url;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
pub(crate) struct CachedAccessToken {
    pub access_token: String,
    /// Expiry time as seconds since Unix epoch
    pub expires_at: i64,
}

impl CachedAccessToken {
    /// Usable until one refresh margin before the server-side expiry
    pub fn is_valid_at(&self, now: i64) -> bool {
        now < self.expires_at - REFRESH_MARGIN_SECS
    }
}

/// Exchanges signed service account assertions for access tokens.
///
/// Callers serialize on the cache lock, so concurrent requests for an expired
/// token share a single exchange instead of each starting their own.
pub struct TokenProvider {
    credential: ServiceAccountCredential,
    transport: Arc<dyn HttpTransport + Send + Sync>,
    signer: OnceCell<JwtSigner>,
    cached: Mutex<Option<CachedAccessToken>>,
}

impl TokenProvider {
    pub fn new(
        credential: ServiceAccountCredential,
        transport: Arc<dyn HttpTransport + Send + Sync>,
    ) -> Self {
        Self {
            credential,
            transport,
            signer: OnceCell::new(),
            cached: Mutex::new(None),
        }
    }

    pub fn client_email(&self) -> &str {
        &self.credential.client_email
    }

    /// Get a valid access token, exchanging a new assertion when needed
    #[instrument(name = "Getting access token", skip_all)]
    pub async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        let now = chrono::Utc::now().timestamp();

        if let Some(token) = cached.as_ref().filter(|t| t.is_valid_at(now)) {
            debug!("Using cached access token");
            return Ok(token.access_token.clone());
        }

        debug!("Access token missing or expired, exchanging assertion...");
        let token = self.exchange(now).await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);

        Ok(access_token)
    }

    /// Drop the cached token, e.g. after the API rejected it
    pub async fn invalidate(&self) {
        self.cached.lock().await.take();
    }

    fn signer(&self) -> Result<&JwtSigner> {
        self.signer
            .get_or_try_init(|| JwtSigner::from_credential(&self.credential))
            .map_err(|e| AppError::Auth(format!("Failed to load service account key: {}", e)))
    }

    async fn exchange(&self, now: i64) -> Result<CachedAccessToken> {
        let assertion = self.signer()?.sign_assertion(now)?;

        let url = Url::parse(TOKEN_URL)
            .map_err(|e| AppError::Auth(format!("Invalid token URL: {}", e)))?;
        let request = HttpRequest::new(Method::POST, url)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())]);

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| AppError::Auth(format!("Failed to request token: {}", e)))?;

        if !response.is_success() {
            return Err(AppError::Auth(format!(
                "Failed to exchange assertion: {} - {}",
                response.status, response.body
            )));
        }

        let token: TokenResponse = serde_json::from_str(&response.body)
            .map_err(|e| AppError::Auth(format!("Failed to parse token response: {}", e)))?;

        // Default to 1 hour if not provided
        let expires_in = token.expires_in.unwrap_or(3600);

        Ok(CachedAccessToken {
            access_token: token.access_token,
            expires_at: now + expires_in,
        })
    }
}
