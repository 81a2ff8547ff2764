use crate::auth::ServiceAccountCredential;
use crate::error::{AppError, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rsa::RsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::sha2::Sha256;
use rsa::signature::{SignatureEncoding, Signer};
use serde::{Deserialize, Serialize};

/// Read and write access to spreadsheets
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Header {
    alg: String,
    typ: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
}

/// Signs JWT-bearer assertions for a service account with RS256.
pub struct JwtSigner {
    issuer: String,
    signing_key: SigningKey<Sha256>,
}

impl JwtSigner {
    pub fn new(issuer: impl Into<String>, key: RsaPrivateKey) -> Self {
        Self {
            issuer: issuer.into(),
            signing_key: SigningKey::<Sha256>::new(key),
        }
    }

    pub fn from_credential(credential: &ServiceAccountCredential) -> Result<Self> {
        let key = credential.key_material()?.to_private_key()?;
        Ok(Self::new(credential.client_email.clone(), key))
    }

    pub fn claims(&self, now: i64) -> Claims {
        Claims {
            iss: self.issuer.clone(),
            scope: SHEETS_SCOPE.to_string(),
            aud: TOKEN_URL.to_string(),
            exp: now + ASSERTION_LIFETIME_SECS,
            iat: now,
        }
    }

    /// Build the compact `header.payload.signature` assertion issued at `now`.
    pub fn sign_assertion(&self, now: i64) -> Result<String> {
        let header = Header {
            alg: "RS256".to_string(),
            typ: "JWT".to_string(),
        };

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&self.claims(now))?)
        );

        let signature = self
            .signing_key
            .try_sign(signing_input.as_bytes())
            .map_err(|e| AppError::Auth(format!("Failed to sign assertion: {}", e)))?;

        Ok(format!(
            "{}.{}",
            signing_input,
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        ))
    }
}
