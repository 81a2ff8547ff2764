use crate::auth::der::{RsaKeyMaterial, decode_pkcs8_rsa};
use crate::error::{AppError, Result};
use serde::Deserialize;
use std::fmt;

const PKCS8_PEM_TAG: &str = "PRIVATE KEY";

/// The two fields of a Google service account key file that signing needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountCredential {
    pub client_email: String,
    pub private_key: String,
}

impl fmt::Debug for ServiceAccountCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountCredential")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl ServiceAccountCredential {
    pub fn from_json(text: &str) -> Result<Self> {
        let credential: Self = serde_json::from_str(text).map_err(|e| {
            AppError::Config(format!("Failed to parse service account credential: {}", e))
        })?;

        if credential.client_email.is_empty() || credential.private_key.is_empty() {
            return Err(AppError::Config(
                "Service account client_email and private_key must be set".to_string(),
            ));
        }

        Ok(credential)
    }

    /// Strip the PEM armor and decode the PKCS#8 body.
    pub fn key_material(&self) -> Result<RsaKeyMaterial> {
        let pem = pem::parse(&self.private_key)
            .map_err(|e| AppError::KeyFormat(format!("Invalid PEM private key: {}", e)))?;

        if pem.tag() != PKCS8_PEM_TAG {
            return Err(AppError::KeyFormat(format!(
                "Unsupported PEM label '{}', expected '{}'",
                pem.tag(),
                PKCS8_PEM_TAG
            )));
        }

        decode_pkcs8_rsa(pem.contents())
    }
}
