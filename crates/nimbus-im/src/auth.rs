//! Request signing for the platform's authenticated header schemes.
//!
//! Every outbound call carries a fresh nonce/timestamp pair and a SHA-1
//! signature derived from the app secret. The legacy and REST protocols
//! place the same material under different header names.

use chrono::Utc;
use sha1::{Digest, Sha1};
use uuid::Uuid;

/// Legacy protocol header names.
pub const HEADER_APP_KEY: &str = "App-Key";
pub const HEADER_NONCE: &str = "Nonce";
pub const HEADER_TIMESTAMP: &str = "Timestamp";
pub const HEADER_SIGNATURE: &str = "Signature";

/// REST protocol header names.
pub const HEADER_REST_APP_KEY: &str = "X-Nimbus-App-Key";
pub const HEADER_REST_NONCE: &str = "X-Nimbus-Nonce";
pub const HEADER_REST_TIMESTAMP: &str = "X-Nimbus-Timestamp";
pub const HEADER_REST_SIGNATURE: &str = "X-Nimbus-Signature";
pub const HEADER_REST_REQUEST_ID: &str = "X-Nimbus-Request-Id";

/// Long-lived application credentials.
#[derive(Clone)]
pub(crate) struct Credentials {
    pub app_key: String,
    pub app_secret: String,
}

/// Computes a request signature: hex SHA-1 over secret, nonce and timestamp.
///
/// SHA-1 is fixed by the platform's wire contract. The platform signs its
/// callbacks with the same formula, so this also serves to verify them.
pub fn sign(app_secret: &str, nonce: &str, timestamp: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(app_secret.as_bytes());
    hasher.update(nonce.as_bytes());
    hasher.update(timestamp.as_bytes());
    hex::encode(hasher.finalize())
}

/// Authentication material minted for a single outbound call.
pub(crate) struct SignatureMaterial {
    pub nonce: String,
    pub timestamp: String,
    pub signature: String,
}

impl SignatureMaterial {
    pub fn generate(credentials: &Credentials) -> Self {
        let nonce = Uuid::new_v4().simple().to_string();
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign(&credentials.app_secret, &nonce, &timestamp);
        Self {
            nonce,
            timestamp,
            signature,
        }
    }

    /// Header set for the legacy form-encoded protocol.
    pub fn legacy_headers(&self, app_key: &str) -> Vec<(&'static str, String)> {
        vec![
            (HEADER_APP_KEY, app_key.to_string()),
            (HEADER_NONCE, self.nonce.clone()),
            (HEADER_TIMESTAMP, self.timestamp.clone()),
            (HEADER_SIGNATURE, self.signature.clone()),
        ]
    }

    /// Header set for the REST protocol. Mints the per-call request
    /// identifier and returns it alongside the headers.
    pub fn rest_headers(&self, app_key: &str) -> (String, Vec<(&'static str, String)>) {
        let request_id = Uuid::new_v4().to_string();
        let headers = vec![
            (HEADER_REST_APP_KEY, app_key.to_string()),
            (HEADER_REST_NONCE, self.nonce.clone()),
            (HEADER_REST_TIMESTAMP, self.timestamp.clone()),
            (HEADER_REST_SIGNATURE, self.signature.clone()),
            (HEADER_REST_REQUEST_ID, request_id.clone()),
        ];
        (request_id, headers)
    }
}
