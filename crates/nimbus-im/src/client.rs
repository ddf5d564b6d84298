//! Client configuration and the HTTP dispatch path shared by every operation.

use std::time::Duration;

use tracing::{debug, warn};

use crate::auth::{Credentials, SignatureMaterial};
use crate::error::Result;
use crate::protocol::{ApiCall, Protocol, RequestId};

/// Default platform endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.nimbus-im.com";
/// Default endpoint of the SMS subsystem.
pub const DEFAULT_SMS_BASE: &str = "https://sms.nimbus-im.com";
/// Default per-request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Endpoint and timeout overrides for [`NimbusClient::with_options`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub api_base: String,
    pub sms_base: String,
    /// Applied to the whole request, connect phase included.
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            sms_base: DEFAULT_SMS_BASE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Client for the platform's server-side API.
///
/// Construction is cheap and the underlying connection pool is
/// reference-counted; clone freely and share across tasks. Configuration is
/// immutable after construction.
#[derive(Clone)]
pub struct NimbusClient {
    http: reqwest::Client,
    credentials: Credentials,
    api_base: String,
    sms_base: String,
}

impl NimbusClient {
    /// Creates a client against the default platform endpoints.
    pub fn new(app_key: impl Into<String>, app_secret: impl Into<String>) -> Result<Self> {
        Self::with_options(app_key, app_secret, ClientOptions::default())
    }

    /// Creates a client with explicit endpoint and timeout overrides.
    pub fn with_options(
        app_key: impl Into<String>,
        app_secret: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .connect_timeout(options.timeout)
            .user_agent(concat!("nimbus-im/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            credentials: Credentials {
                app_key: app_key.into(),
                app_secret: app_secret.into(),
            },
            api_base: options.api_base.trim_end_matches('/').to_string(),
            sms_base: options.sms_base.trim_end_matches('/').to_string(),
        })
    }

    /// The configured app key.
    pub fn app_key(&self) -> &str {
        &self.credentials.app_key
    }

    /// Base endpoint API calls are issued against.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Base endpoint of the SMS subsystem.
    pub fn sms_base(&self) -> &str {
        &self.sms_base
    }

    /// Executes a legacy-protocol call and returns the raw envelope bytes.
    pub(crate) async fn execute_legacy(&self, call: ApiCall) -> Result<Vec<u8>> {
        let material = SignatureMaterial::generate(&self.credentials);
        let headers = material.legacy_headers(&self.credentials.app_key);
        self.send(call, headers).await
    }

    /// Executes a REST-protocol call, returning the raw envelope bytes and
    /// the request identifier placed on the outbound headers. Transport
    /// failures come back stamped with that identifier.
    pub(crate) async fn execute_rest(&self, call: ApiCall) -> Result<(Vec<u8>, RequestId)> {
        let material = SignatureMaterial::generate(&self.credentials);
        let (request_id, headers) = material.rest_headers(&self.credentials.app_key);
        match self.send(call, headers).await {
            Ok(body) => Ok((body, request_id)),
            Err(err) => Err(err.with_request_id(&request_id)),
        }
    }

    /// Signs and sends one call. Non-2xx statuses are not short-circuited:
    /// the platform puts its error envelope in those bodies too, so the
    /// bytes always come back for decoding.
    async fn send(&self, call: ApiCall, headers: Vec<(&'static str, String)>) -> Result<Vec<u8>> {
        let ApiCall {
            protocol,
            method,
            path,
            form,
            query,
            body,
        } = call;
        let url = format!("{}{}", self.api_base, path);
        debug!("{} {} ({})", method, url, protocol);

        let mut request = self.http.request(method, &url);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        if !query.is_empty() {
            request = request.query(&query);
        }
        request = match protocol {
            Protocol::Legacy => request.form(&form),
            Protocol::Rest => match body {
                Some(body) => request.json(&body),
                None => request,
            },
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("{} returned HTTP {}, decoding envelope anyway", url, status);
        }
        let bytes = response.bytes().await?;
        debug!("{} responded with {} bytes (HTTP {})", url, bytes.len(), status);
        Ok(bytes.to_vec())
    }
}
