//! Dual-protocol request construction.
//!
//! The platform speaks two wire conventions: legacy endpoints take
//! form-encoded parameters on `/<resource>/<action>.json` paths, REST
//! endpoints take JSON bodies on `/v2` paths. Operations describe a call
//! with [`ApiCall`]; the client signs and executes it.

use std::fmt;

use reqwest::Method;
use serde_json::Value;

/// Correlation token generated for every REST-protocol call.
pub type RequestId = String;

/// Format suffix on legacy action paths.
const LEGACY_FORMAT: &str = "json";

/// Which wire convention an endpoint speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Form-encoded parameters, `App-Key` header family.
    Legacy,
    /// JSON bodies on `/v2` resource paths, prefixed header family.
    Rest,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Legacy => write!(f, "legacy"),
            Protocol::Rest => write!(f, "REST"),
        }
    }
}

/// One outbound API call, described but not yet signed or sent.
#[derive(Debug, Clone)]
pub(crate) struct ApiCall {
    pub protocol: Protocol,
    pub method: Method,
    pub path: String,
    pub form: Vec<(&'static str, String)>,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<Value>,
}

impl ApiCall {
    /// Legacy form POST to `/<action>.json`.
    pub fn legacy(action: &str) -> Self {
        Self {
            protocol: Protocol::Legacy,
            method: Method::POST,
            path: format!("/{action}.{LEGACY_FORMAT}"),
            form: Vec::new(),
            query: Vec::new(),
            body: None,
        }
    }

    /// REST call on a `/v2` resource path.
    pub fn rest(method: Method, path: impl Into<String>) -> Self {
        Self {
            protocol: Protocol::Rest,
            method,
            path: path.into(),
            form: Vec::new(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn param(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.form.push((key, value.into()));
        self
    }

    /// Adds a form parameter only when it carries a value; `None` and empty
    /// strings are omitted, not sent.
    pub fn param_opt(mut self, key: &'static str, value: Option<&str>) -> Self {
        if let Some(value) = value {
            if !value.is_empty() {
                self.form.push((key, value.to_string()));
            }
        }
        self
    }

    pub fn query(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}
