//! Response envelope decoding shared by both protocols.
//!
//! Every response is a JSON envelope carrying a status `code`. Payloads are
//! decoded through per-endpoint schemas whose loosely-typed fields use the
//! lenient deserializers below: a missing, null or cross-typed field lands
//! on its zero value instead of failing the whole decode.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{NimbusError, Result};
use crate::protocol::Protocol;

/// Envelope code reported by the platform on success.
pub(crate) const SUCCESS_CODE: i32 = 200;

/// Some success-only endpoints omit the code entirely.
fn is_success(code: i32) -> bool {
    code == SUCCESS_CODE || code == 0
}

#[derive(Debug, Deserialize)]
struct LegacyStatus {
    #[serde(default)]
    code: i32,
    #[serde(default, rename = "errorMessage")]
    error_message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RestStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default, rename = "errorMessage")]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RestData<T> {
    #[serde(default)]
    data: Option<T>,
}

/// Checks a legacy envelope, ignoring any payload.
pub(crate) fn legacy_ack(body: &[u8]) -> Result<()> {
    let status: LegacyStatus = serde_json::from_slice(body)?;
    if !is_success(status.code) {
        return Err(NimbusError::Api {
            origin: Protocol::Legacy,
            code: status.code,
            message: status.error_message.or(status.msg).unwrap_or_default(),
            request_id: None,
        });
    }
    Ok(())
}

/// Decodes a legacy envelope into an endpoint schema after checking its code.
pub(crate) fn decode_legacy<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    legacy_ack(body)?;
    Ok(serde_json::from_slice(body)?)
}

/// Checks a REST envelope, stamping the request identifier into any error.
pub(crate) fn rest_ack(body: &[u8], request_id: &str) -> Result<()> {
    let status: RestStatus = rest_slice(body, request_id)?;
    if !is_success(status.code) {
        return Err(NimbusError::Api {
            origin: Protocol::Rest,
            code: status.code,
            message: status.msg.or(status.error_message).unwrap_or_default(),
            request_id: Some(request_id.to_string()),
        });
    }
    Ok(())
}

/// Decodes the `data` payload of a REST envelope. A missing `data` object
/// decodes to the schema's default, never an error.
pub(crate) fn decode_rest<T>(body: &[u8], request_id: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    rest_ack(body, request_id)?;
    let envelope: RestData<T> = rest_slice(body, request_id)?;
    Ok(envelope.data.unwrap_or_default())
}

/// Parses a REST body, keeping the request identifier on decode failures.
fn rest_slice<T: DeserializeOwned>(body: &[u8], request_id: &str) -> Result<T> {
    serde_json::from_slice(body).map_err(|source| NimbusError::Json {
        source,
        request_id: Some(request_id.to_string()),
    })
}

/// Treats an explicit `null` like an absent key: the field's default.
/// Collection fields pair this with `#[serde(default)]` so both spellings
/// of "no entries" decode to an empty container.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Coerces a loosely-typed field to a string; null becomes "".
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}

/// Coerces numbers (including floats), numeric strings and booleans to i64.
pub(crate) fn lenient_i64<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => s
            .parse::<i64>()
            .ok()
            .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
            .unwrap_or(0),
        Value::Bool(b) => i64::from(b),
        _ => 0,
    })
}

/// Coerces booleans, "true"/"false" strings and 0/1 numbers to bool.
pub(crate) fn lenient_bool<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::String(s) => matches!(s.as_str(), "true" | "True" | "1"),
        Value::Number(n) => n
            .as_i64()
            .map(|v| v != 0)
            .or_else(|| n.as_f64().map(|f| f != 0.0))
            .unwrap_or(false),
        _ => false,
    })
}
