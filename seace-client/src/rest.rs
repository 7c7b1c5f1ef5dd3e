//! HTTP transport for the Apps Script endpoint.
//!
//! Every call is a GET: `<base_url>?action=<name>&<param>=<value>...`. Write
//! payloads travel as query parameters too, nested ones as a single `data`
//! parameter holding JSON.

use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use reqwest::Url;
use serde_json::{Map, Value};

use seace_core::{ApiSettings, ConfigError};

use crate::error::FetchError;

/// Payloads with more keys than this are sent as one `data` parameter.
const MAX_FLAT_PAYLOAD_KEYS: usize = 10;

pub type Params = Vec<(String, String)>;

/// Something that can run a backend action.
///
/// The returned future must not borrow `self`, so a cached fetch can
/// outlive the call that started it.
pub trait Backend: Send + Sync {
    fn call(&self, action: &str, params: Params) -> BoxFuture<'static, Result<Value, FetchError>>;
}

#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: Url,
}

impl RestClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, FetchError> {
        let base_url =
            Url::parse(settings.base_url.trim()).map_err(|e| ConfigError::InvalidValue {
                field: "api.base_url".to_string(),
                value: settings.base_url.clone(),
                reason: e.to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .build()
            .map_err(|e| FetchError::Config(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full request URL for `action` with `params`. Empty values are
    /// dropped.
    pub fn request_url(&self, action: &str, params: &[(String, String)]) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("action", action);
            for (name, value) in params.iter().filter(|(_, v)| !v.is_empty()) {
                query.append_pair(name, value);
            }
        }
        url
    }

    pub async fn execute(&self, action: &str, params: &[(String, String)]) -> Result<Value, FetchError> {
        let url = self.request_url(action, params);
        tracing::debug!(action, params = params.len(), "backend request");

        let response = self.client.get(url).send().await.map_err(|e| {
            let err = FetchError::from(e);
            tracing::warn!(action, error = %err, "backend request failed");
            err
        })?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(action, status = status.as_u16(), bytes = body.len(), "backend response");

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("error").map(error_text))
                .unwrap_or_else(|| status.canonical_reason().unwrap_or_default().to_string());
            return Err(FetchError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let value: Value = serde_json::from_str(&body)?;
        check_backend_error(value)
    }
}

impl Backend for RestClient {
    fn call(&self, action: &str, params: Params) -> BoxFuture<'static, Result<Value, FetchError>> {
        let client = self.clone();
        let action = action.to_string();
        async move { client.execute(&action, &params).await }.boxed()
    }
}

/// Reject backend error envelopes and unwrap `{ success: true, data }`.
///
/// `{ "success": false, ... }` and bodies carrying a non-null `error`
/// without `success: true` are backend errors. Any other body is returned
/// as is.
pub fn check_backend_error(value: Value) -> Result<Value, FetchError> {
    let mut map = match value {
        Value::Object(map) => map,
        other => return Ok(other),
    };

    let success = map.get("success").and_then(Value::as_bool);
    let error = map.get("error").filter(|e| !e.is_null()).map(error_text);

    match (success, error) {
        (Some(false), error) => Err(FetchError::Backend(
            error.unwrap_or_else(|| "request failed".to_string()),
        )),
        (None, Some(error)) => Err(FetchError::Backend(error)),
        (Some(true), _) if map.contains_key("data") => {
            Ok(map.remove("data").unwrap_or(Value::Null))
        }
        _ => Ok(Value::Object(map)),
    }
}

fn error_text(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        Value::Object(obj) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}

/// Flatten a write payload into query parameters.
///
/// Scalar payloads with at most ten keys become one parameter per key, with
/// nulls dropped. Payloads holding arrays or objects, or with more keys,
/// become a single `data` parameter with the whole payload as JSON.
pub fn encode_payload(payload: &Map<String, Value>) -> Params {
    let nested = payload
        .values()
        .any(|v| matches!(v, Value::Array(_) | Value::Object(_)));

    if nested || payload.len() > MAX_FLAT_PAYLOAD_KEYS {
        return vec![("data".to_string(), Value::Object(payload.clone()).to_string())];
    }

    payload
        .iter()
        .filter_map(|(k, v)| match v {
            Value::Null => None,
            Value::String(s) => Some((k.clone(), s.clone())),
            other => Some((k.clone(), other.to_string())),
        })
        .collect()
}
