//! HTTP client for the primary records service

use crate::error::{RemoteError, Result};
use crate::types::RemoteConfig;
use reqwest::{header, Client, Method, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// HTTP client for the primary records service
///
/// Every call resolves to the decoded JSON body. The body is returned as-is:
/// it may be an envelope (`{"success": .., "data": ..}`) or a bare
/// array/object, and callers decide how to read it.
///
/// # Example
///
/// ```rust,no_run
/// use tally_remote_client::{RemoteClient, RemoteConfig};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = RemoteClient::new(RemoteConfig::default())?;
///
/// let created = client
///     .post("/finance/transactions", &json!({"amount": 100, "type": "INCOME"}))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RemoteClient {
    config: RemoteConfig,
    client: Client,
}

impl RemoteClient {
    /// Create a new client
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref api_key) = config.api_key {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| RemoteError::Config(format!("invalid API key: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RemoteError::Config(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Client configuration
    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// Issue a request against `path` (relative to the base URL)
    pub async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let url = self.url(path);
        tracing::debug!(%method, %url, "remote request");

        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request
                .header(header::CONTENT_TYPE, "application/json")
                .json(body);
        }

        let response = request.send().await?;
        self.handle_response(response).await
    }

    /// GET `path`
    pub async fn get(&self, path: &str) -> Result<Value> {
        self.request(Method::GET, path, None).await
    }

    /// POST a JSON body to `path`
    pub async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.request(Method::POST, path, Some(body)).await
    }

    /// PUT a JSON body to `path`
    pub async fn put(&self, path: &str, body: &Value) -> Result<Value> {
        self.request(Method::PUT, path, Some(body)).await
    }

    /// DELETE `path`
    pub async fn delete(&self, path: &str) -> Result<Value> {
        self.request(Method::DELETE, path, None).await
    }

    // ==================== Helper Methods ====================

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn handle_response(&self, response: reqwest::Response) -> Result<Value> {
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound(response.url().path().to_string()));
        }

        let text = response.text().await?;

        if !status.is_success() {
            return Err(RemoteError::Server {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        // 204 and empty 200s carry no body
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&text)?)
    }
}

/// Pull a human-readable message out of an error body
pub(crate) fn error_message(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => ["message", "error", "detail", "hint"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string()),
        _ => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = RemoteClient::new(RemoteConfig {
            base_url: "http://erp.local/api/".into(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(
            client.url("/finance/transactions"),
            "http://erp.local/api/finance/transactions"
        );
        assert_eq!(client.url("shifts/7"), "http://erp.local/api/shifts/7");
    }

    #[test]
    fn test_error_message_prefers_message_field() {
        assert_eq!(
            error_message(r#"{"success":false,"message":"Account is locked"}"#),
            "Account is locked"
        );
        assert_eq!(error_message(r#"{"error":"bad token"}"#), "bad token");
        assert_eq!(error_message("gateway timeout"), "gateway timeout");
    }

    #[test]
    fn test_invalid_api_key_is_config_error() {
        let result = RemoteClient::new(RemoteConfig {
            api_key: Some("line\nbreak".into()),
            ..Default::default()
        });
        assert!(matches!(result, Err(RemoteError::Config(_))));
    }
}
