//! Query client for the managed store
//!
//! Speaks the PostgREST dialect: collections are tables under `/rest/v1`,
//! rows are filtered with `id=eq.<id>` and writes ask for the affected rows
//! back with `Prefer: return=representation`.

use crate::client::error_message;
use crate::error::{RemoteError, Result};
use crate::types::ManagedStoreConfig;
use reqwest::{header, Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Client for named collections in the managed store
#[derive(Clone)]
pub struct ManagedStoreClient {
    config: ManagedStoreConfig,
    client: Client,
}

impl ManagedStoreClient {
    /// Create a new managed store client
    pub fn new(config: ManagedStoreConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        if !config.api_key.is_empty() {
            let key = header::HeaderValue::from_str(&config.api_key)
                .map_err(|e| RemoteError::Config(format!("invalid API key: {}", e)))?;
            let bearer = header::HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                .map_err(|e| RemoteError::Config(format!("invalid API key: {}", e)))?;
            headers.insert("apikey", key);
            headers.insert(header::AUTHORIZATION, bearer);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RemoteError::Config(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Select every row of a collection
    pub async fn select(&self, collection: &str) -> Result<Vec<Value>> {
        let url = format!("{}?select=*", self.collection_url(collection));
        let rows = self.send(self.client.get(&url)).await?;
        into_rows(rows)
    }

    /// Insert a row, returning the stored representation
    pub async fn insert(&self, collection: &str, row: &Value) -> Result<Value> {
        let request = self
            .client
            .post(self.collection_url(collection))
            .header("Prefer", "return=representation")
            .json(row);

        let rows = into_rows(self.send(request).await?)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RemoteError::InvalidResponse(format!("insert into {} returned no rows", collection)))
    }

    /// Patch the row with `id`; `None` if no row matched
    pub async fn update(&self, collection: &str, id: &str, changes: &Value) -> Result<Option<Value>> {
        let request = self
            .client
            .request(Method::PATCH, self.row_url(collection, id))
            .header("Prefer", "return=representation")
            .json(changes);

        let rows = into_rows(self.send(request).await?)?;
        Ok(rows.into_iter().next())
    }

    /// Delete the row with `id`; `false` if no row matched
    pub async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let request = self
            .client
            .delete(self.row_url(collection, id))
            .header("Prefer", "return=representation");

        let rows = into_rows(self.send(request).await?)?;
        Ok(!rows.is_empty())
    }

    // ==================== Helper Methods ====================

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.url.trim_end_matches('/'),
            urlencoding::encode(collection)
        )
    }

    fn row_url(&self, collection: &str, id: &str) -> String {
        format!("{}?id=eq.{}", self.collection_url(collection), urlencoding::encode(id))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value> {
        let response = request.send().await?;
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

        if text.trim().is_empty() {
            return Ok(Value::Array(Vec::new()));
        }
        Ok(serde_json::from_str(&text)?)
    }
}

fn into_rows(body: Value) -> Result<Vec<Value>> {
    match body {
        Value::Array(rows) => Ok(rows),
        Value::Object(_) => Ok(vec![body]),
        Value::Null => Ok(Vec::new()),
        other => Err(RemoteError::InvalidResponse(format!("expected rows, got {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_url_encodes_id() {
        let client = ManagedStoreClient::new(ManagedStoreConfig {
            url: "https://project.example.co/".into(),
            api_key: "anon".into(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(
            client.row_url("stock_movements", "mv 1"),
            "https://project.example.co/rest/v1/stock_movements?id=eq.mv%201"
        );
    }

    #[test]
    fn test_into_rows_accepts_single_object() {
        assert_eq!(into_rows(json!({"id": "a"})).unwrap().len(), 1);
        assert!(into_rows(Value::Null).unwrap().is_empty());
        assert!(into_rows(json!("nope")).is_err());
    }
}
