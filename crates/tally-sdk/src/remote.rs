//! HTTP implementations of the tier traits

use crate::traits::{ManagedStore, Method, PrimaryRemote, TierError};
use async_trait::async_trait;
use serde_json::Value;
use tally_remote_client::{HttpMethod, ManagedStoreClient, RemoteClient, RemoteError};

impl From<RemoteError> for TierError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::NotFound(what) => TierError::NotFound(what),
            RemoteError::Server { status, message } if (400..500).contains(&status) => {
                TierError::Application(message)
            }
            other => TierError::Transport(other.to_string()),
        }
    }
}

fn http_method(method: Method) -> HttpMethod {
    match method {
        Method::Get => HttpMethod::GET,
        Method::Post => HttpMethod::POST,
        Method::Put => HttpMethod::PUT,
        Method::Patch => HttpMethod::PATCH,
        Method::Delete => HttpMethod::DELETE,
    }
}

#[async_trait]
impl PrimaryRemote for RemoteClient {
    async fn request(&self, path: &str, method: Method, body: Option<Value>) -> Result<Value, TierError> {
        Ok(RemoteClient::request(self, http_method(method), path, body.as_ref()).await?)
    }
}

#[async_trait]
impl ManagedStore for ManagedStoreClient {
    async fn select(&self, collection: &str) -> Result<Vec<Value>, TierError> {
        Ok(ManagedStoreClient::select(self, collection).await?)
    }

    async fn insert(&self, collection: &str, row: Value) -> Result<Value, TierError> {
        Ok(ManagedStoreClient::insert(self, collection, &row).await?)
    }

    async fn update(&self, collection: &str, id: &str, changes: Value) -> Result<Option<Value>, TierError> {
        Ok(ManagedStoreClient::update(self, collection, id, &changes).await?)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, TierError> {
        Ok(ManagedStoreClient::delete(self, collection, id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_classification() {
        let not_found: TierError = RemoteError::NotFound("/shifts/9".into()).into();
        assert_eq!(not_found, TierError::NotFound("/shifts/9".into()));

        let rejected: TierError = RemoteError::Server { status: 422, message: "amount required".into() }.into();
        assert_eq!(rejected, TierError::Application("amount required".into()));

        let outage: TierError = RemoteError::Server { status: 503, message: "maintenance".into() }.into();
        assert!(matches!(outage, TierError::Transport(_)));
    }
}
