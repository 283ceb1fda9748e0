//! HTTP client for the storefront API.
//!
//! Every request except those under `/auth/` carries the stored bearer
//! token. A 401 answer drops the stored session so the caller falls back to
//! guest behaviour.

use std::sync::Arc;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use dream_collections_core::api::MessageResponse;

use crate::error::ClientError;
use crate::storage::{Storage, keys};

/// Used when `DREAM_API_URL` is not set.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

/// Environment variable overriding the API base URL.
pub const BASE_URL_ENV: &str = "DREAM_API_URL";

/// Storefront API client.
///
/// Cheap to clone; clones share the HTTP connection pool and storage.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    storage: Arc<dyn Storage>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.storage.get(keys::TOKEN).is_some())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for the given base URL, e.g. `http://localhost:8080/api`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, storage: Arc<dyn Storage>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
            storage,
        }
    }

    /// Create a client from `DREAM_API_URL`, falling back to the local default.
    #[must_use]
    pub fn from_env(storage: Arc<dyn Storage>) -> Self {
        let base_url = std::env::var(BASE_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self::new(base_url, storage)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The storage holding the session and guest data.
    #[must_use]
    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// Shared handle to the storage.
    #[must_use]
    pub fn storage_handle(&self) -> Arc<dyn Storage> {
        Arc::clone(&self.storage)
    }

    /// Build the absolute URL for an API path, appending query pairs.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Url` if the result is not a valid URL.
    pub fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ClientError> {
        let mut url = Url::parse(&format!("{}{path}", self.base_url))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// `GET` and decode.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server rejects it.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let url = self.url(path, query)?;
        self.send(Method::GET, path, self.client.get(url)).await
    }

    /// `GET` a path ending in free text, e.g. a category name.
    ///
    /// The text is percent-encoded as a single path segment.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server rejects it.
    pub async fn get_by_name<T: DeserializeOwned>(
        &self,
        path: &str,
        name: &str,
    ) -> Result<T, ClientError> {
        let mut url = self.url(path, &[])?;
        url.path_segments_mut()
            .map_err(|()| ClientError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .push(name);
        self.send(Method::GET, path, self.client.get(url)).await
    }

    /// `POST` a JSON body and decode.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server rejects it.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path, &[])?;
        self.send(Method::POST, path, self.client.post(url).json(body))
            .await
    }

    /// `PUT` a JSON body and decode.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server rejects it.
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path, &[])?;
        self.send(Method::PUT, path, self.client.put(url).json(body))
            .await
    }

    /// `PUT` without a body and decode.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server rejects it.
    pub async fn put_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.url(path, &[])?;
        self.send(Method::PUT, path, self.client.put(url)).await
    }

    /// `DELETE` and decode.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server rejects it.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.url(path, &[])?;
        self.send(Method::DELETE, path, self.client.delete(url))
            .await
    }

    /// Attach the bearer token unless the path is an auth endpoint.
    fn authorize(&self, builder: RequestBuilder, path: &str) -> RequestBuilder {
        if is_auth_path(path) {
            return builder;
        }
        match self.storage.get(keys::TOKEN) {
            Some(token) if !token.is_empty() => builder.bearer_auth(token),
            _ => builder,
        }
    }

    #[instrument(skip(self, builder), fields(method = %method, path = %path))]
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        builder: RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = self.authorize(builder, path).send().await?;
        let status = response.status();

        if status.is_success() {
            debug!(status = status.as_u16(), "API request succeeded");
            return decode(response).await;
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.drop_session();
        }

        let message = error_message(response).await;
        warn!(status = status.as_u16(), %message, "API request rejected");
        Err(ClientError::Status {
            status: status.as_u16(),
            message,
        })
    }

    /// Forget the stored token and user after the server rejected them.
    fn drop_session(&self) {
        for key in [keys::TOKEN, keys::USER] {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "Failed to clear session");
            }
        }
    }
}

fn is_auth_path(path: &str) -> bool {
    path.contains("/auth/")
}

/// Decode a success body. An empty body decodes as JSON `null`.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Ok(serde_json::from_str("null")?);
    }
    Ok(serde_json::from_slice(&bytes)?)
}

/// Pull a human-readable message out of an error body.
async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<MessageResponse>(&body)
        .map(|m| m.message)
        .ok()
        .filter(|m| !m.is_empty())
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
        .or_else(|| status.canonical_reason().map(String::from))
        .unwrap_or_else(|| "Request failed".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(base, Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn test_url_joins_and_encodes_query() {
        let api = client("http://localhost:8080/api/");
        assert_eq!(api.base_url(), "http://localhost:8080/api");

        let url = api
            .url(
                "/products/search",
                &[("name", "gold ring".to_string()), ("page", "0".to_string())],
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/products/search?name=gold+ring&page=0"
        );
    }

    #[test]
    fn test_auth_paths_skip_token() {
        assert!(is_auth_path("/auth/signin"));
        assert!(is_auth_path("/auth/otp/verify"));
        assert!(!is_auth_path("/carts/mine"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_http_error() {
        let api = client("http://127.0.0.1:1/api");
        let err = api
            .get::<serde_json::Value>("/categories", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Http(_)));
        assert!(err.status().is_none());
    }
}
