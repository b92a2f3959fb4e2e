//! Transport client: remote book reads and writes.
//!
//! The engine is generic over [`Transport`] so tests can script responses;
//! [`HttpTransport`] is the production implementation against the book
//! server's REST surface. All calls are bearer-token authenticated and
//! `update` is idempotent from the caller's perspective, so replaying a
//! queued write with the same payload is safe.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::models::{Book, BookId};
use crate::util::{compact_text, has_http_scheme, non_blank};

#[derive(Debug, Error)]
pub enum TransportError {
    /// The server could not be reached (offline, DNS, timeout)
    #[error("server unreachable: {0}")]
    Unreachable(String),
    /// The server answered with a non-success status
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    /// The server answered with a payload we could not decode
    #[error("invalid response payload: {0}")]
    InvalidPayload(String),
    /// Invalid transport configuration
    #[error("invalid transport configuration: {0}")]
    InvalidConfiguration(String),
}

impl TransportError {
    /// Whether the failure is connectivity-shaped and worth retrying once
    /// the network returns.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::InvalidPayload(error.to_string())
        } else if error.is_builder() {
            Self::InvalidConfiguration(error.to_string())
        } else {
            Self::Unreachable(error.to_string())
        }
    }
}

/// Remote operations the sync engine depends on.
pub trait Transport {
    /// Fetch the whole collection.
    async fn fetch_all(&self, token: &str) -> Result<Vec<Book>, TransportError>;

    /// Fetch a single record by id.
    async fn fetch_one(&self, id: &BookId) -> Result<Book, TransportError>;

    /// Create a record; the server assigns the id and version 0.
    async fn create(&self, token: &str, book: &Book) -> Result<Book, TransportError>;

    /// Update a record; the server bumps the version on success.
    async fn update(&self, token: &str, book: &Book) -> Result<Book, TransportError>;
}

/// HTTP implementation of [`Transport`].
#[derive(Clone)]
pub struct HttpTransport {
    items_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport against a server base URL (e.g. `http://localhost:3000`).
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, TransportError> {
        let base = normalize_endpoint(base_url.as_ref())?;
        Ok(Self {
            items_url: format!("{base}/api/item"),
            client: reqwest::Client::builder().build()?,
        })
    }

    fn item_url(&self, id: &BookId) -> String {
        format!("{}/{id}", self.items_url)
    }
}

impl Transport for HttpTransport {
    async fn fetch_all(&self, token: &str) -> Result<Vec<Book>, TransportError> {
        let response = self
            .client
            .get(&self.items_url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .await?;
        decode_response(response).await
    }

    async fn fetch_one(&self, id: &BookId) -> Result<Book, TransportError> {
        let response = self
            .client
            .get(self.item_url(id))
            .header("Accept", "application/json")
            .send()
            .await?;
        decode_response(response).await
    }

    async fn create(&self, token: &str, book: &Book) -> Result<Book, TransportError> {
        let response = self
            .client
            .post(&self.items_url)
            .bearer_auth(token)
            .json(book)
            .send()
            .await?;
        decode_response(response).await
    }

    async fn update(&self, token: &str, book: &Book) -> Result<Book, TransportError> {
        let id = book
            .id
            .as_ref()
            .ok_or_else(|| TransportError::InvalidConfiguration("update requires an id".into()))?;
        let response = self
            .client
            .put(self.item_url(id))
            .bearer_auth(token)
            .json(book)
            .send()
            .await?;
        decode_response(response).await
    }
}

async fn decode_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, TransportError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TransportError::Rejected {
            status: status.as_u16(),
            message: parse_api_error(status, &body),
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|error| TransportError::InvalidPayload(error.to_string()))
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return compact_text(&message);
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        compact_text(trimmed)
    }
}

fn normalize_endpoint(raw: &str) -> Result<String, TransportError> {
    let endpoint = non_blank(raw).ok_or_else(|| {
        TransportError::InvalidConfiguration("server URL must not be empty".to_string())
    })?;
    if has_http_scheme(endpoint) {
        Ok(endpoint.trim_end_matches('/').to_string())
    } else {
        Err(TransportError::InvalidConfiguration(
            "server URL must include http:// or https://".to_string(),
        ))
    }
}
