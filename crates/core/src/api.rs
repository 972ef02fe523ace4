//! Topic API Client
//!
//! Read-only access to the topic service. The trait keeps the controller
//! independent of the transport; `HttpTopicApi` is the `reqwest` version.

use crate::topic::{Faq, Topic, TopicSummary};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Errors returned by a topic API client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Request to {url} returned status {status}")]
    Status { url: String, status: StatusCode },
    #[error("Response from {url} could not be decoded: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// The three read-only endpoints the player consumes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TopicApi: Send + Sync {
    /// `GET /api/topics`
    async fn list_topics(&self) -> Result<Vec<TopicSummary>, ApiError>;
    /// `GET /api/topics/{id}`, with the topic's FAQ references nested.
    async fn get_topic(&self, topic_id: &str) -> Result<Topic, ApiError>;
    /// `GET /api/faqs/{id}`
    async fn get_faq(&self, faq_id: &str) -> Result<Faq, ApiError>;
}

/// A `TopicApi` backed by HTTP.
///
/// Any non-success status is reported as `ApiError::Status`; the player does
/// not distinguish between status codes.
#[derive(Clone)]
pub struct HttpTopicApi {
    client: Client,
    base_url: Url,
}

impl HttpTopicApi {
    /// Creates a client rooted at `base_url` (e.g. `http://localhost:8000`).
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self, ApiError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let url_str = url.to_string();
        debug!(url = %url_str, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| ApiError::Request {
                url: url_str.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                url: url_str,
                status,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| ApiError::Decode {
                url: url_str,
                source,
            })
    }
}

#[async_trait]
impl TopicApi for HttpTopicApi {
    async fn list_topics(&self) -> Result<Vec<TopicSummary>, ApiError> {
        let url = self.endpoint(&["topics"])?;
        self.get_json(url).await
    }

    async fn get_topic(&self, topic_id: &str) -> Result<Topic, ApiError> {
        let url = self.endpoint(&["topics", topic_id])?;
        self.get_json(url).await
    }

    async fn get_faq(&self, faq_id: &str) -> Result<Faq, ApiError> {
        let url = self.endpoint(&["faqs", faq_id])?;
        self.get_json(url).await
    }
}
