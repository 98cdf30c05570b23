use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, instrument};
use url::Url;

/// Failure talking to an upstream metadata API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("invalid request url: {0}")]
    Url(#[from] url::ParseError),

    #[error("upstream rejected the API key")]
    Unauthorized,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to decode response: {0}")]
    Decode(String),
}

// Request URLs carry API keys in the query string, so they are stripped
// before an error can reach a log line or a response body.
impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Http(e.without_url())
    }
}

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("muvi/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Joins `base` and `path` and appends `params` as an encoded query string.
    pub fn build_url(base: &str, path: &str, params: &[(&str, String)]) -> Result<Url, ApiError> {
        let joined = format!("{}{}", base.trim_end_matches('/'), path);
        let url = Url::parse_with_params(&joined, params.iter().map(|(k, v)| (*k, v.as_str())))?;
        Ok(url)
    }

    #[instrument(skip(self, url), fields(path = %url.path()))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        debug!("Making GET request");
        let response = self.client.get(url).send().await?;

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED => return Err(ApiError::Unauthorized),
            StatusCode::NOT_FOUND => {
                return Err(ApiError::NotFound(response.url().path().to_string()))
            }
            s if !s.is_success() => {
                error!("HTTP request failed with status: {}", s);
                let message = response.text().await.unwrap_or_default();
                return Err(ApiError::Status {
                    status: s.as_u16(),
                    message,
                });
            }
            _ => {}
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.without_url().to_string()))
    }
}
