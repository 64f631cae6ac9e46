//! Fetch stage: download the Drive thumbnail of the located PDF.
//!
//! The HTTP call sits behind [`PreviewFetcher`] so the converter can be
//! exercised without a network; [`HttpPreviewFetcher`] is the reqwest-backed
//! implementation used in production. Exactly one request is made per
//! conversion and nothing is retried.

use crate::auth::TokenProvider;
use crate::config::ConversionConfig;
use crate::error::{Pdf2ImgError, StepError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;
use tracing::{debug, info};

/// Raw preview bytes plus the server-reported content type, if any.
#[derive(Debug, Clone)]
pub struct FetchedPreview {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// GET a URL with the given headers and return the body.
#[async_trait]
pub trait PreviewFetcher: Send + Sync {
    async fn fetch(&self, url: &str, headers: HeaderMap) -> Result<FetchedPreview, StepError>;
}

/// [`PreviewFetcher`] over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpPreviewFetcher {
    client: reqwest::Client,
}

impl HttpPreviewFetcher {
    /// Build a client; `timeout_secs = None` keeps reqwest's default (no timeout).
    pub fn new(timeout_secs: Option<u64>) -> Result<Self, Pdf2ImgError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| Pdf2ImgError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Use a preconfigured client (proxy, user agent, timeouts).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PreviewFetcher for HttpPreviewFetcher {
    async fn fetch(&self, url: &str, headers: HeaderMap) -> Result<FetchedPreview, StepError> {
        let failed = |reason: String| StepError::FetchFailed {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    failed(format!("timed out: {e}"))
                } else {
                    failed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("HTTP {status}")));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| failed(e.to_string()))?;

        Ok(FetchedPreview {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

/// Fetch the thumbnail for `file_id` with a fresh bearer token.
pub async fn fetch_preview(
    fetcher: &dyn PreviewFetcher,
    token: &dyn TokenProvider,
    config: &ConversionConfig,
    file_id: &str,
) -> Result<FetchedPreview, StepError> {
    let url = config.thumbnail_url(file_id);
    let access_token = token
        .access_token()
        .await
        .map_err(|e| StepError::AuthFailed {
            detail: e.to_string(),
        })?;

    let mut headers = HeaderMap::new();
    let bearer = HeaderValue::from_str(&format!("Bearer {access_token}")).map_err(|e| {
        StepError::AuthFailed {
            detail: format!("token is not a valid header value: {e}"),
        }
    })?;
    headers.insert(AUTHORIZATION, bearer);

    info!("Fetching preview: {}", url);
    let preview = fetcher.fetch(&url, headers).await?;
    debug!(
        "Preview is {} bytes ({})",
        preview.bytes.len(),
        preview.content_type.as_deref().unwrap_or("unknown type")
    );
    Ok(preview)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingFetcher {
        seen: Mutex<Vec<(String, Option<String>)>>,
    }

    #[async_trait]
    impl PreviewFetcher for RecordingFetcher {
        async fn fetch(&self, url: &str, headers: HeaderMap) -> Result<FetchedPreview, StepError> {
            let auth = headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            self.seen.lock().unwrap().push((url.to_string(), auth));
            Ok(FetchedPreview {
                bytes: vec![1, 2, 3],
                content_type: Some("image/png".into()),
            })
        }
    }

    #[tokio::test]
    async fn sends_bearer_token_to_thumbnail_url() {
        let fetcher = RecordingFetcher::default();
        let token = StaticToken::new("ya29.test");
        let config = ConversionConfig::default();

        let preview = fetch_preview(&fetcher, &token, &config, "FILE1").await.unwrap();
        assert_eq!(preview.bytes, vec![1, 2, 3]);

        let seen = fetcher.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].0,
            "https://drive.google.com/thumbnail?id=FILE1&sz=w1000"
        );
        assert_eq!(seen[0].1.as_deref(), Some("Bearer ya29.test"));
    }

    #[tokio::test]
    async fn token_failure_skips_the_request() {
        let fetcher = RecordingFetcher::default();
        let token = StaticToken::new("");
        let config = ConversionConfig::default();

        let err = fetch_preview(&fetcher, &token, &config, "FILE1").await.unwrap_err();
        assert!(matches!(err, StepError::AuthFailed { .. }));
        assert!(fetcher.seen.lock().unwrap().is_empty());
    }
}
