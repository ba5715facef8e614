//! Vision API interaction: send an image plus prompt, return the model's
//! description.
//!
//! This module is intentionally thin — prompt text lives in
//! [`crate::prompts`] so it can change without touching retry or
//! error-handling logic here.
//!
//! ## Retry Strategy
//!
//! 429/5xx/timeouts from hosted model APIs are transient and frequent.
//! Attempts are bounded by [`RetryPolicy::max_attempts`] with exponential
//! backoff (`backoff_base * 2^(failures-1)`) and a hard per-request timeout.
//! There is no mid-flight cancellation: giving up means exhausting the
//! attempt budget.

use crate::error::DocVisionError;
use crate::pipeline::classify::Classification;
use crate::pipeline::transcode::EncodedImage;
use crate::prompts;
use crate::vision::cache::{CachedDescription, DescriptionCache};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use md5::{Digest, Md5};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Environment variable holding the API key for [`VisionClient::from_env`].
pub const API_KEY_VAR: &str = "OPENROUTER_API_KEY";

const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_MODEL: &str = "anthropic/claude-3-5-sonnet";
const DEFAULT_MAX_TOKENS: usize = 1000;

/// Retry behaviour for the remote call, injected as a value object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Default: 3.
    pub max_attempts: u32,
    /// Base delay for the exponential backoff. Default: 500 ms.
    pub backoff_base: Duration,
    /// Hard per-request timeout. Default: 30 s.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following `failures` prior failures:
    /// 500 ms → 1 s → 2 s with the defaults.
    pub fn delay(&self, failures: u32) -> Duration {
        self.backoff_base * 2u32.pow(failures.saturating_sub(1))
    }
}

/// Client for an OpenRouter-style `chat/completions` vision endpoint.
///
/// Descriptions are cached by MD5 of the image bytes through the injected
/// [`DescriptionCache`]; the cache is flushed after every new analysis.
pub struct VisionClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    max_tokens: usize,
    retry: RetryPolicy,
    cache: Arc<dyn DescriptionCache>,
}

impl VisionClient {
    pub fn new(api_key: impl Into<String>, cache: Arc<dyn DescriptionCache>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            retry: RetryPolicy::default(),
            cache,
        }
    }

    /// Construct from the [`API_KEY_VAR`] environment variable.
    pub fn from_env(cache: Arc<dyn DescriptionCache>) -> Result<Self, DocVisionError> {
        let api_key = std::env::var(API_KEY_VAR)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(DocVisionError::MissingApiKey {
                variable: API_KEY_VAR,
            })?;
        Ok(Self::new(api_key, cache))
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Describe an image, consulting the cache first.
    pub async fn describe(
        &self,
        image: &EncodedImage,
        prompt: &str,
    ) -> Result<String, DocVisionError> {
        let key = content_key(&image.bytes);
        if let Some(hit) = self.cache.get(&key) {
            let prefix = &key[..8.min(key.len())];
            debug!(key = prefix, "description cache hit");
            return Ok(hit.description);
        }
        self.request_and_cache(image, prompt, &key).await
    }

    /// Describe an image with the default prompt for its classification.
    pub async fn describe_classified(
        &self,
        image: &EncodedImage,
        classification: Classification,
    ) -> Result<String, DocVisionError> {
        self.describe(image, prompts::prompt_for(classification))
            .await
    }

    /// Describe an image with the chart-analysis prompt.
    pub async fn describe_chart(&self, image: &EncodedImage) -> Result<String, DocVisionError> {
        self.describe(image, prompts::CHART_PROMPT).await
    }

    /// Describe an image with the table-analysis prompt.
    ///
    /// The classifier never emits a table label; callers that know a region
    /// is a data table (e.g. from surrounding text) opt into this prompt
    /// directly.
    pub async fn describe_table(&self, image: &EncodedImage) -> Result<String, DocVisionError> {
        self.describe(image, prompts::TABLE_PROMPT).await
    }

    /// Force a fresh analysis, bypassing the cache lookup but still storing
    /// the new result.
    pub async fn refresh(
        &self,
        image: &EncodedImage,
        prompt: &str,
    ) -> Result<String, DocVisionError> {
        let key = content_key(&image.bytes);
        self.request_and_cache(image, prompt, &key).await
    }

    async fn request_and_cache(
        &self,
        image: &EncodedImage,
        prompt: &str,
        key: &str,
    ) -> Result<String, DocVisionError> {
        let description = self.call_with_retry(image, prompt).await?;
        self.cache.put(
            key,
            CachedDescription::new(description.clone(), image.size_bytes()),
        );
        if let Err(e) = self.cache.flush() {
            warn!(error = %e, "description cache flush failed");
        }
        Ok(description)
    }

    async fn call_with_retry(
        &self,
        image: &EncodedImage,
        prompt: &str,
    ) -> Result<String, DocVisionError> {
        let b64 = STANDARD.encode(&image.bytes);
        let payload = serde_json::json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    {
                        "type": "image_url",
                        "image_url": { "url": format!("data:image/jpeg;base64,{b64}") }
                    }
                ]
            }],
            "max_tokens": self.max_tokens,
        });

        let mut last_error: Option<String> = None;

        for failures in 0..self.retry.max_attempts {
            if failures > 0 {
                let delay = self.retry.delay(failures);
                warn!(
                    attempt = failures + 1,
                    max = self.retry.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "retrying vision request"
                );
                sleep(delay).await;
            }

            let sent = self
                .http
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .timeout(self.retry.timeout)
                .json(&payload)
                .send()
                .await;

            match sent {
                Ok(response) if response.status().is_success() => {
                    match extract_content(response).await {
                        Ok(description) => {
                            debug!(bytes = image.size_bytes(), "vision request succeeded");
                            return Ok(description);
                        }
                        Err(detail) => last_error = Some(detail),
                    }
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    warn!(%status, "vision API returned an error");
                    last_error = Some(format!("HTTP {status}: {body}"));
                }
                Err(e) => {
                    warn!(error = %e, "vision request failed");
                    last_error = Some(e.to_string());
                }
            }
        }

        Err(DocVisionError::VisionApiFailed {
            attempts: self.retry.max_attempts,
            detail: last_error.unwrap_or_else(|| "no attempt recorded".to_string()),
        })
    }
}

/// Content-hash cache key: MD5 hex digest of the image bytes.
fn content_key(bytes: &[u8]) -> String {
    format!("{:x}", Md5::digest(bytes))
}

async fn extract_content(response: reqwest::Response) -> Result<String, String> {
    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| format!("response body was not JSON: {e}"))?;
    body["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| format!("response had no message content: {body}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::cache::MemoryCache;

    #[test]
    fn backoff_doubles_per_failure() {
        let retry = RetryPolicy::default();
        assert_eq!(retry.delay(1), Duration::from_millis(500));
        assert_eq!(retry.delay(2), Duration::from_millis(1000));
        assert_eq!(retry.delay(3), Duration::from_millis(2000));
    }

    #[test]
    fn content_key_is_stable_md5_hex() {
        let key = content_key(b"hello world");
        assert_eq!(key, "5eb63bbbe01eeed093cb22bb8f5acdc3");
        assert_eq!(key, content_key(b"hello world"));
    }

    #[test]
    fn from_env_without_key_errors() {
        // Only meaningful when the variable is absent in the test env.
        if std::env::var(API_KEY_VAR).is_ok() {
            return;
        }
        let result = VisionClient::from_env(Arc::new(MemoryCache::new()));
        assert!(matches!(
            result,
            Err(DocVisionError::MissingApiKey { .. })
        ));
    }

    #[test]
    fn cache_hit_short_circuits_the_network() {
        let cache = Arc::new(MemoryCache::new());
        let image = EncodedImage {
            bytes: vec![1, 2, 3, 4],
        };
        cache.put(
            &content_key(&image.bytes),
            CachedDescription::new("a cached description", image.size_bytes()),
        );

        // Endpoint is unroutable; a cache miss would error.
        let client = VisionClient::new("test-key", cache)
            .with_endpoint("http://127.0.0.1:1/unreachable")
            .with_retry(RetryPolicy {
                max_attempts: 1,
                backoff_base: Duration::from_millis(1),
                timeout: Duration::from_millis(50),
            });

        let description =
            tokio_test::block_on(client.describe(&image, prompts::DEFAULT_IMAGE_PROMPT))
                .expect("cache hit");
        assert_eq!(description, "a cached description");
    }

    #[test]
    fn chart_and_table_conveniences_consult_the_same_cache() {
        let cache = Arc::new(MemoryCache::new());
        let image = EncodedImage {
            bytes: vec![5, 6, 7, 8],
        };
        cache.put(
            &content_key(&image.bytes),
            CachedDescription::new("a table of fees", image.size_bytes()),
        );

        let client = VisionClient::new("test-key", cache)
            .with_endpoint("http://127.0.0.1:1/unreachable")
            .with_retry(RetryPolicy {
                max_attempts: 1,
                backoff_base: Duration::from_millis(1),
                timeout: Duration::from_millis(50),
            });

        let description =
            tokio_test::block_on(client.describe_table(&image)).expect("cache hit");
        assert_eq!(description, "a table of fees");
        let description =
            tokio_test::block_on(client.describe_chart(&image)).expect("cache hit");
        assert_eq!(description, "a table of fees");
    }

    #[test]
    fn exhausted_attempts_surface_the_last_error() {
        let client = VisionClient::new("test-key", Arc::new(MemoryCache::new()))
            .with_endpoint("http://127.0.0.1:1/unreachable")
            .with_retry(RetryPolicy {
                max_attempts: 2,
                backoff_base: Duration::from_millis(1),
                timeout: Duration::from_millis(50),
            });

        let image = EncodedImage { bytes: vec![9; 16] };
        let err = tokio_test::block_on(client.describe(&image, "describe this"))
            .expect_err("unreachable endpoint");
        assert!(matches!(
            err,
            DocVisionError::VisionApiFailed { attempts: 2, .. }
        ));
    }
}
