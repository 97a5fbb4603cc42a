use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use rand::Rng;
use reqwest::{Client, StatusCode};
use tokio::time::sleep;

use crate::config::GeminiSettings;
use crate::error::{FnolError, Result};
use crate::llm::generator::Generator;
use crate::llm::types::*;

const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    settings: GeminiSettings,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> Result<Self> {
        if settings.api_key.trim().is_empty() {
            return Err(FnolError::Configuration(
                "Gemini API key must not be empty".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self { client, settings })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    fn request_for(&self, prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content::user(prompt)],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                temperature: self.settings.temperature,
            },
        }
    }

    async fn generate_content(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.settings.base_url, self.settings.model
        );

        let payload = self.request_for(prompt);

        let res = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.settings.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FnolError::Timeout(self.settings.request_timeout)
                } else {
                    FnolError::Network(e)
                }
            })?;
        let status = res.status();

        if !status.is_success() {
            let retry_after = if status == StatusCode::TOO_MANY_REQUESTS {
                retry_after(&res)
            } else {
                None
            };
            if let Some(wait) = retry_after {
                debug!("Gemini asked us to wait {:?} before retrying", wait);
            }
            let err_text = res.text().await.unwrap_or_default();
            return Err(FnolError::Api {
                status: status.as_u16(),
                message: err_text,
                retry_after,
            });
        }

        let body: GenerateContentResponse = res.json().await?;
        body.first_text()
            .ok_or_else(|| FnolError::Generator("Gemini returned no text candidates".to_string()))
    }
}

fn retry_after(res: &reqwest::Response) -> Option<Duration> {
    res.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Exponential backoff with up to 25% random jitter, capped at [`MAX_BACKOFF`].
pub(crate) fn backoff_delay(initial: Duration, attempt: u32) -> Duration {
    let exp = initial.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
    let base = exp.min(MAX_BACKOFF);
    let jitter_ms = (base.as_millis() as u64) / 4;
    let jitter = if jitter_ms > 0 {
        rand::thread_rng().gen_range(0..=jitter_ms)
    } else {
        0
    };
    base + Duration::from_millis(jitter)
}

/// The single wait before retry `attempt`: the server's `Retry-After` when it
/// asks for longer than our own backoff, capped at [`MAX_BACKOFF`].
pub(crate) fn retry_delay(err: &FnolError, initial: Duration, attempt: u32) -> Duration {
    let backoff = backoff_delay(initial, attempt);
    match err.retry_after() {
        Some(requested) => backoff.max(requested.min(MAX_BACKOFF)),
        None => backoff,
    }
}

#[async_trait]
impl Generator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.generate_content(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.settings.max_retries => {
                    attempt += 1;
                    let delay = retry_delay(&e, self.settings.initial_backoff, attempt);
                    warn!(
                        "Gemini call failed ({}), retry {}/{} in {:?}",
                        e, attempt, self.settings.max_retries, delay
                    );
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_caps() {
        let initial = Duration::from_millis(1000);

        let first = backoff_delay(initial, 1);
        assert!(first >= Duration::from_millis(1000) && first <= Duration::from_millis(1250));

        let third = backoff_delay(initial, 3);
        assert!(third >= Duration::from_millis(4000) && third <= Duration::from_millis(5000));

        let huge = backoff_delay(initial, 40);
        assert!(huge <= MAX_BACKOFF + MAX_BACKOFF / 4);
    }

    #[test]
    fn test_retry_after_replaces_backoff_instead_of_adding() {
        let initial = Duration::from_millis(100);
        let rate_limited = |retry_after| FnolError::Api {
            status: 429,
            message: "quota".to_string(),
            retry_after,
        };

        let longer = retry_delay(&rate_limited(Some(Duration::from_secs(7))), initial, 1);
        assert_eq!(longer, Duration::from_secs(7));

        let shorter = retry_delay(&rate_limited(Some(Duration::from_millis(1))), initial, 1);
        assert!(shorter >= Duration::from_millis(100) && shorter <= Duration::from_millis(125));

        let capped = retry_delay(&rate_limited(Some(Duration::from_secs(3600))), initial, 1);
        assert_eq!(capped, MAX_BACKOFF);

        let plain = retry_delay(&FnolError::Timeout(Duration::from_secs(1)), initial, 2);
        assert!(plain >= Duration::from_millis(200) && plain <= Duration::from_millis(250));
    }

    #[test]
    fn test_request_carries_configured_temperature() {
        let default = GeminiClient::new(GeminiSettings::new("key")).unwrap();
        let json = serde_json::to_value(default.request_for("hi")).unwrap();
        assert!(json["generationConfig"].get("temperature").is_none());
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");

        let tuned = GeminiClient::new(GeminiSettings::new("key").with_temperature(0.5)).unwrap();
        let json = serde_json::to_value(tuned.request_for("hi")).unwrap();
        assert_eq!(json["generationConfig"]["temperature"], 0.5);
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
    }

    #[test]
    fn test_empty_key_rejected() {
        let err = GeminiClient::new(GeminiSettings::new(" ")).err().unwrap();
        assert!(matches!(err, FnolError::Configuration(_)));
    }

    #[test]
    fn test_new_client_uses_settings() {
        let client = GeminiClient::new(GeminiSettings::new("key").with_model("gemini-2.5-pro")).unwrap();
        assert_eq!(client.model(), "gemini-2.5-pro");
    }
}
