use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::ServiceError;
use crate::srt::{SrtCue, parse_srt};
use crate::ui::{Level, emit};

/// Which remote audio endpoint a run targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Transcribe in the spoken language.
    Transcriptions,
    /// Translate to English while transcribing.
    Translations,
}

impl Mode {
    pub fn endpoint_path(self) -> &'static str {
        match self {
            Mode::Transcriptions => "transcriptions",
            Mode::Translations => "translations",
        }
    }
}

/// Remote transcription collaborator. One call covers one bounded clip and
/// returns cues in clip-local time.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, clip: &Path) -> Result<Vec<SrtCue>, ServiceError>;
}

/// Transcriber backed by an OpenAI-compatible `/audio/*` HTTP API.
pub struct WhisperApi {
    client: Client,
    base_url: String,
    api_key: String,
    mode: Mode,
    language: Option<String>,
}

impl WhisperApi {
    pub fn new(
        base_url: String,
        api_key: String,
        mode: Mode,
        language: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ServiceError::Network(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            mode,
            language,
        })
    }
}

#[async_trait]
impl Transcriber for WhisperApi {
    async fn transcribe(&self, clip: &Path) -> Result<Vec<SrtCue>, ServiceError> {
        let content = tokio::fs::read(clip)
            .await
            .map_err(|err| ServiceError::Malformed(format!("unreadable clip {}: {err}", clip.display())))?;
        let file_name = clip
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "clip.mp3".to_string());

        let mut form = Form::new()
            .text("model", "whisper-1")
            .text("response_format", "srt")
            .part("file", Part::bytes(content).file_name(file_name));
        if let Some(language) = &self.language {
            form = form.text("language", language.clone());
        }

        let url = format!("{}/audio/{}", self.base_url, self.mode.endpoint_path());
        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|err| ServiceError::Network(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ServiceError::Network(err.to_string()))?;

        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        parse_srt(&body)
            .map_err(|err| ServiceError::Malformed(format!("unparseable SRT response: {err:#}")))
    }
}

fn classify_status(status: StatusCode, body: &str) -> ServiceError {
    let detail = || {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {trimmed}")
        }
    };
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ServiceError::Auth(detail()),
        StatusCode::TOO_MANY_REQUESTS => ServiceError::RateLimited,
        status if status.is_server_error() => ServiceError::Unavailable(detail()),
        _ => ServiceError::Malformed(detail()),
    }
}

/// Bounded retry with exponential backoff, applied around one remote call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let backoff = self.base_delay.saturating_mul(1u32 << attempt.min(16));
        backoff + jitter(self.base_delay)
    }
}

fn jitter(base: Duration) -> Duration {
    use rand::Rng;
    let ceiling = (base.as_millis() as u64 / 2).max(1);
    Duration::from_millis(rand::thread_rng().gen_range(0..ceiling))
}

/// Run `operation`, retrying transient failures until the policy is
/// exhausted. Permanent failures are returned immediately.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    code: &str,
    mut operation: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_retries => {
                let delay = policy.delay_for_attempt(attempt);
                attempt += 1;
                emit(
                    Level::Warn,
                    code,
                    &format!(
                        "{err}; retrying in {:.1}s (attempt {attempt} of {})",
                        delay.as_secs_f64(),
                        policy.max_retries
                    ),
                );
                sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
