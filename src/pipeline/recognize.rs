//! Page recognition: the seam to the text/math recognition model.
//!
//! The orchestrator talks only to [`PageRecognizer`]. The shipped
//! implementation, [`VisionRecognizer`], sends each rendered page to a vision
//! language model through `edgequake-llm` and asks for Markdown with LaTeX.
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized ──recognize()──▶ Initialized ──release()──▶ Uninitialized
//! ```
//!
//! The provider is resolved on the first call, not at construction, so a
//! converter that never reaches text extraction never touches the model.
//! `release()` drops the handle; the next call resolves it again.
//!
//! ## Retry Strategy
//!
//! Transient API failures are retried with exponential backoff
//! (`retry_backoff_ms * 2^(attempt-1)`): 500 ms → 1 s → 2 s with defaults.

use crate::error::RecognitionError;
use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use image::DynamicImage;
use std::fmt;
use std::io::Cursor;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Default model when a provider is named without one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Converts one rendered page image into text.
///
/// Implementations must be `Send + Sync`; the orchestrator may call
/// `recognize` for several pages at once (bounded by
/// [`crate::config::ConversionConfig::concurrency`]).
#[async_trait]
pub trait PageRecognizer: Send + Sync {
    /// Recognize the text of the 1-based page `page_num`.
    async fn recognize(
        &self,
        page_num: usize,
        page_image: &DynamicImage,
    ) -> Result<String, RecognitionError>;

    /// Free whatever the recognizer holds (model handle, accelerator memory).
    async fn release(&self) {}
}

/// Settings handed to [`VisionRecognizer::new`].
#[derive(Clone)]
pub struct RecognizerConfig {
    /// Pre-constructed provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Provider name (e.g. "openai", "anthropic", "ollama"). If None along
    /// with `provider`, the provider is auto-detected from the environment.
    pub provider_name: Option<String>,

    /// Model identifier. If None, [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// Sampling temperature. Default: 0.0, transcription must be faithful.
    pub temperature: f32,

    /// Maximum tokens generated per page. Default: 4096.
    pub max_tokens: usize,

    /// Retries on a failed call. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds. Default: 500.
    pub retry_backoff_ms: u64,

    /// Custom system prompt. If None, [`DEFAULT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            provider: None,
            provider_name: None,
            model: None,
            temperature: 0.0,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            system_prompt: None,
        }
    }
}

impl fmt::Debug for RecognizerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecognizerConfig")
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .finish()
    }
}

/// [`PageRecognizer`] backed by a vision language model.
pub struct VisionRecognizer {
    config: RecognizerConfig,
    handle: Mutex<Option<Arc<dyn LLMProvider>>>,
}

impl VisionRecognizer {
    pub fn new(config: RecognizerConfig) -> Self {
        Self {
            config,
            handle: Mutex::new(None),
        }
    }

    /// Whether the provider has been resolved and not released since.
    pub async fn is_initialized(&self) -> bool {
        self.handle.lock().await.is_some()
    }

    /// Resolve the provider on first use.
    async fn provider(&self) -> Result<Arc<dyn LLMProvider>, RecognitionError> {
        let mut guard = self.handle.lock().await;
        if let Some(provider) = guard.as_ref() {
            return Ok(Arc::clone(provider));
        }
        let provider = resolve_provider(&self.config)?;
        info!("Recognizer initialised");
        *guard = Some(Arc::clone(&provider));
        Ok(provider)
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.config.temperature),
            max_tokens: Some(self.config.max_tokens),
            ..Default::default()
        }
    }
}

#[async_trait]
impl PageRecognizer for VisionRecognizer {
    async fn recognize(
        &self,
        page_num: usize,
        page_image: &DynamicImage,
    ) -> Result<String, RecognitionError> {
        let provider = self.provider().await?;

        let image_data = page_image_data(page_image).map_err(|e| RecognitionError::Failed {
            retries: 0,
            detail: format!("page image encoding failed: {e}"),
        })?;

        let system_prompt = self
            .config
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);
        // The image carries all the content; the user turn text stays empty.
        let messages = vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user_with_images("", vec![image_data]),
        ];
        let options = self.options();

        let mut last_err: Option<String> = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff = self.config.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "Page {}: retry {}/{} after {}ms",
                    page_num, attempt, self.config.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match provider.chat(&messages, Some(&options)).await {
                Ok(response) => {
                    debug!(
                        "Page {}: {} input tokens, {} output tokens",
                        page_num, response.prompt_tokens, response.completion_tokens
                    );
                    return Ok(response.content);
                }
                Err(e) => {
                    let err_msg = format!("{}", e);
                    warn!("Page {}: attempt {} failed: {}", page_num, attempt + 1, err_msg);
                    last_err = Some(err_msg);
                }
            }
        }

        Err(RecognitionError::Failed {
            retries: self.config.max_retries,
            detail: last_err.unwrap_or_else(|| "Unknown error".to_string()),
        })
    }

    async fn release(&self) {
        if self.handle.lock().await.take().is_some() {
            info!("Recognizer released");
        }
    }
}

/// Encode a rendered page as a base64 PNG attachment.
///
/// PNG keeps glyph edges crisp; JPEG artefacts around sub- and superscripts
/// degrade math recognition. `detail: "high"` lets the model tile the page
/// instead of reading a single downscaled overview.
fn page_image_data(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    let b64 = STANDARD.encode(&buf);
    debug!("Encoded page image → {} bytes base64", b64.len());
    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

/// Resolve the provider, from most-specific to least-specific:
///
/// 1. pre-built `config.provider`
/// 2. `config.provider_name` + `config.model`
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL` when both are set
/// 4. `ProviderFactory::from_env`, which picks the first API key it finds
fn resolve_provider(config: &RecognizerConfig) -> Result<Arc<dyn LLMProvider>, RecognitionError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
    if let Some(ref name) = config.provider_name {
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| RecognitionError::Unavailable {
            provider: "auto".to_string(),
            hint: format!(
                "No vision model provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, RecognitionError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        RecognitionError::Unavailable {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}
