//! Remote translation interface and the Google Translate v2 client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::translation::config::ConfigManager;
use crate::translation::error::{helpers::service_error, TranslationError, TranslationResult};

/// One remote call translates an ordered list of texts
///
/// Implementations must return exactly one output per input, in input order.
/// Each call is atomic: it either yields the whole list or fails.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate_batch(
        &self,
        texts: &[String],
        target_lang: &str,
    ) -> TranslationResult<Vec<String>>;

    async fn translate(&self, text: &str, target_lang: &str) -> TranslationResult<String> {
        self.translate_batch(&[text.to_string()], target_lang)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| service_error("empty translation response"))
    }

    fn name(&self) -> &str {
        "translator"
    }
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a [String],
    target: &'a str,
    format: &'static str,
}

#[derive(Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Deserialize)]
struct TranslateData {
    translations: Vec<Translation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

/// Google Cloud Translation v2 client
///
/// The credential and endpoint are read from the [`ConfigManager`] on every
/// call, so a key saved mid-session takes effect on the next request.
#[derive(Clone)]
pub struct GoogleTranslator {
    client: reqwest::Client,
    config: ConfigManager,
}

impl GoogleTranslator {
    pub fn new(config: ConfigManager) -> TranslationResult<Self> {
        let timeout = config.get()?.request_timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("interlinear/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TranslationError::NetworkError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }
}

impl std::fmt::Debug for GoogleTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleTranslator")
            .field("api_key", &"***")
            .finish()
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate_batch(
        &self,
        texts: &[String],
        target_lang: &str,
    ) -> TranslationResult<Vec<String>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let api_key = self.config.api_key()?;
        let api_url = self.config.get()?.api_url;

        let body = TranslateRequest {
            q: texts,
            target: target_lang,
            format: "text",
        };

        tracing::debug!("requesting {} translations into '{}'", texts.len(), target_lang);

        let response = self
            .client
            .post(&api_url)
            .query(&[("key", api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|body| body.error.message)
                .unwrap_or(text);
            return Err(service_error(format!("API returned {status}: {message}")));
        }

        let parsed: TranslateResponse = response.json().await?;
        let translations: Vec<String> = parsed
            .data
            .translations
            .into_iter()
            .map(|t| t.translated_text)
            .collect();

        if translations.len() != texts.len() {
            return Err(service_error(format!(
                "expected {} translations, got {}",
                texts.len(),
                translations.len()
            )));
        }

        Ok(translations)
    }

    fn name(&self) -> &str {
        "google-v2"
    }
}
