use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::TranslateConfig;
use crate::error::{Result, SubwatchError};
use super::{TranslationProvider, TranslationRequestOptions};

const FREE_ENDPOINT: &str = "https://api-free.deepl.com";
const PRO_ENDPOINT: &str = "https://api.deepl.com";

/// DeepL answers 456 when the character quota is used up
const QUOTA_EXCEEDED: u16 = 456;

#[derive(Debug, Clone, Serialize)]
pub struct DeepLRequest<'a> {
    pub text: &'a [String],
    pub target_lang: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_lang: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeepLResponse {
    pub translations: Vec<DeepLTranslation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeepLTranslation {
    #[serde(default)]
    pub detected_source_language: Option<String>,
    pub text: String,
}

/// DeepL v2 text translation
pub struct DeepLProvider {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl DeepLProvider {
    pub fn new(config: &TranslateConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| default_endpoint(&config.api_key).to_string());

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Free-tier keys carry a `:fx` suffix and live on a separate host
pub fn default_endpoint(api_key: &str) -> &'static str {
    if api_key.trim().ends_with(":fx") {
        FREE_ENDPOINT
    } else {
        PRO_ENDPOINT
    }
}

fn status_error(status: StatusCode, body: &str) -> SubwatchError {
    let message = match status.as_u16() {
        401 | 403 => format!("authentication failed ({}): {}", status, body),
        QUOTA_EXCEEDED => format!("translation quota exceeded: {}", body),
        429 => format!("rate limited ({}): {}", status, body),
        _ => format!("DeepL API error {}: {}", status, body),
    };
    SubwatchError::TranslationProvider(message)
}

#[async_trait]
impl TranslationProvider for DeepLProvider {
    async fn translate_batch(
        &self,
        texts: &[String],
        options: &TranslationRequestOptions,
    ) -> Result<Vec<String>> {
        let request = DeepLRequest {
            text: texts,
            target_lang: &options.target_language,
            source_lang: options.source_language.as_deref(),
            context: options.context.as_deref(),
        };

        let url = format!("{}/v2/translate", self.endpoint.trim_end_matches('/'));

        debug!("Sending {} texts to {}", texts.len(), url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| SubwatchError::TranslationProvider(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &error_text));
        }

        let body: DeepLResponse = response
            .json()
            .await
            .map_err(|e| SubwatchError::TranslationProvider(format!("Failed to parse response: {}", e)))?;

        Ok(body.translations.into_iter().map(|t| t.text).collect())
    }
}
