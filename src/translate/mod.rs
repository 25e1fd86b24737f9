// Translation layer
//
// `BatchTranslator` turns one file's cue texts into a single provider call.
// Providers implement `TranslationProvider`; DeepL is the production one.

pub mod deepl;
pub mod markup;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::TranslateConfig;
use crate::error::{Result, SubwatchError};

pub use deepl::DeepLProvider;
pub use markup::strip_markup;

/// Language and context settings sent with every batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequestOptions {
    pub target_language: String,
    pub source_language: Option<String>,
    pub context: Option<String>,
}

impl From<&TranslateConfig> for TranslationRequestOptions {
    fn from(config: &TranslateConfig) -> Self {
        Self {
            target_language: config.target_language.clone(),
            source_language: config.source_language.clone(),
            context: config.context.clone(),
        }
    }
}

/// External batch translation capability
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Translate `texts` in one request. The result has the same length and order.
    async fn translate_batch(
        &self,
        texts: &[String],
        options: &TranslationRequestOptions,
    ) -> Result<Vec<String>>;
}

/// Sends a whole file's texts to the provider at once
pub struct BatchTranslator {
    provider: Box<dyn TranslationProvider>,
    options: TranslationRequestOptions,
}

impl BatchTranslator {
    pub fn new(provider: Box<dyn TranslationProvider>, options: TranslationRequestOptions) -> Self {
        Self { provider, options }
    }

    pub fn target_language(&self) -> &str {
        &self.options.target_language
    }

    /// Translate `texts`, keeping their order. Markup is stripped first.
    pub async fn translate(&self, texts: &[String]) -> Result<Vec<String>> {
        if texts.is_empty() {
            debug!("Nothing to translate, skipping provider call");
            return Ok(Vec::new());
        }

        let cleaned: Vec<String> = texts.iter().map(|t| strip_markup(t)).collect();

        info!(
            "Translating {} text blocks to {}",
            cleaned.len(),
            self.options.target_language
        );

        let translations = self.provider.translate_batch(&cleaned, &self.options).await?;

        if translations.len() != cleaned.len() {
            return Err(SubwatchError::TranslationProvider(format!(
                "Expected {} translations, received {}",
                cleaned.len(),
                translations.len()
            )));
        }

        Ok(translations)
    }
}
