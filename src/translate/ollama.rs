use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::TranslateConfig;
use crate::error::{DubError, Result};
use crate::language::{coerce_source_language, Language};
use super::{split_into_chunks, Translator, AUTO_DETECT};

/// Body of `POST /api/generate`
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct TranslatedText {
    text: String,
}

/// Translator backed by a model served through Ollama
pub struct OllamaTranslator {
    client: Client,
    config: TranslateConfig,
}

impl OllamaTranslator {
    pub fn new(config: TranslateConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// One chunk through the model, JSON answer requested
    async fn translate_text(&self, text: &str, source: &str, target: Language) -> Result<String> {
        let request = GenerateRequest {
            model: &self.config.ollama_model,
            prompt: build_translation_prompt(text, source, target),
            stream: false,
            format: "json",
        };

        let url = format!("{}/api/generate", self.config.ollama_endpoint.trim_end_matches('/'));

        debug!("Sending translation request to: {}", url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| DubError::Translation(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DubError::Translation(format!(
                "Ollama API error {}: {}",
                status, error_text
            )));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| DubError::Translation(format!("Failed to parse response: {}", e)))?;

        let raw_response = generated.response.trim().to_string();

        debug!("Raw Ollama response: {}", raw_response);

        let translated = extract_translation(&raw_response);
        if translated.is_empty() {
            return Err(DubError::Translation("Model answered with an empty translation".to_string()));
        }

        Ok(translated)
    }
}

#[async_trait]
impl Translator for OllamaTranslator {
    async fn translate(&self, text: &str, source: &str, target: Language) -> Result<String> {
        let chunks = split_into_chunks(text, self.config.max_chunk_chars);
        if chunks.is_empty() {
            return Ok(String::new());
        }

        info!(
            "Translating {} chunk(s) to {} with Ollama model {}",
            chunks.len(),
            target.name(),
            self.config.ollama_model
        );

        let mut translated = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            translated.push(self.translate_text(chunk, source, target).await?);
        }

        Ok(translated.join(" "))
    }
}

/// Prompt for a single spoken passage; the answer must be `{"text": "..."}`
fn build_translation_prompt(text: &str, source: &str, target: Language) -> String {
    let from = if source == AUTO_DETECT {
        String::new()
    } else {
        format!(" from {}", coerce_source_language(source).name())
    };

    format!(
        "Translate the following spoken transcript{} into {} ({}).\n\
         It will be read aloud as a voice-over, so keep it natural and keep every sentence.\n\
         Answer with a JSON object of the form {{\"text\": \"...\"}} and nothing else.\n\
         \n\
         {}\n",
        from,
        target.name(),
        target.code(),
        text
    )
}

/// Translated text from a model answer, accepting plain text when the model ignored the JSON format
fn extract_translation(raw: &str) -> String {
    match serde_json::from_str::<TranslatedText>(raw) {
        Ok(result) => result.text.trim().to_string(),
        Err(_) => raw.trim().trim_matches('"').trim().to_string(),
    }
}
