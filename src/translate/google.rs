use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::TranslateConfig;
use crate::error::{DubError, Result};
use crate::language::Language;
use super::{split_into_chunks, Translator};

/// Translator backed by the public Google translate web endpoint
pub struct GoogleTranslator {
    client: Client,
    endpoint: String,
    max_chunk_chars: usize,
}

impl GoogleTranslator {
    pub fn new(config: TranslateConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.google_endpoint.trim_end_matches('/').to_string(),
            max_chunk_chars: config.max_chunk_chars,
        })
    }

    async fn translate_chunk(&self, text: &str, source: &str, target: Language) -> Result<String> {
        let url = format!("{}/translate_a/single", self.endpoint);
        debug!("Sending translation request to: {}", url);

        let response = self
            .client
            .post(&url)
            .query(&[("client", "gtx"), ("sl", source), ("tl", target.code()), ("dt", "t")])
            .form(&[("q", text)])
            .send()
            .await
            .map_err(|e| DubError::Translation(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DubError::Translation(format!(
                "Translate API error {}: {}",
                status, error_text
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| DubError::Translation(format!("Failed to parse response: {}", e)))?;

        parse_gtx_response(&body)
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, source: &str, target: Language) -> Result<String> {
        let chunks = split_into_chunks(text, self.max_chunk_chars);
        if chunks.is_empty() {
            return Ok(String::new());
        }

        info!("Translating {} chunk(s) {} -> {}", chunks.len(), source, target);

        let mut translated = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            translated.push(self.translate_chunk(chunk, source, target).await?);
        }

        Ok(translated.join(" ").trim().to_string())
    }
}

/// Concatenate the sentence translations of a `client=gtx` response.
///
/// The body is a nested array whose first element lists
/// `[translated, original, ...]` entries per sentence.
pub fn parse_gtx_response(body: &Value) -> Result<String> {
    let sentences = match body.get(0) {
        Some(Value::Array(sentences)) => sentences,
        Some(Value::Null) => return Ok(String::new()),
        _ => {
            return Err(DubError::Translation(format!(
                "Unexpected translate response shape: {}",
                body
            )))
        }
    };

    let text: String = sentences
        .iter()
        .filter_map(|sentence| sentence.get(0).and_then(Value::as_str))
        .collect();

    Ok(text)
}
